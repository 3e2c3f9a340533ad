//! 编译流程集成测试：假进程执行器写出日志与 PDF，验证编排、检查与取消

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use poster_gen::config::AppConfig;
use poster_gen::core::{CompileOutcome, PosterCompiler, PosterError};
use poster_gen::pipeline::{
    CompilationResult, CompilationStep, FailureSource, PipelineEvent, PipelineOutcome,
    ProcessRunner, RunOutcome, StepOutput,
};
use poster_gen::poster::{MissingField, PosterDraft, PresentationMode};
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

const PDF_BYTES: &[u8] = b"%PDF-1.5\nposter body\n%%EOF";
const BIBTEX: &str = "@article{Doe2024, title={Cats}, year={2024}}";

/// 假执行器：lualatex 写 main.log / main.pdf，biber 写 main.blg
struct FakeTexRunner {
    calls: Mutex<Vec<String>>,
    typeset_log: String,
    bib_log: String,
}

impl FakeTexRunner {
    fn clean() -> Self {
        Self::with_logs(
            "This is LuaHBTeX\nOutput written on main.pdf (1 page).",
            "INFO - This is Biber 2.19\nINFO - WARNINGS: 0",
        )
    }

    fn with_logs(typeset_log: &str, bib_log: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            typeset_log: typeset_log.to_string(),
            bib_log: bib_log.to_string(),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeTexRunner {
    async fn run(
        &self,
        step: &CompilationStep,
        cwd: &Path,
        _cancel: &CancellationToken,
    ) -> Result<RunOutcome, PosterError> {
        self.calls.lock().unwrap().push(step.program.clone());
        match step.program.as_str() {
            "lualatex" => {
                std::fs::write(cwd.join("main.log"), &self.typeset_log)?;
                std::fs::write(cwd.join("main.pdf"), PDF_BYTES)?;
            }
            "biber" => std::fs::write(cwd.join("main.blg"), &self.bib_log)?,
            _ => {}
        }
        Ok(RunOutcome::Exited(StepOutput {
            exit_code: Some(0),
            ..Default::default()
        }))
    }
}

/// 第二步（biber）挂起直到取消
struct HangingRunner {
    calls: Mutex<Vec<String>>,
    reached: Arc<Notify>,
}

#[async_trait]
impl ProcessRunner for HangingRunner {
    async fn run(
        &self,
        step: &CompilationStep,
        _cwd: &Path,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, PosterError> {
        self.calls.lock().unwrap().push(step.program.clone());
        if step.program == "biber" {
            self.reached.notify_one();
            cancel.cancelled().await;
            return Ok(RunOutcome::Cancelled);
        }
        Ok(RunOutcome::Exited(StepOutput::default()))
    }
}

/// 取消后子进程要过一段时间才退出；记录同时在跑的调用数
struct SlowExitRunner {
    active: AtomicUsize,
    max_active: AtomicUsize,
    reached: Arc<Notify>,
}

#[async_trait]
impl ProcessRunner for SlowExitRunner {
    async fn run(
        &self,
        _step: &CompilationStep,
        _cwd: &Path,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, PosterError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.reached.notify_one();
        cancel.cancelled().await;
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(RunOutcome::Cancelled)
    }
}

fn workspace_config(dir: &TempDir) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.workspace.root = Some(dir.path().join("latex"));
    std::fs::create_dir_all(dir.path().join("latex")).unwrap();
    cfg
}

fn jane_doe(dest: PathBuf) -> PosterDraft {
    PosterDraft {
        presenter: "Dr. Jane Doe".into(),
        role: "PhD Student".into(),
        date: NaiveDate::from_ymd_opt(2024, 10, 17).unwrap(),
        time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        mode: PresentationMode::Citation,
        bibtex: BIBTEX.into(),
        save_location: dest.display().to_string(),
        ..Default::default()
    }
}

async fn drain_events(handle: &mut poster_gen::CompileHandle) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Some(ev) = handle.next_event().await {
        events.push(ev);
    }
    events
}

#[tokio::test]
async fn test_end_to_end_citation_poster() {
    let dir = TempDir::new().unwrap();
    let cfg = workspace_config(&dir);
    let runner = Arc::new(FakeTexRunner::clean());
    let compiler = PosterCompiler::with_runner(&cfg, runner.clone()).without_toolchain_check();
    let dest = dir.path().join("JaneDoe_17Oct.pdf");

    let mut handle = compiler.submit_draft(&jane_doe(dest.clone())).unwrap();
    let events = drain_events(&mut handle).await;
    let outcome = handle.finish().await.unwrap();

    assert_eq!(
        outcome,
        CompileOutcome::Finished(CompilationResult::Success { output: dest.clone() })
    );
    assert_eq!(std::fs::read(&dest).unwrap(), PDF_BYTES);
    assert_eq!(runner.calls(), vec!["lualatex", "biber", "lualatex", "lualatex"]);

    let input = std::fs::read_to_string(compiler.workspace().input_path()).unwrap();
    assert!(input.contains("\\newcommand{\\Presenter}{Dr. Jane Doe}"));
    assert!(input.contains("\\newcommand{\\Role}{PhD Student}"));
    assert!(input.contains("\\newcommand{\\Day}{Thursday}"));
    assert!(input.contains("\\newcommand{\\Date}{17 October 2024}"));
    assert!(input.contains("\\newcommand{\\Time}{10:00 AM}"));
    assert!(input.contains("\\newcommand{\\CiteKey}{Doe2024}"));
    assert!(!input.contains("\\Title"));
    assert_eq!(
        std::fs::read_to_string(compiler.workspace().bibliography_path()).unwrap(),
        BIBTEX
    );

    assert_eq!(events.first(), Some(&PipelineEvent::Started { total: 4 }));
    let progress: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StepCompleted { completed, .. } => Some(*completed),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![1, 2, 3, 4]);
    assert_eq!(
        events.last(),
        Some(&PipelineEvent::Finished {
            outcome: PipelineOutcome::Completed
        })
    );
}

#[tokio::test]
async fn test_missing_fields_rejected_before_any_write() {
    let dir = TempDir::new().unwrap();
    let cfg = workspace_config(&dir);
    let runner = Arc::new(FakeTexRunner::clean());
    let compiler = PosterCompiler::with_runner(&cfg, runner.clone()).without_toolchain_check();

    let draft = PosterDraft {
        role: "PhD Student".into(),
        bibtex: BIBTEX.into(),
        ..Default::default()
    };
    match compiler.submit_draft(&draft) {
        Err(PosterError::MissingFields(fields)) => {
            assert!(fields.contains(&MissingField::Presenter));
            assert!(fields.contains(&MissingField::SaveLocation));
        }
        other => panic!("expected MissingFields, got {:?}", other.map(|h| h.id())),
    }
    assert!(!compiler.workspace().input_path().exists());
    assert!(runner.calls().is_empty());
    assert!(!compiler.supervisor().is_busy());
}

#[tokio::test]
async fn test_second_submission_is_busy_until_first_finishes() {
    let dir = TempDir::new().unwrap();
    let cfg = workspace_config(&dir);
    let runner = Arc::new(FakeTexRunner::clean());
    let compiler = PosterCompiler::with_runner(&cfg, runner).without_toolchain_check();
    let draft = jane_doe(dir.path().join("out.pdf"));

    let first = compiler.submit_draft(&draft).unwrap();
    assert!(matches!(compiler.submit_draft(&draft), Err(PosterError::Busy)));

    first.finish().await.unwrap();
    assert!(!compiler.supervisor().is_busy());
    let second = compiler.submit_draft(&draft).unwrap();
    second.finish().await.unwrap();
}

#[tokio::test]
async fn test_typesetting_error_reported_with_diagnostic() {
    let dir = TempDir::new().unwrap();
    let cfg = workspace_config(&dir);
    let runner = Arc::new(FakeTexRunner::with_logs(
        "This is LuaHBTeX\n./main.tex:12: Undefined control sequence.\nl.12 \\foo\n./main.tex:12:  ==> Fatal error occurred, no output PDF file produced!",
        "INFO - WARNINGS: 0",
    ));
    let compiler = PosterCompiler::with_runner(&cfg, runner).without_toolchain_check();
    let dest = dir.path().join("out.pdf");

    let handle = compiler.submit_draft(&jane_doe(dest.clone())).unwrap();
    match handle.finish().await.unwrap() {
        CompileOutcome::Finished(CompilationResult::Failure {
            source,
            diagnostic,
            log,
        }) => {
            assert_eq!(source, FailureSource::Typesetting);
            assert_eq!(diagnostic, "./main.tex:12: Undefined control sequence.");
            assert!(log.contains(&diagnostic));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_bibliography_error_after_clean_typesetting() {
    let dir = TempDir::new().unwrap();
    let cfg = workspace_config(&dir);
    let runner = Arc::new(FakeTexRunner::with_logs(
        "Output written on main.pdf (1 page).",
        "INFO - This is Biber\nERROR - BibTeX subsystem: ref.bib, line 3, syntax error\nINFO - ERRORS: 1",
    ));
    let compiler = PosterCompiler::with_runner(&cfg, runner).without_toolchain_check();

    let handle = compiler
        .submit_draft(&jane_doe(dir.path().join("out.pdf")))
        .unwrap();
    match handle.finish().await.unwrap() {
        CompileOutcome::Finished(CompilationResult::Failure {
            source, diagnostic, ..
        }) => {
            assert_eq!(source, FailureSource::Bibliography);
            assert!(diagnostic.starts_with("ERROR - BibTeX subsystem"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_title_mode_writes_no_bibliography() {
    let dir = TempDir::new().unwrap();
    let cfg = workspace_config(&dir);
    let compiler = PosterCompiler::with_runner(&cfg, Arc::new(FakeTexRunner::clean()))
        .without_toolchain_check();
    let mut draft = jane_doe(dir.path().join("out.pdf"));
    draft.mode = PresentationMode::Title;
    draft.bibtex.clear();
    draft.title = "Graph Neural Networks for Cats".into();

    let handle = compiler.submit_draft(&draft).unwrap();
    handle.finish().await.unwrap();

    let input = std::fs::read_to_string(compiler.workspace().input_path()).unwrap();
    assert!(input.contains("\\newcommand{\\Title}{Graph Neural Networks for Cats}"));
    assert!(!input.contains("\\CiteKey"));
    assert!(!compiler.workspace().bibliography_path().exists());
}

#[tokio::test]
async fn test_cancel_mid_pipeline_stops_progress() {
    let dir = TempDir::new().unwrap();
    let cfg = workspace_config(&dir);
    let reached = Arc::new(Notify::new());
    let runner = Arc::new(HangingRunner {
        calls: Mutex::new(Vec::new()),
        reached: reached.clone(),
    });
    let compiler = PosterCompiler::with_runner(&cfg, runner.clone()).without_toolchain_check();
    let dest = dir.path().join("out.pdf");

    let mut handle = compiler.submit_draft(&jane_doe(dest.clone())).unwrap();
    reached.notified().await;
    handle.cancel();

    let events = tokio::time::timeout(std::time::Duration::from_secs(5), drain_events(&mut handle))
        .await
        .expect("pipeline did not stop after cancel");
    let outcome = handle.finish().await.unwrap();

    assert_eq!(outcome, CompileOutcome::Cancelled);
    assert_eq!(*runner.calls.lock().unwrap(), vec!["lualatex", "biber"]);
    assert!(!events
        .iter()
        .any(|e| matches!(e, PipelineEvent::StepCompleted { completed, .. } if *completed > 1)));
    assert_eq!(
        events.last(),
        Some(&PipelineEvent::Finished {
            outcome: PipelineOutcome::Cancelled
        })
    );
    assert!(!dest.exists());
    assert!(!compiler.supervisor().is_busy());
}

#[tokio::test]
async fn test_dropped_handle_stays_busy_until_worker_exits() {
    let dir = TempDir::new().unwrap();
    let cfg = workspace_config(&dir);
    let reached = Arc::new(Notify::new());
    let runner = Arc::new(SlowExitRunner {
        active: AtomicUsize::new(0),
        max_active: AtomicUsize::new(0),
        reached: reached.clone(),
    });
    let compiler = PosterCompiler::with_runner(&cfg, runner.clone()).without_toolchain_check();
    let draft = jane_doe(dir.path().join("out.pdf"));

    let first = compiler.submit_draft(&draft).unwrap();
    reached.notified().await;
    drop(first);

    // 第一个子进程还没退出，工作目录仍被占用
    assert!(matches!(compiler.submit_draft(&draft), Err(PosterError::Busy)));

    tokio::time::timeout(std::time::Duration::from_secs(5), compiler.supervisor().wait_idle())
        .await
        .expect("worker never exited");
    let second = compiler.submit_draft(&draft).unwrap();
    reached.notified().await;
    second.cancel();
    assert_eq!(second.finish().await.unwrap(), CompileOutcome::Cancelled);

    assert_eq!(runner.max_active.load(Ordering::SeqCst), 1);
}
