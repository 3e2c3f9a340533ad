//! poster-gen 命令行入口
//!
//! 子命令：generate（编译海报，默认 TUI，`--plain` 输出到终端）、lookup（查询 DOI）、
//! check（检查外部工具）、reset（重置工作目录）、init（生成请求模板）。

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use poster_gen::config::{load_config, AppConfig};
use poster_gen::core::{
    CompileHandle, PosterCompiler, ProgressState, SessionSupervisor, ShutdownCoordinator,
    ShutdownManager, WorkspaceResetCleanup,
};
use poster_gen::pipeline::{check_toolchain, CompilationResult, PipelineEvent};
use poster_gen::poster::{
    default_output_name, fill_from_doi, lookup_citation, DoiResolver, PosterDraft, Workspace,
    ROLE_SUGGESTIONS,
};
use poster_gen::{observability, ui};

#[derive(Parser, Debug)]
#[command(
    name = "poster-gen",
    version,
    about = "Seminar poster generator - fills the LaTeX template and drives LuaLaTeX / Biber"
)]
struct Cli {
    /// Extra config file layered over config/default.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Compile a poster from a request file
    Generate {
        /// Request file (TOML)
        request: PathBuf,

        /// Print progress to the terminal instead of the TUI
        #[arg(long)]
        plain: bool,

        /// Print each pipeline event as one JSON line (implies --plain)
        #[arg(long)]
        json: bool,
    },

    /// Fetch and print the BibTeX entry for a DOI
    Lookup { doi: String },

    /// Verify that the typesetting tools are on PATH
    Check,

    /// Restore the LaTeX workspace from its backup
    Reset,

    /// Write a request template
    Init {
        #[arg(default_value = "poster.toml")]
        path: PathBuf,

        /// Presenter name, also used for the default save location
        #[arg(long)]
        presenter: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config).context("Failed to load config")?;

    match cli.command {
        Command::Generate {
            request,
            plain,
            json,
        } => generate(&cfg, &request, plain || json, json).await,
        Command::Lookup { doi } => {
            observability::init();
            let resolver = DoiResolver::new(&cfg.citation.base_url, cfg.citation.timeout_secs)?;
            let entry = lookup_citation(&resolver, &doi)
                .await
                .context("DOI lookup failed")?;
            println!("% key: {}", entry.key);
            println!("{}", entry.bibtex);
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => {
            observability::init();
            check_toolchain(&cfg.toolchain)?;
            println!(
                "{} and {} found on PATH",
                cfg.toolchain.typesetter, cfg.toolchain.bibliography
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Reset => {
            observability::init();
            let workspace = Workspace::from_config(&cfg);
            let restored = workspace
                .reset()
                .with_context(|| format!("Failed to reset {}", workspace.root().display()))?;
            println!("Workspace reset ({} template files restored)", restored);
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { path, presenter } => {
            write_template(&cfg, &path, presenter)?;
            println!("Request template written to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn generate(
    cfg: &AppConfig,
    request: &Path,
    plain: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    if plain {
        observability::init();
    } else {
        let log_file = cfg
            .app
            .log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("poster-gen.log"));
        observability::init_to_file(&log_file)
            .with_context(|| format!("Failed to open log file {}", log_file.display()))?;
    }

    let text = std::fs::read_to_string(request)
        .with_context(|| format!("Failed to read request file {}", request.display()))?;
    let mut draft: PosterDraft = toml::from_str(&text)
        .with_context(|| format!("Invalid request file {}", request.display()))?;

    let resolver = DoiResolver::new(&cfg.citation.base_url, cfg.citation.timeout_secs)?;
    fill_from_doi(&mut draft, &resolver)
        .await
        .context("DOI lookup failed")?;

    let compiler = PosterCompiler::new(cfg);
    let outcome = compile(&compiler, &draft, plain, json).await;
    finish_session(cfg, &compiler).await;

    let (state, destination) = outcome?;
    Ok(report(&state, &destination))
}

/// 提交并跟踪一次编译，返回最终状态与目标路径
async fn compile(
    compiler: &PosterCompiler,
    draft: &PosterDraft,
    plain: bool,
    json: bool,
) -> anyhow::Result<(ProgressState, PathBuf)> {
    let handle = compiler.submit_draft(draft)?;
    let destination = handle.destination().to_path_buf();
    let state = if plain {
        run_plain(handle, compiler.supervisor(), json).await
    } else {
        ui::run_progress(handle, compiler.steps())
            .await
            .context("App run failed")?
    };
    Ok((state, destination))
}

/// 会话收尾：等后台任务退出，再按配置重置工作目录（无论编译是否出错）
async fn finish_session(cfg: &AppConfig, compiler: &PosterCompiler) {
    compiler.supervisor().wait_idle().await;
    if cfg.app.reset_on_exit {
        let mut coordinator = ShutdownCoordinator::new();
        coordinator.register(WorkspaceResetCleanup::new(compiler.workspace().clone()));
        coordinator.run_cleanup().await;
    }
}

/// 无 TUI 模式：进度打印到 stderr（`--json` 时每个事件一行 JSON 输出到 stdout），Ctrl+C / SIGTERM 取消编译
async fn run_plain(
    mut handle: CompileHandle,
    supervisor: &SessionSupervisor,
    json: bool,
) -> ProgressState {
    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    let signal = shutdown.token();
    let mut state = ProgressState::default();
    let mut cancel_sent = false;

    loop {
        tokio::select! {
            biased;
            _ = signal.cancelled(), if !cancel_sent => {
                cancel_sent = true;
                supervisor.cancel();
            }
            event = handle.next_event() => {
                let Some(event) = event else { break };
                if json {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => tracing::warn!(error = %e, "event serialization failed"),
                    }
                } else if let PipelineEvent::StepCompleted { completed, total, ref program, .. } = event {
                    eprintln!("[{}/{}] {} finished", completed, total, program);
                }
                state.apply(&event);
            }
        }
    }

    state.settle(handle.finish().await);
    state
}

fn report(state: &ProgressState, destination: &Path) -> ExitCode {
    if let Some(err) = &state.error_message {
        eprintln!("Error: {}", err);
        return ExitCode::FAILURE;
    }
    match &state.result {
        Some(CompilationResult::Success { .. }) => {
            println!("Poster generated successfully: {}", destination.display());
            ExitCode::SUCCESS
        }
        Some(CompilationResult::Failure {
            source, diagnostic, ..
        }) => {
            eprintln!("{}: {}", source.title(), source.message());
            eprintln!("{}", diagnostic);
            ExitCode::FAILURE
        }
        None => {
            eprintln!("Compilation cancelled.");
            ExitCode::FAILURE
        }
    }
}

fn write_template(cfg: &AppConfig, path: &Path, presenter: Option<String>) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let mut draft = PosterDraft::default();
    if let Some(name) = presenter {
        let dir = cfg.app.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        draft.save_location = dir
            .join(default_output_name(&name, draft.date))
            .display()
            .to_string();
        draft.presenter = name;
    }
    let body = toml::to_string_pretty(&draft).context("Failed to render request template")?;
    let header = format!(
        "# Poster request. Role suggestions: {}\n# mode = \"citation\" uses bibtex (or doi); mode = \"title\" uses title.\n\n",
        ROLE_SUGGESTIONS.join(", ")
    );
    std::fs::write(path, header + &body)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
