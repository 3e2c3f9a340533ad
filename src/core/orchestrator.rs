//! 编译编排器
//!
//! 负责：拒绝并发编译、检查外部工具、写入 input.tex / ref.bib、在后台任务中启动流水线，
//! 并在流水线结束后交给 OutcomeInspector 判定结果。交互端只通过 CompileHandle 收事件、发取消。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use crate::config::{AppConfig, ToolchainSection};
use crate::core::{PosterError, SessionSupervisor};
use crate::pipeline::{
    check_toolchain, standard_sequence, CompilationPipeline, CompilationResult, CompilationStep,
    OutcomeInspector, PipelineEvent, PipelineOutcome, ProcessRunner, SystemRunner,
};
use crate::poster::{validate, write_sources, PosterDraft, PosterRequest, Workspace};

/// 一次编译的最终结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Finished(CompilationResult),
    Cancelled,
}

/// 编译服务：按配置持有工作目录、步骤序列与进程执行器
pub struct PosterCompiler {
    workspace: Workspace,
    toolchain: ToolchainSection,
    steps: Vec<CompilationStep>,
    runner: Arc<dyn ProcessRunner>,
    supervisor: SessionSupervisor,
    check_tools: bool,
}

impl PosterCompiler {
    pub fn new(cfg: &AppConfig) -> Self {
        let runner = Arc::new(SystemRunner::new(cfg.toolchain.hide_console_window));
        Self::with_runner(cfg, runner)
    }

    /// 注入自定义进程执行器（测试用假实现）
    pub fn with_runner(cfg: &AppConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let workspace = Workspace::from_config(cfg);
        let steps = standard_sequence(&cfg.toolchain, &workspace);
        Self {
            workspace,
            toolchain: cfg.toolchain.clone(),
            steps,
            runner,
            supervisor: SessionSupervisor::new(),
            check_tools: true,
        }
    }

    /// 跳过 PATH 检查（假执行器不需要真实工具）
    pub fn without_toolchain_check(mut self) -> Self {
        self.check_tools = false;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn steps(&self) -> &[CompilationStep] {
        &self.steps
    }

    pub fn supervisor(&self) -> &SessionSupervisor {
        &self.supervisor
    }

    /// 校验草稿后提交；缺字段时不会触碰工作目录
    pub fn submit_draft(&self, draft: &PosterDraft) -> Result<CompileHandle, PosterError> {
        let request = validate(draft).map_err(PosterError::MissingFields)?;
        self.submit(request)
    }

    /// 提交一次编译，立即返回；流水线在后台任务中运行
    pub fn submit(&self, request: PosterRequest) -> Result<CompileHandle, PosterError> {
        let guard = self.supervisor.try_begin()?;

        if self.check_tools {
            check_toolchain(&self.toolchain)?;
        }
        write_sources(&request, &self.workspace)?;

        let id = Uuid::new_v4();
        let cancel = self.supervisor.child_token();
        let pipeline = CompilationPipeline::new(
            self.runner.clone(),
            self.steps.clone(),
            self.workspace.root().to_path_buf(),
        );
        tracing::info!(
            compile_id = %id,
            workspace = %self.workspace.root().display(),
            dest = %request.destination.display(),
            "compilation started"
        );
        let (task, events) = pipeline.spawn(cancel.clone(), guard);

        Ok(CompileHandle {
            id,
            events,
            task,
            inspector: OutcomeInspector::new(self.workspace.clone()),
            destination: request.destination,
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
        })
    }
}

/// 进行中的编译；丢弃句柄会取消编译，但「编译中」标记要等后台任务退出才释放
pub struct CompileHandle {
    id: Uuid,
    events: mpsc::UnboundedReceiver<PipelineEvent>,
    task: JoinHandle<PipelineOutcome>,
    inspector: OutcomeInspector,
    destination: PathBuf,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
}

impl CompileHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn destination(&self) -> &std::path::Path {
        &self.destination
    }

    /// 终止当前外部进程并放弃剩余步骤
    pub fn cancel(&self) {
        tracing::info!(compile_id = %self.id, "cancel requested");
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 等待下一个事件；流水线结束且事件读完后返回 None
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    /// 非阻塞读取事件（UI 帧循环用）；`Disconnected` 表示后台任务已退出且事件已读完
    pub fn try_next_event(&mut self) -> Result<PipelineEvent, TryRecvError> {
        self.events.try_recv()
    }

    /// 等待流水线结束并检查日志
    pub async fn finish(self) -> Result<CompileOutcome, PosterError> {
        let outcome = self
            .task
            .await
            .map_err(|e| PosterError::Worker(e.to_string()))?;
        match outcome {
            PipelineOutcome::Cancelled => {
                tracing::info!(compile_id = %self.id, "compilation cancelled");
                Ok(CompileOutcome::Cancelled)
            }
            PipelineOutcome::Completed => {
                let result = self.inspector.inspect_and_finalize(&self.destination)?;
                Ok(CompileOutcome::Finished(result))
            }
        }
    }
}
