//! 编译流水线：单个后台任务按顺序执行外部命令
//!
//! 每步结束发送 StepCompleted（已完成步数，从 1 开始），全部结束或取消后发送一次 Finished。
//! 不检查退出码：失败的工具也算完成一步，成败完全交给 OutcomeInspector 读日志判断。

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::BusyGuard;
use crate::pipeline::runner::{ProcessRunner, RunOutcome};
use crate::pipeline::step::CompilationStep;

/// 流水线最终状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    Completed,
    Cancelled,
}

/// 发往交互端的进度事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Started { total: usize },
    StepCompleted {
        completed: usize,
        total: usize,
        program: String,
        /// 仅记录；无法启动或被信号终止时为 None
        exit_code: Option<i32>,
    },
    Finished { outcome: PipelineOutcome },
}

pub struct CompilationPipeline {
    runner: Arc<dyn ProcessRunner>,
    steps: Vec<CompilationStep>,
    workdir: PathBuf,
}

impl CompilationPipeline {
    pub fn new(runner: Arc<dyn ProcessRunner>, steps: Vec<CompilationStep>, workdir: PathBuf) -> Self {
        Self {
            runner,
            steps,
            workdir,
        }
    }

    /// 在当前任务中执行全部步骤
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        events: &mpsc::UnboundedSender<PipelineEvent>,
    ) -> PipelineOutcome {
        let total = self.steps.len();
        let _ = events.send(PipelineEvent::Started { total });

        let mut outcome = PipelineOutcome::Completed;
        for (i, step) in self.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                outcome = PipelineOutcome::Cancelled;
                break;
            }
            tracing::info!(step = i + 1, total, command = %step.display(), "running step");

            let exit_code = match self.runner.run(step, &self.workdir, cancel).await {
                Ok(RunOutcome::Exited(out)) => {
                    tracing::debug!(
                        step = i + 1,
                        exit_code = ?out.exit_code,
                        stdout_bytes = out.stdout.len(),
                        stderr_bytes = out.stderr.len(),
                        "step finished"
                    );
                    out.exit_code
                }
                Ok(RunOutcome::Cancelled) => {
                    outcome = PipelineOutcome::Cancelled;
                    break;
                }
                Err(e) => {
                    tracing::warn!(step = i + 1, error = %e, "step could not run, continuing");
                    None
                }
            };

            // 取消请求之后不再上报进度
            if cancel.is_cancelled() {
                outcome = PipelineOutcome::Cancelled;
                break;
            }
            let _ = events.send(PipelineEvent::StepCompleted {
                completed: i + 1,
                total,
                program: step.program.clone(),
                exit_code,
            });
        }

        tracing::info!(?outcome, "pipeline finished");
        let _ = events.send(PipelineEvent::Finished { outcome });
        outcome
    }

    /// 在独立后台任务中执行；返回任务句柄与事件接收端
    ///
    /// `busy` 随任务存活，直到最后一个子进程退出、run 返回后才释放。
    pub fn spawn(
        self,
        cancel: CancellationToken,
        busy: BusyGuard,
    ) -> (JoinHandle<PipelineOutcome>, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let _busy = busy;
            self.run(&cancel, &tx).await
        });
        (handle, rx)
    }
}
