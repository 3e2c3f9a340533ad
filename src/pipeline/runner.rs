//! 进程执行接口
//!
//! ProcessRunner 是流水线与操作系统之间的注入点：测试中替换为假实现，生产中用 SystemRunner。
//! SystemRunner 以 tokio::process 启动子进程，捕获 stdout/stderr，取消时 kill 当前子进程。

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::core::PosterError;
use crate::pipeline::step::CompilationStep;

/// 单步执行结果；退出码只记录，不参与成败判断
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    /// 被信号终止时为 None
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Exited(StepOutput),
    /// 取消令牌触发，子进程已被终止
    Cancelled,
}

/// 执行一个外部命令并等待其结束
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        step: &CompilationStep,
        cwd: &Path,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, PosterError>;
}

/// 真实子进程执行器
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    hide_console_window: bool,
}

impl SystemRunner {
    pub fn new(hide_console_window: bool) -> Self {
        Self { hide_console_window }
    }

    fn command(&self, step: &CompilationStep, cwd: &Path) -> Command {
        let mut cmd = Command::new(&step.program);
        cmd.args(&step.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        hide_console(&mut cmd, self.hide_console_window);
        cmd
    }
}

#[cfg(windows)]
fn hide_console(cmd: &mut Command, hide: bool) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    if hide {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
}

#[cfg(not(windows))]
fn hide_console(_cmd: &mut Command, _hide: bool) {}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut r) = reader {
        if let Err(e) = r.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "child pipe read failed");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(
        &self,
        step: &CompilationStep,
        cwd: &Path,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, PosterError> {
        let mut child = self
            .command(step, cwd)
            .spawn()
            .map_err(|source| PosterError::Spawn {
                program: step.program.clone(),
                source,
            })?;

        // 并发读取管道，避免输出过多时子进程阻塞在写端
        let stdout_task = tokio::spawn(read_all(child.stdout.take()));
        let stderr_task = tokio::spawn(read_all(child.stderr.take()));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(program = %step.program, error = %e, "failed to kill child");
                }
                stdout_task.abort();
                stderr_task.abort();
                tracing::info!(program = %step.program, "child terminated on cancel");
                Ok(RunOutcome::Cancelled)
            }
            status = child.wait() => {
                let status = status?;
                Ok(RunOutcome::Exited(StepOutput {
                    exit_code: status.code(),
                    stdout: stdout_task.await.unwrap_or_default(),
                    stderr: stderr_task.await.unwrap_or_default(),
                }))
            }
        }
    }
}
