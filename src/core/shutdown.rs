//! 关闭与会话收尾
//!
//! ShutdownManager 监听 Ctrl+C / SIGTERM 并取消关闭 token（纯文本模式下用于取消编译）；
//! ShutdownCoordinator 在会话结束时依次执行清理任务，例如把 LaTeX 工作目录恢复为备份状态。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::poster::Workspace;

/// 关闭信号管理器
#[derive(Clone, Default)]
pub struct ShutdownManager {
    shutdown_token: CancellationToken,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取关闭 token（收到信号后被取消）
    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn shutdown(&self, signal: &'static str) {
        tracing::info!(signal, "shutdown requested, cancelling...");
        self.shutdown_token.cancel();
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                manager.shutdown("SIGINT");
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    manager.shutdown("SIGTERM");
                }
            });
        }
    }
}

/// 会话结束时需要执行的清理任务
#[async_trait::async_trait]
pub trait ShutdownCleanup: Send + Sync {
    async fn cleanup(&self) -> anyhow::Result<()>;

    /// 清理任务名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 关闭协调器：管理多个清理任务
pub struct ShutdownCoordinator {
    cleanup_tasks: Vec<Arc<dyn ShutdownCleanup>>,
    /// 单个清理任务的超时（秒）
    timeout_secs: u64,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            cleanup_tasks: Vec::new(),
            timeout_secs: 5,
        }
    }

    pub fn register<T: ShutdownCleanup + 'static>(&mut self, task: T) {
        self.cleanup_tasks.push(Arc::new(task));
    }

    /// 执行所有清理任务；失败只记录，不中断后续任务
    pub async fn run_cleanup(&self) {
        tracing::info!("Running {} cleanup tasks...", self.cleanup_tasks.len());

        let timeout = tokio::time::Duration::from_secs(self.timeout_secs);

        for task in &self.cleanup_tasks {
            let name = task.name();
            match tokio::time::timeout(timeout, task.cleanup()).await {
                Ok(Ok(())) => {
                    tracing::info!("Cleanup task '{}' completed successfully", name);
                }
                Ok(Err(e)) => {
                    tracing::warn!("Cleanup task '{}' failed: {}", name, e);
                }
                Err(_) => {
                    tracing::warn!("Cleanup task '{}' timed out after {}s", name, self.timeout_secs);
                }
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// 工作目录重置：删除中间文件并从 backup 恢复模板
pub struct WorkspaceResetCleanup {
    workspace: Workspace,
}

impl WorkspaceResetCleanup {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait::async_trait]
impl ShutdownCleanup for WorkspaceResetCleanup {
    async fn cleanup(&self) -> anyhow::Result<()> {
        let workspace = self.workspace.clone();
        tokio::task::spawn_blocking(move || workspace.reset()).await??;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "WorkspaceReset"
    }
}
