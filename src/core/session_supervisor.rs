//! 会话监管：同一时间只允许一次编译，并为每次编译派生取消令牌
//!
//! 会话级 CancellationToken 在收到关闭信号时取消所有编译；try_begin 在已有编译进行时返回 Busy。
//! BusyGuard 随后台任务存活，任务真正退出后才释放，wait_idle 等待这一刻。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::core::PosterError;

/// 会话级生命周期管理：取消令牌与「编译中」标记
#[derive(Debug, Clone)]
pub struct SessionSupervisor {
    cancel_token: CancellationToken,
    busy: Arc<AtomicBool>,
    idle: Arc<Notify>,
}

/// 持有期间视为编译进行中，Drop 时释放
#[derive(Debug)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
    idle: Arc<Notify>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
        self.idle.notify_waiters();
    }
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self {
            cancel_token: CancellationToken::new(),
            busy: Arc::new(AtomicBool::new(false)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// 取消会话内全部编译
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// 子 token（用于单次编译）
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// 等待当前编译的后台任务退出（没有编译时立即返回）
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if !self.is_busy() {
                return;
            }
            notified.await;
        }
    }

    /// 标记开始编译；已有编译时拒绝
    pub fn try_begin(&self) -> Result<BusyGuard, PosterError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PosterError::Busy)?;
        Ok(BusyGuard {
            busy: self.busy.clone(),
            idle: self.idle.clone(),
        })
    }
}

impl Default for SessionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
