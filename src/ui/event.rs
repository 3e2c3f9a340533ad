//! 事件处理
//!
//! 轮询 crossterm 键盘事件：编译中 Esc / Ctrl+C 触发取消；有结论后 Enter / q / Esc 退出，
//! 方向键与翻页键滚动日志。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio_util::sync::CancellationToken;

/// 界面事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Cancel,
    Quit,
    Scroll(isize),
    ScrollHome,
    ScrollEnd,
    Tick,
}

/// 事件处理器：持有本次编译的取消令牌
pub struct EventHandler {
    cancel: CancellationToken,
}

impl EventHandler {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn poll(&self, settled: bool) -> anyhow::Result<AppEvent> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key, settled));
                }
            }
        }
        Ok(AppEvent::Tick)
    }

    pub(crate) fn handle_key(&self, key: KeyEvent, settled: bool) -> AppEvent {
        let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if !settled {
            if ctrl_c || key.code == KeyCode::Esc {
                self.cancel.cancel();
                return AppEvent::Cancel;
            }
            return AppEvent::Tick;
        }
        match key.code {
            _ if ctrl_c => AppEvent::Quit,
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => AppEvent::Quit,
            KeyCode::Up => AppEvent::Scroll(-1),
            KeyCode::Down => AppEvent::Scroll(1),
            KeyCode::PageUp => AppEvent::Scroll(-10),
            KeyCode::PageDown => AppEvent::Scroll(10),
            KeyCode::Home => AppEvent::ScrollHome,
            KeyCode::End => AppEvent::ScrollEnd,
            _ => AppEvent::Tick,
        }
    }
}
