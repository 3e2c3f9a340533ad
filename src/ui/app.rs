//! TUI 进度界面主循环
//!
//! 进入全屏/原始模式，每帧读取流水线事件更新 ProgressState，流水线结束后检查日志并展示结论，
//! 用户确认后恢复终端并返回最终状态。界面循环从不阻塞等待流水线。

use std::io::{self, Stdout};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::error::TryRecvError;

use crate::core::{CompileHandle, ProgressState};
use crate::pipeline::CompilationStep;
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::draw;

/// 显示编译进度直到用户退出，返回最终状态
pub async fn run_progress(
    handle: CompileHandle,
    steps: &[CompilationStep],
) -> anyhow::Result<ProgressState> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, handle, steps).await;

    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    handle: CompileHandle,
    steps: &[CompilationStep],
) -> anyhow::Result<ProgressState> {
    let events = EventHandler::new(handle.cancel_token());
    let mut handle = Some(handle);
    let mut state = ProgressState::default();
    let mut log_scroll = 0usize;

    loop {
        let finished = handle
            .as_mut()
            .is_some_and(|h| drain_events(h, &mut state));
        if finished {
            if let Some(h) = handle.take() {
                state.settle(h.finish().await);
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| draw(f, &state, steps, log_scroll, &mut scroll_info))?;
        let (total_lines, viewport_height) = scroll_info;
        let max_scroll = total_lines.saturating_sub(viewport_height);
        log_scroll = log_scroll.min(max_scroll);

        match events.poll(state.is_settled())? {
            AppEvent::Quit => break,
            AppEvent::Scroll(delta) => {
                log_scroll = log_scroll.saturating_add_signed(delta).min(max_scroll);
            }
            AppEvent::ScrollHome => log_scroll = 0,
            AppEvent::ScrollEnd => log_scroll = max_scroll,
            AppEvent::Cancel | AppEvent::Tick => {}
        }

        tokio::task::yield_now().await;
    }

    Ok(state)
}

/// 读完当前可用的事件；返回后台任务是否已经退出
///
/// 以通道断开为准，不依赖 Finished 事件（任务 panic 时不会发送）。
fn drain_events(handle: &mut CompileHandle, state: &mut ProgressState) -> bool {
    loop {
        match handle.try_next_event() {
            Ok(ev) => state.apply(&ev),
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => return true,
        }
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use crate::config::AppConfig;
    use crate::core::{PosterCompiler, PosterError};
    use crate::pipeline::{ProcessRunner, RunOutcome};
    use crate::poster::{PosterDraft, PresentationMode};

    struct PanickingRunner;

    #[async_trait]
    impl ProcessRunner for PanickingRunner {
        async fn run(
            &self,
            _step: &CompilationStep,
            _cwd: &Path,
            _cancel: &CancellationToken,
        ) -> Result<RunOutcome, PosterError> {
            panic!("runner crashed");
        }
    }

    #[tokio::test]
    async fn test_worker_panic_settles_progress() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut cfg = AppConfig::default();
        cfg.workspace.root = Some(dir.path().to_path_buf());
        let compiler =
            PosterCompiler::with_runner(&cfg, Arc::new(PanickingRunner)).without_toolchain_check();
        let draft = PosterDraft {
            presenter: "Jane Doe".into(),
            role: "PhD Student".into(),
            mode: PresentationMode::Title,
            title: "Cats".into(),
            save_location: dir.path().join("out.pdf").display().to_string(),
            ..Default::default()
        };

        let mut handle = compiler.submit_draft(&draft).unwrap();
        let mut state = ProgressState::default();
        let finished = tokio::time::timeout(Duration::from_secs(5), async {
            while !drain_events(&mut handle, &mut state) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(finished.is_ok(), "channel never disconnected");
        assert!(!state.is_settled());

        state.settle(handle.finish().await);
        assert!(state.is_settled());
        assert!(state
            .error_message
            .as_deref()
            .is_some_and(|m| m.starts_with("Compilation worker failed")));
        assert!(!compiler.supervisor().is_busy());
    }
}
