//! 界面渲染
//!
//! 上方为标题与进度条，中部为步骤列表，下方为结果区：成功显示输出路径，
//! 失败显示短诊断与可滚动的完整日志（对应原先的弹窗「详细信息」）。

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

use crate::core::{CompilePhase, ProgressState};
use crate::pipeline::{CompilationResult, CompilationStep};

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        lines.push(line);
    }
    lines
}

/// Paragraph 只接受 u16 行偏移，超长日志停在最大值
fn scroll_row(offset: usize) -> u16 {
    u16::try_from(offset).unwrap_or(u16::MAX)
}

fn phase_label(state: &ProgressState) -> (String, Color) {
    if state.error_message.is_some() {
        return ("错误".to_string(), Color::Red);
    }
    match (&state.phase, &state.result) {
        (CompilePhase::Idle, _) => ("准备中…".to_string(), Color::Gray),
        (CompilePhase::Running, _) => (
            format!("编译中 {}/{}", state.completed, state.total),
            Color::Yellow,
        ),
        (CompilePhase::Completed, None) => ("检查日志…".to_string(), Color::Yellow),
        (CompilePhase::Completed, Some(CompilationResult::Success { .. })) => {
            ("完成".to_string(), Color::Green)
        }
        (CompilePhase::Completed, Some(CompilationResult::Failure { source, .. })) => {
            (source.title().to_string(), Color::Red)
        }
        (CompilePhase::Cancelled, _) => ("已取消".to_string(), Color::DarkGray),
    }
}

fn step_lines(state: &ProgressState, steps: &[CompilationStep]) -> Vec<Line<'static>> {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let (mark, color) = if i < state.completed {
                ("✓", Color::Green)
            } else if i == state.completed && state.phase == CompilePhase::Running {
                ("▶", Color::Yellow)
            } else {
                ("·", Color::DarkGray)
            };
            Line::from(vec![
                Span::styled(format!(" {} ", mark), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(step.display()),
            ])
        })
        .collect()
}

/// 绘制一帧；将 (日志总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(
    f: &mut Frame,
    state: &ProgressState,
    steps: &[CompilationStep],
    log_scroll: usize,
    out: &mut (usize, usize),
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(steps.len() as u16 + 2),
            Constraint::Min(5),
        ])
        .split(f.area());

    let (label, color) = phase_label(state);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(format!(" Poster │ {} ", label))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
        .gauge_style(Style::default().fg(color))
        .ratio(state.ratio());
    f.render_widget(gauge, chunks[0]);

    let steps_widget = Paragraph::new(Text::from(step_lines(state, steps)))
        .block(Block::default().title(" 步骤 ").borders(Borders::ALL));
    f.render_widget(steps_widget, chunks[1]);

    let hint = if state.is_settled() {
        " ↑↓ PgUp/PgDn 滚动 │ Enter/q 退出 "
    } else {
        " Esc/Ctrl+C 取消 "
    };
    let result_area = chunks[2];
    let content_width = result_area.width.saturating_sub(3) as usize; // 边框 + 滚动条
    let content_height = result_area.height.saturating_sub(2) as usize;

    let mut lines: Vec<Line> = Vec::new();
    let mut border = Color::Blue;
    if let Some(err) = &state.error_message {
        border = Color::Red;
        for l in wrap_text(err, content_width.max(20)) {
            lines.push(Line::from(Span::styled(l, Style::default().fg(Color::Red))));
        }
    } else if let Some(result) = &state.result {
        match result {
            CompilationResult::Success { output } => {
                border = Color::Green;
                lines.push(Line::from("Poster generated successfully."));
                lines.push(Line::from(Span::styled(
                    output.display().to_string(),
                    Style::default().fg(Color::Green),
                )));
            }
            CompilationResult::Failure {
                source,
                diagnostic,
                log,
            } => {
                border = Color::Red;
                lines.push(Line::from(source.message()));
                for l in wrap_text(diagnostic, content_width.max(20)) {
                    lines.push(Line::from(Span::styled(
                        l,
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )));
                }
                lines.push(Line::from(""));
                for l in wrap_text(log, content_width.max(20)) {
                    lines.push(Line::from(Span::styled(l, Style::default().fg(Color::Gray))));
                }
            }
        }
    } else if state.phase == CompilePhase::Cancelled {
        lines.push(Line::from("Compilation cancelled."));
    }

    let total_lines = lines.len();
    let max_scroll = total_lines.saturating_sub(content_height);
    let scroll_offset = log_scroll.min(max_scroll);

    let block = Block::default()
        .title(" 结果 ")
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((scroll_row(scroll_offset), 0));
    f.render_widget(paragraph, result_area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, result_area, &mut scrollbar_state);
    }

    out.0 = total_lines;
    out.1 = content_height;
}
