//! 进度状态：把流水线事件投影为界面可渲染的轻量状态

use serde::Serialize;

use crate::core::{CompileOutcome, PosterError};
use crate::pipeline::{CompilationResult, PipelineEvent, PipelineOutcome};

/// 编译阶段：Idle -> Running -> Completed / Cancelled
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum CompilePhase {
    Idle,
    Running,
    /// 流水线结束，正在或已经检查日志
    Completed,
    Cancelled,
}

/// UI 看到的「投影」状态
#[derive(Clone, Debug, Serialize)]
pub struct ProgressState {
    pub phase: CompilePhase,
    pub completed: usize,
    pub total: usize,
    /// 最近完成的工具名
    pub last_program: Option<String>,
    pub result: Option<CompilationResult>,
    pub error_message: Option<String>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            phase: CompilePhase::Idle,
            completed: 0,
            total: 0,
            last_program: None,
            result: None,
            error_message: None,
        }
    }
}

impl ProgressState {
    pub fn apply(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Started { total } => {
                self.phase = CompilePhase::Running;
                self.total = *total;
                self.completed = 0;
            }
            PipelineEvent::StepCompleted {
                completed,
                total,
                program,
                ..
            } => {
                self.completed = *completed;
                self.total = *total;
                self.last_program = Some(program.clone());
            }
            PipelineEvent::Finished { outcome } => {
                self.phase = match outcome {
                    PipelineOutcome::Completed => CompilePhase::Completed,
                    PipelineOutcome::Cancelled => CompilePhase::Cancelled,
                };
            }
        }
    }

    /// 记录 CompileHandle::finish 的结论；未收到 Finished 事件时也能据此收尾
    pub fn settle(&mut self, outcome: Result<CompileOutcome, PosterError>) {
        match outcome {
            Ok(CompileOutcome::Finished(result)) => {
                self.phase = CompilePhase::Completed;
                self.result = Some(result);
            }
            Ok(CompileOutcome::Cancelled) => self.phase = CompilePhase::Cancelled,
            Err(e) => self.error_message = Some(e.to_string()),
        }
    }

    /// 进度比例 0.0..=1.0
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
        }
    }

    /// 已经有结论（结果、错误或取消）
    pub fn is_settled(&self) -> bool {
        self.result.is_some() || self.error_message.is_some() || self.phase == CompilePhase::Cancelled
    }
}
