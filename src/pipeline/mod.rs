//! 编译流水线：步骤描述、进程执行、后台任务、日志检查

pub mod inspect;
pub mod runner;
pub mod step;
pub mod worker;

pub use inspect::{
    check_bibliography_log, check_typeset_log, CompilationResult, FailureSource, LogFailure,
    OutcomeInspector,
};
pub use runner::{ProcessRunner, RunOutcome, StepOutput, SystemRunner};
pub use step::{check_toolchain, standard_sequence, CompilationStep};
pub use worker::{CompilationPipeline, PipelineEvent, PipelineOutcome};
