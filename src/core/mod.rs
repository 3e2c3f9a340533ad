//! 核心编排层：错误、进度状态、会话监管、关闭收尾、编译编排

pub mod error;
pub mod orchestrator;
pub mod session_supervisor;
pub mod shutdown;
pub mod state;

pub use error::{InspectionError, PosterError};
pub use orchestrator::{CompileHandle, CompileOutcome, PosterCompiler};
pub use session_supervisor::{BusyGuard, SessionSupervisor};
pub use shutdown::{
    ShutdownCleanup, ShutdownCoordinator, ShutdownManager, WorkspaceResetCleanup,
};
pub use state::{CompilePhase, ProgressState};
