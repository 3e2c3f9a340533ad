//! poster-gen - 研讨会海报生成器
//!
//! 收集报告人与会议信息，写入 LaTeX 工作目录，依次调用 lualatex / biber / lualatex / lualatex，
//! 再根据 main.log 与 main.blg 判定结果并复制 PDF。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、进度状态、会话监管、关闭收尾、编译编排
//! - **observability**: tracing 订阅器初始化
//! - **pipeline**: 编译步骤、进程执行器、后台流水线、日志检查
//! - **poster**: 请求模型、字段校验、文档组装、DOI 查询、工作目录
//! - **ui**: Ratatui 进度界面

pub mod config;
pub mod core;
pub mod observability;
pub mod pipeline;
pub mod poster;
pub mod ui;

pub use crate::core::{CompileHandle, CompileOutcome, PosterCompiler, PosterError};
pub use crate::pipeline::CompilationResult;
pub use crate::poster::{PosterDraft, PosterRequest};
