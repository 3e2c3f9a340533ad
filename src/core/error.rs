//! 海报生成错误类型
//!
//! 分类：前置条件（缺字段 / 缺工具 / 正在编译）、写入失败、日志检查失败、成品拷贝失败。
//! 编译本身的失败（LaTeX / Biber 报错）不是错误，而是 `CompilationResult::Failure`。

use std::path::PathBuf;

use thiserror::Error;

use crate::poster::MissingField;

/// 编译流程中可能出现的错误
#[derive(Error, Debug)]
pub enum PosterError {
    /// 必填字段缺失，调用方应提示用户补全后重试
    #[error("Incomplete fields: {}", join_missing(.0))]
    MissingFields(Vec<MissingField>),

    /// lualatex / biber 不在 PATH 中
    #[error("{0} not found. Please ensure that a TeX distribution is installed and added to your system PATH.")]
    MissingTool(String),

    /// 上一次编译尚未结束
    #[error("A compilation is already running")]
    Busy,

    /// input.tex / ref.bib 写入失败，编译未启动
    #[error("Failed to write {what} to {}: {source}", path.display())]
    Write {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// 后台任务 panic 或被中止
    #[error("Compilation worker failed: {0}")]
    Worker(String),

    #[error("Log inspection failed: {0}")]
    Inspection(#[from] InspectionError),

    /// 成品 PDF 无法拷贝到目标路径
    #[error("Failed to copy poster to {}: {source}", dest.display())]
    Finalize {
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("BibTeX from DOI error: {0}")]
    Citation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 日志检查阶段的错误（日志缺失、无法定位诊断行）
#[derive(Error, Debug)]
pub enum InspectionError {
    #[error("log file {} could not be read: {source}", path.display())]
    MissingLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 末行报错，但之前没有任何一行能与之对应
    #[error("{tool} reported an error but no matching diagnostic line was found")]
    NoDiagnostic { tool: &'static str, log: String },
}

fn join_missing(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(|f| f.message())
        .collect::<Vec<_>>()
        .join(" ")
}
