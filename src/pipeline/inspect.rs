//! 结果检查：读取排版日志与文献日志判断成败
//!
//! 顺序固定：先看排版日志（最后一步是排版，最能反映最终状态），再看文献日志；
//! 两者都干净时把成品 PDF 拷贝到目标路径。

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::{InspectionError, PosterError};
use crate::poster::Workspace;

/// 排版日志末行的错误标记
const TYPESET_ERROR_MARKER: &str = "error";
/// 末行中用于定位诊断行的分隔符（取其前半部分）
const TYPESET_DELIMITER: &str = "==>";
/// 文献日志末行的错误汇总标记
const BIB_ERRORS_MARKER: &str = "ERRORS";
const BIB_ERROR_MARKER: &str = "ERROR";

/// 失败来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSource {
    Typesetting,
    Bibliography,
}

impl FailureSource {
    pub fn title(&self) -> &'static str {
        match self {
            FailureSource::Typesetting => "LaTeX Error",
            FailureSource::Bibliography => "BibTeX Error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FailureSource::Typesetting => "The following LaTeX error has occured:",
            FailureSource::Bibliography => "The following BibTeX error has occured:",
        }
    }
}

/// 从日志中提取的失败信息：短诊断 + 完整日志
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFailure {
    pub diagnostic: String,
    pub log: String,
}

/// 一次编译的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompilationResult {
    Success {
        output: PathBuf,
    },
    Failure {
        source: FailureSource,
        diagnostic: String,
        log: String,
    },
}

fn trimmed_lines(text: &str) -> Vec<&str> {
    text.trim().lines().collect()
}

/// 排版日志：末行含 "error" 即失败；诊断行为首个包含末行 "==>" 之前部分的行
pub fn check_typeset_log(text: &str) -> Result<Option<LogFailure>, InspectionError> {
    let lines = trimmed_lines(text);
    let Some((last, before)) = lines.split_last() else {
        return Ok(None);
    };
    if !last.contains(TYPESET_ERROR_MARKER) {
        return Ok(None);
    }
    let needle = last.split(TYPESET_DELIMITER).next().unwrap_or_default().trim();
    let log = lines.join("\n");
    match before.iter().find(|line| line.contains(needle)) {
        Some(line) => Ok(Some(LogFailure {
            diagnostic: line.to_string(),
            log,
        })),
        None => Err(InspectionError::NoDiagnostic {
            tool: "typesetting",
            log,
        }),
    }
}

/// 文献日志：末行含 "ERRORS" 即失败；诊断行为首个含 "ERROR" 的行
pub fn check_bibliography_log(text: &str) -> Result<Option<LogFailure>, InspectionError> {
    let lines = trimmed_lines(text);
    let Some((last, before)) = lines.split_last() else {
        return Ok(None);
    };
    if !last.contains(BIB_ERRORS_MARKER) {
        return Ok(None);
    }
    let log = lines.join("\n");
    match before.iter().find(|line| line.contains(BIB_ERROR_MARKER)) {
        Some(line) => Ok(Some(LogFailure {
            diagnostic: line.to_string(),
            log,
        })),
        None => Err(InspectionError::NoDiagnostic {
            tool: "bibliography",
            log,
        }),
    }
}

fn read_log(path: &Path) -> Result<String, InspectionError> {
    // 日志可能含非 UTF-8 字节
    std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|source| InspectionError::MissingLog {
            path: path.to_path_buf(),
            source,
        })
}

/// 编译完成后的检查与收尾
pub struct OutcomeInspector {
    workspace: Workspace,
}

impl OutcomeInspector {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    /// 只检查日志，不拷贝；None 表示无错误
    pub fn inspect(&self) -> Result<Option<(FailureSource, LogFailure)>, InspectionError> {
        let typeset = read_log(&self.workspace.typeset_log())?;
        if let Some(failure) = check_typeset_log(&typeset)? {
            return Ok(Some((FailureSource::Typesetting, failure)));
        }
        let bib = read_log(&self.workspace.bibliography_log())?;
        if let Some(failure) = check_bibliography_log(&bib)? {
            return Ok(Some((FailureSource::Bibliography, failure)));
        }
        Ok(None)
    }

    /// 检查日志；成功时把成品拷贝到 destination
    pub fn inspect_and_finalize(&self, destination: &Path) -> Result<CompilationResult, PosterError> {
        if let Some((source, failure)) = self.inspect()? {
            tracing::warn!(?source, diagnostic = %failure.diagnostic, "compilation failed");
            return Ok(CompilationResult::Failure {
                source,
                diagnostic: failure.diagnostic,
                log: failure.log,
            });
        }

        let output = self.workspace.output_path();
        std::fs::copy(&output, destination).map_err(|source| PosterError::Finalize {
            dest: destination.to_path_buf(),
            source,
        })?;
        tracing::info!(dest = %destination.display(), "poster generated");
        Ok(CompilationResult::Success {
            output: destination.to_path_buf(),
        })
    }
}
