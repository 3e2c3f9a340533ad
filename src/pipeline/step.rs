//! 编译步骤：固定顺序的外部命令描述
//!
//! 标准序列：排版 -> 文献处理 -> 排版 -> 排版（后两遍解析交叉引用与引用编号）。

use crate::config::ToolchainSection;
use crate::core::PosterError;
use crate::poster::Workspace;

/// 单个外部命令（程序名 + 参数）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationStep {
    pub program: String,
    pub args: Vec<String>,
}

impl CompilationStep {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// 用于日志展示
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

/// 按配置生成标准四步序列
pub fn standard_sequence(toolchain: &ToolchainSection, workspace: &Workspace) -> Vec<CompilationStep> {
    let mut typeset_args = toolchain.typesetter_args.clone();
    typeset_args.push(workspace.source_file());
    let typeset = CompilationStep::new(&toolchain.typesetter, typeset_args);

    let bib_args = toolchain
        .bibliography_args
        .clone()
        .unwrap_or_else(|| vec![workspace.job_name().to_string()]);
    let bibliography = CompilationStep::new(&toolchain.bibliography, bib_args);

    vec![typeset.clone(), bibliography, typeset.clone(), typeset]
}

/// 前置检查：排版引擎与文献处理器都必须能在 PATH 中找到
pub fn check_toolchain(toolchain: &ToolchainSection) -> Result<(), PosterError> {
    let missing: Vec<&str> = [toolchain.typesetter.as_str(), toolchain.bibliography.as_str()]
        .into_iter()
        .filter(|program| which::which(program).is_err())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PosterError::MissingTool(missing.join(" and/or ")))
    }
}
