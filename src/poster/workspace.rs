//! LaTeX 工作目录
//!
//! 存放模板、生成的 input.tex / ref.bib、各工具日志与成品 PDF。
//! 会话结束时 reset：删除除保留子目录外的全部文件，再从 backup 恢复原始模板。

use std::path::{Path, PathBuf};

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    job_name: String,
    preserved: Vec<String>,
    backup_dir: String,
}

impl Workspace {
    pub fn new(root: impl AsRef<Path>, job_name: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            job_name: job_name.to_string(),
            preserved: vec![
                "backup".into(),
                "fonts".into(),
                "lualatex".into(),
                "media".into(),
            ],
            backup_dir: "backup".to_string(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        let mut ws = Self::new(cfg.workspace_root(), &cfg.workspace.job_name);
        ws.preserved = cfg.workspace.preserved.clone();
        ws.backup_dir = cfg.workspace.backup_dir.clone();
        ws
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// 宏定义文件，由模板 \input
    pub fn input_path(&self) -> PathBuf {
        self.root.join("input.tex")
    }

    pub fn bibliography_path(&self) -> PathBuf {
        self.root.join("ref.bib")
    }

    pub fn source_file(&self) -> String {
        format!("{}.tex", self.job_name)
    }

    pub fn typeset_log(&self) -> PathBuf {
        self.root.join(format!("{}.log", self.job_name))
    }

    pub fn bibliography_log(&self) -> PathBuf {
        self.root.join(format!("{}.blg", self.job_name))
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join(format!("{}.pdf", self.job_name))
    }

    fn backup_path(&self) -> PathBuf {
        self.root.join(&self.backup_dir)
    }

    /// 重置为干净状态；返回恢复的文件数
    pub fn reset(&self) -> std::io::Result<usize> {
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if self.preserved.iter().any(|p| *p == name) {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }

        let backup = self.backup_path();
        if !backup.is_dir() {
            tracing::warn!(backup = %backup.display(), "no backup directory, workspace left empty");
            return Ok(0);
        }
        let mut restored = 0;
        for entry in std::fs::read_dir(&backup)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                std::fs::copy(entry.path(), self.root.join(entry.file_name()))?;
                restored += 1;
            }
        }
        tracing::info!(root = %self.root.display(), restored, "workspace reset");
        Ok(restored)
    }
}
