//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `POSTER__*` 覆盖（双下划线表示嵌套，如 `POSTER__TOOLCHAIN__TYPESETTER=xelatex`）。
//! 配置以显式结构体传给各组件（工作目录、外部工具、进程创建标志），不读取全局状态。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub workspace: WorkspaceSection,
    pub toolchain: ToolchainSection,
    pub citation: CitationSection,
}

/// [app] 段：日志文件、退出时是否重置工作目录、默认输出目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// TUI 占用终端时日志写入此文件；未设置时写入当前目录的 poster-gen.log（工作目录会在结束时被重置）
    pub log_file: Option<PathBuf>,
    /// 会话结束时从 backup 恢复工作目录
    pub reset_on_exit: bool,
    /// `init` 生成请求模板时的默认保存目录
    pub output_dir: Option<PathBuf>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            log_file: None,
            reset_on_exit: true,
            output_dir: None,
        }
    }
}

/// [workspace] 段：LaTeX 工作目录与需要保留的子目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceSection {
    /// 工作目录，未设置时用 ./latex
    pub root: Option<PathBuf>,
    /// 主文档名（不含扩展名），决定 .log / .blg / .pdf 文件名
    pub job_name: String,
    /// 重置时保留的子目录
    pub preserved: Vec<String>,
    /// 原始模板备份目录名（必须也在 preserved 中）
    pub backup_dir: String,
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            root: None,
            job_name: default_job_name(),
            preserved: default_preserved(),
            backup_dir: "backup".to_string(),
        }
    }
}

fn default_job_name() -> String {
    "main".to_string()
}

fn default_preserved() -> Vec<String> {
    vec![
        "backup".into(),
        "fonts".into(),
        "lualatex".into(),
        "media".into(),
    ]
}

/// [toolchain] 段：排版引擎与文献处理器
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolchainSection {
    pub typesetter: String,
    pub typesetter_args: Vec<String>,
    pub bibliography: String,
    /// 未设置时为 [job_name]
    pub bibliography_args: Option<Vec<String>>,
    /// Windows 下创建子进程时不弹出控制台窗口
    pub hide_console_window: bool,
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            typesetter: "lualatex".to_string(),
            typesetter_args: vec![
                "-interaction=nonstopmode".into(),
                "-halt-on-error".into(),
                "-file-line-error".into(),
            ],
            bibliography: "biber".to_string(),
            bibliography_args: None,
            hide_console_window: true,
        }
    }
}

/// [citation] 段：DOI 解析服务
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CitationSection {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for CitationSection {
    fn default() -> Self {
        Self {
            base_url: "https://doi.org".to_string(),
            timeout_secs: 15,
        }
    }
}

impl AppConfig {
    /// 工作目录：配置 > 当前目录下的 latex
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace.root.clone().unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("latex")
        })
    }
}

/// 从 config 目录加载配置，环境变量 POSTER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 POSTER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("POSTER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
