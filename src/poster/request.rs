//! 海报请求数据模型
//!
//! PosterDraft 是请求文件（TOML）反序列化出的原始输入，字段可能缺失；
//! 经 validate 后得到 PosterRequest，引用与自定义标题互斥由 Presentation 枚举保证。

use std::path::PathBuf;

use chrono::{Duration, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// 角色候选（可自由填写，候选仅用于模板提示）
pub const ROLE_SUGGESTIONS: &[&str] = &["PhD Student", "MSc Student", "BSc Student"];

/// 演讲内容模式：引用文献 或 自定义标题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    #[default]
    Citation,
    Title,
}

/// 用户填写的原始表单
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterDraft {
    pub presenter: String,
    pub role: String,
    pub invited: bool,
    /// 是否附带头像
    pub profile: bool,
    pub profile_location: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub mode: PresentationMode,
    /// 可选 DOI；citation 模式且 bibtex 为空时用于自动查询
    pub doi: Option<String>,
    pub bibtex: String,
    /// 未填写时从 bibtex 中解析
    pub cite_key: Option<String>,
    pub title: String,
    pub save_location: String,
}

impl Default for PosterDraft {
    fn default() -> Self {
        Self {
            presenter: String::new(),
            role: String::new(),
            invited: false,
            profile: false,
            profile_location: String::new(),
            date: default_date(),
            time: default_time(),
            mode: PresentationMode::Citation,
            doi: None,
            bibtex: String::new(),
            cite_key: None,
            title: String::new(),
            save_location: String::new(),
        }
    }
}

/// 默认会议日期：明天
pub fn default_date() -> NaiveDate {
    Local::now().date_naive() + Duration::days(1)
}

/// 默认会议时间：10:00 AM
pub fn default_time() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// 海报展示内容，二者只能取其一
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Citation { key: String, bibtex: String },
    Title(String),
}

/// 校验通过的海报请求；编译开始时读取一次，之后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterRequest {
    pub presenter: String,
    pub role: String,
    pub invited: bool,
    pub profile: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub presentation: Presentation,
    pub destination: PathBuf,
}

/// 默认输出文件名：去掉空格与句点的姓名 + `_` + 日月（如 JaneDoe_17Oct.pdf）
pub fn default_output_name(presenter: &str, date: NaiveDate) -> String {
    let name: String = presenter.chars().filter(|c| *c != ' ' && *c != '.').collect();
    format!("{}_{}.pdf", name, date.format("%-d%b"))
}
