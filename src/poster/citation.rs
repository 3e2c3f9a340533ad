//! 文献查询与 BibTeX 规范化
//!
//! CitationResolver 是外部协作者：DOI -> BibTeX 文本 或 错误信息。
//! DoiResolver 通过 doi.org 内容协商（Accept: application/x-bibtex）获取条目；
//! normalize_bibtex 把 `&amp;` 换成 `\&`、把 en-dash 换成 `-`，并提取条目键。

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use crate::core::PosterError;
use crate::poster::request::{PosterDraft, PresentationMode};

const BIBTEX_MIME: &str = "application/x-bibtex";

/// 文献解析器：DOI -> BibTeX
#[async_trait]
pub trait CitationResolver: Send + Sync {
    async fn resolve(&self, doi: &str) -> Result<String, String>;
}

/// 基于 doi.org 的解析器
pub struct DoiResolver {
    client: Client,
    base_url: String,
}

impl DoiResolver {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, PosterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("poster-gen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PosterError::Citation(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CitationResolver for DoiResolver {
    async fn resolve(&self, doi: &str) -> Result<String, String> {
        let url = format!("{}/{}", self.base_url, doi.trim());
        tracing::info!(url = %url, "resolving DOI");
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, BIBTEX_MIME)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {} for DOI {}", resp.status(), doi.trim()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Read body: {}", e))?;
        if body.trim().is_empty() {
            return Err(format!("Empty BibTeX record for DOI {}", doi.trim()));
        }
        Ok(body)
    }
}

/// 规范化后的 BibTeX 条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub key: String,
    pub bibtex: String,
}

static ENTRY_KEY_RE: OnceLock<Regex> = OnceLock::new();

/// 提取首个条目的键：`@article{Key2024,` -> `Key2024`
pub fn extract_cite_key(bibtex: &str) -> Option<String> {
    let re = ENTRY_KEY_RE.get_or_init(|| Regex::new(r"@\s*\w+\s*[{(]\s*([^,\s{}()]+)\s*,").unwrap());
    re.captures(bibtex)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// 替换排版引擎无法直接处理的字符
pub fn escape_for_typesetting(text: &str) -> String {
    text.replace("&amp;", "\\&").replace('\u{2013}', "-")
}

/// 规范化 BibTeX 文本并提取键；没有条目时报错
pub fn normalize_bibtex(raw: &str) -> Result<BibEntry, PosterError> {
    let bibtex = escape_for_typesetting(raw.trim());
    let key = extract_cite_key(&bibtex)
        .ok_or_else(|| PosterError::Citation("No BibTeX entry found in record".to_string()))?;
    Ok(BibEntry { key, bibtex })
}

/// 查询 DOI 并规范化结果
pub async fn lookup_citation(
    resolver: &dyn CitationResolver,
    doi: &str,
) -> Result<BibEntry, PosterError> {
    if doi.trim().is_empty() {
        return Err(PosterError::Citation("DOI field cannot be empty.".to_string()));
    }
    let raw = resolver.resolve(doi).await.map_err(PosterError::Citation)?;
    normalize_bibtex(&raw)
}

/// citation 模式下 bibtex 为空但给了 DOI 时，查询并填入草稿；返回是否发生了查询
pub async fn fill_from_doi(
    draft: &mut PosterDraft,
    resolver: &dyn CitationResolver,
) -> Result<bool, PosterError> {
    if draft.mode != PresentationMode::Citation || !draft.bibtex.trim().is_empty() {
        return Ok(false);
    }
    let Some(doi) = draft.doi.clone().filter(|d| !d.trim().is_empty()) else {
        return Ok(false);
    };
    let entry = lookup_citation(resolver, &doi).await?;
    tracing::info!(doi = %doi, key = %entry.key, "BibTeX filled from DOI");
    draft.cite_key = Some(entry.key);
    draft.bibtex = entry.bibtex;
    Ok(true)
}
