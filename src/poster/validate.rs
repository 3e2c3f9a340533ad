//! 字段校验
//!
//! 纯函数：检查必填字段，返回 PosterRequest 或全部缺失字段；不触碰工作目录。

use std::path::PathBuf;

use crate::poster::citation::extract_cite_key;
use crate::poster::request::{PosterDraft, PosterRequest, Presentation, PresentationMode};

/// 缺失或不可用的字段（按表单顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Presenter,
    Role,
    SaveLocation,
    ProfileLocation,
    Bibtex,
    /// bibtex 非空但解析不出条目键
    CiteKey,
    Title,
}

impl MissingField {
    pub fn message(&self) -> &'static str {
        match self {
            MissingField::Presenter => "Presenter name cannot be empty.",
            MissingField::Role => "Presenter role cannot be empty.",
            MissingField::SaveLocation => "Save location cannot be empty.",
            MissingField::ProfileLocation => "Profile picture location cannot be empty.",
            MissingField::Bibtex => "BibTeX entry cannot be empty.",
            MissingField::CiteKey => "BibTeX entry has no citation key.",
            MissingField::Title => "Title cannot be empty.",
        }
    }
}

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// 校验草稿；通过则生成不可变的 PosterRequest
pub fn validate(draft: &PosterDraft) -> Result<PosterRequest, Vec<MissingField>> {
    let mut missing = Vec::new();

    if is_blank(&draft.presenter) {
        missing.push(MissingField::Presenter);
    }
    if is_blank(&draft.role) {
        missing.push(MissingField::Role);
    }
    if is_blank(&draft.save_location) {
        missing.push(MissingField::SaveLocation);
    }
    if draft.profile && is_blank(&draft.profile_location) {
        missing.push(MissingField::ProfileLocation);
    }

    let presentation = match draft.mode {
        PresentationMode::Citation => {
            if is_blank(&draft.bibtex) {
                missing.push(MissingField::Bibtex);
                None
            } else {
                let key = draft
                    .cite_key
                    .clone()
                    .filter(|k| !is_blank(k))
                    .or_else(|| extract_cite_key(&draft.bibtex));
                match key {
                    Some(key) => Some(Presentation::Citation {
                        key,
                        bibtex: draft.bibtex.clone(),
                    }),
                    None => {
                        missing.push(MissingField::CiteKey);
                        None
                    }
                }
            }
        }
        PresentationMode::Title => {
            if is_blank(&draft.title) {
                missing.push(MissingField::Title);
                None
            } else {
                Some(Presentation::Title(draft.title.clone()))
            }
        }
    };

    match presentation {
        Some(presentation) if missing.is_empty() => Ok(PosterRequest {
            presenter: draft.presenter.clone(),
            role: draft.role.clone(),
            invited: draft.invited,
            profile: draft.profile.then(|| draft.profile_location.clone()),
            date: draft.date,
            time: draft.time,
            presentation,
            destination: PathBuf::from(&draft.save_location),
        }),
        _ => Err(missing),
    }
}
