//! 海报领域：请求模型、字段校验、文档组装、文献查询、工作目录

pub mod assemble;
pub mod citation;
pub mod request;
pub mod validate;
pub mod workspace;

pub use assemble::{render_input, write_sources};
pub use citation::{fill_from_doi, lookup_citation, normalize_bibtex, BibEntry, CitationResolver, DoiResolver};
pub use request::{
    default_output_name, PosterDraft, PosterRequest, Presentation, PresentationMode,
    ROLE_SUGGESTIONS,
};
pub use validate::{validate, MissingField};
pub use workspace::Workspace;
