//! 文档组装：把请求字段写成模板使用的宏定义
//!
//! 每个字段对应一个 `\newcommand`，原样插入，不做转义（特殊字符由调用方预先处理）。
//! CiteKey 与 Title 二者只写其一。

use std::path::Path;

use crate::core::PosterError;
use crate::poster::request::{PosterRequest, Presentation};
use crate::poster::workspace::Workspace;

fn macro_line(name: &str, value: &str) -> String {
    format!("\\newcommand{{\\{}}}{{{}}}\n", name, value)
}

/// 生成 input.tex 内容
pub fn render_input(req: &PosterRequest) -> String {
    let mut out = String::new();
    out.push_str(&macro_line("Presenter", &req.presenter));
    out.push_str(&macro_line("Role", &req.role));
    if req.invited {
        out.push_str(&macro_line("Invited", "True"));
    }
    if let Some(profile) = req.profile.as_deref().filter(|p| !p.is_empty()) {
        // 排版工具只认正斜杠
        out.push_str(&macro_line("Profile", &profile.replace('\\', "/")));
    }
    out.push_str(&macro_line("Day", &req.date.format("%A").to_string()));
    out.push_str(&macro_line("Date", &req.date.format("%-d %B %Y").to_string()));
    out.push_str(&macro_line("Time", &req.time.format("%I:%M %p").to_string()));
    match &req.presentation {
        Presentation::Citation { key, .. } => out.push_str(&macro_line("CiteKey", key)),
        Presentation::Title(title) => out.push_str(&macro_line("Title", title)),
    }
    out
}

fn write_file(what: &'static str, path: &Path, contents: &str) -> Result<(), PosterError> {
    std::fs::write(path, contents).map_err(|source| PosterError::Write {
        what,
        path: path.to_path_buf(),
        source,
    })
}

/// 写入 input.tex，citation 模式下再写 ref.bib
pub fn write_sources(req: &PosterRequest, ws: &Workspace) -> Result<(), PosterError> {
    let input = ws.input_path();
    write_file("input details", &input, &render_input(req))?;
    tracing::debug!(path = %input.display(), "input details written");

    if let Presentation::Citation { bibtex, .. } = &req.presentation {
        let bib = ws.bibliography_path();
        write_file("BibTeX entry", &bib, bibtex)?;
        tracing::debug!(path = %bib.display(), "bibliography written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn request(presentation: Presentation) -> PosterRequest {
        PosterRequest {
            presenter: "Jane Doe".into(),
            role: "PhD Student".into(),
            invited: false,
            profile: None,
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            presentation,
            destination: PathBuf::from("/tmp/out.pdf"),
        }
    }

    #[test]
    fn test_render_citation_mode() {
        let req = request(Presentation::Citation {
            key: "Doe2024".into(),
            bibtex: "@article{Doe2024,}".into(),
        });
        let text = render_input(&req);
        assert_eq!(
            text,
            "\\newcommand{\\Presenter}{Jane Doe}\n\
             \\newcommand{\\Role}{PhD Student}\n\
             \\newcommand{\\Day}{Friday}\n\
             \\newcommand{\\Date}{16 October 2026}\n\
             \\newcommand{\\Time}{10:00 AM}\n\
             \\newcommand{\\CiteKey}{Doe2024}\n"
        );
        assert!(!text.contains("\\Title"));
    }

    #[test]
    fn test_render_title_mode_with_optionals() {
        let mut req = request(Presentation::Title("Deep Posters".into()));
        req.invited = true;
        req.profile = Some("C:\\Users\\jane\\me.png".into());
        req.time = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        let text = render_input(&req);
        assert!(text.contains("\\newcommand{\\Invited}{True}\n"));
        assert!(text.contains("\\newcommand{\\Profile}{C:/Users/jane/me.png}\n"));
        assert!(text.contains("\\newcommand{\\Time}{02:30 PM}\n"));
        assert!(text.contains("\\newcommand{\\Title}{Deep Posters}\n"));
        assert!(!text.contains("\\CiteKey"));
    }

    #[test]
    fn test_write_sources_title_mode_skips_bib() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path(), "main");
        write_sources(&request(Presentation::Title("T".into())), &ws).unwrap();
        assert!(ws.input_path().exists());
        assert!(!ws.bibliography_path().exists());
    }

    #[test]
    fn test_write_sources_citation_mode_writes_bib() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path(), "main");
        let req = request(Presentation::Citation {
            key: "K".into(),
            bibtex: "@misc{K, note={x}}".into(),
        });
        write_sources(&req, &ws).unwrap();
        assert_eq!(
            std::fs::read_to_string(ws.bibliography_path()).unwrap(),
            "@misc{K, note={x}}"
        );
    }

    #[test]
    fn test_write_sources_missing_workspace_is_write_error() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::new(dir.path().join("does-not-exist"), "main");
        let err = write_sources(&request(Presentation::Title("T".into())), &ws).unwrap_err();
        assert!(matches!(err, PosterError::Write { what: "input details", .. }));
    }
}
