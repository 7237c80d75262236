//! Loading the resume into page-level text segments.
//!
//! PDFs are read page by page with lopdf. Plain-text resumes (`.txt`, `.md`) are
//! split into pages on form feed characters, the way `pdftotext` writes them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Page separator for plain-text documents.
pub const PAGE_BREAK: char = '\x0c';

/// One page of extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based page number in the source document.
    pub page: u32,
    pub text: String,
}

/// Reads `path` and returns its pages in reading order.
/// Pages without extractable text are kept with empty text so numbering stays intact.
pub fn load_document(path: &Path) -> Result<Vec<Segment>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("pdf"));
    let segments = if is_pdf {
        load_pdf(path)?
    } else {
        let raw = std::fs::read_to_string(path).map_err(|e| LoadError::Read(path.to_path_buf(), e))?;
        split_pages(&raw)
    };
    log::debug!("loaded {} page(s) from {}", segments.len(), path.display());
    Ok(segments)
}

fn load_pdf(path: &Path) -> Result<Vec<Segment>, LoadError> {
    let doc = lopdf::Document::load(path).map_err(|e| LoadError::Pdf(path.to_path_buf(), e))?;
    let mut segments = Vec::new();
    // get_pages is keyed by page number, so iteration is already in page order.
    for page in doc.get_pages().into_keys() {
        let text = match doc.extract_text(&[page]) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("no text extracted from page {} of {}: {}", page, path.display(), e);
                String::new()
            }
        };
        segments.push(Segment { page, text });
    }
    Ok(segments)
}

/// Splits plain text into pages on form feeds. A trailing form feed does not start a new page.
fn split_pages(raw: &str) -> Vec<Segment> {
    let raw = raw.strip_suffix(PAGE_BREAK).unwrap_or(raw);
    raw.split(PAGE_BREAK)
        .enumerate()
        .map(|(i, text)| Segment {
            page: i as u32 + 1,
            text: text.to_string(),
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("document not found: {0}")]
    NotFound(PathBuf),
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("could not parse PDF {0}: {1}")]
    Pdf(PathBuf, lopdf::Error),
}
