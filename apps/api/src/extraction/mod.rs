//! Document Extractor: turns uploaded PDF / DOCX / plain-text bytes into normalized text.
//!
//! Pure transformation: no I/O beyond the bytes handed in. Failures are always
//! reported as `ExtractError`, never folded into an empty string.

mod docx;
mod pdf;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to extract text from {format} document: {message}")]
    ExtractionFailure {
        format: DocumentFormat,
        message: String,
    },
}

impl ExtractError {
    pub(crate) fn failure(format: DocumentFormat, message: impl fmt::Display) -> Self {
        ExtractError::ExtractionFailure {
            format,
            message: message.to_string(),
        }
    }
}

/// Declared format of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Derives the format from a filename extension (`resume.PDF` → `Pdf`).
    pub fn from_filename(filename: &str) -> Result<Self, ExtractError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .ok_or_else(|| ExtractError::UnsupportedFormat(filename.to_string()))?;
        extension.parse()
    }

    /// Derives the format from a MIME content type; parameters such as `charset` are ignored.
    pub fn from_content_type(content_type: &str) -> Result<Self, ExtractError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Ok(DocumentFormat::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Ok(DocumentFormat::Docx)
            }
            "text/plain" => Ok(DocumentFormat::PlainText),
            _ => Err(ExtractError::UnsupportedFormat(content_type.to_string())),
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = ExtractError;

    /// Accepts a short format name or file extension.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            "txt" | "text" | "md" => Ok(DocumentFormat::PlainText),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::PlainText => "text",
        };
        f.write_str(name)
    }
}

/// Extracts and normalizes the text of a document.
pub fn extract(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractError> {
    let raw = match format {
        DocumentFormat::Pdf => pdf::extract_pdf_text(bytes)?,
        DocumentFormat::Docx => docx::extract_docx_text(bytes)?,
        DocumentFormat::PlainText => String::from_utf8_lossy(bytes).into_owned(),
    };
    Ok(normalize_text(&raw))
}

/// Unifies line endings, strips NULs and a leading BOM, trims line ends,
/// collapses runs of blank lines into one and trims the whole text.
pub fn normalize_text(text: &str) -> String {
    let cleaned = text
        .replace('\u{0000}', "")
        .replace("\r\n", "\n")
        .replace('\r', "\n");
    let cleaned = cleaned.trim_start_matches('\u{FEFF}');

    let mut lines: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for line in cleaned.lines().map(str::trim_end) {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        lines.push(if blank { "" } else { line });
        previous_blank = blank;
    }

    lines.join("\n").trim().to_string()
}
