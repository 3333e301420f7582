use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ImportError;

/// Broad file categories we recognise
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileCategory {
    PlainText,
    /// Office Open XML word-processing document (.docx)
    WordDocument,
    /// Pre-2007 binary Word document (.doc)
    LegacyWord,
    /// Google Docs desktop shortcut (.gdoc): a pointer, not the document
    GoogleDocShortcut,
    Pdf,
    Unsupported,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::WordDocument => "word_document",
            Self::LegacyWord => "legacy_word",
            Self::GoogleDocShortcut => "google_doc_shortcut",
            Self::Pdf => "pdf",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::PlainText | Self::WordDocument)
    }

    /// Actionable message for categories that cannot be turned into text.
    pub fn unsupported_reason(&self) -> Option<&'static str> {
        match self {
            Self::PlainText | Self::WordDocument => None,
            Self::GoogleDocShortcut => Some(
                "Google Docs shortcuts (.gdoc) cannot be read directly; download the document as Microsoft Word (.docx) and open that file instead",
            ),
            Self::LegacyWord => Some(
                "legacy Word documents (.doc) are not supported; save the file as .docx or plain text",
            ),
            Self::Pdf => Some(
                "PDF files are not supported; export the transcript as .docx or plain text",
            ),
            Self::Unsupported => Some(
                "file is neither UTF-8 text nor a .docx document; save the transcript as UTF-8 text or .docx",
            ),
        }
    }
}

/// Result of format detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatDetection {
    pub category: FileCategory,
    pub file_size_bytes: u64,
}

pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024; // 20MB

const SNIFF_LEN: usize = 4096;

/// Detect a file's format from its name and leading bytes.
pub fn detect_format(path: &Path) -> Result<FormatDetection, ImportError> {
    let metadata = std::fs::metadata(path)?;
    let file_size = metadata.len();

    if file_size > MAX_FILE_SIZE {
        return Err(ImportError::FileTooLarge {
            size_mb: file_size as f64 / (1024.0 * 1024.0),
            max_mb: MAX_FILE_SIZE / (1024 * 1024),
        });
    }

    let mut file = std::fs::File::open(path)?;
    let mut header = vec![0u8; SNIFF_LEN];
    let bytes_read = file.read(&mut header)?;
    header.truncate(bytes_read);

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    Ok(FormatDetection {
        category: detect_category(file_name, &header),
        file_size_bytes: file_size,
    })
}

/// Classify content by magic bytes, with the file name consulted only for
/// shortcut files that have no distinctive content.
pub fn detect_category(file_name: &str, header: &[u8]) -> FileCategory {
    if has_extension(file_name, "gdoc") {
        return FileCategory::GoogleDocShortcut;
    }

    match header {
        // ZIP container: PK\x03\x04 (docx is a ZIP of XML parts)
        [0x50, 0x4B, 0x03, 0x04, ..] => FileCategory::WordDocument,
        // OLE compound file: D0 CF 11 E0 A1 B1 1A E1
        [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, ..] => FileCategory::LegacyWord,
        // PDF: %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => FileCategory::Pdf,
        _ if is_likely_text(header) => FileCategory::PlainText,
        _ => FileCategory::Unsupported,
    }
}

fn has_extension(file_name: &str, ext: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Valid UTF-8 (a character cut off by the sniff window is fine) and mostly
/// printable. Empty input counts as text.
fn is_likely_text(bytes: &[u8]) -> bool {
    let text = match std::str::from_utf8(bytes) {
        Ok(t) => t,
        Err(e) if e.error_len().is_none() => {
            // Incomplete sequence at the end of the sniff window
            match std::str::from_utf8(&bytes[..e.valid_up_to()]) {
                Ok(t) => t,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };

    if text.is_empty() {
        return true;
    }

    let total = text.chars().count();
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    printable as f64 / total as f64 > 0.80
}

/// Strip path components from a user-supplied name, limit length.
///
/// The result is what the analysis prompt sees as the file name, and what
/// file-name date inference runs on.
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("transcript");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "transcript".to_string()
    } else {
        clean
    }
}
