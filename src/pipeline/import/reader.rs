use std::path::Path;

use super::docx::extract_docx_text;
use super::format::{detect_category, detect_format, sanitize_filename, FileCategory};
use super::ImportError;

/// A transcript loaded from disk, ready for analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTranscript {
    /// Base name of the source file; used in the prompt and for date inference.
    pub file_name: String,
    pub text: String,
    pub category: FileCategory,
}

/// Read a transcript file and convert it to text.
///
/// Unsupported containers (.gdoc shortcuts, legacy .doc, PDF, binaries)
/// fail with [`ImportError::UnsupportedFormat`]; I/O problems with
/// [`ImportError::Io`].
pub fn extract_text(path: &Path) -> Result<LoadedTranscript, ImportError> {
    let detection = detect_format(path)?;
    let file_name = sanitize_filename(&path.to_string_lossy());

    if let Some(reason) = detection.category.unsupported_reason() {
        tracing::warn!(
            file_name,
            category = detection.category.as_str(),
            "Unsupported transcript format"
        );
        return Err(ImportError::UnsupportedFormat(reason.to_string()));
    }

    let bytes = std::fs::read(path)?;
    let text = decode(detection.category, &bytes)?;

    tracing::debug!(
        file_name,
        category = detection.category.as_str(),
        bytes = detection.file_size_bytes,
        chars = text.chars().count(),
        "Loaded transcript"
    );

    Ok(LoadedTranscript {
        file_name,
        text,
        category: detection.category,
    })
}

/// Convert in-memory file contents to text, classifying by name and content.
pub fn extract_text_from_bytes(file_name: &str, bytes: &[u8]) -> Result<String, ImportError> {
    let category = detect_category(file_name, bytes);
    if let Some(reason) = category.unsupported_reason() {
        return Err(ImportError::UnsupportedFormat(reason.to_string()));
    }
    decode(category, bytes)
}

fn decode(category: FileCategory, bytes: &[u8]) -> Result<String, ImportError> {
    match category {
        FileCategory::WordDocument => extract_docx_text(bytes),
        FileCategory::PlainText => Ok(decode_plain_text(bytes)),
        other => Err(ImportError::UnsupportedFormat(
            other.unsupported_reason().unwrap_or("unsupported").to_string(),
        )),
    }
}

/// Lossy UTF-8 decode with the byte-order mark removed.
fn decode_plain_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::import::docx::tests::{build_zip, SAMPLE_DOCUMENT_XML};

    #[test]
    fn reads_plain_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2025-03-07_1234.txt");
        std::fs::write(&path, "\u{feff}医師: こんにちは\n患者: こんにちは").unwrap();

        let loaded = extract_text(&path).unwrap();
        assert_eq!(loaded.file_name, "2025-03-07_1234.txt");
        assert_eq!(loaded.text, "医師: こんにちは\n患者: こんにちは");
        assert_eq!(loaded.category, FileCategory::PlainText);
    }

    #[test]
    fn reads_docx_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visit.docx");
        let zip = build_zip(&[("word/document.xml", SAMPLE_DOCUMENT_XML.as_bytes())], true);
        std::fs::write(&path, zip).unwrap();

        let loaded = extract_text(&path).unwrap();
        assert_eq!(loaded.category, FileCategory::WordDocument);
        assert!(loaded.text.contains("眠れなくて & 食欲も"));
    }

    #[test]
    fn gdoc_shortcut_is_unsupported_with_guidance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("面談.gdoc");
        std::fs::write(&path, r#"{"doc_id":"abc"}"#).unwrap();

        let err = extract_text(&path).unwrap_err();
        match err {
            ImportError::UnsupportedFormat(msg) => assert!(msg.contains(".docx")),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_io_error_not_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_text(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, ImportError::Io(_)));
    }

    #[test]
    fn from_bytes_rejects_legacy_word() {
        let header = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0, 0, 0, 0];
        let err = extract_text_from_bytes("old.doc", &header).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    }

    #[test]
    fn from_bytes_reads_text() {
        assert_eq!(
            extract_text_from_bytes("a.md", "# 記録\n本文".as_bytes()).unwrap(),
            "# 記録\n本文"
        );
    }
}
