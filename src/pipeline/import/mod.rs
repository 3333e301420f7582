pub mod format;
pub mod docx;
pub mod reader;

pub use format::*;
pub use docx::extract_docx_text;
pub use reader::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Could not read document: {0}")]
    CorruptDocument(String),
}
