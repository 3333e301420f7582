pub mod prompt;
pub mod parser;
pub mod gemini;
pub mod mock;

pub use prompt::*;
pub use parser::*;
pub use gemini::*;
pub use mock::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::pipeline::reconcile::RawFinding;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Could not reach the analysis service at {0}")]
    Connection(String),

    #[error("Analysis request timed out after {0}s")]
    Timeout(u64),

    #[error("Analysis service returned error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),
}

/// One analysis pass over a transcript (allows mocking).
///
/// Implementations must fail when the upstream call does not succeed and
/// must return an empty vector, not an error, when the upstream determines
/// there is nothing to report.
#[async_trait]
pub trait TranscriptAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        file_name: &str,
        text: &str,
    ) -> Result<Vec<RawFinding>, AnalysisError>;
}
