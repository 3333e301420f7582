//! One user-facing analysis: validate input, load text, reconcile, export.
//!
//! This is the layer a front end calls. It owns the input checks that the
//! reconciler assumes have already happened.

use std::path::Path;

use thiserror::Error;

use crate::config::{Settings, SettingsError};
use crate::pipeline::analysis::{AnalysisError, GeminiClient, TranscriptAnalyzer};
use crate::pipeline::export::to_tsv;
use crate::pipeline::import::{extract_text, ImportError};
use crate::pipeline::reconcile::{reconcile, Finding, FindingKind, ReconcileOptions};

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Transcript text is empty")]
    EmptyTranscript,

    #[error("No API key configured; run `transcript-patterns settings --api-key <KEY>` or set GEMINI_API_KEY")]
    MissingApiKey,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Could not write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Reconciled result of one transcript.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub file_name: String,
    pub findings: Vec<Finding>,
}

impl AnalysisOutcome {
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Clipboard/spreadsheet payload; `None` when there is nothing to export.
    pub fn to_tsv(&self) -> Option<String> {
        to_tsv(&self.findings)
    }

    /// (rallies, monologues) by display classification.
    pub fn kind_counts(&self) -> (usize, usize) {
        self.findings
            .iter()
            .fold((0, 0), |(rally, mono), f| match f.kind() {
                FindingKind::Rally => (rally + 1, mono),
                FindingKind::Monologue => (rally, mono + 1),
            })
    }
}

pub fn validate_transcript(text: &str) -> Result<(), InputError> {
    if text.trim().is_empty() {
        return Err(InputError::EmptyTranscript);
    }
    Ok(())
}

/// Build the Gemini analyzer from settings, failing before any request when
/// no key is available.
pub fn build_analyzer(
    settings: &Settings,
    env_api_key: Option<String>,
) -> Result<GeminiClient, PipelineError> {
    let api_key = settings
        .resolve_api_key(env_api_key)
        .ok_or(InputError::MissingApiKey)?;
    Ok(GeminiClient::with_key(&api_key, &settings.model)?)
}

/// Validate and reconcile a transcript that is already in memory.
pub async fn analyze_transcript<A>(
    file_name: &str,
    text: &str,
    analyzer: &A,
    options: &ReconcileOptions,
) -> Result<AnalysisOutcome, PipelineError>
where
    A: TranscriptAnalyzer + ?Sized,
{
    validate_transcript(text)?;
    let findings = reconcile(file_name, text, analyzer, options).await?;
    Ok(AnalysisOutcome {
        file_name: file_name.to_string(),
        findings,
    })
}

/// Load a transcript file and reconcile it.
pub async fn analyze_file<A>(
    path: &Path,
    analyzer: &A,
    options: &ReconcileOptions,
) -> Result<AnalysisOutcome, PipelineError>
where
    A: TranscriptAnalyzer + ?Sized,
{
    let loaded = extract_text(path)?;
    analyze_transcript(&loaded.file_name, &loaded.text, analyzer, options).await
}
