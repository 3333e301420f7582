//! Reconciler: merges repeated analysis passes into one result set.
//!
//! Runs: fan-out (N passes) → concatenate in run order → dedup → dates.
//! The analysis capability is non-deterministic and may omit findings on a
//! given pass, so several passes are merged to improve recall.

use std::time::Instant;

use chrono::Datelike;

use super::date::normalize_date;
use super::dedup::deduplicate;
use super::fanout::fan_out_fold;
use super::types::{Finding, RawFinding};
use crate::config;
use crate::pipeline::analysis::{AnalysisError, TranscriptAnalyzer};

/// Knobs for one reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOptions {
    /// Number of independent analysis passes. Values below 1 run once.
    pub run_count: usize,
    /// Year used for dates that carry only month and day.
    pub fallback_year: String,
    /// Date written when neither the finding nor the file name has one.
    pub date_placeholder: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            run_count: config::DEFAULT_RUN_COUNT,
            fallback_year: chrono::Local::now().year().to_string(),
            date_placeholder: config::DEFAULT_DATE_PLACEHOLDER.to_string(),
        }
    }
}

impl ReconcileOptions {
    pub fn with_run_count(mut self, run_count: usize) -> Self {
        self.run_count = run_count;
        self
    }

    pub fn with_fallback_year(mut self, year: impl Into<String>) -> Self {
        self.fallback_year = year.into();
        self
    }

    pub fn with_date_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.date_placeholder = placeholder.into();
        self
    }

    pub fn effective_runs(&self) -> usize {
        self.run_count.max(1)
    }
}

/// Owns an analyzer and the options it is reconciled with.
pub struct Reconciler<A: TranscriptAnalyzer> {
    analyzer: A,
    options: ReconcileOptions,
}

impl<A: TranscriptAnalyzer> Reconciler<A> {
    pub fn new(analyzer: A, options: ReconcileOptions) -> Self {
        Self { analyzer, options }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    pub async fn run(
        &self,
        file_name: &str,
        source_text: &str,
    ) -> Result<Vec<Finding>, AnalysisError> {
        reconcile(file_name, source_text, &self.analyzer, &self.options).await
    }
}

/// Reconcile `options.run_count` analysis passes over one transcript.
///
/// The caller guarantees `source_text` is non-blank. Any failed pass fails
/// the whole call; findings from passes that did succeed are discarded.
pub async fn reconcile<A>(
    file_name: &str,
    source_text: &str,
    analyzer: &A,
    options: &ReconcileOptions,
) -> Result<Vec<Finding>, AnalysisError>
where
    A: TranscriptAnalyzer + ?Sized,
{
    let start = Instant::now();
    let runs = options.effective_runs();

    let merged = fan_out_fold(
        runs,
        |run| async move {
            analyzer
                .analyze(file_name, source_text)
                .await
                .inspect_err(|e| {
                    tracing::warn!(
                        run,
                        file_name,
                        error = %e,
                        "Analysis run failed, aborting reconciliation"
                    );
                })
        },
        concat_runs,
    )
    .await?;

    let raw_count = merged.len();
    let unique = deduplicate(merged);
    let findings = resolve_dates(unique, file_name, options);

    tracing::info!(
        file_name,
        runs,
        raw = raw_count,
        unique = findings.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Reconciled analysis runs"
    );
    Ok(findings)
}

/// Run 1's findings, then run 2's, each in its own order.
fn concat_runs(runs: Vec<Vec<RawFinding>>) -> Vec<RawFinding> {
    runs.into_iter().flatten().collect()
}

/// Attach a final date to each finding: its own date if it normalizes, else
/// the file name's date, else the placeholder.
pub fn resolve_dates(
    items: Vec<RawFinding>,
    file_name: &str,
    options: &ReconcileOptions,
) -> Vec<Finding> {
    let file_date = normalize_date(file_name, &options.fallback_year);

    items
        .into_iter()
        .map(|item| {
            let own_date = normalize_date(&item.date, &options.fallback_year);
            let date = if !own_date.is_empty() {
                own_date
            } else if !file_date.is_empty() {
                file_date.clone()
            } else {
                options.date_placeholder.clone()
            };
            Finding::from_raw(item, date)
        })
        .collect()
}
