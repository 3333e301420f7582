use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{AnalysisError, TranscriptAnalyzer};
use crate::pipeline::reconcile::RawFinding;

/// Scripted analyzer for tests: the n-th call returns the n-th scripted run
/// (cycling when there are more calls than runs).
pub struct MockAnalyzer {
    runs: Vec<Result<Vec<RawFinding>, String>>,
    delays: Vec<Duration>,
    calls: AtomicUsize,
}

impl MockAnalyzer {
    /// Every call returns the same findings.
    pub fn returning(findings: Vec<RawFinding>) -> Self {
        Self::scripted(vec![Ok(findings)])
    }

    /// One entry per call; `Err(message)` becomes an upstream API failure.
    pub fn scripted(runs: Vec<Result<Vec<RawFinding>, String>>) -> Self {
        Self {
            runs,
            delays: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Per-call latency, indexed like the scripted runs.
    pub fn with_delays(mut self, delays: Vec<Duration>) -> Self {
        self.delays = delays;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptAnalyzer for MockAnalyzer {
    async fn analyze(
        &self,
        _file_name: &str,
        _text: &str,
    ) -> Result<Vec<RawFinding>, AnalysisError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delays.is_empty() {
            tokio::time::sleep(self.delays[call % self.delays.len()]).await;
        }

        if self.runs.is_empty() {
            return Ok(Vec::new());
        }

        match &self.runs[call % self.runs.len()] {
            Ok(findings) => Ok(findings.clone()),
            Err(message) => Err(AnalysisError::Api {
                status: 503,
                message: message.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cycles_through_scripted_runs() {
        let mock =
            MockAnalyzer::scripted(vec![Ok(vec![RawFinding::default()]), Err("down".into())]);

        assert_eq!(mock.analyze("f", "t").await.unwrap().len(), 1);
        assert!(mock.analyze("f", "t").await.is_err());
        assert_eq!(mock.analyze("f", "t").await.unwrap().len(), 1);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn empty_script_returns_no_findings() {
        let mock = MockAnalyzer::scripted(Vec::new());
        assert!(mock.analyze("f", "t").await.unwrap().is_empty());
    }
}
