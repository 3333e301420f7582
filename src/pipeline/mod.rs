pub mod import; // Transcript files -> text
pub mod analysis; // LLM analysis passes
pub mod reconcile; // Multi-run merge, dedup, date resolution
pub mod export; // TSV output
