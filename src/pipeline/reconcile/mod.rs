//! Result reconciliation
//!
//! Turns several independent analysis passes over one transcript into a
//! single ordered, deduplicated, date-normalized result set.
//!
//! ```text
//! analyze × N (concurrent) → concat in run order → dedup → date resolution
//! ```

pub mod types;
pub mod date;
pub mod dedup;
pub mod fanout;
pub mod reconciler;

pub use types::*;
pub use date::normalize_date;
pub use dedup::{deduplicate, excerpt_signature, SIGNATURE_CHARS};
pub use fanout::{fan_out, fan_out_fold};
pub use reconciler::{reconcile, resolve_dates, ReconcileOptions, Reconciler};
