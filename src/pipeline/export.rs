//! Tab-separated export for pasting into spreadsheet applications.
//!
//! Format: one header line, then one line per finding. Fields are joined by
//! `\t`, rows by `\n`. Data fields are double-quoted with embedded quotes
//! doubled, so excerpts containing tabs or newlines stay in one cell.

use crate::pipeline::reconcile::Finding;

/// Column labels in export order: date, reception number, type, excerpt, summary.
pub const TSV_HEADERS: [&str; 5] = [
    "日付",
    "受付番号",
    "種別",
    "実際の会話（抜粋）",
    "内容の要約",
];

/// Serialize findings with the default headers.
///
/// Returns `None` when there is nothing to export. An empty result set never
/// produces a header-only payload.
pub fn to_tsv(results: &[Finding]) -> Option<String> {
    to_tsv_with_headers(results, &TSV_HEADERS)
}

/// Serialize findings with caller-supplied (e.g. localized) header labels.
/// Column order and count are fixed.
pub fn to_tsv_with_headers(results: &[Finding], headers: &[&str; 5]) -> Option<String> {
    if results.is_empty() {
        return None;
    }

    let mut lines = Vec::with_capacity(results.len() + 1);
    lines.push(headers.join("\t"));

    for row in results {
        let reception_number = row.reception_number.to_string();
        let fields = [
            row.date.as_str(),
            reception_number.as_str(),
            row.finding_type.as_str(),
            row.excerpt.as_str(),
            row.summary.as_str(),
        ];
        lines.push(
            fields
                .iter()
                .map(|f| quote_field(f))
                .collect::<Vec<_>>()
                .join("\t"),
        );
    }

    Some(lines.join("\n"))
}

fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
