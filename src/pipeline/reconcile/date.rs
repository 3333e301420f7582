//! Date normalization for findings and file names.
//!
//! Models and file names use many date spellings (`2025-03-07`,
//! `2025年3月7日`, `3月7日`, `3/7`, `20250307_patient.txt`). Everything is
//! folded into `YYYY/MM/DD`. Three rules are tried in order and the first
//! match of the first matching rule wins:
//!
//! 1. year + month + day, separators `-` `/` `_` `年` `月` optional, optional
//!    trailing `日`, found anywhere in the text;
//! 2. `M月D日` anywhere, year taken from the fallback;
//! 3. a bare `M-D` or `M/D` that is the whole input, year from the fallback.
//!
//! Matches are syntactic only. `2025-13-40` normalizes to `2025/13/40`.

use std::sync::LazyLock;

use regex::Regex;

static FULL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})[-/_年]?([0-9]{1,2})[-/_月]?([0-9]{1,2})日?")
        .expect("valid regex")
});

static MONTH_DAY_KANJI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2})月([0-9]{1,2})日").expect("valid regex"));

static BARE_MONTH_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,2})[-/]([0-9]{1,2})$").expect("valid regex"));

/// Normalize `text` to `YYYY/MM/DD`, or return an empty string when no rule
/// matches. `fallback_year` is used verbatim for month/day-only forms.
pub fn normalize_date(text: &str, fallback_year: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    if let Some(caps) = FULL_DATE_RE.captures(text) {
        return format_ymd(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = MONTH_DAY_KANJI_RE.captures(text) {
        return format_ymd(fallback_year, &caps[1], &caps[2]);
    }

    if let Some(caps) = BARE_MONTH_DAY_RE.captures(text) {
        return format_ymd(fallback_year, &caps[1], &caps[2]);
    }

    String::new()
}

fn format_ymd(year: &str, month: &str, day: &str) -> String {
    format!("{year}/{month:0>2}/{day:0>2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_dates_yield_empty() {
        assert_eq!(normalize_date("hello", "2025"), "");
        assert_eq!(normalize_date("", "2025"), "");
        assert_eq!(normalize_date("   ", "2025"), "");
        assert_eq!(normalize_date("患者: 最近眠れません", "2025"), "");
    }

    #[test]
    fn full_dates_in_common_spellings() {
        assert_eq!(normalize_date("2025-03-07", "1999"), "2025/03/07");
        assert_eq!(normalize_date("2025/03/07", "1999"), "2025/03/07");
        assert_eq!(normalize_date("2025年3月7日", "1999"), "2025/03/07");
        assert_eq!(normalize_date("2025_3_7", "1999"), "2025/03/07");
        assert_eq!(normalize_date("2025年12月25日", "1999"), "2025/12/25");
    }

    #[test]
    fn full_date_inside_file_name() {
        assert_eq!(normalize_date("2025-03-07_patient.txt", "1999"), "2025/03/07");
        assert_eq!(normalize_date("外来記録 2024年11月2日.docx", "1999"), "2024/11/02");
    }

    #[test]
    fn separators_are_optional() {
        assert_eq!(normalize_date("20250307", "1999"), "2025/03/07");
    }

    #[test]
    fn month_day_kanji_uses_fallback_year() {
        assert_eq!(normalize_date("3月7日", "2025"), "2025/03/07");
        assert_eq!(normalize_date("受診日は11月30日でした", "2024"), "2024/11/30");
    }

    #[test]
    fn bare_month_day_uses_fallback_year() {
        assert_eq!(normalize_date("3-7", "2025"), "2025/03/07");
        assert_eq!(normalize_date("12/31", "2025"), "2025/12/31");
    }

    #[test]
    fn bare_month_day_must_span_whole_input() {
        assert_eq!(normalize_date("foo 3-7 bar", "2025"), "");
        assert_eq!(normalize_date("3-7 ", "2025"), "");
    }

    #[test]
    fn first_match_of_first_rule_wins() {
        assert_eq!(
            normalize_date("2024-01-02 から 2025-03-04 まで", "1999"),
            "2024/01/02"
        );
        // Rule 1 takes priority over rule 2 even when rule 2 appears first.
        assert_eq!(normalize_date("3月7日 (2025-04-01)", "1999"), "2025/04/01");
    }

    #[test]
    fn invalid_calendar_dates_are_not_rejected() {
        assert_eq!(normalize_date("2025-13-40", "1999"), "2025/13/40");
        assert_eq!(normalize_date("13/45", "2025"), "2025/13/45");
    }

    #[test]
    fn full_width_digits_are_not_dates() {
        assert_eq!(normalize_date("２０２５年３月７日", "2025"), "");
    }
}
