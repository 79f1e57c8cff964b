//! text.rs
//!
//! Display-text formatting for the overlay counters:
//!   • count text, including the "First" / "1st of N" rule for the
//!     earliest-authored item
//!   • relative last-updated timestamps ("3m ago", "2h ago", "5d ago"),
//!     rounded to the nearest unit, "<1m" below one minute
//!
//! Callers supply "now" so the functions stay pure and testable.

use crate::stats::Scope;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Counter text for one category (PRs or issues).
///
/// When the earliest item the contributor authored is the one currently being
/// viewed, the counter reads "First" (sole item) or "1st of N". Account scope
/// is excluded from that rule: the first PR on some other repo is not the
/// first PR here. An unset count renders as the loading placeholder.
pub fn format_text(
    count: Option<u64>,
    first_number: Option<u64>,
    current_num: u64,
    scope: Scope,
) -> String {
    let Some(count) = count else {
        return "..".to_string();
    };

    if first_number == Some(current_num) && scope != Scope::Account {
        if count == 1 {
            return "First".to_string();
        }
        if count > 1 {
            return format!("1st of {count}");
        }
    }

    count.to_string()
}

/// Relative timestamp, rounded to the nearest minute/hour/day.
pub fn format_ago(last_update_ms: i64, now_ms: i64) -> String {
    let diff = (now_ms - last_update_ms).max(0);
    let mins = round_div(diff, MINUTE_MS);
    let hours = round_div(diff, HOUR_MS);
    let days = round_div(diff, DAY_MS);

    if mins < 1 {
        "<1m".to_string()
    } else if mins < 60 {
        format!("{mins}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else {
        format!("{days}d ago")
    }
}

fn round_div(n: i64, unit: i64) -> i64 {
    (n + unit / 2) / unit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_count_renders_placeholder() {
        assert_eq!(format_text(None, Some(10), 10, Scope::Repo), "..");
    }

    #[test]
    fn sole_first_item_renders_first() {
        // alice viewing PR #10, her only repo PR, which is #10 itself
        assert_eq!(format_text(Some(1), Some(10), 10, Scope::Repo), "First");
    }

    #[test]
    fn first_of_many_renders_ordinal() {
        assert_eq!(format_text(Some(4), Some(10), 10, Scope::Repo), "1st of 4");
    }

    #[test]
    fn non_first_item_renders_raw_count() {
        // prs=4 with the earliest being #2; viewing #10
        assert_eq!(format_text(Some(4), Some(2), 10, Scope::Repo), "4");
    }

    #[test]
    fn account_scope_never_renders_first() {
        assert_eq!(format_text(Some(1), Some(10), 10, Scope::Account), "1");
        assert_eq!(format_text(Some(7), Some(10), 10, Scope::Account), "7");
    }

    #[test]
    fn org_scope_honors_first_rule() {
        assert_eq!(format_text(Some(2), Some(10), 10, Scope::Org), "1st of 2");
    }

    #[test]
    fn zero_count_renders_zero() {
        assert_eq!(format_text(Some(0), None, 10, Scope::Repo), "0");
    }

    #[test]
    fn ago_below_one_minute() {
        assert_eq!(format_ago(0, 29 * 1000), "<1m");
    }

    #[test]
    fn ago_rounds_to_nearest_minute() {
        assert_eq!(format_ago(0, 30 * 1000), "1m ago");
        assert_eq!(format_ago(0, 3 * MINUTE_MS + 10 * 1000), "3m ago");
    }

    #[test]
    fn ago_hours_and_days() {
        assert_eq!(format_ago(0, 2 * HOUR_MS), "2h ago");
        assert_eq!(format_ago(0, 5 * DAY_MS), "5d ago");
    }

    #[test]
    fn ago_clamps_clock_skew() {
        assert_eq!(format_ago(10_000, 0), "<1m");
    }
}
