//! Per-user season summary

use crate::models::{HistoryEntry, UserSummary};

/// Derive the user document's score fields from a week-ordered history.
///
/// Returns `None` for an empty history. Previous values come from the
/// second-latest entry and are absent when only one week exists.
pub fn summarize_history(entries: &[HistoryEntry]) -> Option<UserSummary> {
    let latest = entries.last()?;
    let previous = entries.len().checked_sub(2).map(|index| entries[index]);

    Some(UserSummary {
        score: latest.score,
        rank: latest.rank,
        previous_score: previous.map(|p| p.score),
        previous_rank: previous.map(|p| p.rank),
        score_change: previous.map(|p| latest.score - p.score),
        rank_change: previous.map(|p| p.rank as i64 - latest.rank as i64),
        highest_score: entries.iter().map(|e| e.score).max().unwrap_or(latest.score),
        lowest_score: entries.iter().map(|e| e.score).min().unwrap_or(latest.score),
        highest_rank: entries.iter().map(|e| e.rank).min().unwrap_or(latest.rank),
        lowest_rank: entries.iter().map(|e| e.rank).max().unwrap_or(latest.rank),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(week: u32, score: i32, rank: u32) -> HistoryEntry {
        HistoryEntry { week, score, rank }
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(summarize_history(&[]), None);
    }

    #[test]
    fn test_single_week_has_no_previous() {
        let summary = summarize_history(&[entry(0, 40, 3)]).unwrap();
        assert_eq!(summary.score, 40);
        assert_eq!(summary.previous_rank, None);
        assert_eq!(summary.rank_change, None);
        assert_eq!((summary.highest_rank, summary.lowest_rank), (3, 3));
    }

    #[test]
    fn test_climb_is_positive_rank_change() {
        let summary =
            summarize_history(&[entry(0, 40, 3), entry(1, 30, 7), entry(2, 55, 2)]).unwrap();
        assert_eq!(summary.previous_score, Some(30));
        assert_eq!(summary.score_change, Some(25));
        assert_eq!(summary.rank_change, Some(5));
        assert_eq!((summary.highest_score, summary.lowest_score), (55, 30));
        assert_eq!((summary.highest_rank, summary.lowest_rank), (2, 7));
    }
}
