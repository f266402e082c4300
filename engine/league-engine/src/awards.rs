//! Most-improved awards per calendar period

use tracing::debug;

use crate::history::UserTrack;
use crate::models::{AwardPeriod, AwardType, MonthlyAward, UserId, Week};

struct Candidate<'a> {
    user_id: &'a UserId,
    improvement: i32,
    start_score: i32,
    end_score: i32,
}

/// Resolve winners and runners-up for every completed period.
///
/// Only non-pro users with history at both boundary weeks compete. Every
/// user sharing the top improvement wins. A runner-up is recorded only when
/// the winner is alone; all users on the next-lower improvement share it.
pub fn resolve_awards(periods: &[AwardPeriod], tracks: &[UserTrack], latest_week: Week) -> Vec<MonthlyAward> {
    let mut awards = Vec::new();

    for period in periods.iter().filter(|p| p.end_week <= latest_week) {
        let mut candidates: Vec<Candidate<'_>> = tracks
            .iter()
            .filter(|track| !track.is_pro)
            .filter_map(|track| {
                let start = track.entry_at(period.start_week)?;
                let end = track.entry_at(period.end_week)?;
                Some(Candidate {
                    user_id: &track.user_id,
                    improvement: end.score - start.score,
                    start_score: start.score,
                    end_score: end.score,
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            (b.improvement, b.end_score)
                .cmp(&(a.improvement, a.end_score))
                .then_with(|| a.user_id.cmp(b.user_id))
        });

        let Some(top) = candidates.first().map(|c| c.improvement) else {
            debug!("No eligible users for award period {}", period.id);
            continue;
        };

        let winners: Vec<&Candidate<'_>> = candidates.iter().filter(|c| c.improvement == top).collect();
        let runners_up: Vec<&Candidate<'_>> = if winners.len() == 1 {
            candidates
                .iter()
                .map(|c| c.improvement)
                .find(|improvement| *improvement < top)
                .map(|next| candidates.iter().filter(|c| c.improvement == next).collect())
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let award = |candidate: &Candidate<'_>, award_type: AwardType| MonthlyAward {
            period_id: period.id.clone(),
            label: period.label.clone(),
            user_id: candidate.user_id.clone(),
            award_type,
            improvement: candidate.improvement,
            start_score: candidate.start_score,
            end_score: candidate.end_score,
        };
        awards.extend(winners.into_iter().map(|c| award(c, AwardType::Winner)));
        awards.extend(runners_up.into_iter().map(|c| award(c, AwardType::RunnerUp)));
    }

    awards
}
