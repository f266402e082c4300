//! Prediction scoring
//!
//! A team predicted at position `p` that actually sits at rank `a` is worth
//! `5 - |p - a|` points, so a perfect pick scores 5 and the worst possible
//! pick on a 20-team table scores -14.

use std::collections::HashMap;

use crate::models::TeamId;

/// Points for a team placed exactly right
pub const MAX_TEAM_POINTS: i32 = 5;

/// Points for one predicted team
pub fn team_points(predicted_position: u32, actual_rank: u32) -> i32 {
    MAX_TEAM_POINTS - (predicted_position as i32 - actual_rank as i32).abs()
}

/// Score earned from a single team in a prediction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamContribution {
    pub team_id: TeamId,
    pub predicted_position: u32,
    pub actual_position: u32,
    pub points: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionScore {
    pub total: i32,
    pub breakdown: Vec<TeamContribution>,
}

/// Score a ranked prediction against the actual team ranks.
///
/// Teams without an actual rank are skipped.
pub fn score_prediction(rankings: &[TeamId], actual_ranks: &HashMap<TeamId, u32>) -> PredictionScore {
    let breakdown: Vec<TeamContribution> = rankings
        .iter()
        .enumerate()
        .filter_map(|(index, team_id)| {
            let actual_position = *actual_ranks.get(team_id)?;
            let predicted_position = index as u32 + 1;
            Some(TeamContribution {
                team_id: team_id.clone(),
                predicted_position,
                actual_position,
                points: team_points(predicted_position, actual_position),
            })
        })
        .collect();

    PredictionScore { total: breakdown.iter().map(|c| c.points).sum(), breakdown }
}
