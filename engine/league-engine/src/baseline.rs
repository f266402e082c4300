//! Week 0 team ranks from the prior-season table

use std::collections::HashMap;

use tracing::warn;

use crate::config::BaselineEntry;
use crate::error::LeagueWarning;
use crate::models::{Team, TeamId};

/// Resolved week 0 ranks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineRanks {
    pub ranks: HashMap<TeamId, u32>,
    /// Teams with no prior-season row, in the order they were ranked
    pub unmapped: Vec<TeamId>,
    pub warnings: Vec<LeagueWarning>,
}

/// Map every team to a week 0 rank.
///
/// Teams found in the baseline keep its order, compacted to `1..=n` so that
/// relegated sides leave no gaps. Teams absent from it take the following
/// ranks alphabetically by name.
pub fn resolve_baseline(
    baseline: &[BaselineEntry],
    teams: &[Team],
    promoted_teams: usize,
) -> BaselineRanks {
    let by_name: HashMap<&str, u32> = baseline.iter().map(|e| (e.team.as_str(), e.rank)).collect();

    let mut mapped: Vec<(u32, &Team)> = Vec::new();
    let mut unmapped: Vec<&Team> = Vec::new();
    for team in teams {
        match by_name.get(team.name.as_str()) {
            Some(rank) => mapped.push((*rank, team)),
            None => unmapped.push(team),
        }
    }
    mapped.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));
    unmapped.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    let ranks = mapped
        .iter()
        .map(|(_, team)| *team)
        .chain(unmapped.iter().copied())
        .enumerate()
        .map(|(index, team)| (team.id.clone(), index as u32 + 1))
        .collect();

    let mut warnings = Vec::new();
    if unmapped.len() != promoted_teams {
        let names: Vec<&str> = unmapped.iter().map(|t| t.name.as_str()).collect();
        let warning = LeagueWarning::configuration(format!(
            "expected {} teams missing from the baseline, found {} ({})",
            promoted_teams,
            unmapped.len(),
            names.join(", ")
        ));
        warn!("{}", warning);
        warnings.push(warning);
    }

    BaselineRanks {
        ranks,
        unmapped: unmapped.into_iter().map(|t| t.id.clone()).collect(),
        warnings,
    }
}
