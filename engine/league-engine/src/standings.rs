//! League table computation
//!
//! Standings are always rebuilt from the full list of played fixtures up to
//! a cutoff week; nothing is patched incrementally.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::LeagueWarning;
use crate::models::{CurrentStanding, FormResult, Match, Team, TeamId, TeamRecentResult, Week};
use crate::ranking::{competition_rank, RankedEntry};

pub const POINTS_FOR_WIN: u32 = 3;
pub const POINTS_FOR_DRAW: u32 = 1;

/// Number of results in a form guide
pub const FORM_LENGTH: usize = 6;

/// Aggregate record of one team
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamStats {
    pub points: u32,
    pub games_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl TeamStats {
    pub fn goal_difference(&self) -> i32 {
        self.goals_for as i32 - self.goals_against as i32
    }

    fn record(&mut self, scored: u32, conceded: u32) {
        self.games_played += 1;
        self.goals_for += scored;
        self.goals_against += conceded;

        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => {
                self.wins += 1;
                self.points += POINTS_FOR_WIN;
            }
            std::cmp::Ordering::Equal => {
                self.draws += 1;
                self.points += POINTS_FOR_DRAW;
            }
            std::cmp::Ordering::Less => {
                self.losses += 1;
            }
        }
    }
}

/// Rank key for teams: points, goal difference, goals scored
pub type TeamRankKey = (u32, i32, u32);

/// Per-team statistics for one cutoff week
#[derive(Debug, Clone, Default)]
pub struct StandingsTable {
    rows: BTreeMap<TeamId, TeamStats>,
    names: HashMap<TeamId, String>,
}

impl StandingsTable {
    pub fn get(&self, team_id: &str) -> Option<&TeamStats> {
        self.rows.get(team_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TeamId, &TeamStats)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Display name of a team, falling back to its id
    pub fn team_name<'a>(&'a self, team_id: &'a str) -> &'a str {
        self.names.get(team_id).map(String::as_str).unwrap_or(team_id)
    }

    /// Competition ranks ordered by points, goal difference, goals for, then name
    pub fn ranked(&self) -> Vec<RankedEntry<TeamId>> {
        let entries: Vec<(TeamId, TeamRankKey, String)> = self
            .rows
            .iter()
            .map(|(id, stats)| {
                let key = (stats.points, stats.goal_difference(), stats.goals_for);
                (id.clone(), key, self.team_name(id).to_string())
            })
            .collect();
        competition_rank(entries)
    }

    /// Table rows with the given ranks applied, in rank order
    pub fn current_standings(&self, ranks: &HashMap<TeamId, u32>) -> Vec<CurrentStanding> {
        let mut standings: Vec<CurrentStanding> = self
            .rows
            .iter()
            .filter_map(|(id, stats)| {
                let rank = *ranks.get(id)?;
                Some(CurrentStanding {
                    team_id: id.clone(),
                    team_name: self.team_name(id).to_string(),
                    points: stats.points,
                    games_played: stats.games_played,
                    wins: stats.wins,
                    draws: stats.draws,
                    losses: stats.losses,
                    goals_for: stats.goals_for,
                    goals_against: stats.goals_against,
                    goal_difference: stats.goal_difference(),
                    rank,
                })
            })
            .collect();
        standings.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.team_name.cmp(&b.team_name)));
        standings
    }
}

/// Aggregate every played fixture with `week <= cutoff`.
///
/// Every team appears in the result, with all-zero stats when it has not
/// played. Fixtures naming a team outside `teams` are ignored; use
/// [`partition_known_matches`] to report them.
pub fn calculate_standings<'a, I>(teams: &[Team], matches: I, cutoff: Week) -> StandingsTable
where
    I: IntoIterator<Item = &'a Match>,
{
    let mut table = StandingsTable {
        rows: teams.iter().map(|t| (t.id.clone(), TeamStats::default())).collect(),
        names: teams.iter().map(|t| (t.id.clone(), t.name.clone())).collect(),
    };

    for m in matches.into_iter().filter(|m| m.week <= cutoff) {
        let Some((home, away)) = m.score() else {
            continue;
        };
        if !table.rows.contains_key(&m.home_team_id) || !table.rows.contains_key(&m.away_team_id)
        {
            continue;
        }
        if let Some(stats) = table.rows.get_mut(&m.home_team_id) {
            stats.record(home, away);
        }
        if let Some(stats) = table.rows.get_mut(&m.away_team_id) {
            stats.record(away, home);
        }
    }

    table
}

/// Split fixtures into those whose teams all exist and warnings for the rest
pub fn partition_known_matches<'a>(
    teams: &[Team],
    matches: &'a [Match],
) -> (Vec<&'a Match>, Vec<LeagueWarning>) {
    let known: HashSet<&str> = teams.iter().map(|t| t.id.as_str()).collect();
    let mut kept = Vec::with_capacity(matches.len());
    let mut warnings = Vec::new();

    for m in matches {
        let missing = [&m.home_team_id, &m.away_team_id]
            .into_iter()
            .find(|id| !known.contains(id.as_str()));
        match missing {
            Some(id) => warnings.push(LeagueWarning::missing_reference(format!("match {}", m.id()), id)),
            None => kept.push(m),
        }
    }

    (kept, warnings)
}

/// Last [`FORM_LENGTH`] results of a team up to `cutoff`, oldest first.
///
/// Played fixtures are ordered by week, kick-off date and id. When fewer
/// than six have been played the guide is left-padded with `-`.
pub fn recent_form<'a, I>(team_id: &str, matches: I, cutoff: Week) -> TeamRecentResult
where
    I: IntoIterator<Item = &'a Match>,
{
    let mut played: Vec<&Match> = matches
        .into_iter()
        .filter(|m| m.week <= cutoff && m.is_played() && m.involves(team_id))
        .collect();
    played.sort_by(|a, b| {
        a.week
            .cmp(&b.week)
            .then_with(|| a.match_date.cmp(&b.match_date))
            .then_with(|| a.id().cmp(&b.id()))
    });

    let latest = &played[played.len().saturating_sub(FORM_LENGTH)..];
    let mut form = vec![FormResult::Empty; FORM_LENGTH - latest.len()];
    form.extend(latest.iter().filter_map(|m| {
        let (home, away) = m.score()?;
        let (scored, conceded) = if m.home_team_id == team_id { (home, away) } else { (away, home) };
        Some(match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => FormResult::Win,
            std::cmp::Ordering::Equal => FormResult::Draw,
            std::cmp::Ordering::Less => FormResult::Loss,
        })
    }));

    TeamRecentResult { team_id: team_id.to_string(), form }
}
