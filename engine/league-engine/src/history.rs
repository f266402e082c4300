//! Week-by-week season replay
//!
//! The builder replays the season from the pre-season baseline through every
//! week that has at least one played fixture. For each week it rebuilds the
//! team table, scores every eligible prediction against it and ranks the
//! users. Bad records are skipped and reported as warnings.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::baseline::resolve_baseline;
use crate::config::SeasonConfig;
use crate::error::LeagueWarning;
use crate::models::{
    CurrentStanding, HistoryEntry, Match, PlayerTeamScore, Prediction, Team, TeamId,
    TeamRecentResult, User, UserHistory, UserId, UserSummary, Week, WeeklyTeamStanding,
    BASELINE_WEEK,
};
use crate::ranking::{competition_rank, rank_map};
use crate::scoring::{score_prediction, PredictionScore};
use crate::standings::{calculate_standings, partition_known_matches, recent_form};
use crate::summary::summarize_history;

/// Raw league data for one replay
#[derive(Debug, Clone, Copy)]
pub struct HistoryInputs<'a> {
    pub teams: &'a [Team],
    pub matches: &'a [Match],
    pub users: &'a [User],
    pub predictions: &'a [Prediction],
    pub season: &'a SeasonConfig,
}

/// A ranked user's season
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTrack {
    pub user_id: UserId,
    pub name: String,
    pub is_pro: bool,
    pub entries: Vec<HistoryEntry>,
}

impl UserTrack {
    pub fn entry_at(&self, week: Week) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.week == week)
    }
}

/// A user's place in a week's ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStanding {
    pub user_id: UserId,
    pub name: String,
    pub is_pro: bool,
    pub score: i32,
    pub rank: u32,
    /// Ordinal slot in the final order, unique per user
    pub position: u32,
}

/// Everything derived from one replay
#[derive(Debug, Clone, Default)]
pub struct SeasonHistory {
    /// Processed weeks, ascending, always starting with week 0
    pub weeks: Vec<Week>,
    /// Per-user series, ordered by user id
    pub tracks: Vec<UserTrack>,
    /// User ranking of the final processed week, in rank order
    pub final_standings: Vec<UserStanding>,
    pub current_standings: Vec<CurrentStanding>,
    pub weekly_team_standings: Vec<WeeklyTeamStanding>,
    pub recent_results: Vec<TeamRecentResult>,
    pub player_team_scores: Vec<PlayerTeamScore>,
    pub warnings: Vec<LeagueWarning>,
}

impl SeasonHistory {
    pub fn latest_week(&self) -> Week {
        self.weeks.last().copied().unwrap_or(BASELINE_WEEK)
    }

    pub fn user_histories(&self) -> Vec<UserHistory> {
        self.tracks
            .iter()
            .map(|track| UserHistory {
                user_id: track.user_id.clone(),
                weekly_scores: track.entries.clone(),
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<(UserId, UserSummary)> {
        self.tracks
            .iter()
            .filter_map(|track| Some((track.user_id.clone(), summarize_history(&track.entries)?)))
            .collect()
    }
}

/// Re-rank stored tracks at `week`, e.g. from persisted user histories.
///
/// Tracks without an entry for that week are left out.
pub fn rank_tracks(tracks: &[UserTrack], week: Week) -> Vec<UserStanding> {
    let by_user: HashMap<&str, (&UserTrack, i32)> = tracks
        .iter()
        .filter_map(|t| Some((t.user_id.as_str(), (t, t.entry_at(week)?.score))))
        .collect();

    let keyed: Vec<(&str, (i32, bool), (&str, &str))> = by_user
        .iter()
        .map(|(id, (track, score))| (*id, (*score, track.is_pro), (track.name.as_str(), *id)))
        .collect();

    competition_rank(keyed)
        .into_iter()
        .filter_map(|entry| {
            let (track, score) = by_user.get(entry.id)?;
            Some(UserStanding {
                user_id: track.user_id.clone(),
                name: track.name.clone(),
                is_pro: track.is_pro,
                score: *score,
                rank: entry.rank,
                position: entry.position,
            })
        })
        .collect()
}

/// Users who take part in ranking, with their prediction
struct Entrant<'a> {
    user: &'a User,
    rankings: &'a [TeamId],
}

#[derive(Debug, Default)]
pub struct HistoryBuilder;

impl HistoryBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, inputs: HistoryInputs<'_>) -> SeasonHistory {
        let mut warnings = Vec::new();

        let (known_matches, match_warnings) = partition_known_matches(inputs.teams, inputs.matches);
        warnings.extend(match_warnings);

        let entrants = Self::entrants(&inputs, &mut warnings);

        let weeks: Vec<Week> = std::iter::once(BASELINE_WEEK)
            .chain(known_matches.iter().filter(|m| m.is_played()).map(|m| m.week))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let baseline = resolve_baseline(
            &inputs.season.baseline,
            inputs.teams,
            inputs.season.promoted_teams,
        );
        warnings.extend(baseline.warnings.iter().cloned());

        let mut tracks: BTreeMap<UserId, UserTrack> = entrants
            .iter()
            .map(|e| {
                let track = UserTrack {
                    user_id: e.user.id.clone(),
                    name: e.user.name.clone(),
                    is_pro: e.user.is_pro,
                    entries: Vec::with_capacity(weeks.len()),
                };
                (e.user.id.clone(), track)
            })
            .collect();

        let mut weekly_team_standings = Vec::with_capacity(weeks.len() * inputs.teams.len());
        let mut final_standings = Vec::new();
        let mut final_ranks = HashMap::new();
        let mut final_scores: Vec<(UserId, PredictionScore)> = Vec::new();

        for &week in &weeks {
            let team_ranks = if week == BASELINE_WEEK {
                baseline.ranks.clone()
            } else {
                let table = calculate_standings(inputs.teams, known_matches.iter().copied(), week);
                rank_map(&table.ranked())
            };

            let mut team_rows: Vec<WeeklyTeamStanding> = team_ranks
                .iter()
                .map(|(team_id, rank)| WeeklyTeamStanding { week, team_id: team_id.clone(), rank: *rank })
                .collect();
            team_rows.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.team_id.cmp(&b.team_id)));
            weekly_team_standings.extend(team_rows);

            let scores: Vec<(UserId, PredictionScore)> = entrants
                .iter()
                .map(|e| (e.user.id.clone(), score_prediction(e.rankings, &team_ranks)))
                .collect();
            let standings = Self::rank_users(&entrants, &scores);

            for standing in &standings {
                if let Some(track) = tracks.get_mut(&standing.user_id) {
                    track.entries.push(HistoryEntry {
                        week,
                        score: standing.score,
                        rank: standing.rank,
                    });
                }
            }

            debug!(
                "Week {}: ranked {} teams and {} users",
                week,
                team_ranks.len(),
                standings.len()
            );

            final_standings = standings;
            final_ranks = team_ranks;
            final_scores = scores;
        }

        let latest_week = weeks.last().copied().unwrap_or(BASELINE_WEEK);
        let final_table = calculate_standings(inputs.teams, known_matches.iter().copied(), latest_week);
        let current_standings = final_table.current_standings(&final_ranks);

        let recent_results = inputs
            .teams
            .iter()
            .map(|team| recent_form(&team.id, known_matches.iter().copied(), latest_week))
            .collect();

        let player_team_scores = final_scores
            .into_iter()
            .flat_map(|(user_id, score)| {
                score.breakdown.into_iter().map(move |c| PlayerTeamScore {
                    user_id: user_id.clone(),
                    team_id: c.team_id,
                    predicted_position: c.predicted_position,
                    actual_position: c.actual_position,
                    points: c.points,
                })
            })
            .collect();

        info!(
            "Replayed {} weeks (latest {}) for {} ranked users with {} warnings",
            weeks.len(),
            latest_week,
            tracks.len(),
            warnings.len()
        );

        SeasonHistory {
            weeks,
            tracks: tracks.into_values().collect(),
            final_standings,
            current_standings,
            weekly_team_standings,
            recent_results,
            player_team_scores,
            warnings,
        }
    }

    /// Pair users with complete predictions, reporting everything skipped
    fn entrants<'a>(inputs: &HistoryInputs<'a>, warnings: &mut Vec<LeagueWarning>) -> Vec<Entrant<'a>> {
        let users: HashMap<&str, &User> = inputs.users.iter().map(|u| (u.id.as_str(), u)).collect();
        let team_ids: HashSet<&str> = inputs.teams.iter().map(|t| t.id.as_str()).collect();
        let mut entrants = Vec::new();

        for prediction in inputs.predictions {
            let Some(user) = users.get(prediction.user_id.as_str()) else {
                let warning = LeagueWarning::missing_reference(
                    format!("prediction {}", prediction.user_id),
                    &prediction.user_id,
                );
                warn!("{}", warning);
                warnings.push(warning);
                continue;
            };

            if !prediction.is_complete() {
                let warning = LeagueWarning::IncompletePrediction {
                    user_id: prediction.user_id.clone(),
                    entries: prediction.rankings.len(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                continue;
            }

            for team_id in prediction.rankings.iter().filter(|id| !team_ids.contains(id.as_str())) {
                let warning = LeagueWarning::missing_reference(
                    format!("prediction {}", prediction.user_id),
                    team_id,
                );
                warn!("{}", warning);
                warnings.push(warning);
            }

            entrants.push(Entrant { user: *user, rankings: &prediction.rankings });
        }

        entrants.sort_by(|a, b| a.user.id.cmp(&b.user.id));
        entrants
    }

    fn rank_users(entrants: &[Entrant<'_>], scores: &[(UserId, PredictionScore)]) -> Vec<UserStanding> {
        let by_user: HashMap<&str, &Entrant<'_>> =
            entrants.iter().map(|e| (e.user.id.as_str(), e)).collect();

        let keyed: Vec<(UserId, (i32, bool), (String, UserId))> = scores
            .iter()
            .filter_map(|(user_id, score)| {
                let entrant = by_user.get(user_id.as_str())?;
                let key = (score.total, entrant.user.is_pro);
                Some((user_id.clone(), key, (entrant.user.name.clone(), user_id.clone())))
            })
            .collect();
        let totals: HashMap<&str, i32> =
            scores.iter().map(|(id, score)| (id.as_str(), score.total)).collect();

        competition_rank(keyed)
            .into_iter()
            .filter_map(|entry| {
                let entrant = by_user.get(entry.id.as_str())?;
                Some(UserStanding {
                    user_id: entry.id.clone(),
                    name: entrant.user.name.clone(),
                    is_pro: entrant.user.is_pro,
                    score: totals.get(entry.id.as_str()).copied().unwrap_or_default(),
                    rank: entry.rank,
                    position: entry.position,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BaselineEntry;

    fn season(baseline: &[(&str, u32)]) -> SeasonConfig {
        SeasonConfig {
            baseline: baseline.iter().map(|(name, rank)| BaselineEntry::new(name, *rank)).collect(),
            promoted_teams: 0,
            ..Default::default()
        }
    }

    /// 20 teams t01..t20 named "Team 01".."Team 20"
    fn twenty_teams() -> Vec<Team> {
        (1..=20).map(|i| Team::new(format!("t{i:02}"), format!("Team {i:02}"))).collect()
    }

    fn ordered_prediction(user_id: &str, teams: &[Team]) -> Prediction {
        Prediction::new(user_id, teams.iter().map(|t| t.id.clone()).collect())
    }

    fn baseline_for(teams: &[Team]) -> Vec<(String, u32)> {
        teams.iter().enumerate().map(|(i, t)| (t.name.clone(), i as u32 + 1)).collect()
    }

    fn season_for(teams: &[Team]) -> SeasonConfig {
        let rows = baseline_for(teams);
        let refs: Vec<(&str, u32)> = rows.iter().map(|(n, r)| (n.as_str(), *r)).collect();
        season(&refs)
    }

    #[test]
    fn test_baseline_only_season() {
        let teams = twenty_teams();
        let users = vec![User::new("u1", "Una", false)];
        let predictions = vec![ordered_prediction("u1", &teams)];
        let season = season_for(&teams);

        let history = HistoryBuilder::new().build(HistoryInputs {
            teams: &teams,
            matches: &[],
            users: &users,
            predictions: &predictions,
            season: &season,
        });

        assert_eq!(history.weeks, vec![0]);
        assert_eq!(history.tracks[0].entries, vec![HistoryEntry { week: 0, score: 100, rank: 1 }]);
        assert_eq!(history.current_standings.len(), 20);
        assert_eq!(history.current_standings[0].team_id, "t01");
        assert_eq!(history.current_standings[0].rank, 1);
        assert_eq!(history.player_team_scores.len(), 20);
        assert_eq!(history.weekly_team_standings.len(), 20);
        assert!(history.warnings.is_empty());
    }

    #[test]
    fn test_weeks_follow_played_fixtures() {
        let teams = twenty_teams();
        let matches = vec![
            Match::played(1, "t20", "t01", 3, 0),
            Match::scheduled(2, "t02", "t03"),
            Match::played(4, "t02", "t03", 1, 1),
        ];
        let users = vec![User::new("u1", "Una", false), User::new("u2", "Vic", true)];
        let mut reversed = ordered_prediction("u2", &teams);
        reversed.rankings.reverse();
        let predictions = vec![ordered_prediction("u1", &teams), reversed];
        let season = season_for(&teams);

        let history = HistoryBuilder::new().build(HistoryInputs {
            teams: &teams,
            matches: &matches,
            users: &users,
            predictions: &predictions,
            season: &season,
        });

        assert_eq!(history.weeks, vec![0, 1, 4]);
        assert_eq!(history.latest_week(), 4);
        for track in &history.tracks {
            let weeks: Vec<Week> = track.entries.iter().map(|e| e.week).collect();
            assert_eq!(weeks, vec![0, 1, 4]);
        }
        assert_eq!(history.weekly_team_standings.len(), 60);

        let t20 = history.current_standings.iter().find(|s| s.team_id == "t20").unwrap();
        assert_eq!((t20.points, t20.rank), (3, 1));
        assert_eq!(history.summaries().len(), 2);

        let reranked = rank_tracks(&history.tracks, history.latest_week());
        assert_eq!(reranked, history.final_standings);
    }

    #[test]
    fn test_skipped_records_are_reported() {
        let teams = twenty_teams();
        let matches = vec![Match::played(1, "t01", "ghost", 1, 0)];
        let users = vec![User::new("u1", "Una", false), User::new("u2", "Vic", false)];
        let mut short = ordered_prediction("u2", &teams);
        short.rankings.pop();
        let predictions = vec![
            ordered_prediction("u1", &teams),
            short,
            ordered_prediction("nobody", &teams),
        ];
        let season = season_for(&teams);

        let history = HistoryBuilder::new().build(HistoryInputs {
            teams: &teams,
            matches: &matches,
            users: &users,
            predictions: &predictions,
            season: &season,
        });

        assert_eq!(history.weeks, vec![0]);
        assert_eq!(history.tracks.len(), 1);
        assert_eq!(history.tracks[0].user_id, "u1");
        assert!(history
            .warnings
            .contains(&LeagueWarning::IncompletePrediction { user_id: "u2".into(), entries: 19 }));
        assert!(history
            .warnings
            .contains(&LeagueWarning::missing_reference("match 1_t01_ghost", "ghost")));
        assert!(history
            .warnings
            .contains(&LeagueWarning::missing_reference("prediction nobody", "nobody")));
    }
}
