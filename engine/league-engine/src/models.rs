//! Typed league records
//!
//! Field names on the wire are camelCase, matching the documents held by the
//! hosted store. Score sentinels (`-1` not played, `-2` postponed) only exist
//! at the serde boundary; in memory a fixture carries a [`MatchStatus`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LeagueError;

pub type TeamId = String;
pub type UserId = String;
pub type Week = u32;

/// Week number of the pre-season baseline
pub const BASELINE_WEEK: Week = 0;

/// Number of teams a complete prediction ranks
pub const PREDICTION_LENGTH: usize = 20;

/// Wire sentinel for a fixture that has not been played
pub const SCORE_NOT_PLAYED: i32 = -1;

/// Wire sentinel for a postponed fixture
pub const SCORE_POSTPONED: i32 = -2;

/// A league team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Team {
    pub fn new(id: impl Into<TeamId>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), short_name: None, logo_url: None }
    }
}

/// Outcome state of a fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Played { home: u32, away: u32 },
    Scheduled,
    Postponed,
}

/// A fixture, keyed by `{week}_{home}_{away}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MatchRecord", into = "MatchRecord")]
pub struct Match {
    pub week: Week,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub status: MatchStatus,
    pub match_date: Option<DateTime<Utc>>,
}

impl Match {
    pub fn played(
        week: Week,
        home_team_id: impl Into<TeamId>,
        away_team_id: impl Into<TeamId>,
        home: u32,
        away: u32,
    ) -> Self {
        Self {
            week,
            home_team_id: home_team_id.into(),
            away_team_id: away_team_id.into(),
            status: MatchStatus::Played { home, away },
            match_date: None,
        }
    }

    pub fn scheduled(
        week: Week,
        home_team_id: impl Into<TeamId>,
        away_team_id: impl Into<TeamId>,
    ) -> Self {
        Self {
            week,
            home_team_id: home_team_id.into(),
            away_team_id: away_team_id.into(),
            status: MatchStatus::Scheduled,
            match_date: None,
        }
    }

    /// Composite document id
    pub fn id(&self) -> String {
        format!("{}_{}_{}", self.week, self.home_team_id, self.away_team_id)
    }

    pub fn is_played(&self) -> bool {
        matches!(self.status, MatchStatus::Played { .. })
    }

    /// Goals as `(home, away)` when the match has been played
    pub fn score(&self) -> Option<(u32, u32)> {
        match self.status {
            MatchStatus::Played { home, away } => Some((home, away)),
            _ => None,
        }
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }
}

/// Wire shape of a fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchRecord {
    week: Week,
    home_team_id: TeamId,
    away_team_id: TeamId,
    #[serde(default = "not_played")]
    home_score: i32,
    #[serde(default = "not_played")]
    away_score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_date: Option<DateTime<Utc>>,
}

fn not_played() -> i32 {
    SCORE_NOT_PLAYED
}

impl TryFrom<MatchRecord> for Match {
    type Error = LeagueError;

    fn try_from(record: MatchRecord) -> Result<Self, Self::Error> {
        let status = match (record.home_score, record.away_score) {
            (home, away) if home >= 0 && away >= 0 => {
                MatchStatus::Played { home: home as u32, away: away as u32 }
            }
            (SCORE_POSTPONED, _) | (_, SCORE_POSTPONED) => MatchStatus::Postponed,
            (home, away)
                if (home >= 0 || home == SCORE_NOT_PLAYED)
                    && (away >= 0 || away == SCORE_NOT_PLAYED) =>
            {
                MatchStatus::Scheduled
            }
            (home, away) => {
                return Err(LeagueError::invalid_match(format!(
                    "week {} {} v {}: unknown score sentinel {}-{}",
                    record.week, record.home_team_id, record.away_team_id, home, away
                )));
            }
        };

        Ok(Match {
            week: record.week,
            home_team_id: record.home_team_id,
            away_team_id: record.away_team_id,
            status,
            match_date: record.match_date,
        })
    }
}

impl From<Match> for MatchRecord {
    fn from(m: Match) -> Self {
        let (home_score, away_score) = match m.status {
            MatchStatus::Played { home, away } => (home as i32, away as i32),
            MatchStatus::Scheduled => (SCORE_NOT_PLAYED, SCORE_NOT_PLAYED),
            MatchStatus::Postponed => (SCORE_POSTPONED, SCORE_POSTPONED),
        };
        MatchRecord {
            week: m.week,
            home_team_id: m.home_team_id,
            away_team_id: m.away_team_id,
            home_score,
            away_score,
            match_date: m.match_date,
        }
    }
}

/// A user's predicted final table, index 0 = predicted champion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub user_id: UserId,
    #[serde(default)]
    pub rankings: Vec<TeamId>,
}

impl Prediction {
    pub fn new(user_id: impl Into<UserId>, rankings: Vec<TeamId>) -> Self {
        Self { user_id: user_id.into(), rankings }
    }

    pub fn is_complete(&self) -> bool {
        self.rankings.len() == PREDICTION_LENGTH
    }
}

/// A league participant. Derived score fields live in [`UserSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_pro: bool,
}

impl User {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, is_pro: bool) -> Self {
        Self { id: id.into(), name: name.into(), avatar: None, is_pro }
    }
}

/// One week of a user's season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub week: Week,
    pub score: i32,
    pub rank: u32,
}

/// Stored week-by-week series for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHistory {
    pub user_id: UserId,
    pub weekly_scores: Vec<HistoryEntry>,
}

/// Derived score fields merged into a user document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub score: i32,
    pub rank: u32,
    pub previous_score: Option<i32>,
    pub previous_rank: Option<u32>,
    pub score_change: Option<i32>,
    /// Places climbed since the previous played week (negative = dropped)
    pub rank_change: Option<i64>,
    pub highest_score: i32,
    pub lowest_score: i32,
    /// Best (numerically lowest) rank of the season
    pub highest_rank: u32,
    /// Worst (numerically highest) rank of the season
    pub lowest_rank: u32,
}

/// Current league table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStanding {
    pub team_id: TeamId,
    pub team_name: String,
    pub points: u32,
    pub games_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
    pub rank: u32,
}

/// A team's rank at the end of one week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTeamStanding {
    pub week: Week,
    pub team_id: TeamId,
    pub rank: u32,
}

impl WeeklyTeamStanding {
    pub fn id(&self) -> String {
        format!("{}_{}", self.week, self.team_id)
    }
}

/// Single result in a form guide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormResult {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "L")]
    Loss,
    #[serde(rename = "-")]
    Empty,
}

impl fmt::Display for FormResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            FormResult::Win => "W",
            FormResult::Draw => "D",
            FormResult::Loss => "L",
            FormResult::Empty => "-",
        };
        f.write_str(c)
    }
}

/// Last six results of a team, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecentResult {
    pub team_id: TeamId,
    pub form: Vec<FormResult>,
}

/// Points one user earned from one team in the final processed week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTeamScore {
    pub user_id: UserId,
    pub team_id: TeamId,
    pub predicted_position: u32,
    pub actual_position: u32,
    pub points: i32,
}

impl PlayerTeamScore {
    pub fn id(&self) -> String {
        format!("{}_{}", self.user_id, self.team_id)
    }
}

/// Static scoring window for the most-improved award
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardPeriod {
    pub id: String,
    pub label: String,
    pub start_week: Week,
    pub end_week: Week,
}

impl AwardPeriod {
    pub fn new(id: &str, label: &str, start_week: Week, end_week: Week) -> Self {
        Self { id: id.to_string(), label: label.to_string(), start_week, end_week }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AwardType {
    #[serde(rename = "winner")]
    Winner,
    #[serde(rename = "runner-up")]
    RunnerUp,
}

/// A resolved most-improved award
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAward {
    pub period_id: String,
    pub label: String,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub award_type: AwardType,
    pub improvement: i32,
    pub start_score: i32,
    pub end_score: i32,
}

impl MonthlyAward {
    pub fn id(&self) -> String {
        match self.award_type {
            AwardType::Winner => format!("{}_{}", self.period_id, self.user_id),
            AwardType::RunnerUp => format!("{}_{}_runner-up", self.period_id, self.user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_match_sentinels_decode() {
        let played: Match = serde_json::from_value(json!({
            "week": 3, "homeTeamId": "ars", "awayTeamId": "che", "homeScore": 2, "awayScore": 0
        }))
        .unwrap();
        assert_eq!(played.status, MatchStatus::Played { home: 2, away: 0 });
        assert_eq!(played.id(), "3_ars_che");

        let postponed: Match = serde_json::from_value(json!({
            "week": 4, "homeTeamId": "ars", "awayTeamId": "che", "homeScore": -2, "awayScore": -2
        }))
        .unwrap();
        assert_eq!(postponed.status, MatchStatus::Postponed);

        let scheduled: Match = serde_json::from_value(json!({
            "week": 5, "homeTeamId": "ars", "awayTeamId": "che"
        }))
        .unwrap();
        assert_eq!(scheduled.status, MatchStatus::Scheduled);
        assert!(!scheduled.is_played());
    }

    #[test]
    fn test_match_rejects_unknown_sentinel() {
        let result: Result<Match, _> = serde_json::from_value(json!({
            "week": 3, "homeTeamId": "ars", "awayTeamId": "che", "homeScore": -7, "awayScore": 1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_match_encodes_sentinels() {
        let value = serde_json::to_value(Match::scheduled(1, "ars", "che")).unwrap();
        assert_eq!(value["homeScore"], -1);
        assert_eq!(value["awayScore"], -1);
        assert!(value.get("matchDate").is_none());
    }

    #[test]
    fn test_award_ids() {
        let mut award = MonthlyAward {
            period_id: "oct".into(),
            label: "October".into(),
            user_id: "u1".into(),
            award_type: AwardType::Winner,
            improvement: 12,
            start_score: 40,
            end_score: 52,
        };
        assert_eq!(award.id(), "oct_u1");
        award.award_type = AwardType::RunnerUp;
        assert_eq!(award.id(), "oct_u1_runner-up");

        let value = serde_json::to_value(&award).unwrap();
        assert_eq!(value["type"], "runner-up");
    }

    #[test]
    fn test_form_result_serializes_as_letters() {
        let recent = TeamRecentResult {
            team_id: "ars".into(),
            form: vec![FormResult::Empty, FormResult::Win, FormResult::Draw, FormResult::Loss],
        };
        let value = serde_json::to_value(&recent).unwrap();
        assert_eq!(value["form"], json!(["-", "W", "D", "L"]));
    }
}
