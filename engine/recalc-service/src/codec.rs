//! Typed views over store documents
//!
//! Documents are decoded into engine records on read. A document that does
//! not fit its record is quarantined: it is left out and reported as a
//! `MalformedDocument` warning.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use league_engine::{LeagueWarning, User};
use league_store::Document;

/// Collection names in the document store
pub mod collections {
    pub const TEAMS: &str = "teams";
    pub const MATCHES: &str = "matches";
    pub const USERS: &str = "users";
    pub const PREDICTIONS: &str = "predictions";

    pub const STANDINGS: &str = "standings";
    pub const WEEKLY_TEAM_STANDINGS: &str = "weeklyTeamStandings";
    pub const TEAM_RECENT_RESULTS: &str = "teamRecentResults";
    pub const PLAYER_TEAM_SCORES: &str = "playerTeamScores";
    pub const USER_HISTORIES: &str = "userHistories";
    pub const MONTHLY_AWARDS: &str = "monthlyMimoM";
    pub const WINNINGS: &str = "winnings";

    /// Collections rebuilt from scratch on every recalculation
    pub const DERIVED: [&str; 7] = [
        STANDINGS,
        WEEKLY_TEAM_STANDINGS,
        TEAM_RECENT_RESULTS,
        PLAYER_TEAM_SCORES,
        USER_HISTORIES,
        MONTHLY_AWARDS,
        WINNINGS,
    ];
}

/// A user document together with the derived score fields, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub rank: Option<u32>,
}

/// Decode every document of a collection.
///
/// When `id_field` is given and the body lacks it, the document id is
/// copied into that field before decoding.
pub fn decode_documents<T>(
    collection: &str,
    documents: Vec<Document>,
    id_field: Option<&str>,
) -> (Vec<T>, Vec<LeagueWarning>)
where
    T: DeserializeOwned,
{
    let mut records = Vec::with_capacity(documents.len());
    let mut warnings = Vec::new();

    for Document { id, mut data } in documents {
        if let (Some(field), Value::Object(body)) = (id_field, &mut data) {
            body.entry(field.to_string()).or_insert_with(|| Value::String(id.clone()));
        }

        match serde_json::from_value::<T>(data) {
            Ok(record) => records.push(record),
            Err(e) => {
                let warning = LeagueWarning::malformed(collection, id, e.to_string());
                warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }

    (records, warnings)
}

/// Encode a record as a document body
pub fn encode<T: Serialize>(record: &T) -> serde_json::Result<Value> {
    serde_json::to_value(record)
}
