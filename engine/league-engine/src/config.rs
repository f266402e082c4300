//! Season layout and prize fund settings

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{LeagueError, Result};
use crate::models::{AwardPeriod, Week};

/// Static season layout: award calendar and prior-season baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonConfig {
    /// Last gameweek of the season
    pub final_week: Week,

    /// Number of teams expected to be missing from the baseline
    pub promoted_teams: usize,

    /// Most-improved award windows
    pub award_periods: Vec<AwardPeriod>,

    /// Prior-season final table, used as the week 0 team ranks
    pub baseline: Vec<BaselineEntry>,
}

/// One row of the prior-season table, keyed by team name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub team: String,
    pub rank: u32,
}

impl BaselineEntry {
    pub fn new(team: &str, rank: u32) -> Self {
        Self { team: team.to_string(), rank }
    }
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            final_week: 38,
            promoted_teams: 3,
            award_periods: vec![
                AwardPeriod::new("aug", "August", 0, 3),
                AwardPeriod::new("sep", "September", 3, 6),
                AwardPeriod::new("oct", "October", 6, 9),
                AwardPeriod::new("nov", "November", 9, 12),
                AwardPeriod::new("dec", "December", 12, 18),
                AwardPeriod::new("christmas", "Christmas Special", 16, 20),
                AwardPeriod::new("jan", "January", 18, 22),
                AwardPeriod::new("feb", "February", 22, 26),
                AwardPeriod::new("mar", "March", 26, 30),
                AwardPeriod::new("apr", "April", 30, 34),
                AwardPeriod::new("may", "May", 34, 38),
            ],
            baseline: vec![
                BaselineEntry::new("Manchester City", 1),
                BaselineEntry::new("Arsenal", 2),
                BaselineEntry::new("Liverpool", 3),
                BaselineEntry::new("Aston Villa", 4),
                BaselineEntry::new("Tottenham Hotspur", 5),
                BaselineEntry::new("Chelsea", 6),
                BaselineEntry::new("Newcastle United", 7),
                BaselineEntry::new("Manchester United", 8),
                BaselineEntry::new("West Ham United", 9),
                BaselineEntry::new("Crystal Palace", 10),
                BaselineEntry::new("Brighton & Hove Albion", 11),
                BaselineEntry::new("AFC Bournemouth", 12),
                BaselineEntry::new("Fulham", 13),
                BaselineEntry::new("Wolverhampton Wanderers", 14),
                BaselineEntry::new("Everton", 15),
                BaselineEntry::new("Brentford", 16),
                BaselineEntry::new("Nottingham Forest", 17),
                BaselineEntry::new("Luton Town", 18),
                BaselineEntry::new("Burnley", 19),
                BaselineEntry::new("Sheffield United", 20),
            ],
        }
    }
}

impl SeasonConfig {
    /// Reject award periods that are inverted, duplicated or past the season end
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for period in &self.award_periods {
            if period.start_week > period.end_week || period.end_week > self.final_week {
                return Err(LeagueError::InvalidAwardPeriod {
                    id: period.id.clone(),
                    start_week: period.start_week,
                    end_week: period.end_week,
                });
            }
            if !seen.insert(period.id.as_str()) {
                return Err(LeagueError::DuplicateAwardPeriod(period.id.clone()));
            }
        }
        Ok(())
    }
}

/// Largest number of paid seasonal places
pub const MAX_PAID_PLACES: u32 = 100;

/// Largest multiplier between neighbouring paid places
pub const MAX_PLACE_GROWTH: u32 = 10;

/// Prize fund parameters. All amounts are in pounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrizeConfig {
    pub total_pool: Decimal,
    pub monthly_winner_prize: Decimal,
    pub monthly_runner_up_prize: Decimal,

    /// Fixed amount removed from the pool before seasonal prizes
    pub special_deduction: Decimal,

    pub bounty_per_slayer: Decimal,
    pub bounty_cap: Decimal,

    /// Share of the net fund paid to the last paid place
    pub tenth_place_fraction: Decimal,

    /// Multiplier from one paid place to the next place up
    pub place_growth: Decimal,

    pub paid_places: u32,

    /// A slayer must finish strictly below this rank
    pub slayer_rank_threshold: u32,
}

impl Default for PrizeConfig {
    fn default() -> Self {
        Self {
            total_pool: Decimal::from(1500),
            monthly_winner_prize: Decimal::from(30),
            monthly_runner_up_prize: Decimal::from(10),
            special_deduction: Decimal::from(50),
            bounty_per_slayer: Decimal::from(5),
            bounty_cap: Decimal::from(50),
            tenth_place_fraction: Decimal::new(3, 2),
            place_growth: Decimal::new(125, 2),
            paid_places: 10,
            slayer_rank_threshold: 10,
        }
    }
}

impl PrizeConfig {
    pub fn validate(&self) -> Result<()> {
        let amounts = [
            ("total_pool", self.total_pool),
            ("monthly_winner_prize", self.monthly_winner_prize),
            ("monthly_runner_up_prize", self.monthly_runner_up_prize),
            ("special_deduction", self.special_deduction),
            ("bounty_per_slayer", self.bounty_per_slayer),
            ("bounty_cap", self.bounty_cap),
        ];
        if let Some((name, _)) = amounts.iter().find(|(_, value)| value.is_sign_negative()) {
            return Err(LeagueError::invalid_prize_config(format!("{name} must not be negative")));
        }

        if self.tenth_place_fraction <= Decimal::ZERO || self.tenth_place_fraction >= Decimal::ONE {
            return Err(LeagueError::invalid_prize_config(
                "tenth_place_fraction must be between 0 and 1",
            ));
        }

        if self.place_growth <= Decimal::ZERO || self.place_growth > Decimal::from(MAX_PLACE_GROWTH) {
            return Err(LeagueError::invalid_prize_config(format!(
                "place_growth must be positive and at most {MAX_PLACE_GROWTH}"
            )));
        }

        if self.paid_places == 0 || self.paid_places > MAX_PAID_PLACES {
            return Err(LeagueError::invalid_prize_config(format!(
                "paid_places must be between 1 and {MAX_PAID_PLACES}"
            )));
        }

        let mut multiplier = Decimal::ONE;
        for _ in 1..self.paid_places {
            multiplier = multiplier.checked_mul(self.place_growth).ok_or_else(|| {
                LeagueError::invalid_prize_config("place_growth over paid_places exceeds the money range")
            })?;
        }

        Ok(())
    }

    /// Reject a fund that cannot cover its fixed deductions.
    ///
    /// Monthly prizes for every period, the special deduction and a full
    /// bounty must fit in the total pool, so allocation never runs dry.
    pub fn check_fund(&self, periods: usize) -> Result<()> {
        let monthly_pool =
            Decimal::from(periods) * (self.monthly_winner_prize + self.monthly_runner_up_prize);
        let deductions = monthly_pool + self.special_deduction + self.bounty_cap;
        if self.total_pool < deductions {
            return Err(LeagueError::PrizeFundExhausted {
                total_pool: self.total_pool.round_dp(2).to_string(),
                deductions: deductions.round_dp(2).to_string(),
            });
        }
        Ok(())
    }
}
