//! Prize money allocation
//!
//! Three sources are tracked per user: seasonal places, monthly awards and
//! the pro-slayer bounty. Amounts are exact decimals; rounding to pennies is
//! left to whoever displays or stores them.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PrizeConfig;
use crate::error::{LeagueError, Result};
use crate::history::UserStanding;
use crate::models::{AwardPeriod, AwardType, MonthlyAward, UserId};

/// One user's share of the prize fund
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWinnings {
    pub user_id: UserId,
    pub seasonal: Decimal,
    pub monthly: Decimal,
    pub bounty: Decimal,
    pub total: Decimal,
}

impl UserWinnings {
    fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            seasonal: Decimal::ZERO,
            monthly: Decimal::ZERO,
            bounty: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    /// Copy with every amount rounded to pennies
    pub fn rounded(&self) -> Self {
        Self {
            user_id: self.user_id.clone(),
            seasonal: self.seasonal.round_dp(2),
            monthly: self.monthly.round_dp(2),
            bounty: self.bounty.round_dp(2),
            total: self.total.round_dp(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinningsReport {
    pub monthly_pool: Decimal,
    pub bounty_pool: Decimal,
    pub net_fund: Decimal,
    /// Prize for each paid place, index 0 = first place
    pub place_prizes: Vec<Decimal>,
    pub slayers: Vec<UserId>,
    /// Per-user amounts in final standings order
    pub users: Vec<UserWinnings>,
}

impl WinningsReport {
    pub fn get(&self, user_id: &str) -> Option<&UserWinnings> {
        self.users.iter().find(|w| w.user_id == user_id)
    }
}

/// Prize for each paid place, first place first.
///
/// The last paid place receives `net_fund * tenth_place_fraction`; every
/// place above it receives `place_growth` times the place below.
pub fn place_prizes(net_fund: Decimal, prizes: &PrizeConfig) -> Vec<Decimal> {
    let mut amounts = Vec::with_capacity(prizes.paid_places as usize);
    let mut current = net_fund * prizes.tenth_place_fraction;
    for _ in 0..prizes.paid_places {
        amounts.push(current);
        current = current.checked_mul(prizes.place_growth).unwrap_or(Decimal::MAX);
    }
    amounts.reverse();
    amounts
}

/// Allocate the prize fund over the final standings.
///
/// `standings` must be in final order (pro rule applied), as produced by the
/// history builder.
pub fn allocate_winnings(
    standings: &[UserStanding],
    awards: &[MonthlyAward],
    periods: &[AwardPeriod],
    prizes: &PrizeConfig,
) -> Result<WinningsReport> {
    let mut users: Vec<UserWinnings> = standings.iter().map(|s| UserWinnings::new(&s.user_id)).collect();
    let mut index: HashMap<UserId, usize> =
        standings.iter().enumerate().map(|(i, s)| (s.user_id.clone(), i)).collect();

    // Monthly awards: each prize split evenly among the users sharing it.
    let mut recipients: BTreeMap<(&str, AwardType), Vec<&str>> = BTreeMap::new();
    for award in awards {
        recipients
            .entry((award.period_id.as_str(), award.award_type))
            .or_default()
            .push(award.user_id.as_str());
    }
    for ((_, award_type), user_ids) in &recipients {
        let prize = match award_type {
            AwardType::Winner => prizes.monthly_winner_prize,
            AwardType::RunnerUp => prizes.monthly_runner_up_prize,
        };
        let share = prize / Decimal::from(user_ids.len());
        for user_id in user_ids {
            let slot = *index.entry(user_id.to_string()).or_insert_with(|| {
                users.push(UserWinnings::new(user_id));
                users.len() - 1
            });
            users[slot].monthly += share;
        }
    }

    // Pro-slayer bounty
    let best_pro = standings.iter().filter(|s| s.is_pro).map(|s| s.score).max();
    let slayers: Vec<UserId> = match best_pro {
        Some(best_pro) => standings
            .iter()
            .filter(|s| !s.is_pro && s.score > best_pro && s.rank > prizes.slayer_rank_threshold)
            .map(|s| s.user_id.clone())
            .collect(),
        None => Vec::new(),
    };
    let bounty_pool = if slayers.is_empty() {
        Decimal::ZERO
    } else {
        (prizes.bounty_per_slayer * Decimal::from(slayers.len())).min(prizes.bounty_cap)
    };
    if !slayers.is_empty() {
        let share = bounty_pool / Decimal::from(slayers.len());
        for user_id in &slayers {
            if let Some(slot) = index.get(user_id) {
                users[*slot].bounty += share;
            }
        }
    }

    // Seasonal places from whatever remains of the fund
    let monthly_pool = Decimal::from(periods.len())
        * (prizes.monthly_winner_prize + prizes.monthly_runner_up_prize);
    let deductions = monthly_pool + prizes.special_deduction + bounty_pool;
    let net_fund = prizes.total_pool - deductions;
    if net_fund.is_sign_negative() && !net_fund.is_zero() {
        return Err(LeagueError::PrizeFundExhausted {
            total_pool: prizes.total_pool.round_dp(2).to_string(),
            deductions: deductions.round_dp(2).to_string(),
        });
    }

    let place_amounts = place_prizes(net_fund, prizes);
    let mut groups: BTreeMap<u32, Vec<&UserStanding>> = BTreeMap::new();
    for standing in standings.iter().filter(|s| !s.is_pro) {
        groups.entry(standing.rank).or_default().push(standing);
    }
    for members in groups.values() {
        let pot: Decimal = members
            .iter()
            .filter_map(|s| place_amounts.get((s.position as usize).checked_sub(1)?))
            .copied()
            .sum();
        if pot.is_zero() {
            continue;
        }
        let share = pot / Decimal::from(members.len());
        for member in members {
            if let Some(slot) = index.get(&member.user_id) {
                users[*slot].seasonal += share;
            }
        }
    }

    for user in &mut users {
        user.total = user.seasonal + user.monthly + user.bounty;
    }

    debug!(
        "Allocated prize fund: net {} monthly {} bounty {} across {} slayers",
        net_fund,
        monthly_pool,
        bounty_pool,
        slayers.len()
    );

    Ok(WinningsReport {
        monthly_pool,
        bounty_pool,
        net_fund,
        place_prizes: place_amounts,
        slayers,
        users,
    })
}
