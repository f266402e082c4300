//! # Command Line Interface
//!
//! Operator commands for running a recalculation against a local data
//! directory and inspecting what it wrote.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use league_engine::{
    allocate_winnings, rank_tracks, MonthlyAward, User, UserHistory, UserTrack, BASELINE_WEEK,
};
use league_store::{create_local_store_with_config, DocumentStore};

use crate::codec::{collections, decode_documents, StoredUser};
use crate::config::{save_config, ServiceConfig};
use crate::orchestrator::{RecalcReport, RecalculationOrchestrator};

/// Prediction league recalculation tool
#[derive(Parser)]
#[command(name = "league-recalc")]
#[command(about = "Rebuild and inspect derived prediction league data")]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the store's data directory
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild every derived collection from matches and predictions
    Recalculate {
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the user leaderboard from the last recalculation
    Leaderboard {
        /// Number of rows to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show prize allocation for the stored standings
    Winnings,
    /// Print the effective configuration, or write it to a file
    Config {
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

/// CLI handler
pub struct CliHandler {
    config: ServiceConfig,
    store: Arc<dyn DocumentStore>,
}

impl CliHandler {
    pub async fn new(mut config: ServiceConfig, data_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = data_dir {
            config.store.data_dir = dir;
        }

        let mut store = create_local_store_with_config(config.store.clone())
            .context("Failed to open local store")?;
        store.initialize().await.context("Failed to initialize local store")?;

        Ok(Self { config, store: Arc::new(store) })
    }

    /// Handle CLI commands
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Recalculate { json } => self.recalculate(json).await,
            Commands::Leaderboard { limit } => self.leaderboard(limit).await,
            Commands::Winnings => self.winnings().await,
            Commands::Config { save } => self.show_config(save),
        }
    }

    async fn recalculate(&self, json: bool) -> Result<()> {
        let progress = Arc::new(|message: &str| println!("  {message}"));
        let orchestrator = RecalculationOrchestrator::new(self.store.clone(), &self.config)
            .with_progress(progress);

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received, cancelling at the next phase boundary");
                on_signal.cancel();
            }
        });

        let outcome = orchestrator.run(cancel).await;
        signal_task.abort();
        let report = outcome.context("Recalculation failed")?;

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }

    async fn leaderboard(&self, limit: usize) -> Result<()> {
        let documents = self.store.fetch_all(collections::USERS).await?;
        let (users, _): (Vec<StoredUser>, _) = decode_documents(collections::USERS, documents, Some("id"));

        let mut ranked: Vec<&StoredUser> = users.iter().filter(|u| u.rank.is_some()).collect();
        ranked.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.user.name.cmp(&b.user.name)));

        println!("{:>4}  {:<24} {:>6}", "Rank", "Name", "Score");
        println!("{}", "=".repeat(36));
        for user in ranked.into_iter().take(limit) {
            let pro = if user.user.is_pro { " (pro)" } else { "" };
            println!(
                "{:>4}  {:<24} {:>6}",
                user.rank.unwrap_or_default(),
                format!("{}{}", user.user.name, pro),
                user.score.unwrap_or_default()
            );
        }
        Ok(())
    }

    async fn winnings(&self) -> Result<()> {
        let (users, histories, awards) = tokio::try_join!(
            self.store.fetch_all(collections::USERS),
            self.store.fetch_all(collections::USER_HISTORIES),
            self.store.fetch_all(collections::MONTHLY_AWARDS),
        )?;
        let (users, _): (Vec<User>, _) = decode_documents(collections::USERS, users, Some("id"));
        let (histories, _): (Vec<UserHistory>, _) =
            decode_documents(collections::USER_HISTORIES, histories, Some("userId"));
        let (awards, _): (Vec<MonthlyAward>, _) = decode_documents(collections::MONTHLY_AWARDS, awards, None);

        let by_id: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();
        let tracks: Vec<UserTrack> = histories
            .into_iter()
            .filter_map(|history| {
                let user = by_id.get(history.user_id.as_str())?;
                Some(UserTrack {
                    user_id: history.user_id,
                    name: user.name.clone(),
                    is_pro: user.is_pro,
                    entries: history.weekly_scores,
                })
            })
            .collect();

        let latest_week = tracks
            .iter()
            .flat_map(|t| t.entries.iter().map(|e| e.week))
            .max()
            .unwrap_or(BASELINE_WEEK);
        let standings = rank_tracks(&tracks, latest_week);
        info!("Allocating winnings for {} users at week {}", standings.len(), latest_week);

        let report = allocate_winnings(&standings, &awards, &self.config.season.award_periods, &self.config.prizes)
            .context("Prize allocation failed")?;

        println!("Monthly pool: £{}", report.monthly_pool.round_dp(2));
        println!("Bounty pool:  £{}", report.bounty_pool.round_dp(2));
        println!("Net fund:     £{}", report.net_fund.round_dp(2));
        println!("{}", "=".repeat(52));
        println!("{:<24} {:>6} {:>6} {:>6} {:>7}", "User", "Season", "Month", "Bounty", "Total");

        let names: HashMap<&str, &str> = standings.iter().map(|s| (s.user_id.as_str(), s.name.as_str())).collect();
        for user in report.users.iter().map(|u| u.rounded()) {
            let name = names.get(user.user_id.as_str()).copied().unwrap_or(user.user_id.as_str());
            println!(
                "{:<24} {:>6} {:>6} {:>6} {:>7}",
                name, user.seasonal, user.monthly, user.bounty, user.total
            );
        }
        Ok(())
    }

    fn show_config(&self, save: Option<PathBuf>) -> Result<()> {
        match save {
            Some(path) => {
                save_config(&self.config, &path)?;
                println!("Configuration written to {}", path.display());
            }
            None => println!("{}", toml::to_string_pretty(&self.config)?),
        }
        Ok(())
    }
}

fn print_report(report: &RecalcReport) {
    println!("Recalculation complete in {}ms", report.elapsed().num_milliseconds());
    println!("{}", "=".repeat(40));
    println!("Weeks processed:   {}", report.weeks_processed.len());
    println!("Latest week:       {}", report.latest_week);
    println!("Users ranked:      {}", report.users_ranked);
    println!("Awards:            {} (previously {})", report.awards.len(), report.previous_awards);
    println!("Documents written: {}", report.documents_written);
    println!("Documents deleted: {}", report.documents_deleted);

    if !report.warnings.is_empty() {
        println!("\nWarnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }
}
