use analytics::{FilterCriteria, StatisticsEngine, StatisticsSummary, TimeWindow};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{Config, LogFormat};
use core_types::{Direction, Outcome};
use database::{PoolSettings, TradeQuery};
use rust_decimal::Decimal;
use std::path::PathBuf;
use web_server::AppState;

/// The main entry point for the trading journal.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; settings may come from the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = configuration::load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    let _guard = configuration::init_tracing(&config.logging)?;

    match cli.command {
        Commands::Serve(args) => handle_serve(args, &config).await,
        Commands::Stats(args) => handle_stats(args, &config).await,
        Commands::Migrate => handle_migrate(&config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A trading journal: log trades, filter them, and review performance.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides the configured console log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the journal HTTP API.
    Serve(ServeArgs),
    /// Print performance statistics for the stored trades.
    Stats(StatsArgs),
    /// Apply pending database migrations and exit.
    Migrate,
}

#[derive(Parser)]
struct ServeArgs {
    /// Keep trades in memory instead of Postgres. Nothing survives a restart.
    #[arg(long)]
    in_memory: bool,
}

#[derive(Parser)]
struct StatsArgs {
    /// Case-insensitive substring of the instrument (e.g., "btc").
    #[arg(long)]
    instrument: Option<String>,

    /// LONG or SHORT.
    #[arg(long)]
    direction: Option<Direction>,

    /// WIN, LOSS or BREAKEVEN.
    #[arg(long)]
    outcome: Option<Outcome>,

    /// Earliest trade date to include (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest trade date to include (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Relative period: all, 7d, 30d, 90d or ytd.
    #[arg(long)]
    window: Option<TimeWindow>,
}

impl StatsArgs {
    fn into_criteria(self, today: NaiveDate) -> FilterCriteria {
        let criteria = FilterCriteria {
            direction: self.direction,
            outcome: self.outcome,
            instrument_substring: self.instrument,
            date_from: self.from,
            date_to: self.to,
            strategy_id: None,
        };
        match self.window {
            Some(window) => criteria.with_window(window, today),
            None => criteria,
        }
    }
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_serve(args: ServeArgs, config: &Config) -> anyhow::Result<()> {
    let state = if args.in_memory {
        tracing::warn!("Serving from the in-memory store; trades are lost on exit.");
        AppState::in_memory(database::MemoryStore::new())
    } else {
        AppState::connect(&config.database).await?
    };
    web_server::run_server(config, state).await
}

async fn handle_stats(args: StatsArgs, config: &Config) -> anyhow::Result<()> {
    let state = AppState::connect(&config.database).await?;
    let criteria = args.into_criteria(Utc::now().date_naive());
    tracing::debug!(?criteria, "Summarizing journal.");

    let trades = state
        .trades
        .list_trades(&TradeQuery::new(criteria).ascending())
        .await?;

    match StatisticsEngine::new().summarize(&trades).into_summary() {
        None => println!("No trades match the selected filters."),
        Some(summary) => {
            println!("{}", render_summary(&summary));
            if let Some(last) = summary.cumulative_equity().last() {
                println!("Equity after {}: {}", last.trade_date, last.profit_loss.round_dp(2));
            }
        }
    }
    Ok(())
}

async fn handle_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = database::connect(PoolSettings {
        max_connections: config.database.max_connections,
        acquire_timeout: config.database.acquire_timeout(),
    })
    .await?;
    database::run_migrations(&pool).await?;
    println!("Migrations applied.");
    Ok(())
}

fn render_summary(summary: &StatisticsSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);

    let money = |value: Decimal| value.round_dp(2).to_string();
    let rows = [
        ("Total trades", summary.total_trades.to_string()),
        ("Winning trades", summary.winning_trades.to_string()),
        ("Losing trades", summary.losing_trades.to_string()),
        ("Break-even trades", summary.break_even_trades.to_string()),
        ("Win rate", format!("{}%", summary.win_rate.round_dp(2))),
        ("Total P/L", money(summary.total_profit_loss)),
        ("Gross profit", money(summary.gross_profit)),
        ("Gross loss", money(summary.gross_loss)),
        ("Profit factor", summary.profit_factor.round_dp(2).to_string()),
        ("Avg P/L per trade", money(summary.avg_profit_per_trade)),
        ("Average win", money(summary.average_win)),
        ("Average loss", money(summary.average_loss)),
        ("Largest win", money(summary.largest_win)),
        ("Largest loss", money(summary.largest_loss)),
        ("Max drawdown", money(summary.max_drawdown)),
        ("Avg risk/reward", summary.avg_risk_reward_ratio.round_dp(2).to_string()),
        ("Avg execution rating", summary.avg_execution_rating.round_dp(2).to_string()),
    ];
    for (metric, value) in rows {
        table.add_row(vec![metric.to_string(), value]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stats_filters() {
        let cli = Cli::try_parse_from([
            "journal", "stats", "--direction", "long", "--outcome", "breakeven", "--window", "30d",
        ])
        .unwrap();
        let Commands::Stats(args) = cli.command else {
            panic!("expected the stats command");
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let criteria = args.into_criteria(today);
        assert_eq!(criteria.direction, Some(Direction::Long));
        assert_eq!(criteria.outcome, Some(Outcome::BreakEven));
        assert_eq!(criteria.date_from, NaiveDate::from_ymd_opt(2024, 3, 2));
        assert_eq!(criteria.date_to, Some(today));
    }

    #[test]
    fn serve_accepts_in_memory_and_global_options() {
        let cli = Cli::try_parse_from(["journal", "serve", "--in-memory", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert!(matches!(cli.command, Commands::Serve(ServeArgs { in_memory: true })));
    }
}
