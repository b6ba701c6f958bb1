//! Winloss CLI: trade outcome statistics from a trade-history file.
//!
//! Commands:
//! - `summary`: win/loss statistics at one loss threshold, optionally per cohort
//! - `simulate`: stop-loss threshold sweep with the reliability-gated optimum
//! - `expirations`: forensics for trades that expired unresolved
//! - `loss-patterns`: losing trades grouped by reason code
//! - `report`: every analysis, written as `report.json` plus CSV tables
//!
//! Tables go to stdout; logs go to stderr (`RUST_LOG` or `--verbose`).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use winloss_analysis::{
    aggregate_loss_patterns, analyze, analyze_expirations, save_artifacts, summarize,
    summarize_by, CohortKey, ExpirationReport, LossPattern, SimulationResult, SummaryReport,
    ThresholdSimulator,
};
use winloss_core::{load_trades, round1, AnalysisConfig, LossThreshold, TradeHistory};

#[derive(Parser)]
#[command(
    name = "winloss",
    about = "Winloss CLI: trade outcome statistics and stop-loss simulation"
)]
struct Cli {
    /// Print raw JSON instead of tables.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Trade history (.json, .jsonl or .csv).
    #[arg(long)]
    trades: PathBuf,

    /// Analysis config TOML. Defaults apply to anything it omits.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Win/loss statistics at one loss threshold.
    Summary {
        #[command(flatten)]
        input: Input,

        /// Loss threshold in percent. Defaults to the config value.
        #[arg(long)]
        threshold: Option<f64>,

        /// Break the summary down by one cohort tag.
        #[arg(long, value_enum)]
        by: Option<Cohort>,
    },
    /// Sweep stop-loss thresholds and pick the best reliable one.
    Simulate {
        #[command(flatten)]
        input: Input,

        /// Comma-separated thresholds (e.g. 0,1,2,5,10). Defaults to the config sweep.
        #[arg(long, value_delimiter = ',')]
        thresholds: Option<Vec<f64>>,

        /// Run the sweep on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Forensics for trades that expired before hitting target or stop.
    Expirations {
        #[command(flatten)]
        input: Input,
    },
    /// Losing trades grouped by reason code.
    LossPatterns {
        #[command(flatten)]
        input: Input,

        /// Loss threshold in percent. Defaults to the config value.
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Run every analysis and write report.json plus CSV tables.
    Report {
        #[command(flatten)]
        input: Input,

        /// Output directory.
        #[arg(long, default_value = "winloss-report")]
        output_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Cohort {
    Source,
    AssetType,
    Direction,
    HoldingPeriod,
}

impl From<Cohort> for CohortKey {
    fn from(c: Cohort) -> Self {
        match c {
            Cohort::Source => CohortKey::Source,
            Cohort::AssetType => CohortKey::AssetType,
            Cohort::Direction => CohortKey::Direction,
            Cohort::HoldingPeriod => CohortKey::HoldingPeriod,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    match cli.command {
        Commands::Summary {
            input,
            threshold,
            by,
        } => run_summary(&input, threshold, by, json),
        Commands::Simulate {
            input,
            thresholds,
            sequential,
        } => run_simulate(&input, thresholds, sequential, json),
        Commands::Expirations { input } => run_expirations(&input, json),
        Commands::LossPatterns { input, threshold } => run_loss_patterns(&input, threshold, json),
        Commands::Report { input, output_dir } => run_report(&input, &output_dir),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(input: &Input) -> Result<(TradeHistory, AnalysisConfig)> {
    let config = match &input.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    let history = load_trades(&input.trades)
        .with_context(|| format!("failed to load trades from {}", input.trades.display()))?;
    info!(
        trades = history.trades.len(),
        skipped = history.warnings.len(),
        "trade history loaded"
    );
    Ok((history, config))
}

fn threshold_or_default(threshold: Option<f64>, config: &AnalysisConfig) -> Result<LossThreshold> {
    let percent = threshold.unwrap_or(config.loss_threshold_percent);
    LossThreshold::new(percent).context("invalid --threshold")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}

// ─── Commands ───────────────────────────────────────────────────────

fn run_summary(input: &Input, threshold: Option<f64>, by: Option<Cohort>, json: bool) -> Result<()> {
    let (history, config) = load(input)?;
    let trades = history.trades;
    let threshold = threshold_or_default(threshold, &config)?;

    match by {
        None => {
            let report = summarize(&trades, threshold, &config);
            if json {
                return print_json(&report);
            }
            print_summary(&report);
        }
        Some(cohort) => {
            let key = CohortKey::from(cohort);
            let cohorts = summarize_by(&trades, threshold, &config, key);
            if json {
                return print_json(&cohorts);
            }
            println!("Loss threshold: {}%   by {}", round1(threshold.percent()), key);
            println!();
            println!(
                "{:<12} {:>7} {:>5} {:>5} {:>5} {:>7} {:>15} {:>8} {:>7} {:<6}",
                "Cohort", "Decided", "Wins", "Loss", "BE", "Win%", "95% CI", "Expect", "PF", "Rel"
            );
            println!("{}", "-".repeat(88));
            for c in &cohorts {
                let r = &c.report;
                println!(
                    "{:<12} {:>7} {:>5} {:>5} {:>5} {:>6.1}% {:>15} {:>+7.1}% {:>7} {:<6}",
                    c.cohort,
                    r.decided_trades,
                    r.wins,
                    r.losses,
                    r.breakeven,
                    r.win_rate,
                    format_ci(r),
                    r.expectancy,
                    r.profit_factor,
                    r.sample_reliability,
                );
            }
        }
    }
    Ok(())
}

fn run_simulate(
    input: &Input,
    thresholds: Option<Vec<f64>>,
    sequential: bool,
    json: bool,
) -> Result<()> {
    let (history, config) = load(input)?;
    let trades = history.trades;
    let thresholds = thresholds.unwrap_or_else(|| config.thresholds.clone());

    let result = ThresholdSimulator::new(&config)
        .with_parallelism(!sequential)
        .run(&trades, &thresholds)
        .context("invalid --thresholds")?;

    if json {
        return print_json(&result);
    }
    print_simulation(&result);
    Ok(())
}

fn run_expirations(input: &Input, json: bool) -> Result<()> {
    let (history, config) = load(input)?;
    let trades = history.trades;
    let report = analyze_expirations(&trades, &config.expiration);
    if json {
        return print_json(&report);
    }
    print_expirations(&report);
    Ok(())
}

fn run_loss_patterns(input: &Input, threshold: Option<f64>, json: bool) -> Result<()> {
    let (history, config) = load(input)?;
    let trades = history.trades;
    let threshold = threshold_or_default(threshold, &config)?;
    let patterns = aggregate_loss_patterns(&trades, threshold);
    if json {
        return print_json(&patterns);
    }
    print_loss_patterns(&patterns, threshold);
    Ok(())
}

fn run_report(input: &Input, output_dir: &Path) -> Result<()> {
    let (history, config) = load(input)?;
    let mut report = analyze(&history.trades, &config)?;
    report.merge_warnings(history.warnings);

    print_summary(&report.summary);
    println!();
    let written = save_artifacts(&report, output_dir)?;
    println!("Fingerprint: {}", report.input_fingerprint);
    println!("Artifacts saved to: {}", output_dir.display());
    for path in &written {
        println!("  {}", path.display());
    }
    if !report.warnings.is_empty() {
        eprintln!("{} record warning(s):", report.warnings.len());
        for w in &report.warnings {
            eprintln!("  {w}");
        }
    }
    Ok(())
}

// ─── Tables ─────────────────────────────────────────────────────────

fn format_ci(r: &SummaryReport) -> String {
    if r.win_rate_interval.is_insufficient() {
        return "n/a".to_string();
    }
    let ci = r.win_rate_interval.rounded();
    format!("{:.1}–{:.1}%", ci.lower, ci.upper)
}

fn print_summary(r: &SummaryReport) {
    println!("=== Summary @ {}% loss threshold ===", round1(r.loss_threshold_percent));
    println!(
        "Trades:         {} total, {} open, {} expired, {} excluded",
        r.total_trades, r.open, r.expired, r.excluded
    );
    println!(
        "Decided:        {} ({} wins, {} losses; {} breakeven not counted)",
        r.decided_trades, r.wins, r.losses, r.breakeven
    );
    if r.is_insufficient() {
        println!("Win rate:       insufficient data");
    } else {
        println!("Win rate:       {:.1}% (95% CI {})", r.win_rate, format_ci(r));
    }
    println!(
        "Avg win/loss:   {:+.1}% / {:+.1}%",
        r.avg_win_percent, r.avg_loss_percent
    );
    println!(
        "Max win/loss:   {:+.1}% / {:+.1}%",
        r.max_win_percent, r.max_loss_percent
    );
    println!("Profit factor:  {}", r.profit_factor);
    println!("Expectancy:     {:+.1}% per decided trade", r.expectancy);
    println!("Payoff ratio:   {:.2}", r.payoff_ratio);
    println!(
        "Streaks:        {} wins / {} losses",
        r.max_consecutive_wins, r.max_consecutive_losses
    );
    println!("Reliability:    {}", r.sample_reliability);
    println!();
    println!("{:<16} {:>6} {:>6} {:>6}", "Return", "Count", "Wins", "Losses");
    for b in &r.distribution {
        println!("{:<16} {:>6} {:>6} {:>6}", b.range, b.count, b.wins, b.losses);
    }
}

fn print_simulation(result: &SimulationResult) {
    println!(
        "{:>6} {:>7} {:>5} {:>5} {:>5} {:>7} {:>15} {:>8} {:>7} {:<6}",
        "Stop%", "Decided", "Wins", "Loss", "BE", "Win%", "95% CI", "Expect", "PF", "Rel"
    );
    println!("{}", "-".repeat(82));
    for p in &result.simulations {
        let s = &p.stats;
        let marker = match &result.optimal {
            Some(o) if o.threshold_percent == p.threshold_percent() => " *",
            _ => "",
        };
        println!(
            "{:>6.1} {:>7} {:>5} {:>5} {:>5} {:>6.1}% {:>15} {:>+7.1}% {:>7} {:<6}{}",
            p.threshold_percent(),
            s.decided_trades,
            s.wins,
            s.losses,
            s.breakeven,
            s.win_rate,
            format_ci(s),
            s.expectancy,
            s.profit_factor,
            s.sample_reliability,
            marker,
        );
    }
    println!();
    match &result.optimal {
        Some(o) => println!(
            "Optimal stop: {}%: {}",
            round1(o.threshold_percent),
            o.rationale
        ),
        None => println!(
            "Optimal stop: insufficient data (no threshold reached {} reliability)",
            result.min_reliability
        ),
    }
}

fn print_expirations(r: &ExpirationReport) {
    println!(
        "Expired: {} ({} analyzed, {} skipped)",
        r.total_expired, r.analyzed, r.skipped
    );
    if r.analyzed == 0 {
        return;
    }
    println!(
        "Almost hit target: {:.1}%   Very close: {:.1}%   Breached stop: {:.1}%   Avg progress: {:.1}%",
        r.almost_hit_target_percent,
        r.very_close_percent,
        r.would_have_hit_stop_percent,
        r.avg_progress_percent
    );

    for (title, cohorts) in [
        ("Holding period", &r.by_holding_period),
        ("Asset type", &r.by_asset_type),
    ] {
        println!();
        println!(
            "{:<14} {:>5} {:>8} {:>8} {:>8} {:>9}",
            title, "Count", "Almost%", "Close%", "Stop%", "Progress"
        );
        for c in cohorts {
            println!(
                "{:<14} {:>5} {:>7.1}% {:>7.1}% {:>7.1}% {:>8.1}%",
                c.cohort,
                c.count,
                c.almost_hit_target_percent,
                c.very_close_percent,
                c.would_have_hit_stop_percent,
                c.avg_progress_percent
            );
        }
    }

    if !r.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for rec in &r.recommendations {
            println!("  [{}] {}", rec.severity, rec.message);
        }
    }
}

fn print_loss_patterns(patterns: &[LossPattern], threshold: LossThreshold) {
    if patterns.is_empty() {
        println!("No losses at {}% threshold.", round1(threshold.percent()));
        return;
    }
    println!(
        "{:<20} {:>6} {:>8} {:>9} {:>9}",
        "Reason", "Count", "Share", "Avg loss", "Worst"
    );
    println!("{}", "-".repeat(56));
    for p in patterns {
        println!(
            "{:<20} {:>6} {:>7.1}% {:>8.1}% {:>8.1}%",
            p.reason, p.count, p.share_percent, p.avg_loss_percent, p.worst_loss_percent
        );
    }
}
