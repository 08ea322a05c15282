//! BarLab CLI — evaluate indicators over deterministic synthetic series.
//!
//! Commands:
//! - `eval`: build a series from a TOML engine config, evaluate one indicator, print rows
//! - `sweep`: evaluate the same indicator over many seeded series in parallel
//! - `replay`: stream bars through a live session and print each decision
//!
//! Logging goes to stderr and follows `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::io::Write;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use barlab_core::config::{EngineConfig, NumBackend};
use barlab_core::domain::Bar;
use barlab_core::indicators::{Ema, Indicator, Macd, Mma, Price, Sma};
use barlab_core::live::{CrossoverStrategy, Decision, LiveSession};
use barlab_core::num::{DecimalNumFactory, DoubleNumFactory, Num, NumFactory};
use barlab_core::series::{BarSeries, BarSeriesBuilder, SeriesMode};

#[derive(Parser)]
#[command(
    name = "barlab",
    about = "BarLab CLI — incremental indicator evaluation over bounded bar series"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one indicator over a synthetic series.
    Eval {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        indicator: IndicatorArgs,

        /// Print only this global index (default: every retained index).
        #[arg(long)]
        index: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Evaluate one indicator at the last index of many seeded series.
    Sweep {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        indicator: IndicatorArgs,

        /// Number of consecutive seeds, starting at --seed.
        #[arg(long, default_value_t = 16)]
        runs: u64,
    },
    /// Stream a synthetic series through a live EMA crossover session.
    ///
    /// The series is always live; the config's mode is ignored.
    Replay {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, default_value_t = 12)]
        fast: usize,

        #[arg(long, default_value_t = 26)]
        slow: usize,

        /// Print Hold decisions too.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Path to a TOML engine config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of synthetic bars to generate.
    #[arg(long, default_value_t = 500)]
    bars: usize,

    /// Seed of the synthetic random walk.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(clap::Args, Clone, Copy)]
struct IndicatorArgs {
    #[arg(long, value_enum, default_value_t = IndicatorKind::Sma)]
    indicator: IndicatorKind,

    #[arg(long, default_value_t = 14)]
    period: usize,

    /// Long period, for MACD.
    #[arg(long, default_value_t = 26)]
    long_period: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IndicatorKind {
    Close,
    Typical,
    Sma,
    Ema,
    Mma,
    Macd,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Serialize)]
struct Row<N: Num> {
    index: usize,
    end_time: DateTime<Utc>,
    close: N,
    value: N,
}

#[derive(Serialize)]
struct SweepRow {
    seed: u64,
    last_index: usize,
    last_close: f64,
    value: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            source,
            indicator,
            index,
            format,
        } => {
            let config = load_config(&source)?;
            match config.num {
                NumBackend::Double => {
                    run_eval(DoubleNumFactory, &config, &source, indicator, index, format)
                }
                NumBackend::Decimal => {
                    run_eval(DecimalNumFactory, &config, &source, indicator, index, format)
                }
            }
        }
        Commands::Sweep {
            source,
            indicator,
            runs,
        } => {
            let config = load_config(&source)?;
            match config.num {
                NumBackend::Double => {
                    run_sweep(DoubleNumFactory, &config, &source, indicator, runs)
                }
                NumBackend::Decimal => {
                    run_sweep(DecimalNumFactory, &config, &source, indicator, runs)
                }
            }
        }
        Commands::Replay {
            source,
            fast,
            slow,
            all,
        } => {
            let config = load_config(&source)?;
            match config.num {
                NumBackend::Double => {
                    run_replay(DoubleNumFactory, &config, &source, fast, slow, all)
                }
                NumBackend::Decimal => {
                    run_replay(DecimalNumFactory, &config, &source, fast, slow, all)
                }
            }
        }
    }
}

fn load_config(source: &SourceArgs) -> Result<EngineConfig> {
    let config = match &source.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let fingerprint = config.fingerprint()?;
    info!(
        series = %config.series_name,
        num = config.num.name(),
        mode = ?config.mode,
        %fingerprint,
        "engine config loaded"
    );
    Ok(config)
}

// ─── Synthetic data ──────────────────────────────────────────────────

/// Daily bars of a seeded random walk starting at 100.
fn synthetic_bars<F: NumFactory>(
    factory: &F,
    count: usize,
    seed: u64,
) -> Result<Vec<Bar<F::Num>>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = Utc
        .with_ymd_and_hms(2020, 1, 2, 21, 0, 0)
        .single()
        .context("invalid synthetic start time")?;
    let mut close = 100.0_f64;
    let mut bars = Vec::with_capacity(count);
    for i in 0..count {
        let open = close;
        close = (close * (1.0 + rng.gen_range(-0.02..0.02))).max(1.0);
        let spread = close * rng.gen_range(0.0..0.01);
        let bar = Bar::builder(factory.clone())
            .time_period(Duration::days(1))
            .end_time(start + Duration::days(i as i64))
            .open(open)
            .high(open.max(close) + spread)
            .low(open.min(close) - spread)
            .close(close)
            .volume(rng.gen_range(1_000.0..100_000.0))
            .trades(rng.gen_range(10..1_000))
            .build()?;
        bars.push(bar);
    }
    Ok(bars)
}

fn build_series<F: NumFactory>(
    factory: &F,
    config: &EngineConfig,
    bars: usize,
    seed: u64,
) -> Result<Arc<BarSeries<F::Num>>> {
    let series = config
        .series_builder::<F::Num>()?
        .with_bars(synthetic_bars(factory, bars, seed)?)
        .build()?;
    debug!(
        begin = series.begin_index(),
        end = ?series.end_index(),
        removed = series.removed_bars_count(),
        "series built"
    );
    Ok(Arc::new(series))
}

// ─── Indicator selection ─────────────────────────────────────────────

type DynIndicator<N> = Box<dyn Indicator<Num = N, Output = N>>;

fn build_indicator<N: Num>(
    series: &Arc<BarSeries<N>>,
    args: IndicatorArgs,
) -> Result<DynIndicator<N>> {
    let close = Price::close(series);
    let indicator: DynIndicator<N> = match args.indicator {
        IndicatorKind::Close => Box::new(close),
        IndicatorKind::Typical => Box::new(Price::typical(series)),
        IndicatorKind::Sma => Box::new(Sma::new(close, args.period)?),
        IndicatorKind::Ema => Box::new(Ema::new(close, args.period)?),
        IndicatorKind::Mma => Box::new(Mma::new(close, args.period)?),
        IndicatorKind::Macd => Box::new(Macd::new(close, args.period, args.long_period)?),
    };
    Ok(indicator)
}

// ─── Commands ────────────────────────────────────────────────────────

fn run_eval<F: NumFactory>(
    factory: F,
    config: &EngineConfig,
    source: &SourceArgs,
    args: IndicatorArgs,
    index: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let series = build_series(&factory, config, source.bars, source.seed)?;
    let indicator = build_indicator(&series, args)?;
    let end = series
        .end_index()
        .context("series is empty; use --bars > 0")?;

    let indices = match index {
        Some(i) => i..=i,
        None => series.begin_index()..=end,
    };
    let rows = indices
        .map(|i| -> Result<Row<F::Num>> {
            let bar = series.get_bar(i)?;
            Ok(Row {
                index: i,
                end_time: bar.end_time(),
                close: bar.close(),
                value: indicator.value(i)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    info!(
        rows = rows.len(),
        unstable_bars = indicator.unstable_bars(),
        "evaluated {:?}",
        args.indicator
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for row in &rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn run_sweep<F: NumFactory>(
    factory: F,
    config: &EngineConfig,
    source: &SourceArgs,
    args: IndicatorArgs,
    runs: u64,
) -> Result<()> {
    let seeds: Vec<u64> = seed_range(source.seed, runs)?.collect();
    let rows = seeds
        .par_iter()
        .map(|&seed| -> Result<SweepRow> {
            let series = build_series(&factory, config, source.bars, seed)?;
            let indicator = build_indicator(&series, args)?;
            let last_index = series
                .end_index()
                .context("series is empty; use --bars > 0")?;
            let last_close = series.get_bar(last_index)?.close().to_f64();
            Ok(SweepRow {
                seed,
                last_index,
                last_close,
                value: indicator.value(last_index)?.to_f64(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(runs = rows.len(), "sweep complete");
    Ok(())
}

/// `runs` consecutive seeds starting at `seed`.
fn seed_range(seed: u64, runs: u64) -> Result<Range<u64>> {
    let end = seed
        .checked_add(runs)
        .with_context(|| format!("--seed {seed} with --runs {runs} overflows u64"))?;
    Ok(seed..end)
}

fn run_replay<F: NumFactory>(
    factory: F,
    config: &EngineConfig,
    source: &SourceArgs,
    fast: usize,
    slow: usize,
    all: bool,
) -> Result<()> {
    let series: Arc<BarSeries<F::Num>> = Arc::new(
        BarSeriesBuilder::new()
            .with_name(config.series_name.clone())
            .with_mode(SeriesMode::Live)
            .build()?,
    );
    let strategy = CrossoverStrategy::new(
        Ema::new(Price::close(&series), fast)?,
        Ema::new(Price::close(&series), slow)?,
    );
    let mut session = LiveSession::new(Arc::clone(&series), strategy)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut trades = 0usize;
    for bar in synthetic_bars(&factory, source.bars, source.seed)? {
        let evaluation = session.on_bar(bar)?;
        if evaluation.decision != Decision::Hold {
            trades += 1;
        }
        if all || evaluation.decision != Decision::Hold {
            writeln!(out, "{}", serde_json::to_string(&evaluation)?)?;
        }
    }
    info!(
        decisions = trades,
        in_position = session.in_position(),
        retained = series.bar_count(),
        "replay complete"
    );
    Ok(())
}
