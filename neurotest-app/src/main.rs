//! Reaction-time test battery: runs one test per invocation and saves the
//! results as JSON.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use neurotest_core::TestVariant;
use neurotest_experiment::{JsonFileSink, SubmissionStatus, TrialRunner, TrialSetProvider};
use neurotest_render::find_font;
use neurotest_timing::HighPrecisionTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

mod app;
mod config;
mod headless;
mod keymap;
mod report;
mod session;

use app::App;
use config::AppConfig;
use headless::{SimulatedParticipant, run_headless};
use session::{Session, summary_lines};

#[derive(Parser)]
#[command(name = "neurotest")]
#[command(version)]
#[command(about = "Reaction-time test battery")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file; defaults to ./neurotest.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one test
    Run(RunArgs),
    /// Summarize saved results
    Report(ReportArgs),
}

#[derive(Args)]
struct RunArgs {
    /// digit-stroop, go-no-go, simon-effect, flanker-task or dual-task
    #[arg(short, long)]
    test: TestVariant,

    /// Participant identifier stored with the results
    #[arg(short, long)]
    subject: String,

    /// Seed for trial order and dual-task delays
    #[arg(long)]
    seed: Option<u64>,

    /// Present trials in catalog order
    #[arg(long)]
    no_shuffle: bool,

    /// Answer with a simulated participant instead of opening a window
    #[arg(long)]
    headless: bool,

    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// TrueType/OpenType font for on-screen text
    #[arg(long)]
    font: Option<PathBuf>,

    /// Simulated response latency (headless only)
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Simulated probability of a wrong answer (headless only)
    #[arg(long)]
    error_rate: Option<f64>,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Only show runs of this participant
    #[arg(short, long)]
    subject: Option<String>,

    /// List every trial under its run
    #[arg(long)]
    details: bool,

    /// Also write one CSV row per trial to this file
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Run(args) => {
            apply_run_args(&mut config, &args);
            config.validate()?;
            run(&config, &args)
        }
        Commands::Report(args) => {
            let dir = args.results_dir.unwrap_or(config.results_dir);
            let runs = report::load_runs(&dir, args.subject.as_deref())?;
            if args.details {
                report::print_details(&runs);
            } else {
                report::print_report(&runs);
            }
            if let Some(path) = &args.csv {
                let rows = report::write_csv(&runs, path)?;
                println!("{rows} trials written to {}", path.display());
            }
            Ok(())
        }
    }
}

/// Command-line flags win over the config file.
fn apply_run_args(config: &mut AppConfig, args: &RunArgs) {
    if let Some(dir) = &args.results_dir {
        config.results_dir = dir.clone();
    }
    if let Some(font) = &args.font {
        config.font_path = Some(font.clone());
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.no_shuffle {
        config.shuffle = false;
    }
    if let Some(latency) = args.latency_ms {
        config.participant.latency_ms = latency;
    }
    if let Some(rate) = args.error_rate {
        config.participant.error_rate = rate;
    }
}

fn rng_from(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_os_rng(),
    }
}

fn run(config: &AppConfig, args: &RunArgs) -> anyhow::Result<()> {
    let variant = args.test;
    if args.subject.trim().is_empty() {
        bail!("subject id must not be empty");
    }

    let trials = TrialSetProvider::new()
        .with_seed(config.seed)
        .with_shuffle(config.shuffle)
        .get_trials(variant);
    let sink = JsonFileSink::new(&config.results_dir);
    let runner = TrialRunner::new(
        args.subject.trim(),
        variant,
        trials,
        HighPrecisionTimer::new(),
        rng_from(config.seed, 1),
        Box::new(sink),
    )?;

    if args.headless {
        let mut runner = runner;
        let mut participant = SimulatedParticipant::new(
            config.participant.latency_ms,
            config.participant.error_rate,
            rng_from(config.seed, 2),
        );
        let summary = run_headless(&mut runner, &mut participant)?;
        println!("{} for {}", variant.test_name(), runner.subject_id());
        for line in summary_lines(&summary) {
            println!("  {line}");
        }
        if let SubmissionStatus::Failed(reason) = runner.submission() {
            bail!("results were not saved: {reason}");
        }
        return Ok(());
    }

    let font = find_font(config.font_path.as_deref()).context("loading font")?;
    App::new(config.window_title.clone(), Session::new(runner), font).run()?;
    info!("session closed");
    Ok(())
}
