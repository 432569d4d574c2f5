use clap::{Parser, ValueEnum};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use lif_ring_tb::config::HarnessConfig;
use lif_ring_tb::dut::{Dut, HeldInReset, LifRing, Playback};
use lif_ring_tb::error::HarnessError;
use lif_ring_tb::harness::sweep::{default_patterns, load_patterns};
use lif_ring_tb::harness::run_session;
use lif_ring_tb::sim::TimeUnit;

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum DutKind {
    /// The behavioural LIF ring model
    Lif,
    /// A seeded random spike stream
    Random,
}

#[derive(Parser, Debug)]
struct Args {
    /// The harness configuration file (JSON), overridden by the options below
    #[arg(long)]
    config: Option<PathBuf>,
    /// The pattern list (JSON), defaults to the five ring patterns
    #[arg(long)]
    patterns: Option<PathBuf>,
    /// The clock half-period
    #[arg(long)]
    half_period: Option<u64>,
    /// The time unit of the half-period, one of: ps, ns, us
    #[arg(long)]
    unit: Option<TimeUnit>,
    /// The number of cycles the reset is held
    #[arg(long)]
    reset_cycles: Option<u64>,
    /// The number of cycles between reset release and the first stimulus
    #[arg(long)]
    settle_cycles: Option<u64>,
    /// The number of cycles held after each pattern
    #[arg(long)]
    inter_pattern_cycles: Option<u64>,
    /// Override the monitoring window of every pattern
    #[arg(long)]
    duration: Option<u64>,
    /// The simulation horizon, in cycles
    #[arg(long)]
    max_cycles: Option<u64>,
    /// Drive ena high during reset
    #[arg(long)]
    enable_during_reset: bool,
    /// The device under test
    #[arg(long, value_enum, default_value = "lif")]
    dut: DutKind,
    /// Keep the DUT in reset for the whole session
    #[arg(long)]
    held_in_reset: bool,
    /// The seed of the random DUT
    #[arg(long, default_value = "0")]
    seed: u64,
    /// The spike density of the random DUT
    #[arg(long, default_value = "0.1")]
    density: f64,
    /// The directory of the log files
    #[arg(long, default_value = "log")]
    log_dir: PathBuf,
    /// The log level
    #[arg(long, default_value = "info")]
    level: LevelFilter,
    /// Where to save the report (JSON)
    #[arg(long)]
    report: Option<PathBuf>,
}

fn init_logging(args: &Args) -> Result<(), HarnessError> {
    let mut hasher = Sha256::new();
    hasher.update(format!("{:?}", args));
    let hash = hasher.finalize();
    let log_path = args.log_dir.join(format!("{:x}.log", hash));

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{l} - {m}{n}")))
        .build();
    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{l} - {m}\n")))
        .build(&log_path)
        .map_err(|e| HarnessError::IOError(e.to_string()))?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(
            Root::builder()
                .appender("stdout")
                .appender("logfile")
                .build(args.level),
        )
        .map_err(|e| HarnessError::IOError(e.to_string()))?;

    log4rs::init_config(config).map_err(|e| HarnessError::IOError(e.to_string()))?;
    log::info!("Logging to {}", log_path.display());
    Ok(())
}

fn harness_config(args: &Args) -> Result<HarnessConfig, HarnessError> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load_from(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(half_period) = args.half_period {
        config.clock_half_period = half_period;
    }
    if let Some(unit) = args.unit {
        config.time_unit = unit;
    }
    if let Some(reset_cycles) = args.reset_cycles {
        config.reset_cycles = reset_cycles;
    }
    if let Some(settle_cycles) = args.settle_cycles {
        config.settle_cycles = settle_cycles;
    }
    if let Some(inter_pattern_cycles) = args.inter_pattern_cycles {
        config.inter_pattern_cycles = inter_pattern_cycles;
    }
    if let Some(max_cycles) = args.max_cycles {
        config.max_cycles = max_cycles;
    }
    config.enable_during_reset |= args.enable_during_reset;
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), HarnessError> {
    let args = Args::parse();
    init_logging(&args)?;
    log::info!("{:?}", args);

    let config = harness_config(&args)?;
    let mut patterns = match &args.patterns {
        Some(path) => load_patterns(path)?,
        None => default_patterns(),
    };
    if let Some(duration) = args.duration {
        patterns.iter_mut().for_each(|p| p.duration = duration);
    }

    let dut: Box<dyn Dut> = match args.dut {
        DutKind::Lif => Box::new(LifRing::new()),
        DutKind::Random => {
            let len = patterns.iter().map(|p| p.duration + config.inter_pattern_cycles).sum::<u64>()
                + config.settle_cycles;
            Box::new(Playback::random(len as usize, args.density, args.seed))
        }
    };

    let outcome = if args.held_in_reset {
        run_session(HeldInReset::new(dut), &config, &patterns)
    } else {
        run_session(dut, &config, &patterns)
    };

    match outcome {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(path) = &args.report {
                report.save_to(path)?;
                log::info!("Report saved to {}", path.display());
            }
            Ok(())
        }
        Err(failure) => {
            log::error!("{}", failure);
            println!("{}", serde_json::to_string_pretty(&failure.partial)?);
            Err(failure.error)
        }
    }
}
