use chrono::Utc;
use clap::Parser;
use std::io;
use std::process::exit;
use std::time::Duration;
use tracing::Level;

use certexpiry::config::{load_sites, DEFAULT_CONFIG};
use certexpiry::{check_sites, check_target, DEFAULT_TIMEOUT};

/// Print HTTPS certificate expiry for a list of sites.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to JSON config file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: String,

    /// Socket timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT, value_parser = parse_timeout)]
    timeout: f64,

    /// Increase diagnostic output on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_timeout(s: &str) -> Result<f64, String> {
    let seconds: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", s))?;
    if seconds <= 0.0 || Duration::try_from_secs_f64(seconds).is_err() {
        return Err(format!("timeout must be a positive number of seconds, got {}", s));
    }
    Ok(seconds)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let targets = match load_sites(&args.config) {
        Ok(targets) => targets,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            exit(1);
        }
    };
    tracing::info!("loaded {} target(s) from {}", targets.len(), args.config);

    let timeout = Duration::from_secs_f64(args.timeout);
    let now = Utc::now();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = check_sites(&mut out, &targets, now, |target| check_target(target, timeout));

    if let Err(e) = result {
        tracing::error!("failed to write report: {}", e);
    }
}
