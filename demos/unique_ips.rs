//! Counts distinct `remote_addr` values in a JSON-lines access log, exactly
//! with a `HashSet` and approximately with a `CardinalityEstimator`.
//!
//! ```text
//! cargo run --example unique_ips -- access.log [precision]
//! ```

use std::collections::HashSet;
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::{Duration, Instant};

use stream_sketches::{CardinalityEstimator, EstimatorConfig};
use tracing::{debug, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<(), Box<dyn Error>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: unique_ips <log file> [precision]")?;
    let config = match args.next() {
        Some(precision) => EstimatorConfig {
            precision: precision.parse()?,
            ..EstimatorConfig::default()
        },
        None => EstimatorConfig::default(),
    };

    // each timed pass streams and parses the log itself
    let (exact, exact_elapsed) = timed(|| -> Result<usize, Box<dyn Error>> {
        let mut seen = HashSet::new();
        for ip in remote_addrs(&path)? {
            seen.insert(ip);
        }
        Ok(seen.len())
    });
    let exact = exact?;
    info!(%path, unique = exact, "counted exactly");

    let (estimator, estimate_elapsed) = timed(|| -> Result<_, Box<dyn Error>> {
        let mut estimator = CardinalityEstimator::from_config(&config)?;
        for ip in remote_addrs(&path)? {
            estimator.insert(&ip)?;
        }
        Ok(estimator)
    });
    let estimator = estimator?;
    let estimate = estimator.estimate();

    println!("| method                | unique | time (s) |");
    println!("|-----------------------|--------|----------|");
    println!(
        "| exact (HashSet)       | {:>6} | {:>8.4} |",
        exact,
        exact_elapsed.as_secs_f64()
    );
    println!(
        "| HyperLogLog (p = {:>2})  | {:>6.0} | {:>8.4} |",
        estimator.precision(),
        estimate,
        estimate_elapsed.as_secs_f64()
    );
    if exact > 0 {
        println!(
            "deviation: {:.2}% (expected ~{:.2}%)",
            (estimate - exact as f64).abs() / exact as f64 * 100.0,
            estimator.relative_error() * 100.0
        );
    }
    Ok(())
}

/// Stream `remote_addr` from every line, skipping lines that are not JSON
/// objects or have no such field.
fn remote_addrs(path: &str) -> std::io::Result<impl Iterator<Item = String>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(reader.lines().filter_map(|line| {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(%err, "skipped unreadable line");
                return None;
            }
        };
        let entry: serde_json::Value = serde_json::from_str(&line).ok()?;
        match entry.get("remote_addr").and_then(|addr| addr.as_str()) {
            Some(addr) => Some(addr.to_string()),
            None => {
                debug!("skipped line without remote_addr");
                None
            }
        }
    }))
}

fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = f();
    (value, start.elapsed())
}
