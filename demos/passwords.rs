//! Checks candidate passwords against a filter preloaded with used ones.
//!
//! Run with `RUST_LOG=stream_sketches=trace` to see every decision.

use stream_sketches::{check_uniqueness, FilterConfig, MembershipFilter, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let mut filter = MembershipFilter::from_config(&FilterConfig::default())?;
    for password in ["password123", "admin123", "qwerty123"] {
        filter.insert(password)?;
    }

    let candidates = ["password123", "newpassword", "admin123", "guest"];
    for (password, status) in check_uniqueness(&mut filter, candidates)? {
        println!("Password '{}' - {}.", password, status);
    }

    println!(
        "filter = {:?}, estimated false positive rate = {:.6}",
        filter,
        filter.estimated_false_positive_rate()
    );
    Ok(())
}
