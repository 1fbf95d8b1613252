//! Scheduled runtime - fetches, reconciles, and alerts on an interval.
//!
//! Usage:
//!   cargo run --release --bin sentiment_runtime
//!
//! Environment variables: see `AppConfig::from_env`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sentiflow::main()
}
