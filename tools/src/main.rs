//! retention-runner: headless batch runner for venue retention analytics.
//!
//! Usage:
//!   retention-runner --input visits.csv --out-dir derived --db retention.db
//!   retention-runner --synthetic-seed 12345 --out-dir derived
//!   retention-runner --input visits.csv --config retention.json

use anyhow::{Context, Result};
use retention_core::{
    config::RetentionConfig,
    engine::{RetentionEngine, RunOutput},
    ingest,
    report,
    store::RetentionStore,
    synthetic::{self, SyntheticSpec},
    VisitEvent,
};
use std::env;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = flag_value(&args, "--input");
    let seed = flag_value(&args, "--synthetic-seed").and_then(|s| s.parse::<u64>().ok());
    let config_path = flag_value(&args, "--config");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let out_dir = flag_value(&args, "--out-dir").unwrap_or("./derived");

    let config = match config_path {
        Some(path) => {
            let config = RetentionConfig::load(path)?;
            log::info!("config loaded from {path}");
            config
        }
        None => RetentionConfig::default(),
    };

    println!("Venue retention: retention-runner");
    println!("  input:     {}", input.unwrap_or("(synthetic)"));
    println!("  db:        {db}");
    println!("  out_dir:   {out_dir}");
    println!("  sentinel:  {}", config.sentinel_user_id);
    println!();

    let events: Vec<VisitEvent> = match (input, seed) {
        (Some(path), _) => ingest::load_visits_csv(path)
            .with_context(|| format!("loading visits from {path}"))?,
        (None, seed) => {
            let seed = seed.unwrap_or(42);
            let spec = SyntheticSpec {
                sentinel_user_id: config.sentinel_user_id.clone(),
                ..SyntheticSpec::default()
            };
            println!("  generating synthetic log (seed={seed})");
            synthetic::generate(&spec, seed)
        }
    };

    let store = RetentionStore::open(db)?;
    store.migrate()?;

    let start_time = Instant::now();
    let mut engine = RetentionEngine::build(config, store);
    let output = engine.run(&events)?;
    let elapsed = start_time.elapsed();

    report::write_all(
        Path::new(out_dir),
        &output.stats,
        &output.bucket_labels,
        &output.conversion,
        &output.classified,
    )?;

    print_summary(&engine.run_id, events.len(), &output);
    println!("Elapsed time: {:.2} sec", elapsed.as_secs_f64());
    Ok(())
}

fn print_summary(run_id: &str, event_count: usize, output: &RunOutput) {
    let venues: std::collections::BTreeSet<_> =
        output.classified.iter().map(|c| &c.venue).collect();
    let (new, ret, rep) = output.classified.iter().fold((0, 0, 0), |(n, r, p), c| {
        (n + c.new_count(), r + c.return_count(), p + c.repeat_count())
    });

    println!("=== RUN SUMMARY ===");
    println!("  run_id:          {run_id}");
    println!("  visit events:    {event_count}");
    println!("  venues:          {}", venues.len());
    println!("  venue-months:    {}", output.classified.len());
    println!("  new visits:      {new}");
    println!("  return visitors: {ret}");
    println!("  repeat visitors: {rep}");
    println!("  stats rows:      {}", output.stats.len());
    println!("  conversion rows: {}", output.conversion.len());

    println!();
    println!("=== CONVERSION TOTALS ===");
    let mut totals = vec![0u64; output.bucket_labels.len()];
    for row in &output.conversion {
        for (t, c) in totals.iter_mut().zip(&row.counts) {
            *t += c;
        }
    }
    for (label, total) in output.bucket_labels.iter().zip(totals) {
        println!("  {label:>12}  {total}");
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
