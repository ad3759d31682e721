// src/main.rs

use std::io::Read;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use log::{debug, error, info, trace};
use serde_json::{json, Value};

use reuse_sched::config::{RunConfig, RunMode, Strategy, USAGE};
use reuse_sched::search::{MemoCache, RunStats, Schedules};
use reuse_sched::strategy::{best_beam_schedule, best_greedy_schedule};
use reuse_sched::{Catalogue, CompositeSchedule, Linearizer};

/// Main entry point for the `reuse-sched` binary.
fn main() -> Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    trace!(
        "sizeof(Schedules) = {}, sizeof(ResultUnit) = {}",
        std::mem::size_of::<Schedules>(),
        std::mem::size_of::<reuse_sched::ResultUnit>()
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match RunMode::from_args(&args) {
        Ok(mode) => mode,
        Err(e) => {
            error!("{e}");
            info!("{USAGE}");
            bail!("invalid arguments");
        }
    };
    debug!("run mode: {mode:?}");

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read the input document")?;
    let document: Value =
        serde_json::from_str(&input).context("input document is not valid JSON")?;

    let catalogue: Catalogue = serde_json::from_value(document.clone())
        .context("input document is missing a valid catalogue")?;
    if catalogue.is_empty() {
        bail!("rattrs must be non-empty");
    }
    info!("rattrs: {:?}", catalogue.rattrs);
    info!("aattrs: {:?}", catalogue.aattrs);
    let catalogue = Rc::new(catalogue);

    let linearizer = match document.get("linearizer") {
        Some(raw) => {
            info!("linearizer: {raw}");
            let lin: Linearizer = serde_json::from_value(raw.clone())
                .context("invalid linearizer specification")?;
            Some(Rc::new(lin))
        }
        None => None,
    };

    let mut config: RunConfig = serde_json::from_value(document.clone())
        .context("invalid search parameters in the input document")?;
    config.apply_env_overrides()?;
    config.validate()?;
    info!(
        "num_pruned: {}, beam_width: {}, timeout: {}s, optimizations: {}",
        config.num_pruned, config.beam_width, config.timeout, config.optimizations
    );

    let started = Instant::now();
    let best = run_strategy(mode, catalogue, linearizer, &config)?;
    let walltime = started.elapsed();

    let best_num_ops = best.num_ops();
    let best_total_distance = best.total_distance();
    info!("best: {}", best.to_string_with_offset());
    info!("num_ops: {best_num_ops}");
    info!("total_distance: {best_total_distance}");
    log_resource_usage();
    info!("walltime: {} s", walltime.as_secs_f64());

    let mut document = document;
    merge_patch(
        &mut document,
        json!({
            "schedule": best.as_ref(),
            "num_ops": best_num_ops,
            "total_distance": best_total_distance,
        }),
    );
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn run_strategy(
    mode: RunMode,
    catalogue: Rc<Catalogue>,
    linearizer: Option<Rc<Linearizer>>,
    config: &RunConfig,
) -> Result<Rc<CompositeSchedule>> {
    match mode.strategy {
        Strategy::Beam => best_beam_schedule(
            catalogue,
            linearizer,
            config.beam_width,
            config.timeout,
            config.optimizations(),
        ),
        Strategy::Greedy => best_greedy_schedule(catalogue, linearizer, config.num_pruned),
        Strategy::BruteForce => {
            let cache = MemoCache::new_shared();
            let stats = Rc::new(RunStats::default());
            let engine = Schedules::shared(
                catalogue,
                None,
                Some(cache.clone()),
                Some(stats.clone()),
                mode.orientation,
            );
            let best = engine.best()?;
            stats.log_summary();
            debug!("distinct subsets cached: {}", cache.borrow().len());
            Ok(best)
        }
    }
}

/// RFC 7386 merge: objects merge recursively, null removes, anything else
/// replaces.
fn merge_patch(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(entries) => {
            if !target.is_object() {
                *target = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(map) = target {
                for (key, value) in entries {
                    if value.is_null() {
                        map.remove(&key);
                    } else {
                        merge_patch(map.entry(key).or_insert(Value::Null), value);
                    }
                }
            }
        }
        other => *target = other,
    }
}

fn log_resource_usage() {
    let mut usage = unsafe { std::mem::zeroed::<libc::rusage>() };
    if unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) } == 0 {
        info!("maxrss: {} kB", usage.ru_maxrss);
    } else {
        debug!(
            "failed to get resource usage: {}",
            std::io::Error::last_os_error()
        );
    }
}
