//! Soak command - drive a live cache on the system clock.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use recall_session::{CacheStats, ContextCache, ContextPatch, ExpirySweeper, Importance};
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, trace};

use super::Context;

/// Arguments for the soak command.
#[derive(Args, Debug)]
pub struct SoakArgs {
    /// How long to run, in seconds
    #[arg(long, default_value_t = 10)]
    pub duration_secs: u64,

    /// Seconds between stats log lines
    #[arg(long, default_value_t = 2)]
    pub report_every_secs: u64,

    /// Number of distinct session ids
    #[arg(long, default_value_t = 200)]
    pub sessions: usize,

    /// Operations issued per tick
    #[arg(long, default_value_t = 50)]
    pub ops_per_tick: usize,

    /// Milliseconds between ticks
    #[arg(long, default_value_t = 10)]
    pub tick_ms: u64,

    /// Override the sweeper interval from config, in seconds
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SoakOutput {
    elapsed_ms: u64,
    operations: u64,
    interrupted: bool,
    stats: CacheStats,
}

/// Issue one operation; the mix is mostly reads and appends.
fn drive(cache: &ContextCache, n: u64, sessions: usize) {
    let slot = (n.wrapping_mul(7919) % sessions.max(1) as u64) as usize;
    let id = format!("soak-{slot:04}");

    match n % 10 {
        0..=4 => {
            cache.get_or_create(&id);
        }
        5..=7 => cache.append_entry(
            &id,
            &format!("topic-{}", n % 13),
            "user asked a follow-up question about their last order",
            match n % 3 {
                0 => Importance::Low,
                1 => Importance::Medium,
                _ => Importance::High,
            },
        ),
        8 => cache.update(&id, ContextPatch::new().workflow(format!("flow-{}", n % 5))),
        _ => cache.record_action(&id, "soak"),
    }

    if n % 97 == 0 {
        let digest = cache.render_context(&id);
        trace!(session_id = %id, digest_len = digest.len(), "Rendered digest");
    }
}

fn log_stats(cache: &ContextCache, operations: u64) {
    let stats = cache.stats();
    info!(
        operations,
        sessions = stats.total_sessions,
        bytes = stats.total_memory_usage_bytes,
        pruned = stats.pruned_sessions_count,
        evicted = stats.evicted_sessions_total,
        "Soak progress"
    );
}

/// Run the soak command.
pub async fn run(args: SoakArgs, ctx: &Context) -> Result<()> {
    let cache = ContextCache::new(ctx.cache_config()?)?;

    let sweeper_config = ctx.loaded.config.sweeper();
    let sweeper = if sweeper_config.enabled {
        let interval = args
            .sweep_interval_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| sweeper_config.interval());
        Some(ExpirySweeper::spawn(cache.clone(), interval))
    } else {
        None
    };

    info!(
        duration_secs = args.duration_secs,
        sessions = args.sessions,
        sweeper = sweeper.is_some(),
        "Starting soak"
    );

    let started = Instant::now();
    let deadline = started + Duration::from_secs(args.duration_secs);
    let mut ticker = tokio::time::interval(Duration::from_millis(args.tick_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut reporter = tokio::time::interval(Duration::from_secs(args.report_every_secs.max(1)));
    // The first tick completes immediately.
    reporter.tick().await;

    let stop = tokio::time::sleep_until(deadline);
    tokio::pin!(stop);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut operations = 0u64;
    let mut interrupted = false;
    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = &mut ctrl_c => {
                interrupted = true;
                break;
            }
            _ = reporter.tick() => log_stats(&cache, operations),
            _ = ticker.tick() => {
                for _ in 0..args.ops_per_tick {
                    drive(&cache, operations, args.sessions);
                    operations += 1;
                }
            }
        }
    }

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }
    log_stats(&cache, operations);

    let output = SoakOutput {
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        operations,
        interrupted,
        stats: cache.stats(),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let dim = Style::new().dim();
        println!();
        println!("{}", style("Soak Summary").bold());
        println!("{}", dim.apply_to("─".repeat(40)));
        println!("  {} {} ms", dim.apply_to("Elapsed:"), output.elapsed_ms);
        println!("  {} {}", dim.apply_to("Operations:"), output.operations);
        println!("  {} {}", dim.apply_to("Sessions:"), output.stats.total_sessions);
        println!(
            "  {} {} bytes",
            dim.apply_to("Memory:"),
            output.stats.total_memory_usage_bytes
        );
        println!("  {} {}", dim.apply_to("Evicted:"), output.stats.evicted_sessions_total);
        if output.interrupted {
            println!("  {}", Style::new().yellow().apply_to("interrupted"));
        }
        println!();
    }

    Ok(())
}
