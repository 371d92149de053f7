//! Simulate command - deterministic workload on a manual clock.
//!
//! Sessions are driven round-robin. Every fifth session is read more
//! often, and every fourth goes idle after the first third of the run so
//! that aging, trimming and eviction all show up in the final table.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{DateTime, TimeDelta};
use clap::Args;
use console::{Style, style};
use recall_session::{
    CacheStats, ContextCache, ContextPatch, Importance, ManualClock, SessionPriority,
};
use serde::Serialize;
use tracing::{debug, info};

use super::Context;

/// Arguments for the simulate command.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of sessions to drive
    #[arg(long, default_value_t = 40)]
    pub sessions: usize,

    /// Conversation turns per session
    #[arg(long, default_value_t = 30)]
    pub turns: usize,

    /// Simulated hours the workload is spread across
    #[arg(long, default_value_t = 72)]
    pub hours: u64,

    /// Override the aggregate memory cap, in KiB
    #[arg(long)]
    pub max_memory_kib: Option<usize>,

    /// Rows of the priority table to print
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Print the rendered digest of the highest-priority session
    #[arg(long)]
    pub show_digest: bool,
}

/// Simulation outcome for JSON output.
#[derive(Debug, Serialize)]
struct SimulationReport {
    simulated_hours: u64,
    operations: u64,
    swept: usize,
    stats: CacheStats,
    top: Vec<SessionPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
}

const SUMMARY_WORDS: &[&str] = &[
    "customer", "asked", "about", "invoice", "refund", "shipping", "order", "status", "update",
    "billing", "plan", "renewal", "account", "access", "report",
];

/// Deterministic summary text of roughly `len` bytes.
fn summary_text(seed: usize, len: usize) -> String {
    let mut out = String::with_capacity(len + 16);
    let mut i = seed;
    while out.len() < len {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(SUMMARY_WORDS[i % SUMMARY_WORDS.len()]);
        i = i.wrapping_mul(31).wrapping_add(7);
    }
    out
}

fn importance_for(n: usize) -> Importance {
    match n % 3 {
        0 => Importance::Low,
        1 => Importance::Medium,
        _ => Importance::High,
    }
}

/// Run the simulate command.
pub async fn run(args: SimulateArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.cache_config()?;
    if let Some(kib) = args.max_memory_kib {
        config = config.with_max_total_memory(kib.saturating_mul(1024));
        config.validate().context("invalid --max-memory-kib")?;
    }

    let start = DateTime::from_timestamp(1_700_000_000, 0).context("start time out of range")?;
    let clock = ManualClock::new(start);
    let cache = ContextCache::with_clock(config, Arc::new(clock.clone()))?;

    let steps = (args.sessions * args.turns).max(1) as i64;
    let span_ms = i64::try_from(args.hours.saturating_mul(3_600_000)).unwrap_or(i64::MAX);
    let step = TimeDelta::milliseconds((span_ms / steps).max(1));

    info!(
        sessions = args.sessions,
        turns = args.turns,
        hours = args.hours,
        cap_bytes = cache.config().max_total_memory_bytes,
        "Starting simulation"
    );

    let mut operations = 0u64;
    for turn in 0..args.turns {
        for i in 0..args.sessions {
            let idle = i % 4 == 3 && turn >= args.turns / 3;
            if idle {
                continue;
            }

            clock.advance(step);
            let id = format!("session-{i:03}");

            let reads = if i % 5 == 0 { 3 } else { 1 };
            for _ in 0..reads {
                cache.get_or_create(&id);
            }
            operations += reads;

            if turn % 6 == 0 {
                cache.update(&id, ContextPatch::new().workflow(format!("workflow-{}", turn / 6)));
                operations += 1;
            }

            let len = 40 + (i * 37 + turn * 11) % 400;
            cache.append_entry(
                &id,
                &format!("topic-{}", (i + turn) % 7),
                &summary_text(i + turn, len),
                importance_for(i + turn),
            );
            operations += 1;

            if turn % 4 == 0 {
                cache.record_action(&id, &format!("action-{}", turn % 3));
                operations += 1;
            }
        }
        debug!(turn, bytes = cache.memory_usage_bytes(), "Turn complete");
    }

    let swept = cache.sweep_expired();
    let mut top = cache.sessions_by_priority();
    top.truncate(args.top);
    let digest = if args.show_digest {
        top.first().map(|s| cache.render_context(&s.session_id))
    } else {
        None
    };

    let report = SimulationReport {
        simulated_hours: args.hours,
        operations,
        swept,
        stats: cache.stats(),
        top,
        digest,
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, cache.config().max_total_memory_bytes);
    }

    Ok(())
}

fn print_report(report: &SimulationReport, cap_bytes: usize) {
    let dim = Style::new().dim();
    let stats = &report.stats;

    println!();
    println!("{}", style("Simulation Summary").bold());
    println!("{}", dim.apply_to("─".repeat(60)));
    println!("  {} {}h", dim.apply_to("Simulated:"), report.simulated_hours);
    println!("  {} {}", dim.apply_to("Operations:"), report.operations);
    println!("  {} {}", dim.apply_to("Sessions:"), stats.total_sessions);
    println!(
        "  {} {} / {} bytes",
        dim.apply_to("Memory:"),
        stats.total_memory_usage_bytes,
        cap_bytes
    );
    println!(
        "  {} {} bytes",
        dim.apply_to("Average:"),
        stats.average_session_size_bytes
    );
    println!("  {} {}", dim.apply_to("Pruned:"), stats.pruned_sessions_count);
    println!("  {} {}", dim.apply_to("Evicted:"), stats.evicted_sessions_total);
    println!("  {} {}", dim.apply_to("Swept:"), report.swept);

    if !report.top.is_empty() {
        println!();
        println!("{}", style("Sessions by priority").bold());
        println!("{}", dim.apply_to("─".repeat(60)));
        println!(
            "  {:<14} {:>8} {:>10}  {}",
            "SESSION", "PRIORITY", "BYTES", "LAST ACCESS"
        );
        for entry in &report.top {
            println!(
                "  {:<14} {:>8.3} {:>10}  {}",
                entry.session_id,
                entry.priority,
                entry.memory_usage_bytes,
                entry.last_accessed_at.format("%Y-%m-%d %H:%M")
            );
        }
    }

    if let Some(digest) = &report.digest {
        println!();
        println!("{}", style("Digest").bold());
        println!("{}", dim.apply_to("─".repeat(60)));
        print!("{digest}");
    }

    println!();
}
