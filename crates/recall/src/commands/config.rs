//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;
use recall_config::RecallConfig;
use serde::Serialize;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show resolved configuration and the files it came from
    Show,

    /// Show the user configuration file path
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./recall.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Resolved configuration for JSON output.
#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    sources: Vec<SourceOutput>,
    warnings: &'a [String],
    config: RecallConfig,
}

#[derive(Debug, Serialize)]
struct SourceOutput {
    path: PathBuf,
    loaded: bool,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { local, force } => cmd_init(ctx, local, force),
    }
}

/// Every section filled in, so `show` prints effective values.
fn resolved(config: &RecallConfig) -> RecallConfig {
    RecallConfig {
        cache: Some(config.cache()),
        sweeper: Some(config.sweeper()),
        logging: Some(config.logging()),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let effective = resolved(&loaded.config);

    if ctx.json_output {
        let output = ShowOutput {
            sources: loaded
                .sources
                .iter()
                .map(|s| SourceOutput {
                    path: s.path.clone(),
                    loaded: s.loaded,
                })
                .collect(),
            warnings: &loaded.warnings,
            config: effective,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let yellow = Style::new().yellow();

    println!("# Recall Configuration\n");

    println!("Config file search order (later overrides earlier):");
    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, dim.apply_to(source.path.display()));
    }
    println!();

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  {} {}", yellow.apply_to("⚠"), w);
        }
        println!();
    }

    println!("{}", effective.to_toml()?);

    if ctx.verbose && loaded.config != RecallConfig::new() {
        println!("---\nAs written:\n");
        println!("{}", loaded.config.to_toml()?);
    }

    Ok(())
}

fn user_config_file(ctx: &Context) -> Result<PathBuf> {
    ctx.config_dir
        .as_ref()
        .map(|d| d.join("config.toml"))
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let path = user_config_file(ctx)?;
    if ctx.json_output {
        println!("{}", serde_json::json!({ "path": path }));
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_init(ctx: &Context, local: bool, force: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("recall.toml")
    } else {
        user_config_file(ctx)?
    };

    if path.exists() && !force {
        println!("Config file already exists: {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    recall_config::save_config(&RecallConfig::with_defaults(), &path)?;
    println!("✓ Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  recall config show      # verify configuration");
    println!("  recall simulate         # exercise the cache with these limits");

    Ok(())
}
