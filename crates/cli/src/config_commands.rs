use std::sync::Arc;

use {
    anyhow::{Context as _, Result, bail},
    clap::Subcommand,
    duplex_config::{ConfigField, ConfigManager, Error as ConfigError},
};

use crate::Context;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the configuration with tokens masked.
    Show,
    /// Set fields and save, e.g. `set name=Alice sender-channel-id=alice_out`.
    Set {
        #[arg(required = true, value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
    },
    /// Print a shareable link carrying the full configuration.
    Link {
        /// Base URL to append the query to (defaults to `share_base_url`).
        base_url: Option<String>,
    },
    /// Install the configuration carried by a shareable link.
    Import { link: String },
}

pub fn handle_config(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            show(&ctx.config_manager());
            Ok(())
        },
        ConfigAction::Set { assignments } => set(ctx, &assignments),
        ConfigAction::Link { base_url } => {
            let base_url = base_url
                .or_else(|| ctx.settings.share_base_url.clone())
                .context("no base URL given and `share_base_url` is not set")?;
            let manager = ctx.config_manager();
            if !manager.is_complete() {
                bail!("configuration is incomplete; run `duplex config show`");
            }
            println!("{}", manager.to_shareable_link(&base_url)?);
            Ok(())
        },
        ConfigAction::Import { link } => {
            let mut manager = ConfigManager::new(Arc::clone(&ctx.store));
            if manager.load_from_link(&link).is_none() {
                bail!("link must carry all of n, st, rt, sch and rch");
            }
            eprintln!("Configuration imported.");
            show(&manager);
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn show(manager: &ConfigManager) {
    let config = manager.config();
    for field in ConfigField::ALL {
        println!("{:<20} {}", field.label(), config.display_value(field));
    }
    println!();
    if manager.is_complete() {
        println!("Configuration is complete.");
    } else {
        println!("Configuration is incomplete.");
    }
}

fn set(ctx: &Context, assignments: &[String]) -> Result<()> {
    let mut manager = ctx.config_manager();
    for assignment in assignments {
        let (field, value) = assignment
            .split_once('=')
            .with_context(|| format!("expected FIELD=VALUE, got `{assignment}`"))?;
        let field: ConfigField = field.trim().parse()?;
        manager.update(field, value);
    }

    match manager.save() {
        Ok(()) => {
            eprintln!("Configuration saved.");
            Ok(())
        },
        Err(ConfigError::Validation { errors }) => {
            for message in errors.values() {
                eprintln!("  {BOLD}{RED}error{RESET} {message}");
            }
            eprintln!();
            eprintln!("{} error(s); nothing saved", errors.len());
            std::process::exit(1);
        },
        Err(e) => Err(e.into()),
    }
}
