//! slotbar - administer slot assignments and visibility rules from the shell.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slotbar::visibility::{User, VisibilityMode};
use slotbar::{Slotbar, SlotbarConfig, StandardCatalog};

/// Inspect and edit slot assignments and visibility rules
#[derive(Parser, Debug)]
#[command(name = "slotbar")]
#[command(about = "Inspect and edit slot assignments and visibility rules")]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "SLOTBAR_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory (overrides the config file)
    #[arg(long, env = "SLOTBAR_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the slot tree
    Show,
    /// List available actions
    Actions,
    /// Print what a user would be shown
    Layout {
        #[arg(long)]
        user: String,
        #[arg(long)]
        admin: bool,
    },
    /// Bind an action to a slot
    Assign {
        #[arg(long)]
        action: String,
        #[arg(long)]
        slot: String,
    },
    /// Remove an action from the slot tree
    Unassign {
        #[arg(long)]
        action: String,
    },
    /// Hide a slot, or show it again with --visible
    Hide {
        #[arg(long)]
        slot: String,
        #[arg(long)]
        visible: bool,
    },
    /// Show or hide a primary slot for one user
    SlotVisibility {
        #[arg(long)]
        user: String,
        #[arg(long)]
        index: usize,
        #[arg(long, action = ArgAction::Set)]
        visible: bool,
    },
    /// Set one user's visibility of an action
    Grant {
        #[arg(long)]
        action: String,
        #[arg(long)]
        user: String,
        #[arg(long, action = ArgAction::Set)]
        visible: bool,
        /// Every non-administrator user id, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        roster: Vec<String>,
    },
    /// Set an action's visibility mode (all, gm-only, selected)
    Mode {
        #[arg(long)]
        action: String,
        #[arg(long)]
        mode: VisibilityMode,
        /// Non-administrator user ids, comma separated
        #[arg(long, value_delimiter = ',')]
        roster: Vec<String>,
    },
    /// Print both configurations as one document
    Export,
    /// Restore the default empty configuration
    Reset,
}

fn players(ids: &[String]) -> Vec<User> {
    ids.iter().map(|id| User::player(id.clone(), id.clone())).collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SlotbarConfig::load(path).await?,
        None => SlotbarConfig::default(),
    };
    if let Some(dir) = args.storage_dir.clone() {
        config.storage.dir = dir;
    }
    if let Some(level) = args.log_level.clone() {
        config.general.log_level = level;
    }

    let log_level = config.general.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("slotbar={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let slotbar = Slotbar::open(config, Arc::new(StandardCatalog)).await?;
    slotbar.initialize().await;

    match args.command {
        Command::Show => print_json(&slotbar.slots().snapshot().await)?,
        Command::Actions => print_json(&slotbar.list_actions().await)?,
        Command::Layout { user, admin } => {
            let user = if admin {
                User::admin(user.clone(), user)
            } else {
                User::player(user.clone(), user)
            };
            print_json(&slotbar.header_layout(&user).await)?;
        }
        Command::Assign { action, slot } => {
            slotbar.assign_action(&action, &slot).await?;
            info!(action_id = %action, slot_id = %slot, "Assigned");
        }
        Command::Unassign { action } => {
            if !slotbar.slots().unassign(&action).await {
                warn!(action_id = %action, "Action was not assigned");
            }
        }
        Command::Hide { slot, visible } => {
            slotbar.slots().set_hidden(&slot, !visible).await?;
        }
        Command::SlotVisibility {
            user,
            index,
            visible,
        } => {
            slotbar
                .visibility()
                .set_slot_visibility(&user, index, visible)
                .await;
        }
        Command::Grant {
            action,
            user,
            visible,
            roster,
        } => {
            let roster = players(&roster);
            slotbar
                .visibility()
                .set_action_visibility(&action, &user, visible, &roster)
                .await;
            print_json(&slotbar.visibility().action_rule(&action).await)?;
        }
        Command::Mode {
            action,
            mode,
            roster,
        } => {
            let roster = players(&roster);
            slotbar
                .visibility()
                .set_action_visibility_mode(&action, mode, &roster)
                .await;
            print_json(&slotbar.visibility().action_rule(&action).await)?;
        }
        Command::Export => print_json(&slotbar.export().await)?,
        Command::Reset => slotbar.reset_all().await,
    }

    Ok(())
}
