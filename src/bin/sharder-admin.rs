//! `sharder-admin` - inspect and override bucket assignments.
//!
//! ```text
//! sharder-admin list-hubs
//! sharder-admin list-users --hub hub-2
//! sharder-admin find-user alice
//! sharder-admin move-user alice --to-hub hub-3
//! sharder-admin migrate-hub hub-1 --to-hub hub-4
//! sharder-admin -c ./sharder.yml assign bob
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sharder::{
    Admin, Assignment, LoadReport, ShardConfig, Sharder, SqliteAssignmentStore,
    DEFAULT_CONFIG_PATH,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sharder-admin", version, about = "Sharder admin utility")]
struct Cli {
    /// The sharder config file.
    #[arg(short, long = "config-file", global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find a user.
    FindUser { user: String },

    /// List all users, or only those on one hub.
    ListUsers {
        #[arg(long)]
        hub: Option<String>,
    },

    /// List all hubs with raw, extra and effective totals.
    ListHubs {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete a user's assignment.
    DeleteUser { user: String },

    /// Add a user to a specific hub.
    AddUser {
        user: String,
        #[arg(long)]
        to_hub: String,
    },

    /// Move a user to another hub.
    MoveUser {
        user: String,
        #[arg(long)]
        to_hub: String,
    },

    /// Move every user on a hub to another hub.
    MigrateHub {
        hub: String,
        #[arg(long)]
        to_hub: String,
    },

    /// Resolve a user's hub, assigning the least loaded one if needed.
    Assign { user: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ShardConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    setup_tracing(&config.log_level);

    let registry = config.registry()?;
    let store = config.sqlite_store();

    // Opening the sharder creates the schema (and legacy placeholders) the
    // admin commands expect to find.
    let sharder = Sharder::open_with(
        config.kind.clone(),
        registry.clone(),
        store.clone(),
        config.sharder_options(),
    )?;
    let admin = Admin::new(config.kind.clone(), registry, store);

    run(&sharder, &admin, cli.command)
}

fn run(
    sharder: &Sharder<SqliteAssignmentStore>,
    admin: &Admin<SqliteAssignmentStore>,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::FindUser { user } => print_users(&[admin.find_user(&user)?]),
        Commands::ListUsers { hub } => print_users(&admin.list_users(hub.as_deref())?),
        Commands::ListHubs { json } => {
            let report = admin.list_buckets()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_hubs(&report);
            }
        }
        Commands::DeleteUser { user } => {
            let row = admin.delete_user(&user)?;
            println!("Deleted {} from {}", row.name, row.bucket);
        }
        Commands::AddUser { user, to_hub } => {
            let row = admin.add_user(&user, &to_hub)?;
            println!("Added {} to {}", row.name, row.bucket);
        }
        Commands::MoveUser { user, to_hub } => {
            let row = admin.move_user(&user, &to_hub)?;
            println!("Moved {} from {} to {}", row.name, row.bucket, to_hub);
        }
        Commands::MigrateHub { hub, to_hub } => {
            let moved = admin.migrate_bucket(&hub, &to_hub)?;
            println!("Moved {} users from {} to {}", moved, hub, to_hub);
        }
        Commands::Assign { user } => println!("{}", sharder.assign(&user)?),
    }
    Ok(())
}

fn print_users(rows: &[Assignment]) {
    println!("{: <45} {: <30}", "Username", "Hub");
    for row in rows {
        println!("{: <45} {: <30}", row.name, row.bucket);
    }
}

fn print_hubs(report: &LoadReport) {
    println!(
        "{: <35} {: <10} {: <10} {: <20}",
        "Hub", "Raw", "Extra", "Effective Total Users"
    );
    for entry in &report.buckets {
        let name = if entry.configured {
            entry.bucket.clone()
        } else {
            format!("{} (unconfigured)", entry.bucket)
        };
        println!(
            "{: <35} {: <10} {: <10} {: <10}",
            name, entry.raw, entry.extra, entry.effective
        );
    }
}

/// Respects `RUST_LOG` if set, otherwise uses the configured level. Logs go to stderr.
fn setup_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
