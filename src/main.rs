use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ifac_tracker::catalog;
use ifac_tracker::config::Config;
use ifac_tracker::storage::{Database, DatabaseError};
use ifac_tracker::tracker::Tracker;
use ifac_tracker::user_topics::{add_outcome, AddOutcome, TopicDraft};
use ifac_tracker::view::ViewState;

/// Get the config directory path (~/.config/ifac-tracker/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("ifac-tracker");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(name = "ifac", about = "Track progress through IFAC technical competence topics")]
struct Args {
    /// Config file (defaults to ~/.config/ifac-tracker/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List topics with their progress
    List {
        /// Only show topics matching this text
        #[arg(short, long)]
        query: Option<String>,

        /// Show every item with its checked state
        #[arg(short, long)]
        expand: bool,
    },
    /// Check or uncheck an item
    Toggle { code: String, item: String },
    /// Add a topic, replacing any user topic with the same code
    Add {
        /// Topic code (generated as USER-### when omitted)
        #[arg(long, default_value = "")]
        code: String,

        #[arg(long, default_value = "")]
        name: String,

        /// Items, one per line
        #[arg(long, default_value = "")]
        items: String,

        /// Keywords (comma-separated)
        #[arg(long, default_value = "")]
        keywords: String,
    },
    /// Append an item to a user topic
    Append { code: String, text: String },
    /// Print overall progress
    Progress,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let catalog = catalog::load(config.catalog_path.as_deref())
        .await
        .context("Failed to load topic catalog")?;

    let db_path = config.database_file(&config_dir);
    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of ifac appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let tracker = Tracker::start(db, catalog)
        .await
        .context("Failed to load saved progress")?;

    match args.command.unwrap_or(Command::List {
        query: None,
        expand: false,
    }) {
        Command::List { query, expand } => {
            if let Some(query) = query {
                tracker.set_query(&query);
            }
            print_view(&tracker.snapshot(), expand);
        }
        Command::Toggle { code, item } => {
            if !tracker.snapshot().has_item(&code, &item) {
                tracker.shutdown().await;
                anyhow::bail!("No item \"{}\" in topic {}", item, code);
            }
            tracker.toggle(&code, &item);
            tracker.flush().await;
            let view = tracker.snapshot();
            println!("{} {}", checkbox(view.is_checked(&code, &item)), item);
            println!("Overall Progress: {}%", view.overall_percent());
        }
        Command::Add {
            code,
            name,
            items,
            keywords,
        } => {
            let draft = TopicDraft::from_input(&code, &name, &items, &keywords);
            let code = draft.code.clone();
            let before = tracker.snapshot().all;
            tracker.add_custom_topic(draft);
            tracker.flush().await;
            match add_outcome(&before, &tracker.snapshot().all, &code) {
                Some(AddOutcome::Added(topic)) => {
                    println!("Added {} – {}", topic.code, topic.name)
                }
                Some(AddOutcome::Replaced(topic)) => {
                    println!("Replaced {} – {}", topic.code, topic.name)
                }
                None => eprintln!("Warning: topic was not saved"),
            }
        }
        Command::Append { code, text } => {
            tracker.add_item_to_topic(&code, &text);
            tracker.flush().await;
        }
        Command::Progress => {
            println!("{}%", tracker.snapshot().overall_percent());
        }
    }

    tracker.shutdown().await;
    Ok(())
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}

fn print_view(view: &ViewState, expand: bool) {
    println!("Overall Progress: {}%", view.overall_percent());
    if view.filtered.is_empty() {
        println!();
        println!("No topics match \"{}\"", view.query.trim());
        return;
    }

    for entry in &view.filtered {
        let topic = &entry.topic;
        println!();
        println!(
            "{} – {}  {} / {} complete",
            topic.code, topic.name, entry.progress.checked, entry.progress.total
        );
        if !topic.keywords.trim().is_empty() {
            println!("  Keywords: {}", topic.keywords);
        }
        if expand {
            for item in &topic.items {
                println!("  {} {}", checkbox(view.is_checked(&topic.code, item)), item);
            }
        }
    }
}
