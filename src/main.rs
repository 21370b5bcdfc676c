use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use readmark::config::Config;
use readmark::reader::Reader;
use readmark::storage::{Database, DatabaseError, Story, StoryError, StoryId};
use readmark::util::{display_width, truncate_to_width};

/// Column budget for a story line in list output
const LINE_WIDTH: usize = 100;

/// Get the config directory path (~/.config/readmark/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("readmark"))
}

#[derive(Parser, Debug)]
#[command(name = "readmark", about = "Track which feed stories you have read")]
struct Args {
    /// Database file (overrides database_path in config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List unread stories
    Unread {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List read stories, one page at a time
    Archive {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        json: bool,
    },
    /// Mark a single story read (or unread)
    Mark {
        id: String,
        #[arg(long)]
        unread: bool,
    },
    /// Mark a batch of stories read in the background
    MarkAll {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

fn print_stories(stories: &[Story]) {
    for story in stories {
        let prefix = format!("{:>6}  {}  ", story.id, story.source);
        let room = LINE_WIDTH.saturating_sub(display_width(&prefix));
        println!("{}{}", prefix, truncate_to_width(&story.headline, room));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    let config = Config::load(&config_dir.join("config.toml")).context("Failed to load config")?;

    let db_path = match (args.db, &config.database_path) {
        (Some(path), _) => path,
        (None, Some(path)) => PathBuf::from(path),
        (None, None) => config_dir.join("readmark.db"),
    };
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;

    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: {}", DatabaseError::InstanceLocked);
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    let reader = Reader::new(Arc::new(db), &config);

    match args.command {
        Command::Unread { json } => {
            let stories = reader.list_unread().await.context("Failed to list unread stories")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stories)?);
            } else if stories.is_empty() {
                println!("You have no unread stories.");
            } else {
                print_stories(&stories);
            }
        }
        Command::Archive { page, json } => {
            let page = reader.list_read(page).await.context("Failed to list read stories")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_stories(&page.items);
                println!(
                    "page {} of {} ({} read)",
                    page.page,
                    page.total_pages().max(1),
                    page.total_items
                );
            }
        }
        Command::Mark { id, unread } => {
            let Some(story_id) = StoryId::parse(&id) else {
                eprintln!("Error: '{}' is not a story id", id);
                std::process::exit(1);
            };
            match reader.set_read_state(story_id, !unread).await {
                Ok(story) => {
                    let state = if story.is_read { "read" } else { "unread" };
                    println!("Marked {} as {}", story.id, state);
                }
                Err(StoryError::NotFound(id)) => {
                    eprintln!("Error: story {} not found", id);
                    std::process::exit(1);
                }
                Err(e) => return Err(e).context("Failed to update story"),
            }
        }
        Command::MarkAll { ids } => {
            let ack = reader
                .enqueue_mark_all_as_read(ids)
                .context("Failed to queue mark all as read")?;
            println!("Queued {} stories to mark as read", ack.accepted);
        }
    }

    // Drain any queued bulk job before exiting
    reader.shutdown().await;
    Ok(())
}
