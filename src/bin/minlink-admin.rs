use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use minlink::config::{Config, DatabaseBackend};
use minlink::storage::{PostgresStorage, SqliteStorage, Storage, StorageError};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "minlink-admin")]
#[command(about = "minlink link management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a short link
    Create {
        /// Destination URL
        url: String,
        /// Custom short code (random when omitted)
        #[arg(long)]
        code: Option<String>,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
    /// List links
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// List recorded visits for a link
    Visits {
        /// Short code of the link
        code: String,
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Delete a link and its visits
    Delete {
        /// Short code of the link
        code: String,
    },
}

/// Random code collisions are possible; retry a few times before giving up.
const CREATE_ATTEMPTS: usize = 3;

const SHORT_CODE_LEN: usize = 6;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
        DatabaseBackend::Postgres => Arc::new(PostgresStorage::new(&config.database.url).await?),
    };

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::Create {
            url,
            code,
            description,
        } => {
            let link = match code {
                Some(code) => {
                    match storage
                        .create_with_code(&code, &url, description.as_deref())
                        .await
                    {
                        Ok(link) => link,
                        Err(StorageError::Conflict) => {
                            bail!("short code '{code}' already exists")
                        }
                        Err(StorageError::Other(err)) => return Err(err),
                    }
                }
                None => {
                    let mut created = None;
                    for _ in 0..CREATE_ATTEMPTS {
                        let code = nanoid::nanoid!(SHORT_CODE_LEN);
                        match storage
                            .create_with_code(&code, &url, description.as_deref())
                            .await
                        {
                            Ok(link) => {
                                created = Some(link);
                                break;
                            }
                            Err(StorageError::Conflict) => continue,
                            Err(StorageError::Other(err)) => return Err(err),
                        }
                    }
                    match created {
                        Some(link) => link,
                        None => bail!(
                            "failed to generate a unique short code after {CREATE_ATTEMPTS} attempts"
                        ),
                    }
                }
            };

            println!("✓ Created '{}' -> {}", link.short_code, link.original_url);
        }
        Commands::List { limit, offset } => {
            let links = storage.list(limit, offset).await?;
            if links.is_empty() {
                println!("No links found.");
            } else {
                println!("{:<10} {:<8} {:<20} {}", "Code", "Visits", "Created", "URL");
                println!("{}", "-".repeat(80));
                for link in links {
                    println!(
                        "{:<10} {:<8} {:<20} {}",
                        link.short_code,
                        link.visits_count,
                        format_unix(link.created_at),
                        link.original_url
                    );
                }
            }
        }
        Commands::Visits {
            code,
            limit,
            offset,
        } => {
            let link = match storage.get_by_code(&code).await? {
                Some(link) => link,
                None => bail!("no link with short code '{code}'"),
            };

            let visits = storage.visits_for_link(link.id, limit, offset).await?;
            if visits.is_empty() {
                println!("No visits recorded for '{}'.", code);
            } else {
                println!(
                    "{:<20} {:<16} {:<12} {:<10} {:<10} {:<10} {}",
                    "Time", "IP", "Country", "City", "Device", "Browser", "Referrer"
                );
                println!("{}", "-".repeat(100));
                for visit in visits {
                    println!(
                        "{:<20} {:<16} {:<12} {:<10} {:<10} {:<10} {}",
                        format_unix(visit.created_at),
                        visit.ip.as_deref().unwrap_or("-"),
                        visit.country,
                        visit.city,
                        visit.device_type,
                        visit.browser_name,
                        visit.referrer
                    );
                }
            }
        }
        Commands::Delete { code } => {
            let link = match storage.get_by_code(&code).await? {
                Some(link) => link,
                None => bail!("no link with short code '{code}'"),
            };

            let deleted = storage.delete(link.id).await?;
            if deleted {
                println!("✓ Deleted '{}' and its visits", code);
            } else {
                println!("⚠ Link '{}' was already gone", code);
            }
        }
    }

    Ok(())
}

fn format_unix(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
