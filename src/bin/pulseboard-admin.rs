use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use pulseboard::auth::password::{hash_password, validate_password_strength};
use pulseboard::config::Config;
use pulseboard::models::Role;
use pulseboard::seed;
use pulseboard::storage::{SqliteStorage, Storage, StorageError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pulseboard-admin")]
#[command(about = "PulseBoard admin management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace traffic with 30 days of demo data and create the demo accounts
    Seed {
        /// RNG seed for reproducible data
        #[arg(long = "seed")]
        rng_seed: Option<u64>,
    },
    /// Create a user account
    CreateUser {
        name: String,
        email: String,
        password: String,
        /// ADMIN or VIEWER
        #[arg(long, default_value = "VIEWER")]
        role: String,
    },
    /// Change the role of an existing user
    SetRole {
        email: String,
        /// ADMIN or VIEWER
        role: String,
    },
    /// List all users
    ListUsers,
    /// Create or overwrite an application setting
    SetSetting { key: String, value: String },
}

fn parse_role(raw: &str) -> Result<Role> {
    raw.parse::<Role>().map_err(|e| anyhow!(e))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
    );

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::Seed { rng_seed } => {
            let mut rng = match rng_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let summary = seed::seed(storage.as_ref(), &mut rng, Utc::now()).await?;
            println!(
                "✓ Seeded {} visitors, {} sessions and {} page views ({} new users, {} settings)",
                summary.visitors,
                summary.sessions,
                summary.page_views,
                summary.users_created,
                summary.settings
            );
            println!(
                "  Sign in as admin@pulseboard.io or viewer@pulseboard.io with password '{}'",
                seed::SEED_PASSWORD
            );
        }
        Commands::CreateUser {
            name,
            email,
            password,
            role,
        } => {
            let role = parse_role(&role)?;
            validate_password_strength(&password)?;
            let email = email.trim().to_lowercase();
            let password_hash = hash_password(&password)?;

            match storage.create_user(&name, &email, &password_hash, role).await {
                Ok(user) => println!("✓ Created {} '{}' with id {}", user.role, user.email, user.id),
                Err(StorageError::Conflict) => {
                    return Err(anyhow!("a user with email '{}' already exists", email))
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::SetRole { email, role } => {
            let role = parse_role(&role)?;
            let user = storage
                .get_user_by_email(&email.trim().to_lowercase())
                .await?
                .with_context(|| format!("no user with email '{}'", email))?;

            storage.update_role(user.id, role).await?;
            println!("✓ Set role of '{}' to {}", user.email, role);
        }
        Commands::ListUsers => {
            let users = storage.list_users().await?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<6} {:<8} {:<30} {}", "ID", "Role", "Email", "Name");
                println!("{}", "-".repeat(80));
                for user in users {
                    println!(
                        "{:<6} {:<8} {:<30} {}",
                        user.id, user.role, user.email, user.name
                    );
                }
            }
        }
        Commands::SetSetting { key, value } => {
            let setting = storage.upsert_setting(&key, &value, None).await?;
            println!("✓ {} = {}", setting.key, setting.value);
        }
    }

    Ok(())
}
