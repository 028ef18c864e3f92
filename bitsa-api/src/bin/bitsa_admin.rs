//! # BITSA admin CLI
//!
//! Operator commands that run directly against the database named by
//! `DATABASE_URL` (a `.env` file is honored).
//!
//! ```bash
//! bitsa-admin migrate
//! bitsa-admin status
//! bitsa-admin create-admin --email admin@bitsa.dev --password 's3cret!'
//! bitsa-admin seed
//! ```

use anyhow::{bail, Context, Result};
use bitsa_api::seed::{self, ATTENDEES, ORGANIZERS, SEED_PASSWORD};
use bitsa_shared::{
    auth::password,
    db::{
        migrations::{ensure_database_exists, get_migration_status, run_migrations},
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    models::user::{CreateUser, User},
};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

/// BITSA backend administration.
#[derive(Parser, Debug)]
#[command(name = "bitsa-admin", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database if needed and apply pending migrations.
    Migrate,
    /// Show applied and known migrations.
    Status,
    /// Create a staff account, or promote and reset the password of an existing one.
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Defaults to the part of the email before `@`.
        #[arg(long)]
        username: Option<String>,
    },
    /// Create demo organizers, attendees and sample events (safe to re-run).
    Seed,
}

/// Username used when none is given: the email's local part
fn default_username(email: &str) -> &str {
    email.split_once('@').map_or(email, |(local, _)| local)
}

async fn connect(database_url: &str) -> Result<PgPool> {
    create_pool(DatabaseConfig {
        max_connections: 2,
        ..DatabaseConfig::new(database_url)
    })
    .await
    .context("Failed to connect to the database")
}

async fn cmd_migrate(database_url: &str) -> Result<()> {
    ensure_database_exists(database_url)
        .await
        .context("Failed to create the database")?;

    let pool = connect(database_url).await?;
    run_migrations(&pool).await.context("Migration failed")?;

    let status = get_migration_status(&pool).await?;
    println!(
        "Applied {}/{} migrations (latest: {})",
        status.applied_migrations,
        status.known_migrations,
        status
            .latest_version
            .map_or_else(|| "none".to_string(), |v| v.to_string())
    );

    close_pool(pool).await;
    Ok(())
}

async fn cmd_status(database_url: &str) -> Result<()> {
    let pool = connect(database_url).await?;
    let status = get_migration_status(&pool).await?;

    println!("applied:    {}", status.applied_migrations);
    println!("known:      {}", status.known_migrations);
    println!("up to date: {}", status.is_up_to_date);

    close_pool(pool).await;
    Ok(())
}

async fn cmd_create_admin(
    database_url: &str,
    email: &str,
    raw_password: &str,
    username: Option<&str>,
) -> Result<()> {
    let email = email.trim();
    if !email.contains('@') {
        bail!("--email must be an email address");
    }
    password::validate_password(raw_password).map_err(anyhow::Error::msg)?;

    let username = username.unwrap_or_else(|| default_username(email));
    let password_hash = password::hash_password(raw_password)?;

    let pool = connect(database_url).await?;

    let existing = match User::find_by_email(&pool, email).await? {
        Some(user) => Some(user),
        None => User::find_by_username(&pool, username).await?,
    };

    let user = match existing {
        Some(user) => {
            let promoted = User::promote_to_staff(&pool, user.id, &password_hash)
                .await?
                .context("User disappeared while being promoted")?;
            println!(
                "Updated user \"{}\" <{}>: password reset, is_staff=true",
                promoted.username, promoted.email
            );
            promoted
        }
        None => {
            let created = User::create(
                &pool,
                CreateUser {
                    username: username.to_string(),
                    email: email.to_string(),
                    first_name: String::new(),
                    last_name: String::new(),
                    password_hash,
                    is_staff: true,
                },
            )
            .await?;
            println!(
                "Created staff user \"{}\" <{}>",
                created.username, created.email
            );
            created
        }
    };

    tracing::info!(user_id = user.id, "Staff account ready");

    close_pool(pool).await;
    Ok(())
}

async fn cmd_seed(database_url: &str) -> Result<()> {
    let pool = connect(database_url).await?;
    let report = seed::seed_events(&pool).await?;

    println!(
        "Seed complete: created {} events, skipped {} existing events.",
        report.created, report.skipped
    );
    println!(
        "Users available: {} (password: {})",
        ORGANIZERS.iter().chain(ATTENDEES.iter()).copied().collect::<Vec<_>>().join("/"),
        SEED_PASSWORD
    );

    close_pool(pool).await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

    match cli.command {
        Commands::Migrate => cmd_migrate(&database_url).await,
        Commands::Status => cmd_status(&database_url).await,
        Commands::CreateAdmin {
            email,
            password,
            username,
        } => cmd_create_admin(&database_url, &email, &password, username.as_deref()).await,
        Commands::Seed => cmd_seed(&database_url).await,
    }
}
