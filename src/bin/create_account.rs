use std::io::{self, Write};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use vidtube_api::auth::passwords::PasswordService;

#[derive(Parser, Debug)]
#[command(name = "create_account", about = "Create a vidtube account directly in the database")]
struct Args {
    /// Username for the account (case insensitive, stored lowercased).
    #[arg(long)]
    username: String,

    /// Email address for the account (case insensitive).
    #[arg(long)]
    email: String,

    /// Plaintext password to hash and store for this account.
    #[arg(long)]
    password: String,

    /// Display name to associate with the account.
    #[arg(long)]
    full_name: String,

    /// Avatar URL to store (uploads are handled by the API, not this tool).
    #[arg(long)]
    avatar_url: String,

    /// Optional cover image URL.
    #[arg(long)]
    cover_image_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let username = args.username.trim().to_lowercase();
    let email = args.email.trim().to_lowercase();

    if !email.contains('@') {
        writeln!(io::stderr(), "error: email must contain '@'")?;
        std::process::exit(1);
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM accounts WHERE lower(username) = lower($1) OR lower(email) = lower($2)",
    )
    .bind(&username)
    .bind(&email)
    .fetch_one(&pool)
    .await?;

    if existing > 0 {
        writeln!(
            io::stderr(),
            "error: an account with username '{username}' or email '{email}' already exists."
        )?;
        std::process::exit(1);
    }

    let password_service = PasswordService::new()
        .map_err(|err| format!("password service initialization failed: {err}"))?;
    let password_hash = password_service
        .hash_password(args.password.trim())
        .map_err(|err| format!("password hashing failed: {err}"))?;

    let account_id = sqlx::query_scalar::<_, uuid::Uuid>(
        r#"
        INSERT INTO accounts (username, email, full_name, avatar_url, cover_image_url, password_hash)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&username)
    .bind(&email)
    .bind(args.full_name.trim())
    .bind(args.avatar_url.trim())
    .bind(args.cover_image_url.as_deref().map(str::trim))
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    println!("created account {account_id} ({username})");

    Ok(())
}
