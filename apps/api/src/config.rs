use anyhow::{bail, Context, Result};

const DEFAULT_DATABASE_NAME: &str = "ml_workshop";

/// Application configuration loaded from environment variables.
/// Fails at startup if `DATABASE_URL` is missing; everything else is defaulted.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Overrides the database named in the URL when set.
    pub database_name: Option<String>,
    pub tables: TableNames,
    pub port: u16,
    pub session_timeout_minutes: i64,
    /// Idle sessions are dropped from memory after this long.
    pub session_retention_minutes: i64,
    pub rust_log: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub songs: String,
    pub responses: String,
    pub users: String,
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames {
            songs: "songs_lang".to_string(),
            responses: "user_responses".to_string(),
            users: "users".to_string(),
        }
    }
}

impl TableNames {
    /// Table names are spliced into SQL text, so only plain identifiers pass.
    pub fn validate(&self) -> Result<()> {
        for name in [&self.songs, &self.responses, &self.users] {
            if !is_sql_identifier(name) {
                bail!("Table name '{name}' is not a valid SQL identifier");
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = TableNames::default();
        let tables = TableNames {
            songs: env_or("SONGS_TABLE", &defaults.songs),
            responses: env_or("RESPONSES_TABLE", &defaults.responses),
            users: env_or("USERS_TABLE", &defaults.users),
        };
        tables.validate()?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            database_name: std::env::var("DATABASE_NAME").ok(),
            tables,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            session_timeout_minutes: std::env::var("SESSION_TIMEOUT_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<i64>()
                .context("SESSION_TIMEOUT_MINUTES must be a whole number of minutes")?,
            session_retention_minutes: std::env::var("SESSION_RETENTION_MINUTES")
                .unwrap_or_else(|_| "240".to_string())
                .parse::<i64>()
                .context("SESSION_RETENTION_MINUTES must be a whole number of minutes")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// The database to connect to: explicit override, then the URL's own, then the default.
    pub fn resolve_database_name(&self, from_url: Option<&str>) -> String {
        self.database_name
            .as_deref()
            .or(from_url)
            .unwrap_or(DEFAULT_DATABASE_NAME)
            .to_string()
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
