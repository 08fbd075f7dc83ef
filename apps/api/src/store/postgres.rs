use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{ResponseStore, SongStore, StoreError, UserStore};
use crate::config::TableNames;
use crate::models::response::{PriorResponse, ResponseRecord};
use crate::models::song::Song;
use crate::models::user::{NewUser, Profile, User};

/// PostgreSQL-backed store. Table names come from configuration and are
/// validated as plain identifiers before they reach this type.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    tables: TableNames,
}

impl PgStore {
    pub fn new(pool: PgPool, tables: TableNames) -> Self {
        PgStore { pool, tables }
    }

    /// Creates the tables and unique indexes when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let TableNames {
            songs,
            responses,
            users,
        } = &self.tables;

        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {songs} (
                    id TEXT PRIMARY KEY,
                    artist TEXT NOT NULL,
                    title TEXT NOT NULL,
                    genre TEXT NOT NULL DEFAULT '',
                    release_date TEXT,
                    popularity INTEGER,
                    spotify_id TEXT,
                    youtube_id TEXT,
                    duration_ms BIGINT,
                    spotify_found BOOLEAN NOT NULL DEFAULT FALSE,
                    is_human_study BOOLEAN NOT NULL DEFAULT FALSE
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {users} (
                    id UUID PRIMARY KEY,
                    email TEXT NOT NULL,
                    password_hash TEXT NOT NULL,
                    gender TEXT,
                    age INTEGER,
                    created_at TIMESTAMPTZ NOT NULL,
                    last_login_at TIMESTAMPTZ,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE
                )
                "#
            ),
            format!("CREATE UNIQUE INDEX IF NOT EXISTS {users}_email_key ON {users} (email)"),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {responses} (
                    user_id UUID NOT NULL,
                    user_gender TEXT,
                    user_age INTEGER,
                    song_id TEXT NOT NULL,
                    spotify_id TEXT,
                    artist TEXT NOT NULL,
                    title TEXT NOT NULL,
                    genre TEXT NOT NULL,
                    release_date TEXT,
                    popularity INTEGER,
                    explicit_content TEXT,
                    sexual_content TEXT,
                    confidence_level TEXT,
                    comments TEXT,
                    status TEXT NOT NULL,
                    song_index INTEGER NOT NULL,
                    session_duration_seconds DOUBLE PRECISION NOT NULL,
                    classification_source TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL
                )
                "#
            ),
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {responses}_user_song_key ON {responses} (user_id, song_id)"
            ),
            format!("CREATE INDEX IF NOT EXISTS {responses}_song_idx ON {responses} (song_id)"),
        ];

        for statement in &statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("Schema ensured for tables {songs}, {users}, {responses}");
        Ok(())
    }
}

#[async_trait]
impl SongStore for PgStore {
    async fn eligible_songs(&self) -> Result<Vec<Song>, StoreError> {
        let sql = format!(
            r#"
            SELECT id, artist, title, genre, release_date, popularity,
                   spotify_id, youtube_id, duration_ms
            FROM {}
            WHERE spotify_found AND is_human_study
            "#,
            self.tables.songs
        );
        Ok(sqlx::query_as::<_, Song>(&sql).fetch_all(&self.pool).await?)
    }

    async fn count_eligible_songs(&self) -> Result<i64, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE spotify_found AND is_human_study",
            self.tables.songs
        );
        Ok(sqlx::query_scalar(&sql).fetch_one(&self.pool).await?)
    }

    async fn response_counts(&self) -> Result<HashMap<String, i64>, StoreError> {
        let sql = format!(
            "SELECT song_id, COUNT(*) FROM {} GROUP BY song_id",
            self.tables.responses
        );
        let rows: Vec<(String, i64)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl ResponseStore for PgStore {
    async fn upsert_response(&self, record: &ResponseRecord) -> Result<(), StoreError> {
        // Single statement: Postgres serializes concurrent writers on the unique index.
        let sql = format!(
            r#"
            INSERT INTO {}
                (user_id, user_gender, user_age,
                 song_id, spotify_id, artist, title, genre, release_date, popularity,
                 explicit_content, sexual_content, confidence_level, comments, status,
                 song_index, session_duration_seconds, classification_source,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT (user_id, song_id) DO UPDATE SET
                user_gender = EXCLUDED.user_gender,
                user_age = EXCLUDED.user_age,
                spotify_id = EXCLUDED.spotify_id,
                artist = EXCLUDED.artist,
                title = EXCLUDED.title,
                genre = EXCLUDED.genre,
                release_date = EXCLUDED.release_date,
                popularity = EXCLUDED.popularity,
                explicit_content = EXCLUDED.explicit_content,
                sexual_content = EXCLUDED.sexual_content,
                confidence_level = EXCLUDED.confidence_level,
                comments = EXCLUDED.comments,
                status = EXCLUDED.status,
                song_index = EXCLUDED.song_index,
                session_duration_seconds = EXCLUDED.session_duration_seconds,
                classification_source = EXCLUDED.classification_source,
                updated_at = EXCLUDED.updated_at
            "#,
            self.tables.responses
        );

        sqlx::query(&sql)
            .bind(record.user_id)
            .bind(&record.user_gender)
            .bind(record.user_age)
            .bind(&record.song_id)
            .bind(&record.spotify_id)
            .bind(&record.artist)
            .bind(&record.title)
            .bind(&record.genre)
            .bind(&record.release_date)
            .bind(record.popularity)
            .bind(&record.explicit_content)
            .bind(&record.sexual_content)
            .bind(&record.confidence_level)
            .bind(&record.comments)
            .bind(&record.status)
            .bind(record.song_index)
            .bind(record.session_duration_seconds)
            .bind(&record.classification_source)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn responses_for_user(&self, user_id: Uuid) -> Result<Vec<PriorResponse>, StoreError> {
        let sql = format!(
            "SELECT song_id, status FROM {} WHERE user_id = $1",
            self.tables.responses
        );
        Ok(sqlx::query_as::<_, PriorResponse>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE email = $1", self.tables.users);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO {}
                (id, email, password_hash, gender, age, created_at, last_login_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, NULL, TRUE)
            RETURNING *
            "#,
            self.tables.users
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.profile.gender)
            .bind(user.profile.age)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET last_login_at = $1 WHERE id = $2",
            self.tables.users
        );
        sqlx::query(&sql)
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_profile(&self, user_id: Uuid, profile: &Profile) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET gender = $1, age = $2 WHERE id = $3",
            self.tables.users
        );
        sqlx::query(&sql)
            .bind(&profile.gender)
            .bind(profile.age)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
