use crate::analytics::{PageViewRecord, SessionRecord, VisitorRecord, Window};
use crate::models::{NewPageView, NewSession, NewVisitor, Role, Setting, User, UserSummary};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        // Every connection to an in-memory database gets its own empty database,
        // so those pools are pinned to a single long-lived connection.
        let in_memory = database_url.contains(":memory:");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = options
            .connect(database_url)
            .await
            .with_context(|| format!("failed to open SQLite database at {database_url}"))?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse::<Role>().map_err(|e| anyhow!(e))?,
            created_at: from_millis(row.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct SettingRow {
    id: i64,
    key: String,
    value: String,
    updated_at: i64,
    editor_id: Option<i64>,
    editor_name: Option<String>,
    editor_email: Option<String>,
}

impl TryFrom<SettingRow> for Setting {
    type Error = anyhow::Error;

    fn try_from(row: SettingRow) -> Result<Self> {
        let updated_by = match (row.editor_id, row.editor_name, row.editor_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary { id, name, email }),
            _ => None,
        };

        Ok(Setting {
            id: row.id,
            key: row.key,
            value: row.value,
            updated_by,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: i64,
    visitor_id: i64,
    country: String,
    browser: String,
    device: String,
    os: String,
    started_at: i64,
    ended_at: i64,
    duration: i64,
    page_view_count: i64,
}

impl TryFrom<SessionRow> for SessionRecord {
    type Error = anyhow::Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(SessionRecord {
            id: row.id,
            visitor: VisitorRecord {
                id: row.visitor_id,
                country: row.country,
                browser: row.browser,
                device: row.device,
                os: row.os,
            },
            started_at: from_millis(row.started_at)?,
            ended_at: from_millis(row.ended_at)?,
            duration_secs: row.duration,
            page_view_count: u32::try_from(row.page_view_count)
                .context("page view count out of range")?,
        })
    }
}

#[derive(FromRow)]
struct PageViewRow {
    id: i64,
    session_id: i64,
    visitor_id: i64,
    path: String,
    referrer: Option<String>,
    created_at: i64,
}

impl TryFrom<PageViewRow> for PageViewRecord {
    type Error = anyhow::Error;

    fn try_from(row: PageViewRow) -> Result<Self> {
        Ok(PageViewRecord {
            id: row.id,
            session_id: row.session_id,
            visitor_id: row.visitor_id,
            path: row.path,
            referrer: row.referrer,
            created_at: from_millis(row.created_at)?,
        })
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| anyhow!("invalid timestamp {millis}"))
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

const SETTING_SELECT: &str = r#"
    SELECT s.id, s.key, s.value, s.updated_at,
           u.id AS editor_id, u.name AS editor_name, u.email AS editor_email
    FROM settings s
    LEFT JOIN users u ON u.id = s.updated_by
"#;

impl SqliteStorage {
    async fn fetch_setting(&self, id: i64) -> Result<Option<Setting>> {
        let row = sqlx::query_as::<_, SettingRow>(&format!("{SETTING_SELECT} WHERE s.id = ?"))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(Setting::try_from).transpose()
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'VIEWER',
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                value TEXT NOT NULL,
                updated_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visitors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                country TEXT NOT NULL,
                browser TEXT NOT NULL,
                device TEXT NOT NULL,
                os TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                visitor_id INTEGER NOT NULL REFERENCES visitors(id) ON DELETE CASCADE,
                started_at INTEGER NOT NULL,
                ended_at INTEGER NOT NULL,
                duration INTEGER NOT NULL DEFAULT 0 CHECK (duration >= 0)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS page_views (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                path TEXT NOT NULL,
                referrer TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_visitor ON sessions(visitor_id)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_page_views_created_at ON page_views(created_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_page_views_session ON page_views(session_id)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> StorageResult<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(now_millis())
        .execute(self.pool.as_ref())
        .await;

        let result = match result {
            Ok(result) => result,
            Err(e) if is_unique_violation(&e) => return Err(StorageError::Conflict),
            Err(e) => return Err(StorageError::Other(e.into())),
        };

        self.get_user(result.last_insert_rowid())
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn update_profile(&self, id: i64, name: &str, email: &str) -> StorageResult<User> {
        let result = sqlx::query("UPDATE users SET name = ?, email = ? WHERE id = ?")
            .bind(name)
            .bind(email)
            .bind(id)
            .execute(self.pool.as_ref())
            .await;

        match result {
            Ok(r) if r.rows_affected() == 0 => return Err(StorageError::NotFound),
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(StorageError::Conflict),
            Err(e) => return Err(StorageError::Other(e.into())),
        }

        self.get_user(id).await?.ok_or(StorageError::NotFound)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_role(&self, id: i64, role: Role) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_settings(&self) -> Result<Vec<Setting>> {
        sqlx::query_as::<_, SettingRow>(&format!("{SETTING_SELECT} ORDER BY s.key ASC"))
            .fetch_all(self.pool.as_ref())
            .await?
            .into_iter()
            .map(Setting::try_from)
            .collect()
    }

    async fn update_setting(
        &self,
        id: i64,
        value: &str,
        updated_by: Option<i64>,
    ) -> StorageResult<Setting> {
        let result = sqlx::query(
            r#"
            UPDATE settings
            SET value = ?, updated_by = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(value)
        .bind(updated_by)
        .bind(now_millis())
        .bind(id)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.fetch_setting(id).await?.ok_or(StorageError::NotFound)
    }

    async fn upsert_setting(
        &self,
        key: &str,
        value: &str,
        updated_by: Option<i64>,
    ) -> Result<Setting> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_by, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(updated_by)
        .bind(now_millis())
        .execute(self.pool.as_ref())
        .await?;

        let row = sqlx::query_as::<_, SettingRow>(&format!("{SETTING_SELECT} WHERE s.key = ?"))
            .bind(key)
            .fetch_one(self.pool.as_ref())
            .await?;

        Setting::try_from(row)
    }

    async fn sessions_between(&self, window: &Window) -> Result<Vec<SessionRecord>> {
        sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT s.id, s.visitor_id, v.country, v.browser, v.device, v.os,
                   s.started_at, s.ended_at, s.duration,
                   (SELECT COUNT(*) FROM page_views p WHERE p.session_id = s.id) AS page_view_count
            FROM sessions s
            JOIN visitors v ON v.id = s.visitor_id
            WHERE s.started_at >= ? AND s.started_at <= ?
            ORDER BY s.started_at ASC, s.id ASC
            "#,
        )
        .bind(window.from.timestamp_millis())
        .bind(window.to.timestamp_millis())
        .fetch_all(self.pool.as_ref())
        .await?
        .into_iter()
        .map(SessionRecord::try_from)
        .collect()
    }

    async fn page_views_between(&self, window: &Window) -> Result<Vec<PageViewRecord>> {
        sqlx::query_as::<_, PageViewRow>(
            r#"
            SELECT p.id, p.session_id, s.visitor_id, p.path, p.referrer, p.created_at
            FROM page_views p
            JOIN sessions s ON s.id = p.session_id
            WHERE p.created_at >= ? AND p.created_at <= ?
            ORDER BY p.created_at ASC, p.id ASC
            "#,
        )
        .bind(window.from.timestamp_millis())
        .bind(window.to.timestamp_millis())
        .fetch_all(self.pool.as_ref())
        .await?
        .into_iter()
        .map(PageViewRecord::try_from)
        .collect()
    }

    async fn count_page_views_between(&self, window: &Window) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM page_views WHERE created_at >= ? AND created_at <= ?",
        )
        .bind(window.from.timestamp_millis())
        .bind(window.to.timestamp_millis())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert_visitors(&self, visitors: &[NewVisitor]) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let created_at = now_millis();
        let mut ids = Vec::with_capacity(visitors.len());

        for visitor in visitors {
            let result = sqlx::query(
                r#"
                INSERT INTO visitors (country, browser, device, os, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&visitor.country)
            .bind(&visitor.browser)
            .bind(&visitor.device)
            .bind(&visitor.os)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
            ids.push(result.last_insert_rowid());
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn insert_sessions(&self, sessions: &[NewSession]) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(sessions.len());

        for session in sessions {
            let result = sqlx::query(
                r#"
                INSERT INTO sessions (visitor_id, started_at, ended_at, duration)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(session.visitor_id)
            .bind(session.started_at.timestamp_millis())
            .bind(session.ended_at.timestamp_millis())
            .bind(session.duration_secs())
            .execute(&mut *tx)
            .await?;
            ids.push(result.last_insert_rowid());
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn insert_page_views(&self, page_views: &[NewPageView]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for view in page_views {
            sqlx::query(
                r#"
                INSERT INTO page_views (session_id, path, referrer, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(view.session_id)
            .bind(&view.path)
            .bind(view.referrer.as_deref())
            .bind(view.created_at.timestamp_millis())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn clear_analytics(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM page_views").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM sessions").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM visitors").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn setup() -> SqliteStorage {
        let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
        storage.init().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let storage = setup().await;
        storage
            .create_user("A", "a@example.com", "hash", Role::Viewer)
            .await
            .unwrap();

        let err = storage
            .create_user("B", "a@example.com", "hash", Role::Viewer)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn session_rows_carry_visitor_and_page_view_count() {
        let storage = setup().await;
        let started_at = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();

        let visitor_ids = storage
            .insert_visitors(&[NewVisitor {
                country: "DE".to_string(),
                browser: "Safari".to_string(),
                device: "tablet".to_string(),
                os: "iOS".to_string(),
            }])
            .await
            .unwrap();
        let session_ids = storage
            .insert_sessions(&[NewSession {
                visitor_id: visitor_ids[0],
                started_at,
                ended_at: started_at + Duration::seconds(90),
            }])
            .await
            .unwrap();
        storage
            .insert_page_views(&[
                NewPageView {
                    session_id: session_ids[0],
                    path: "/home".to_string(),
                    referrer: Some("github".to_string()),
                    created_at: started_at,
                },
                NewPageView {
                    session_id: session_ids[0],
                    path: "/docs".to_string(),
                    referrer: None,
                    created_at: started_at + Duration::seconds(30),
                },
            ])
            .await
            .unwrap();

        let window = Window::new(started_at - Duration::hours(1), started_at + Duration::hours(1));
        let sessions = storage.sessions_between(&window).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].visitor.device, "tablet");
        assert_eq!(sessions[0].duration_secs, 90);
        assert_eq!(sessions[0].page_view_count, 2);

        let views = storage.page_views_between(&window).await.unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].visitor_id, visitor_ids[0]);
        assert_eq!(storage.count_page_views_between(&window).await.unwrap(), 2);

        let inverted = Window::new(window.to, window.from);
        assert!(storage.sessions_between(&inverted).await.unwrap().is_empty());
    }
}
