use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::{ChatHistory, User};

/// Account lookup and creation. Users are never deleted.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>>;
}

/// Per-user history documents: find-by-owner and whole-document upsert.
/// Callers are responsible for serializing read-modify-write cycles.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<ChatHistory>>;
    async fn upsert(&self, history: &ChatHistory) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Turso HTTP store
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TursoResponse {
    results: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    rows: Option<Vec<Vec<serde_json::Value>>>,
}

/// Store backed by Turso's HTTP pipeline API. Users live in a `users`
/// table; each ChatHistory is one JSON document in `chat_histories`,
/// written back whole on every update.
pub struct TursoStore {
    client: Client,
    database_url: String,
    auth_token: String,
}

fn sql_escape(s: &str) -> String {
    s.replace('\'', "''")
}

fn opt_sql(v: &Option<String>) -> String {
    match v {
        Some(s) => format!("'{}'", sql_escape(s)),
        None => "NULL".to_string(),
    }
}

impl TursoStore {
    pub fn new(database_url: String, auth_token: String) -> Self {
        Self {
            client: Client::new(),
            database_url: database_url.replace("libsql://", "https://"),
            // Trim whitespace and carriage returns from the auth token
            auth_token: auth_token.trim().to_string(),
        }
    }

    async fn execute_sql(&self, sql: &str) -> Result<TursoResponse> {
        let url = format!("{}/v2/pipeline", self.database_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .json(&json!({
                "requests": [{"type": "execute", "stmt": {"sql": sql}}]
            }))
            .send()
            .await
            .context("Failed to send request to Turso")?;

        if !response.status().is_success() {
            let status = response.status();
            let text: String = response.text().await.unwrap_or_default();
            anyhow::bail!("Turso request failed with status {}: {}", status, text);
        }

        let json_response: serde_json::Value = response.json().await?;
        let results = json_response["results"]
            .as_array()
            .context("Invalid response format")?;

        Ok(TursoResponse {
            results: results
                .iter()
                .map(|r| QueryResult {
                    rows: r["response"]["result"]["rows"].as_array().map(|rows| {
                        rows.iter()
                            .map(|row| {
                                row.as_array()
                                    .unwrap_or(&vec![])
                                    .iter()
                                    .map(|v| v["value"].clone())
                                    .collect()
                            })
                            .collect()
                    }),
                })
                .collect(),
        })
    }

    /// Initialize the database schema
    pub async fn initialize(&self) -> Result<()> {
        self.execute_sql(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT,
                google_id TEXT,
                picture TEXT
            )",
        )
        .await?;

        self.execute_sql(
            "CREATE TABLE IF NOT EXISTS chat_histories (
                user_id TEXT PRIMARY KEY,
                doc TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .await?;

        self.execute_sql(
            "CREATE INDEX IF NOT EXISTS idx_users_google_id
             ON users(google_id)",
        )
        .await?;

        Ok(())
    }

    fn user_from_row(row: &[serde_json::Value]) -> User {
        User {
            id: row[0].as_str().unwrap_or("").to_string(),
            name: row[1].as_str().unwrap_or("").to_string(),
            email: row[2].as_str().unwrap_or("").to_string(),
            password_hash: row[3].as_str().map(String::from),
            google_id: row[4].as_str().map(String::from),
            picture: row[5].as_str().map(String::from),
        }
    }

    async fn find_user_where(&self, predicate: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT id, name, email, password_hash, google_id, picture FROM users WHERE {}",
            predicate
        );
        let response = self.execute_sql(&sql).await?;

        if let Some(result) = response.results.first() {
            if let Some(rows) = &result.rows {
                if let Some(row) = rows.first() {
                    return Ok(Some(Self::user_from_row(row)));
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl UserStore for TursoStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, google_id, picture) VALUES ('{}', '{}', '{}', {}, {}, {})",
            user.id,
            sql_escape(&user.name),
            sql_escape(&user.email),
            opt_sql(&user.password_hash),
            opt_sql(&user.google_id),
            opt_sql(&user.picture),
        );
        self.execute_sql(&sql).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.find_user_where(&format!("id = '{}'", sql_escape(id)))
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user_where(&format!("email = '{}'", sql_escape(email)))
            .await
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        self.find_user_where(&format!("google_id = '{}'", sql_escape(google_id)))
            .await
    }
}

#[async_trait]
impl HistoryStore for TursoStore {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<ChatHistory>> {
        let sql = format!(
            "SELECT doc, created_at, updated_at FROM chat_histories WHERE user_id = '{}'",
            sql_escape(user_id)
        );
        let response = self.execute_sql(&sql).await?;

        if let Some(result) = response.results.first() {
            if let Some(rows) = &result.rows {
                if let Some(row) = rows.first() {
                    let doc = row[0].as_str().unwrap_or("[]");
                    let created_at_str = row[1].as_str().unwrap_or("");
                    let updated_at_str = row[2].as_str().unwrap_or("");

                    let conversations =
                        serde_json::from_str(doc).context("Failed to parse history document")?;
                    let created_at = DateTime::parse_from_rfc3339(created_at_str)
                        .context("Failed to parse created_at")?
                        .with_timezone(&Utc);
                    let updated_at = DateTime::parse_from_rfc3339(updated_at_str)
                        .context("Failed to parse updated_at")?
                        .with_timezone(&Utc);

                    return Ok(Some(ChatHistory {
                        user_id: user_id.to_string(),
                        conversations,
                        created_at,
                        updated_at,
                    }));
                }
            }
        }

        Ok(None)
    }

    async fn upsert(&self, history: &ChatHistory) -> Result<()> {
        let doc = serde_json::to_string(&history.conversations)
            .context("Failed to serialize history document")?;

        let sql = format!(
            "INSERT INTO chat_histories (user_id, doc, created_at, updated_at) VALUES ('{}', '{}', '{}', '{}')
             ON CONFLICT(user_id) DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at",
            sql_escape(&history.user_id),
            sql_escape(&doc),
            history.created_at.to_rfc3339(),
            Utc::now().to_rfc3339(),
        );
        self.execute_sql(&sql).await?;
        Ok(())
    }
}

/// Connect to a Turso database using HTTP API and run schema setup.
pub async fn connect_turso(database_url: &str, auth_token: &str) -> Result<TursoStore> {
    let store = TursoStore::new(database_url.to_string(), auth_token.to_string());
    store.initialize().await?;
    Ok(store)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Map-backed store for tests and credential-less local runs. Enforces the
/// same unique-email constraint as the `users` table.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    histories: RwLock<HashMap<String, ChatHistory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            anyhow::bail!("UNIQUE constraint failed: users.email");
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<ChatHistory>> {
        Ok(self.histories.read().await.get(user_id).cloned())
    }

    async fn upsert(&self, history: &ChatHistory) -> Result<()> {
        self.histories
            .write()
            .await
            .insert(history.user_id.clone(), history.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Conversation;

    #[tokio::test]
    async fn memory_store_enforces_unique_email() {
        let store = MemoryStore::new();
        let a = User::new_local("A".into(), "a@x.com".into(), "h1".into());
        let b = User::new_local("B".into(), "a@x.com".into(), "h2".into());

        store.insert_user(&a).await.unwrap();
        assert!(store.insert_user(&b).await.is_err());
    }

    #[tokio::test]
    async fn memory_store_upsert_replaces_whole_document() {
        let store = MemoryStore::new();
        let mut history = ChatHistory::new("u1".into());
        history.conversations.push(Conversation::new());
        store.upsert(&history).await.unwrap();

        history.conversations.push(Conversation::new());
        store.upsert(&history).await.unwrap();

        let loaded = store.find_by_user("u1").await.unwrap().unwrap();
        assert_eq!(loaded.conversations.len(), 2);
    }

    #[tokio::test]
    async fn memory_store_misses_return_none() {
        let store = MemoryStore::new();
        assert!(store.find_by_email("nobody@x.com").await.unwrap().is_none());
        assert!(store.find_by_user("ghost").await.unwrap().is_none());
    }

    #[test]
    fn sql_escaping_doubles_quotes() {
        assert_eq!(sql_escape("O'Brien"), "O''Brien");
        assert_eq!(opt_sql(&None), "NULL");
        assert_eq!(opt_sql(&Some("a'b".into())), "'a''b'");
    }
}
