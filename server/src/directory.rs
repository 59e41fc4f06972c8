//! Member directory.
//!
//! Maps a display name to its latest push token and registration time.
//! Names are case-sensitive and never normalized; re-registering a name
//! overwrites the stored token, since devices rotate tokens.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRecord {
    pub push_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl MemberRecord {
    pub fn new(push_token: Option<String>) -> Self {
        Self {
            push_token,
            updated_at: Utc::now(),
        }
    }
}

/// Key-value view over member storage, swappable between in-memory and Redis.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn upsert(&self, name: &str, record: MemberRecord) -> Result<(), AppError>;

    async fn get(&self, name: &str) -> Result<Option<MemberRecord>, AppError>;

    /// Full scan, used to compute notification recipients.
    async fn members(&self) -> Result<Vec<(String, MemberRecord)>, AppError>;

    /// Connectivity probe for the health check. Never errors.
    async fn ping(&self) -> bool;

    fn kind(&self) -> &'static str;
}

#[derive(Default)]
pub struct MemoryDirectory {
    members: RwLock<HashMap<String, MemberRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn upsert(&self, name: &str, record: MemberRecord) -> Result<(), AppError> {
        self.members
            .write()
            .await
            .insert(name.to_string(), record);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<MemberRecord>, AppError> {
        Ok(self.members.read().await.get(name).cloned())
    }

    async fn members(&self) -> Result<Vec<(String, MemberRecord)>, AppError> {
        Ok(self
            .members
            .read()
            .await
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect())
    }

    async fn ping(&self) -> bool {
        true
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_then_get() {
        let dir = MemoryDirectory::new();
        dir.upsert("Alice", MemberRecord::new(Some("tok-A".into())))
            .await
            .unwrap();

        let record = dir.get("Alice").await.unwrap().unwrap();
        assert_eq!(record.push_token.as_deref(), Some("tok-A"));
    }

    #[tokio::test]
    async fn reregistration_replaces_token() {
        let dir = MemoryDirectory::new();
        dir.upsert("Alice", MemberRecord::new(Some("tok-old".into())))
            .await
            .unwrap();
        dir.upsert("Alice", MemberRecord::new(Some("tok-new".into())))
            .await
            .unwrap();

        let record = dir.get("Alice").await.unwrap().unwrap();
        assert_eq!(record.push_token.as_deref(), Some("tok-new"));
        assert_eq!(dir.members().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn names_are_case_sensitive() {
        let dir = MemoryDirectory::new();
        dir.upsert("alice", MemberRecord::new(None)).await.unwrap();

        assert!(dir.get("Alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_member_is_none() {
        let dir = MemoryDirectory::new();
        assert!(dir.get("nobody").await.unwrap().is_none());
        assert!(dir.members().await.unwrap().is_empty());
    }
}
