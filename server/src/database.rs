//! # Redis
//!
//! Optional durable backing for the member directory.
//!
//! Members are stored as JSON values inside a single Redis hash, one field
//! per display name. The dataset is tiny (one shared residence), so a flat
//! hash with full `HGETALL` scans is plenty.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use crate::{
    directory::{Directory, MemberRecord},
    error::AppError,
};

const MEMBERS_KEY: &str = "mealping:members";

/// Connect with bounded retries and a short timeout so a down Redis fails
/// startup quickly instead of hanging the server.
pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).expect("Redis misconfigured!");

    client
        .get_connection_manager_with_config(config)
        .await
        .expect("Redis misconfigured!")
}

pub struct RedisDirectory {
    connection: ConnectionManager,
}

impl RedisDirectory {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl Directory for RedisDirectory {
    async fn upsert(&self, name: &str, record: MemberRecord) -> Result<(), AppError> {
        let mut connection = self.connection.clone();
        let value = serde_json::to_string(&record)?;

        let _: () = connection.hset(MEMBERS_KEY, name, value).await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<MemberRecord>, AppError> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection.hget(MEMBERS_KEY, name).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn members(&self) -> Result<Vec<(String, MemberRecord)>, AppError> {
        let mut connection = self.connection.clone();
        let raw: HashMap<String, String> = connection.hgetall(MEMBERS_KEY).await?;

        let mut members = Vec::with_capacity(raw.len());
        for (name, json) in raw {
            members.push((name, serde_json::from_str(&json)?));
        }

        Ok(members)
    }

    async fn ping(&self) -> bool {
        let mut connection = self.connection.clone();
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut connection).await;

        pong.is_ok()
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}
