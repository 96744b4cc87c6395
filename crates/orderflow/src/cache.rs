//! Redis TTL cache for the inventory/products read path.
//!
//! Every value is written twice: under its key with the configured TTL,
//! and under a `stale:`-prefixed key with a much longer TTL. The stale
//! copy is what the read-through handlers fall back to when the WMS is
//! unreachable.

use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

const STALE_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Clone)]
pub struct Cache {
    client: redis::Client,
    ttl_secs: u64,
}

impl Cache {
    pub fn connect(redis_url: &str, ttl_secs: u64) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client, ttl_secs })
    }

    async fn conn(&self) -> anyhow::Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn get_stale_json<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> anyhow::Result<Option<T>> {
        self.get_json(&format!("stale:{key}")).await
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)?;
        let mut conn = self.conn().await?;
        let _: () = conn.set_ex(key, &raw, self.ttl_secs).await?;
        let _: () = conn
            .set_ex(format!("stale:{key}"), &raw, STALE_TTL_SECS)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    /// Connectivity probe for the health endpoint.
    pub async fn ping(&self) -> bool {
        match self.conn().await {
            Ok(mut conn) => redis::cmd("PING")
                .query_async::<_, String>(&mut conn)
                .await
                .is_ok(),
            Err(_) => false,
        }
    }
}
