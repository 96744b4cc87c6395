//! Scheduled fetch-and-cache loops: inventory sync and order-status
//! polling. Each task carries a single-flight guard so a slow run is never
//! overlapped by the next tick or a manual trigger.

use crate::cache::Cache;
use crate::wms::{OrderListQuery, Wms};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const INVENTORY_KEY: &str = "inventory";
pub const PRODUCTS_KEY: &str = "products";
pub const RECENT_ORDERS_KEY: &str = "orders:recent";

pub struct SyncTask {
    wms: Arc<dyn Wms>,
    cache: Cache,
    inventory_running: AtomicBool,
    orders_running: AtomicBool,
}

impl SyncTask {
    pub fn new(wms: Arc<dyn Wms>, cache: Cache) -> Self {
        Self {
            wms,
            cache,
            inventory_running: AtomicBool::new(false),
            orders_running: AtomicBool::new(false),
        }
    }

    /// Refresh the inventory and product caches. Returns false without
    /// doing anything if a run is already in flight.
    pub async fn sync_inventory(&self) -> anyhow::Result<bool> {
        if self
            .inventory_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("inventory sync already running, skipping");
            return Ok(false);
        }

        let result = self.sync_inventory_inner().await;
        self.inventory_running.store(false, Ordering::Release);
        result.map(|_| true)
    }

    async fn sync_inventory_inner(&self) -> anyhow::Result<()> {
        let inventory = self.wms.list_inventory().await?;
        self.cache.put_json(INVENTORY_KEY, &inventory).await?;

        let products = self.wms.list_products().await?;
        self.cache.put_json(PRODUCTS_KEY, &products).await?;

        tracing::info!("inventory and product caches refreshed");
        Ok(())
    }

    /// Poll recent order statuses into the cache.
    pub async fn poll_orders(&self) -> anyhow::Result<bool> {
        if self
            .orders_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("order poll already running, skipping");
            return Ok(false);
        }

        let result = self.poll_orders_inner().await;
        self.orders_running.store(false, Ordering::Release);
        result.map(|_| true)
    }

    async fn poll_orders_inner(&self) -> anyhow::Result<()> {
        let query = OrderListQuery {
            limit: Some(100),
            ..Default::default()
        };
        let orders = self.wms.list_orders(&query).await?;
        self.cache.put_json(RECENT_ORDERS_KEY, &orders).await?;

        tracing::info!("order status cache refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn single_flight_guard_admits_one_runner() {
        let flag = AtomicBool::new(false);
        assert!(flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok());
        assert!(flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err());
        flag.store(false, Ordering::Release);
        assert!(flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok());
    }
}
