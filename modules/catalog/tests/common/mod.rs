#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use catalog::{AppServices, Attribute, AttributeOption, CatalogConfig, Notifier, Product, Shop};
use catalog_db::{DBRunner, Db, Entity};
use parking_lot::Mutex;
use uuid::Uuid;

/// Notifier that records every call.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingNotifier {
    pub fn channels(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn sent(&self) -> Vec<(String, serde_json::Value)> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, channel: &str, payload: serde_json::Value) -> anyhow::Result<()> {
        self.sent.lock().push((channel.to_owned(), payload));
        Ok(())
    }
}

/// Notifier whose delivery always fails.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _channel: &str, _payload: serde_json::Value) -> anyhow::Result<()> {
        anyhow::bail!("sink unavailable")
    }
}

pub struct Harness {
    pub db: Db,
    pub services: AppServices,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CatalogConfig::default())
    }

    pub fn with_config(config: CatalogConfig) -> Self {
        let db = Db::in_memory();
        let notifier = Arc::new(RecordingNotifier::default());
        let services = AppServices::new(db.clone(), notifier.clone(), config);
        Self {
            db,
            services,
            notifier,
        }
    }

    pub async fn insert<E: Entity>(&self, row: E) -> E {
        self.db.conn().unwrap().create(row).await.unwrap()
    }

    pub async fn all<E: Entity>(&self) -> Vec<E> {
        let conn = self.db.conn().unwrap();
        let plan = catalog_query::QueryPlan::all();
        let (rows, _) = conn.query::<E>(&plan).await.unwrap();
        rows
    }

    pub async fn shop(&self, name: &str) -> Shop {
        self.insert(Shop::new(name)).await
    }

    pub async fn product(&self, shop_id: Uuid, name: &str) -> Product {
        self.insert(Product::new(shop_id, name, 10.0)).await
    }

    /// An attribute with one option per key.
    pub async fn attribute(
        &self,
        shop_id: Uuid,
        name: &str,
        keys: &[&str],
    ) -> (Attribute, Vec<AttributeOption>) {
        let attribute = self.insert(Attribute::new(shop_id, name)).await;
        let mut options = Vec::new();
        for key in keys {
            options.push(self.insert(AttributeOption::new(attribute.id, *key)).await);
        }
        (attribute, options)
    }
}
