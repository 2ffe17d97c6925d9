//! In-process registry store

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::RegistryStore;
use crate::error::Result;
use crate::models::{Endpoint, ServerIdentity, ServerRecord};

/// Registry store backed by a sharded concurrent map.
///
/// Records live only as long as the process. Writers to different keys lock
/// different shards, so they do not contend.
#[derive(Debug, Default)]
pub struct MemoryRegistryStore {
    records: DashMap<ServerIdentity, Endpoint>,
}

impl MemoryRegistryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistryStore {
    async fn upsert(&self, record: &ServerRecord) -> Result<()> {
        let previous = self.records.insert(record.identity(), record.endpoint());
        debug!(
            identity = %record.identity(),
            endpoint = %record.endpoint(),
            replaced = previous.is_some(),
            "Upserted server record"
        );
        Ok(())
    }

    async fn lookup(&self, identity: &ServerIdentity) -> Result<Option<ServerRecord>> {
        Ok(self
            .records
            .get(identity)
            .map(|endpoint| ServerRecord::new(identity.clone(), endpoint.value().clone())))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(server_type: &str, server_name: &str, ip: &str, port: u16) -> ServerRecord {
        ServerRecord::new(ServerIdentity::new(server_type, server_name), Endpoint::new(ip, port))
    }

    #[tokio::test]
    async fn test_register_then_lookup() {
        let store = MemoryRegistryStore::new();
        store.upsert(&record("web", "api1", "10.0.0.5", 8080)).await.unwrap();

        let found = store.lookup(&ServerIdentity::new("web", "api1")).await.unwrap();
        assert_eq!(found, Some(record("web", "api1", "10.0.0.5", 8080)));
    }

    #[tokio::test]
    async fn test_reregistration_overwrites() {
        let store = MemoryRegistryStore::new();
        store.upsert(&record("web", "api1", "10.0.0.5", 8080)).await.unwrap();
        store.upsert(&record("web", "api1", "10.0.0.6", 9090)).await.unwrap();

        let found = store.lookup(&ServerIdentity::new("web", "api1")).await.unwrap().unwrap();
        assert_eq!(found.endpoint(), Endpoint::new("10.0.0.6", 9090));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_identity_is_none() {
        let store = MemoryRegistryStore::new();
        assert!(store.is_empty());
        assert!(store.lookup(&ServerIdentity::new("web", "api2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_type_is_part_of_the_key() {
        let store = MemoryRegistryStore::new();
        store.upsert(&record("web", "api1", "10.0.0.5", 8080)).await.unwrap();
        store.upsert(&record("grpc", "api1", "10.0.0.9", 50051)).await.unwrap();

        let web = store.lookup(&ServerIdentity::new("web", "api1")).await.unwrap().unwrap();
        let grpc = store.lookup(&ServerIdentity::new("grpc", "api1")).await.unwrap().unwrap();
        assert_eq!(web.endpoint(), Endpoint::new("10.0.0.5", 8080));
        assert_eq!(grpc.endpoint(), Endpoint::new("10.0.0.9", 50051));
        assert!(store.lookup(&ServerIdentity::new("db", "api1")).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_upserts_all_persist() {
        let store = Arc::new(MemoryRegistryStore::new());

        let writes = (0..64u16).map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .upsert(&record("worker", &format!("w{i}"), "10.0.1.1", 7000 + i))
                    .await
            })
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.len(), 64);
        for i in 0..64u16 {
            let found = store
                .lookup(&ServerIdentity::new("worker", format!("w{i}")))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(found.port, 7000 + i);
        }
    }
}
