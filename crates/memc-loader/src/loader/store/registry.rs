use super::{Store, memcache::MemcacheClient};
use core::time::Duration;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

type Connector = dyn Fn(&str) -> Arc<dyn Store> + Send + Sync;

/// Process-wide cache of store clients, one per destination address.
///
/// A client is constructed on the first request for its address and handed
/// out for every later request. Entries are never evicted or health-checked:
/// a client whose server is down stays cached and every write through it
/// fails on its own. The map lock is held only for the lookup-or-insert,
/// never across a write.
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, Arc<dyn Store>>>,
    connector: Box<Connector>,
}

impl ClientRegistry {
    /// Creates a registry building clients with `connector`.
    pub fn new<F>(connector: F) -> Self
    where
        F: Fn(&str) -> Arc<dyn Store> + Send + Sync + 'static,
    {
        Self {
            clients: Mutex::new(HashMap::new()),
            connector: Box::new(connector),
        }
    }

    /// Creates a registry of [`MemcacheClient`]s sharing `timeout`.
    pub fn memcache(timeout: Duration) -> Self {
        Self::new(move |addr| Arc::new(MemcacheClient::new(addr, timeout)) as Arc<dyn Store>)
    }

    /// Returns the client for `addr`, constructing it on first use.
    pub fn get_client(&self, addr: &str) -> Arc<dyn Store> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(addr) {
            return Arc::clone(client);
        }

        tracing::info!(addr, "Create connection");
        let client = (self.connector)(addr);
        clients.insert(addr.to_string(), Arc::clone(&client));
        client
    }

    /// Number of distinct addresses with a cached client.
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::store::Store;
    use memc_loader_core::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullStore;

    #[async_trait::async_trait]
    impl Store for NullStore {
        async fn put(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    fn counting_registry() -> (ClientRegistry, Arc<AtomicUsize>) {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let registry = ClientRegistry::new(move |_addr| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(NullStore) as Arc<dyn Store>
        });
        (registry, built)
    }

    #[test]
    fn client_is_built_once_per_address() {
        let (registry, built) = counting_registry();

        let a = registry.get_client("127.0.0.1:33013");
        let b = registry.get_client("127.0.0.1:33013");
        let c = registry.get_client("127.0.0.1:33014");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_client() {
        let (registry, built) = counting_registry();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry.get_client(if i % 2 == 0 { "a:1" } else { "b:2" });
                })
            })
            .collect();
        for handle in futures::future::join_all(handles).await {
            handle.unwrap();
        }

        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn memcache_registry_builds_lazily() {
        let registry = ClientRegistry::memcache(Duration::from_secs(3));
        assert_eq!(registry.len(), 0);
        registry.get_client("127.0.0.1:1");
        assert_eq!(registry.len(), 1);
    }
}
