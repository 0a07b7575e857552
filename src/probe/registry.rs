//! Probe registry: the live mapping from probe id to its emitter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};

use crate::probe::{FetchRequest, Probe, ProbeError, ProbeInfo};

/// Registry of live probes.
///
/// All reads and writes go through one async mutex that stays held across
/// the stop-then-install sequence, so concurrent control calls for the same
/// id are serialized and never leave two emitters alive.
#[derive(Clone)]
pub struct ProbeRegistry {
    probes: Arc<Mutex<HashMap<String, Probe>>>,
    requests: mpsc::Sender<FetchRequest>,
}

impl ProbeRegistry {
    /// Create an empty registry feeding the given request queue.
    pub fn new(requests: mpsc::Sender<FetchRequest>) -> Self {
        Self {
            probes: Arc::new(Mutex::new(HashMap::new())),
            requests,
        }
    }

    /// Install a probe, stopping any existing emitter for `id` first.
    ///
    /// Returns `true` when an existing probe was replaced.
    pub async fn add_or_replace(
        &self,
        id: &str,
        url: &str,
        interval: Duration,
    ) -> Result<bool, ProbeError> {
        if interval.is_zero() {
            return Err(ProbeError::InvalidInterval);
        }

        let mut probes = self.probes.lock().await;

        let replaced = match probes.remove(id) {
            Some(old) => {
                old.stop().await;
                true
            }
            None => false,
        };

        let probe = Probe::spawn(id, url, interval, self.requests.clone());
        tracing::info!(
            probe_id = %id,
            url = %url,
            interval_ms = interval.as_millis(),
            emitter_id = %probe.info().emitter_id,
            replaced,
            "Probe registered"
        );
        probes.insert(id.to_string(), probe);

        Ok(replaced)
    }

    /// Stop and forget a probe. Unknown ids are a no-op returning `false`.
    pub async fn remove(&self, id: &str) -> bool {
        let mut probes = self.probes.lock().await;
        match probes.remove(id) {
            Some(probe) => {
                probe.stop().await;
                tracing::info!(probe_id = %id, "Probe removed");
                true
            }
            None => {
                tracing::debug!(probe_id = %id, "Remove for unknown probe ignored");
                false
            }
        }
    }

    /// Snapshot of all live probes, sorted by id.
    pub async fn list(&self) -> Vec<ProbeInfo> {
        let mut infos: Vec<ProbeInfo> = self
            .probes
            .lock()
            .await
            .values()
            .map(|p| p.info().clone())
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Look up a single probe.
    pub async fn get(&self, id: &str) -> Option<ProbeInfo> {
        self.probes.lock().await.get(id).map(|p| p.info().clone())
    }

    /// Whether a probe with this id is live.
    pub async fn contains(&self, id: &str) -> bool {
        self.probes.lock().await.contains_key(id)
    }

    /// Number of live probes.
    pub async fn len(&self) -> usize {
        self.probes.lock().await.len()
    }

    /// Whether no probe is live.
    pub async fn is_empty(&self) -> bool {
        self.probes.lock().await.is_empty()
    }

    /// Stop every emitter and clear the registry.
    pub async fn shutdown(&self) {
        let drained: Vec<Probe> = {
            let mut probes = self.probes.lock().await;
            probes.drain().map(|(_, p)| p).collect()
        };
        let count = drained.len();
        for probe in drained {
            probe.stop().await;
        }
        tracing::info!(count, "Probe registry shut down");
    }
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("ProbeRegistry");
        // Skip the count while a control call holds the lock.
        if let Ok(probes) = self.probes.try_lock() {
            s.field("probe_count", &probes.len());
        }
        s.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(capacity: usize) -> (ProbeRegistry, mpsc::Receiver<FetchRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ProbeRegistry::new(tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<FetchRequest>) -> Vec<FetchRequest> {
        let mut out = Vec::new();
        while let Ok(req) = rx.try_recv() {
            out.push(req);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_lifecycle() {
        let (registry, mut rx) = registry(64);

        let replaced = registry
            .add_or_replace("acct1", "http://example.test/ping", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!replaced);
        assert_eq!(registry.len().await, 1);
        assert!(registry.contains("acct1").await);

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert!(registry.remove("acct1").await);
        assert!(registry.is_empty().await);

        let requests = drain(&mut rx);
        assert!(requests.len() >= 3);
        assert!(requests.iter().all(|r| r.probe_id == "acct1"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_is_noop() {
        let (registry, _rx) = registry(4);
        registry
            .add_or_replace("keep", "http://example.test/", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(!registry.remove("missing").await);
        assert_eq!(registry.len().await, 1);
        assert!(registry.contains("keep").await);

        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_stops_superseded_emitter() {
        let (registry, mut rx) = registry(64);

        registry
            .add_or_replace("acct1", "http://old.test/", Duration::from_millis(100))
            .await
            .unwrap();
        let old = registry.get("acct1").await.unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;
        let replaced = registry
            .add_or_replace("acct1", "http://new.test/", Duration::from_millis(100))
            .await
            .unwrap();
        assert!(replaced);
        assert_eq!(registry.len().await, 1);

        let new = registry.get("acct1").await.unwrap();
        assert_ne!(old.emitter_id, new.emitter_id);
        assert_eq!(new.url, "http://new.test/");

        let before = drain(&mut rx);
        assert!(before.iter().all(|r| r.emitter_id == old.emitter_id));

        tokio::time::sleep(Duration::from_millis(550)).await;
        let after = drain(&mut rx);
        assert!(!after.is_empty());
        assert!(after.iter().all(|r| r.emitter_id == new.emitter_id));
        assert!(after.iter().all(|r| r.url == "http://new.test/"));

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_replace_keeps_single_emitter() {
        let (registry, _rx) = registry(1024);

        let mut tasks = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry
                    .add_or_replace("shared", &format!("http://t{i}.test/"), Duration::from_secs(60))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.len().await, 1);
        registry.shutdown().await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let (registry, _rx) = registry(4);
        let err = registry
            .add_or_replace("bad", "http://example.test/", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidInterval));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_debug_omits_count_while_locked() {
        let (registry, _rx) = registry(4);
        registry
            .add_or_replace("a", "http://example.test/", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(format!("{registry:?}").contains("probe_count: 1"));

        let guard = registry.probes.lock().await;
        let rendered = format!("{registry:?}");
        assert!(!rendered.contains("probe_count"));
        drop(guard);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let (registry, _rx) = registry(4);
        for id in ["b", "c", "a"] {
            registry
                .add_or_replace(id, "http://example.test/", Duration::from_secs(60))
                .await
                .unwrap();
        }
        let ids: Vec<String> = registry.list().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        registry.shutdown().await;
    }
}
