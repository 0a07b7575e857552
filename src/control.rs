//! Control API.
//!
//! Transport-independent add/remove operations. Raw string parameters are
//! validated here before the registry is touched; the HTTP layer in
//! [`crate::server`] only maps them onto routes and status codes.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::probe::{ProbeError, ProbeRegistry};

/// Errors returned to control callers.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A required parameter was absent or empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// `interval` was not a positive integer number of milliseconds.
    #[error("interval must be a positive integer (milliseconds)")]
    InvalidInterval,

    /// The registry refused the operation.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Raw key/value parameters of a control call.
#[derive(Debug, Clone, Default)]
pub struct ControlParams(HashMap<String, String>);

impl ControlParams {
    /// Wrap an already-decoded parameter map.
    pub fn new(params: HashMap<String, String>) -> Self {
        Self(params)
    }

    /// Fetch the named fields, failing on the first one that is missing or empty.
    pub fn required(
        &self,
        fields: &[&'static str],
    ) -> Result<HashMap<&'static str, String>, ControlError> {
        fields
            .iter()
            .map(|&field| match self.0.get(field) {
                Some(value) if !value.is_empty() => Ok((field, value.clone())),
                _ => Err(ControlError::MissingField(field)),
            })
            .collect()
    }
}

/// Repeated keys keep their first value.
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ControlParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = HashMap::new();
        for (k, v) in iter {
            params.entry(k.into()).or_insert_with(|| v.into());
        }
        Self(params)
    }
}

/// Validated `AddProbe` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddProbe {
    pub id: String,
    pub url: String,
    pub interval: Duration,
}

impl AddProbe {
    /// Validate raw parameters. Fields are checked in the order `url`, `interval`, `id`.
    pub fn from_params(params: &ControlParams) -> Result<Self, ControlError> {
        let mut fields = params.required(&["url", "interval", "id"])?;

        let interval_ms: u64 = fields["interval"]
            .trim()
            .parse()
            .map_err(|_| ControlError::InvalidInterval)?;
        if interval_ms == 0 {
            return Err(ControlError::InvalidInterval);
        }

        Ok(Self {
            id: fields.remove("id").unwrap_or_default(),
            url: fields.remove("url").unwrap_or_default(),
            interval: Duration::from_millis(interval_ms),
        })
    }
}

/// Validated `RemoveProbe` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveProbe {
    pub id: String,
}

impl RemoveProbe {
    /// Validate raw parameters.
    pub fn from_params(params: &ControlParams) -> Result<Self, ControlError> {
        let mut fields = params.required(&["id"])?;
        Ok(Self {
            id: fields.remove("id").unwrap_or_default(),
        })
    }
}

/// Add/remove operations driving the probe registry.
#[derive(Debug, Clone)]
pub struct ControlApi {
    registry: ProbeRegistry,
}

impl ControlApi {
    pub fn new(registry: ProbeRegistry) -> Self {
        Self { registry }
    }

    /// The registry this API drives.
    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    /// Validate and apply an `AddProbe` call. Returns the acknowledgement text.
    pub async fn add_probe(&self, params: &ControlParams) -> Result<String, ControlError> {
        let AddProbe { id, url, interval } = AddProbe::from_params(params)?;
        self.registry.add_or_replace(&id, &url, interval).await?;

        let msg = format!("Added {id}");
        tracing::info!(probe_id = %id, "{}", msg);
        Ok(msg)
    }

    /// Validate and apply a `RemoveProbe` call. Unknown ids succeed.
    pub async fn remove_probe(&self, params: &ControlParams) -> Result<String, ControlError> {
        let RemoveProbe { id } = RemoveProbe::from_params(params)?;
        self.registry.remove(&id).await;

        let msg = format!("Stopped {id}");
        tracing::info!(probe_id = %id, "{}", msg);
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn api() -> (ControlApi, mpsc::Receiver<crate::probe::FetchRequest>) {
        let (tx, rx) = mpsc::channel(16);
        (ControlApi::new(ProbeRegistry::new(tx)), rx)
    }

    #[test]
    fn test_add_probe_missing_fields() {
        let params: ControlParams = [("id", "acct1"), ("interval", "1000")].into_iter().collect();
        let err = AddProbe::from_params(&params).unwrap_err();
        assert_eq!(err.to_string(), "url is required");

        let params: ControlParams = [("url", "http://x.test/"), ("id", "a")].into_iter().collect();
        let err = AddProbe::from_params(&params).unwrap_err();
        assert_eq!(err.to_string(), "interval is required");

        let params: ControlParams = [("url", "http://x.test/"), ("interval", "5")].into_iter().collect();
        let err = AddProbe::from_params(&params).unwrap_err();
        assert_eq!(err.to_string(), "id is required");
    }

    #[test]
    fn test_repeated_key_keeps_first_value() {
        let params: ControlParams = [("id", "first"), ("id", "second")].into_iter().collect();
        assert_eq!(RemoveProbe::from_params(&params).unwrap().id, "first");
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let params: ControlParams = [("id", "")].into_iter().collect();
        let err = RemoveProbe::from_params(&params).unwrap_err();
        assert_eq!(err.to_string(), "id is required");
    }

    #[test]
    fn test_add_probe_interval_parsing() {
        let params: ControlParams = [("id", "a"), ("url", "http://x.test/"), ("interval", "250")]
            .into_iter()
            .collect();
        let add = AddProbe::from_params(&params).unwrap();
        assert_eq!(add.interval, Duration::from_millis(250));

        for bad in ["abc", "0", "-5", "1.5"] {
            let params: ControlParams = [("id", "a"), ("url", "http://x.test/"), ("interval", bad)]
                .into_iter()
                .collect();
            assert!(matches!(
                AddProbe::from_params(&params),
                Err(ControlError::InvalidInterval)
            ));
        }
    }

    #[tokio::test]
    async fn test_add_and_remove_acknowledgements() {
        let (api, _rx) = api();

        let add: ControlParams = [("id", "acct1"), ("url", "http://x.test/"), ("interval", "60000")]
            .into_iter()
            .collect();
        assert_eq!(api.add_probe(&add).await.unwrap(), "Added acct1");
        assert!(api.registry().contains("acct1").await);

        let remove: ControlParams = [("id", "acct1")].into_iter().collect();
        assert_eq!(api.remove_probe(&remove).await.unwrap(), "Stopped acct1");
        assert!(api.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_unknown_succeeds() {
        let (api, _rx) = api();
        let remove: ControlParams = [("id", "ghost")].into_iter().collect();
        assert_eq!(api.remove_probe(&remove).await.unwrap(), "Stopped ghost");
        assert!(api.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_validation_failure_leaves_registry_untouched() {
        let (api, _rx) = api();
        let add: ControlParams = [("id", "acct1"), ("interval", "1000")].into_iter().collect();
        assert!(api.add_probe(&add).await.is_err());
        assert!(api.registry().is_empty().await);
    }
}
