//! Platform registry
//!
//! Maps a platform key (`amazon`, `linkedin`, ...) to the dataset that
//! collects it, its price per record and its polling deadline. The built-in
//! table is assembled explicitly in `DatasetRegistry::builtin`; callers add
//! their own platforms with `register`.

use dredge_core::ValidationError;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::config::{POLL_TIMEOUT_EXTENDED, POLL_TIMEOUT_FAST, POLL_TIMEOUT_STANDARD};

/// How one platform is collected
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformSpec {
    pub dataset_id: String,
    pub cost_per_record: f64,
    pub poll_timeout: Duration,
    /// Host labels that identify this platform's URLs (`amazon` matches
    /// `www.amazon.co.uk`)
    pub host_labels: Vec<String>,
}

impl PlatformSpec {
    pub fn new(dataset_id: impl Into<String>, cost_per_record: f64, poll_timeout: Duration) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            cost_per_record,
            poll_timeout,
            host_labels: Vec::new(),
        }
    }

    pub fn with_host_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.host_labels = labels.into_iter().map(Into::into).collect();
        self
    }
}

/// Registry of collectable platforms, keyed by lowercase name
#[derive(Debug, Clone, Default)]
pub struct DatasetRegistry {
    platforms: BTreeMap<String, PlatformSpec>,
}

impl DatasetRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The platforms supported out of the box
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(
            "amazon",
            PlatformSpec::new("gd_l7q7dkf244hwxbl93", 0.001, POLL_TIMEOUT_EXTENDED)
                .with_host_labels(["amazon"]),
        );
        registry.register(
            "linkedin",
            PlatformSpec::new("gd_l1oojb10z2jye29kh", 0.002, POLL_TIMEOUT_STANDARD)
                .with_host_labels(["linkedin"]),
        );
        registry.register(
            "instagram",
            PlatformSpec::new("gd_l1vikfch901nx3by4", 0.002, POLL_TIMEOUT_EXTENDED)
                .with_host_labels(["instagram"]),
        );
        registry.register(
            "facebook",
            PlatformSpec::new("gd_lkaxegm826bjpoo9m5", 0.002, POLL_TIMEOUT_EXTENDED)
                .with_host_labels(["facebook", "fb"]),
        );
        registry.register(
            "chatgpt",
            PlatformSpec::new("gd_m7aof0k82r803d5bjm", 0.005, POLL_TIMEOUT_FAST)
                .with_host_labels(["chatgpt", "openai"]),
        );

        registry
    }

    /// Add or replace a platform
    ///
    /// # Returns
    /// The platform previously registered under `key`, if any
    pub fn register(&mut self, key: impl AsRef<str>, spec: PlatformSpec) -> Option<PlatformSpec> {
        self.platforms
            .insert(key.as_ref().trim().to_ascii_lowercase(), spec)
    }

    pub fn get(&self, key: &str) -> Option<&PlatformSpec> {
        self.platforms.get(&key.trim().to_ascii_lowercase())
    }

    /// Like `get`, but an unknown key is a validation error
    pub fn require(&self, key: &str) -> Result<&PlatformSpec, ValidationError> {
        self.get(key).ok_or_else(|| {
            let known: Vec<&str> = self.keys().collect();
            ValidationError::new(format!(
                "unknown platform '{}' (known: {})",
                key,
                known.join(", ")
            ))
        })
    }

    /// Platform whose host labels match the URL's host
    ///
    /// The top-level domain is ignored, so `amazon.com` and `amazon.co.uk`
    /// both resolve to `amazon`.
    pub fn resolve_url(&self, url: &str) -> Option<&str> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();

        let mut labels: Vec<&str> = host.split('.').collect();
        labels.pop();

        self.platforms
            .iter()
            .find(|(_, spec)| {
                spec.host_labels
                    .iter()
                    .any(|wanted| labels.contains(&wanted.as_str()))
            })
            .map(|(key, _)| key.as_str())
    }

    /// Registered platform keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.platforms.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlatformSpec)> {
        self.platforms.iter().map(|(key, spec)| (key.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_platforms() {
        let registry = DatasetRegistry::builtin();
        assert_eq!(
            registry.keys().collect::<Vec<_>>(),
            vec!["amazon", "chatgpt", "facebook", "instagram", "linkedin"]
        );

        let amazon = registry.get("Amazon").unwrap();
        assert_eq!(amazon.dataset_id, "gd_l7q7dkf244hwxbl93");
        assert_eq!(amazon.poll_timeout, Duration::from_secs(240));

        let chatgpt = registry.get("chatgpt").unwrap();
        assert_eq!(chatgpt.cost_per_record, 0.005);
        assert_eq!(chatgpt.poll_timeout, Duration::from_secs(120));

        assert_eq!(
            registry.get("linkedin").unwrap().poll_timeout,
            Duration::from_secs(180)
        );
    }

    #[test]
    fn test_resolve_url() {
        let registry = DatasetRegistry::builtin();
        assert_eq!(
            registry.resolve_url("https://www.amazon.co.uk/dp/B0001"),
            Some("amazon")
        );
        assert_eq!(
            registry.resolve_url("https://www.linkedin.com/in/someone"),
            Some("linkedin")
        );
        assert_eq!(registry.resolve_url("https://fb.com/page"), Some("facebook"));
        assert_eq!(registry.resolve_url("https://example.com/amazon"), None);
        assert_eq!(registry.resolve_url("not a url"), None);
    }

    #[test]
    fn test_register_and_require() {
        let mut registry = DatasetRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.require("shop").is_err());

        let previous = registry.register(
            "Shop",
            PlatformSpec::new("gd_shop", 0.003, Duration::from_secs(60))
                .with_host_labels(["myshop"]),
        );
        assert!(previous.is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.require("shop").unwrap().dataset_id, "gd_shop");
        assert_eq!(registry.resolve_url("https://myshop.io/item/1"), Some("shop"));

        let err = DatasetRegistry::builtin().require("tiktok").unwrap_err();
        assert!(err.to_string().contains("unknown platform 'tiktok'"));
    }
}
