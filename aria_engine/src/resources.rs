//! Engine resources: id/timestamp generation and static data tables.
//!
//! Constructed at startup and passed by reference into the engine; no
//! global state.

pub mod deck;
pub mod pipette_data;

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of generated ids and timestamps.
///
/// The engine never calls `Uuid::new_v4` or `Utc::now` directly so tests
/// can substitute deterministic values.
pub trait ResourceProvider: Send + Sync {
    fn generate_id(&self) -> String;
    fn now(&self) -> DateTime<Utc>;
}

/// Production provider: v4 UUIDs and wall-clock time.
#[derive(Debug, Default)]
pub struct SystemResourceProvider;

impl ResourceProvider for SystemResourceProvider {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic provider for tests: sequential ids and a fixed time.
#[derive(Debug)]
pub struct FixedResourceProvider {
    prefix: String,
    counter: AtomicU64,
    now: DateTime<Utc>,
}

impl FixedResourceProvider {
    pub fn new(prefix: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
            now,
        }
    }
}

impl ResourceProvider for FixedResourceProvider {
    fn generate_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n}", self.prefix)
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_provider_is_sequential() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let provider = FixedResourceProvider::new("id", now);
        assert_eq!(provider.generate_id(), "id-1");
        assert_eq!(provider.generate_id(), "id-2");
        assert_eq!(provider.now(), now);
    }

    #[test]
    fn system_provider_generates_unique_ids() {
        let provider = SystemResourceProvider;
        assert_ne!(provider.generate_id(), provider.generate_id());
    }
}
