//! Mock source adapter for testing.

use crate::traits::{
    Applicability, AssetRecord, SkipReason, SourceAdapter, SourceError, SourceKind, SourceResult,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock adapter that answers from a fixed record set and counts lookups.
///
/// Only lookups that pass the applicability gate are counted.
pub struct MockSourceAdapter {
    name: String,
    kind: SourceKind,
    records: HashMap<String, AssetRecord>,
    failure: Option<SourceError>,
    skip: Option<SkipReason>,
    calls: AtomicUsize,
}

impl MockSourceAdapter {
    pub fn new(name: &str, kind: SourceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            records: HashMap::new(),
            failure: None,
            skip: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Adds a record returned for its hostname.
    pub fn with_record(mut self, record: AssetRecord) -> Self {
        self.records.insert(record.hostname.clone(), record);
        self
    }

    /// Makes every lookup fail with `error`.
    pub fn failing(mut self, error: SourceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Makes the adapter report itself as not applicable.
    pub fn not_applicable(mut self, reason: SkipReason) -> Self {
        self.skip = Some(reason);
        self
    }

    /// Number of lookups performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for MockSourceAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn applicability(&self, _hostname: &str) -> Applicability {
        match self.skip {
            Some(reason) => Applicability::NotApplicable(reason),
            None => Applicability::Applicable,
        }
    }

    async fn lookup(&self, hostname: &str) -> SourceResult<Option<AssetRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self.records.get(hostname).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ResolutionAttempt, ACTIVE_STATUS};

    #[tokio::test]
    async fn test_mock_counts_only_gated_lookups() {
        let skipped = MockSourceAdapter::new("db", SourceKind::Database)
            .not_applicable(SkipReason::ConfigurationMissing);
        assert!(matches!(
            skipped.resolve("app01.contoso.com").await,
            ResolutionAttempt::NotApplicable(_)
        ));
        assert_eq!(skipped.calls(), 0);

        let mock = MockSourceAdapter::new("cmdb", SourceKind::Directory)
            .with_record(AssetRecord::known("app01.contoso.com", ACTIVE_STATUS));
        assert!(matches!(
            mock.resolve("app01.contoso.com").await,
            ResolutionAttempt::Match(_)
        ));
        assert_eq!(mock.resolve("ghost.contoso.com").await, ResolutionAttempt::NoMatch);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockSourceAdapter::new("cmdb", SourceKind::Directory)
            .failing(SourceError::Timeout("10s".to_string()));
        assert_eq!(
            mock.resolve("app01.contoso.com").await,
            ResolutionAttempt::AdapterError(SourceError::Timeout("10s".to_string()))
        );
    }
}
