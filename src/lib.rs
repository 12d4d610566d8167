//! # Whois Analysis Library
//!
//! Whois analysis of domain names for security triage: how long ago was the
//! domain registered, how stale are its ownership records, and, when no answer
//! could be obtained, exactly why.
//!
//! ## Features
//!
//! - One bounded whois query per domain, no retries, no caching
//! - Closed set of failure kinds, recorded as flags instead of errors
//! - Independent creation and last-update ages, floored to whole days
//! - Plain-text summaries for analysts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whois_analysis::WhoisAnalyzer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let analyzer = WhoisAnalyzer::new()?;
//!     let record = analyzer.analyze("example.com").await;
//!
//!     println!("{}", record.summary());
//!     println!("Created: {:?}", record.datetime_created);
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod errors;
pub mod lookup;
pub mod parser;
pub mod record;
pub mod resolver;
pub mod tld;

#[cfg(feature = "server")]
pub mod metrics;

// Re-export main types for easy access
pub use analysis::{classify, AnalysisRecord, ConditionFlags, NO_ZONE_NAME};
pub use config::Config;
pub use errors::{LookupError, ServiceError};
pub use lookup::{LookupInvoker, LookupOutcome};
pub use record::{DateField, RawWhoisRecord};
pub use resolver::{ResolverFailure, SystemWhoisResolver, WhoisResolver};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// High-level analyzer: lookup followed by classification against the
/// current time.
#[derive(Clone)]
pub struct WhoisAnalyzer {
    invoker: Arc<LookupInvoker>,
    concurrency: usize,
}

impl WhoisAnalyzer {
    /// Analyzer backed by the system whois executable, configured from the
    /// environment.
    pub fn new() -> Result<Self, ServiceError> {
        let config = Config::load()?;
        Ok(Self::from_config(&config))
    }

    pub fn from_config(config: &Config) -> Self {
        let resolver = Arc::new(SystemWhoisResolver::from_config(config));
        Self::with_resolver(resolver, config)
    }

    /// Analyzer over any resolver implementation.
    pub fn with_resolver(resolver: Arc<dyn WhoisResolver>, config: &Config) -> Self {
        Self {
            invoker: Arc::new(LookupInvoker::new(resolver, config.whois_timeout())),
            concurrency: config.concurrent_lookups.max(1),
        }
    }

    /// Analyzer whose lookups all report an unavailable resolver.
    pub fn unavailable() -> Self {
        Self {
            invoker: Arc::new(LookupInvoker::unavailable()),
            concurrency: 1,
        }
    }

    /// Look up `domain` and classify the result. Never fails: every problem
    /// is recorded on the returned record.
    pub async fn analyze(&self, domain: &str) -> AnalysisRecord {
        let outcome = self.invoker.lookup(domain).await;
        let record = classify(&outcome, Utc::now());
        tracing::info!("{}: {}", domain, record.summary());
        record
    }

    /// Analyze several domains with bounded concurrency. Results come back
    /// in input order.
    pub async fn analyze_many<I, S>(&self, domains: I) -> Vec<(String, AnalysisRecord)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut results: Vec<(usize, String, AnalysisRecord)> = stream::iter(
            domains.into_iter().map(Into::<String>::into).enumerate(),
        )
        .map(|(index, domain)| async move {
            let record = self.analyze(&domain).await;
            (index, domain, record)
        })
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, domain, record)| (domain, record))
            .collect()
    }
}
