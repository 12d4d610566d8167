//! Lookup invoker: one bounded call to a whois resolver per domain.

use crate::{
    errors::LookupError,
    record::RawWhoisRecord,
    resolver::{ResolverFailure, WhoisResolver},
};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, warn};

/// `Ok(None)` is the "domain not found" answer, distinct from any failure.
pub type LookupOutcome = Result<Option<RawWhoisRecord>, LookupError>;

impl From<ResolverFailure> for LookupError {
    fn from(failure: ResolverFailure) -> Self {
        match failure {
            ResolverFailure::UnknownTld(tld) => LookupError::UnsupportedTld(tld),
            ResolverFailure::Spawn(e) if e.kind() == std::io::ErrorKind::NotFound => {
                LookupError::ResolverBinaryMissing(e.to_string())
            }
            ResolverFailure::Spawn(e) => LookupError::CommandExecutionFailed(e.to_string()),
            ResolverFailure::Exit { status, stderr } => {
                LookupError::CommandExecutionFailed(format!("{}: {}", status, stderr))
            }
            ResolverFailure::Unparseable(reason) => LookupError::CommandExecutionFailed(reason),
            ResolverFailure::DateFormat(value) => LookupError::UnknownDateFormat(value),
            ResolverFailure::Uninitialized => LookupError::ResolverPackageMissing,
        }
    }
}

pub struct LookupInvoker {
    resolver: Option<Arc<dyn WhoisResolver>>,
    timeout: Duration,
}

impl LookupInvoker {
    pub fn new(resolver: Arc<dyn WhoisResolver>, timeout: Duration) -> Self {
        Self {
            resolver: Some(resolver),
            timeout,
        }
    }

    /// An invoker with no resolver behind it. Every lookup reports
    /// [`LookupError::ResolverPackageMissing`].
    pub fn unavailable() -> Self {
        Self {
            resolver: None,
            timeout: Duration::ZERO,
        }
    }

    /// Query the resolver once for `domain`. No retries, no caching.
    pub async fn lookup(&self, domain: &str) -> LookupOutcome {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            debug!("Empty domain, nothing to look up");
            return Ok(None);
        }

        let Some(resolver) = &self.resolver else {
            warn!("No whois resolver available for {}", domain);
            return Err(LookupError::ResolverPackageMissing);
        };

        debug!("Beginning whois lookup of {}", domain);
        let outcome = match timeout(self.timeout, resolver.query(&domain)).await {
            Ok(result) => result.map_err(LookupError::from),
            Err(elapsed) => Err(elapsed.into()),
        };

        match &outcome {
            Ok(Some(_)) => debug!("Whois record received for {}", domain),
            Ok(None) => debug!("No whois record exists for {}", domain),
            Err(e) => warn!("Whois lookup of {} failed ({}): {}", domain, e.kind(), e),
        }

        outcome
    }
}
