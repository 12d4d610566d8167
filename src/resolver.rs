//! The external whois capability and its system-executable implementation.

use crate::{config::Config, parser::WhoisParser, record::RawWhoisRecord, tld::TldRules};
use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Raw failures a resolver can report. The lookup invoker folds these into
/// [`crate::LookupError`] kinds.
#[derive(Error, Debug)]
pub enum ResolverFailure {
    #[error("No whois rules for TLD: {0}")]
    UnknownTld(String),

    #[error("Failed to run whois executable: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Whois exited with {status} and no output: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("Unparseable whois output: {0}")]
    Unparseable(String),

    #[error("Unrecognised date value: {0}")]
    DateFormat(String),

    #[error("Whois resolver not initialized")]
    Uninitialized,
}

/// Something that can answer a whois query for one domain.
///
/// `Ok(None)` means the registry has no record for the domain.
#[async_trait]
pub trait WhoisResolver: Send + Sync {
    async fn query(&self, domain: &str) -> Result<Option<RawWhoisRecord>, ResolverFailure>;
}

/// Resolver backed by the host's `whois` executable.
pub struct SystemWhoisResolver {
    binary: String,
    query_registry_host: bool,
    rules: TldRules,
    parser: WhoisParser,
}

impl SystemWhoisResolver {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            query_registry_host: true,
            rules: TldRules::new(),
            parser: WhoisParser::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let rules = match &config.public_suffix_list {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(list) => TldRules::with_public_suffix_list(&list),
                Err(e) => {
                    warn!("Cannot read public suffix list {}: {}", path, e);
                    TldRules::new()
                }
            },
            None => TldRules::new(),
        };

        Self::new(config.whois_binary.clone())
            .query_registry_host(config.query_registry_host)
            .with_rules(rules)
    }

    /// Pass the registry host from the TLD table with `-h` instead of letting
    /// the executable pick one.
    pub fn query_registry_host(mut self, enabled: bool) -> Self {
        self.query_registry_host = enabled;
        self
    }

    pub fn with_rules(mut self, rules: TldRules) -> Self {
        self.rules = rules;
        self
    }
}

#[async_trait]
impl WhoisResolver for SystemWhoisResolver {
    async fn query(&self, domain: &str) -> Result<Option<RawWhoisRecord>, ResolverFailure> {
        let server = self.rules.whois_server(domain).ok_or_else(|| {
            ResolverFailure::UnknownTld(self.rules.effective_tld(domain).unwrap_or_default())
        })?;

        let mut command = Command::new(&self.binary);
        if self.query_registry_host {
            command.arg("-h").arg(server);
        }
        // Domains starting with '-' must not be read as options
        command
            .arg("--")
            .arg(domain)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!("Running {} for {} (registry host {})", self.binary, domain, server);
        let output = command.output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() && !output.status.success() {
            return Err(ResolverFailure::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        self.parser.parse(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_reports_not_found_io_error() {
        let resolver = SystemWhoisResolver::new("/nonexistent/bin/whois-analysis-test");
        let err = resolver.query("example.com").await.unwrap_err();

        match err {
            ResolverFailure::Spawn(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tld_is_rejected_before_running() {
        let resolver = SystemWhoisResolver::new("/nonexistent/bin/whois-analysis-test");
        let err = resolver.query("example.notarealtld").await.unwrap_err();

        assert!(matches!(err, ResolverFailure::UnknownTld(tld) if tld == "notarealtld"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_without_output() {
        let resolver = SystemWhoisResolver::new("false");
        let err = resolver.query("example.com").await.unwrap_err();

        assert!(matches!(err, ResolverFailure::Exit { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_domain_is_passed_after_end_of_options() {
        use std::os::unix::fs::PermissionsExt;

        // Answers only when the domain follows "--"
        let script = "#!/bin/sh\n\
            while [ \"$#\" -gt 0 ]; do\n\
              if [ \"$1\" = \"--\" ]; then shift; echo \"Domain Name: $1\"; exit 0; fi\n\
              shift\n\
            done\n\
            exit 1\n";
        let path = std::env::temp_dir().join(format!("whois-analysis-stub-{}", std::process::id()));
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = SystemWhoisResolver::new(path.to_string_lossy().into_owned());
        let result = resolver.query("-hevil.internal.com").await;
        let _ = std::fs::remove_file(&path);

        let record = result.unwrap().unwrap();
        assert_eq!(record.name.as_deref(), Some("-hevil.internal.com"));
    }
}
