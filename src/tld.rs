//! TLDs the system resolver has rules for, and their registry whois hosts.
//!
//! A domain whose effective TLD is not listed here is reported as an
//! unsupported TLD instead of being handed to the whois executable.

use once_cell::sync::Lazy;
use publicsuffix::{List, Psl};
use std::collections::HashMap;
use tracing::{debug, warn};

pub static TLD_WHOIS_SERVERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Legacy and sponsored gTLDs
        ("com", "whois.verisign-grs.com"),
        ("net", "whois.verisign-grs.com"),
        ("org", "whois.pir.org"),
        ("info", "whois.afilias.net"),
        ("biz", "whois.nic.biz"),
        ("edu", "whois.educause.edu"),
        ("gov", "whois.dotgov.gov"),
        // Frequent in phishing and malware triage
        ("xyz", "whois.nic.xyz"),
        ("top", "whois.nic.top"),
        ("online", "whois.nic.online"),
        ("site", "whois.nic.site"),
        ("shop", "whois.nic.shop"),
        ("app", "whois.nic.google"),
        ("dev", "whois.nic.google"),
        ("io", "whois.nic.io"),
        ("co", "whois.nic.co"),
        ("me", "whois.nic.me"),
        // ccTLDs and their registry-operated second levels
        ("us", "whois.nic.us"),
        ("ca", "whois.cira.ca"),
        ("uk", "whois.nic.uk"),
        ("co.uk", "whois.nic.uk"),
        ("eu", "whois.eu"),
        ("de", "whois.denic.de"),
        ("fr", "whois.nic.fr"),
        ("nl", "whois.domain-registry.nl"),
        ("ru", "whois.tcinet.ru"),
        ("jp", "whois.jprs.jp"),
        ("cn", "whois.cnnic.cn"),
        ("au", "whois.auda.org.au"),
        ("com.au", "whois.auda.org.au"),
        ("br", "whois.registro.br"),
        ("com.br", "whois.registro.br"),
    ])
});

/// Maps domains to their effective TLD and the whois host responsible for it.
pub struct TldRules {
    psl: Option<List>,
}

impl TldRules {
    pub fn new() -> Self {
        Self { psl: None }
    }

    /// Use a Public Suffix List (text format) for suffix extraction.
    pub fn with_public_suffix_list(list: &str) -> Self {
        match list.parse::<List>() {
            Ok(psl) => Self { psl: Some(psl) },
            Err(e) => {
                warn!("Failed to parse public suffix list, using built-in rules: {}", e);
                Self::new()
            }
        }
    }

    /// Effective TLD of `domain`.
    ///
    /// Prefers a known public suffix when a list is loaded, otherwise the
    /// longest multi-label suffix in the table, otherwise the last label.
    pub fn effective_tld(&self, domain: &str) -> Option<String> {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        if domain.is_empty() {
            return None;
        }

        if let Some(psl) = &self.psl {
            if let Some(suffix) = psl.suffix(domain.as_bytes()) {
                if suffix.is_known() {
                    if let Ok(tld) = std::str::from_utf8(suffix.as_bytes()) {
                        return Some(tld.to_string());
                    }
                }
            }
            debug!("No known public suffix for {}, using built-in rules", domain);
        }

        let labels: Vec<&str> = domain.split('.').collect();
        for start in 1..labels.len() {
            let candidate = labels[start..].join(".");
            if TLD_WHOIS_SERVERS.contains_key(candidate.as_str()) {
                return Some(candidate);
            }
        }

        labels.last().map(|label| label.to_string())
    }

    /// Registry whois host for `domain`, or `None` when its TLD is unsupported.
    ///
    /// Suffixes unknown to the table fall back to their last label, so
    /// `example.ac.uk` is served by the `uk` rules.
    pub fn whois_server(&self, domain: &str) -> Option<&'static str> {
        let tld = self.effective_tld(domain)?;
        if let Some(server) = TLD_WHOIS_SERVERS.get(tld.as_str()) {
            return Some(*server);
        }

        let last = tld.rsplit('.').next()?;
        TLD_WHOIS_SERVERS.get(last).copied()
    }
}

impl Default for TldRules {
    fn default() -> Self {
        Self::new()
    }
}
