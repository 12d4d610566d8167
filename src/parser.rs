use crate::{
    record::{DateField, RawWhoisRecord},
    resolver::ResolverFailure,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// Registry answers meaning "no such domain"
static NOT_FOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[\s%#>]*(no match|not found|no data found|no entries found|no object found|domain not found|the queried object does not exist|object does not exist)",
    )
    .expect("static regex")
});

// DENIC and EURid echo the queried name back along with this status
static FREE_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[\s%#>]*status:\s*(free|available)\s*$").expect("static regex")
});

// Values registries use in place of a date
static DATE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(n/?a|none|null|unknown|not available|not defined|-+|before\b.*|0000-00-00.*)$")
        .expect("static regex")
});

const DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%dT%H:%M:%S%.fZ",  // 2025-05-18T13:36:06.0Z
    "%Y-%m-%dT%H:%M:%S%.f%z", // 2025-05-18T13:36:06+0000
    "%Y-%m-%dT%H:%M:%S%.f",   // 2025-05-18T13:36:06
    "%Y-%m-%d %H:%M:%S%.f%z", // 2025-05-18 13:36:06+0300
    "%Y-%m-%d %H:%M:%S%.f",   // 2025-05-18 13:36:06
    "%Y-%m-%d %H:%M:%S %Z",   // 2025-05-18 13:36:06 CLST
    "%d-%b-%Y %H:%M:%S",      // 18-May-2025 13:36:06
    "%d.%m.%Y %H:%M:%S",      // 18.05.2025 13:36:06
    "%Y.%m.%d %H:%M:%S",      // 2025.05.18 13:36:06
    "%Y/%m/%d %H:%M:%S",      // 2025/05/18 13:36:06
];

const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d", // 2025-05-18
    "%d-%b-%Y", // 18-May-2025
    "%d %b %Y", // 18 May 2025
    "%Y/%m/%d", // 2025/05/18
    "%m/%d/%Y", // 05/18/2025
    "%d.%m.%Y", // 18.05.2025
    "%Y.%m.%d", // 2025.05.18
    "%Y%m%d",   // 20250518
];

/// Turns whois text output into a [`RawWhoisRecord`].
pub struct WhoisParser;

impl WhoisParser {
    pub fn new() -> Self {
        Self
    }

    /// `Ok(None)` means the registry answered that the domain does not exist.
    pub fn parse(&self, data: &str) -> Result<Option<RawWhoisRecord>, ResolverFailure> {
        if data.trim().is_empty() {
            return Err(ResolverFailure::Unparseable("empty whois output".to_string()));
        }

        let mut record = RawWhoisRecord::default();
        let mut creation_raw: Option<String> = None;
        let mut updated_raw: Option<String> = None;
        let mut nameservers: Vec<String> = Vec::new();
        let mut fields_seen = 0usize;

        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('%') || line.starts_with('#') || line.starts_with(">>>") {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            // Prose lines that happen to contain a colon
            if key.is_empty() || key.split_whitespace().count() > 5 {
                continue;
            }
            fields_seen += 1;

            if value.is_empty() {
                continue;
            }

            // Order matters: expiration keys contain "registrar"/"registration" too
            match key.as_str() {
                k if k.contains("expir") || k.contains("paid-till") => {}

                "domain name" | "domain" | "domain_name" | "domainname" => {
                    if record.name.is_none() {
                        record.name = Some(value.to_string());
                    }
                }

                k if k.contains("creation") || k.contains("created") || k == "registered"
                    || k == "registration time" || k == "registration date" =>
                {
                    if creation_raw.is_none() {
                        creation_raw = Some(value.to_string());
                    }
                }

                k if k.contains("updated") || k.contains("modified") || k == "changed"
                    || k == "last-update" =>
                {
                    if updated_raw.is_none() {
                        updated_raw = Some(value.to_string());
                    }
                }

                k if k.contains("registrar") && !k.contains("whois") && !k.contains("url")
                    && !k.contains("abuse") && !k.contains("iana") && !k.contains("registration") =>
                {
                    if record.registrar.is_none() {
                        record.registrar = Some(value.to_string());
                    }
                }

                k if k.contains("name server") || k == "nserver" || k == "ns" || k == "nameserver"
                    || k == "nameservers" =>
                {
                    // Hostname only, trailing glue IPs dropped
                    let server = value
                        .split_whitespace()
                        .next()
                        .unwrap_or(value)
                        .trim_end_matches('.')
                        .to_lowercase();
                    if !nameservers.contains(&server) {
                        nameservers.push(server);
                    }
                }

                _ => {}
            }
        }

        if FREE_STATUS.is_match(data) || (record.name.is_none() && NOT_FOUND.is_match(data)) {
            debug!("Whois output reports no matching domain");
            return Ok(None);
        }

        if fields_seen == 0 {
            return Err(ResolverFailure::Unparseable(
                "no key/value fields in whois output".to_string(),
            ));
        }

        record.creation_date = self.parse_date_field(creation_raw.as_deref())?;
        record.last_updated = self.parse_date_field(updated_raw.as_deref())?;
        if !nameservers.is_empty() {
            record.nameservers = Some(nameservers);
        }

        Ok(Some(record))
    }

    fn parse_date_field(&self, value: Option<&str>) -> Result<DateField, ResolverFailure> {
        let Some(value) = value else {
            return Ok(DateField::Absent);
        };

        if DATE_PLACEHOLDER.is_match(value.trim()) {
            debug!("Placeholder date value: {}", value);
            return Ok(DateField::Invalid(value.to_string()));
        }

        self.parse_date(value)
            .map(DateField::Valid)
            .ok_or_else(|| ResolverFailure::DateFormat(value.to_string()))
    }

    /// Parse various date formats commonly found in whois data
    pub fn parse_date(&self, date_str: &str) -> Option<DateTime<Utc>> {
        let date_str = date_str.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
            return Some(dt.with_timezone(&Utc));
        }

        // Try parsing with timezone first
        for format in &DATETIME_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(date_str, format) {
                return Some(dt.with_timezone(&Utc));
            }
        }

        // Naive datetimes are taken as UTC
        for format in &DATETIME_FORMATS {
            if let Ok(naive_dt) = NaiveDateTime::parse_from_str(date_str, format) {
                return Some(DateTime::from_naive_utc_and_offset(naive_dt, Utc));
            }
        }

        // Dates without time are taken as midnight UTC
        for format in &DATE_FORMATS {
            if let Ok(naive_date) = NaiveDate::parse_from_str(date_str, format) {
                if let Some(naive_dt) = naive_date.and_hms_opt(0, 0, 0) {
                    return Some(DateTime::from_naive_utc_and_offset(naive_dt, Utc));
                }
            }
        }

        debug!("Failed to parse date: {}", date_str);
        None
    }
}

impl Default for WhoisParser {
    fn default() -> Self {
        Self::new()
    }
}
