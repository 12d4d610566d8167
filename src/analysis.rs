//! Result classification: turns a lookup outcome into a finalized
//! [`AnalysisRecord`].
//!
//! Classification is a total function of `(outcome, now)`. Every anomaly ends
//! up as a flag or a clamped value on the record, so callers always get a
//! usable result and "no result" stays distinguishable from "field missing".

use crate::{errors::LookupError, lookup::LookupOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Zone name recorded when the resolver did not report one.
pub const NO_ZONE_NAME: &str = "NO_ZONE_NAME_RETURNED";

const SUMMARY_PREFIX: &str = "Whois Analysis - ";

/// Independent condition flags. Any subset may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionFlags {
    pub tld_not_supported: bool,
    pub domain_not_found: bool,
    pub whois_linux_not_installed: bool,
    pub whois_python_package_not_installed: bool,
    pub command_failed: bool,
    pub command_timed_out: bool,
    pub datetime_unknown_date_format: bool,
    pub datetime_created_missing_or_invalid: bool,
    pub datetime_updated_missing_or_invalid: bool,
}

impl ConditionFlags {
    fn record_failure(&mut self, error: &LookupError) {
        match error {
            LookupError::UnsupportedTld(_) => self.tld_not_supported = true,
            LookupError::ResolverBinaryMissing(_) => self.whois_linux_not_installed = true,
            LookupError::ResolverPackageMissing => self.whois_python_package_not_installed = true,
            LookupError::CommandExecutionFailed(_) => self.command_failed = true,
            LookupError::UnknownDateFormat(_) => self.datetime_unknown_date_format = true,
            LookupError::Timeout => self.command_timed_out = true,
        }
    }

    /// Names of the flags that are set, in declaration order.
    pub fn active(&self) -> Vec<&'static str> {
        [
            ("tld_not_supported", self.tld_not_supported),
            ("domain_not_found", self.domain_not_found),
            ("whois_linux_not_installed", self.whois_linux_not_installed),
            ("whois_python_package_not_installed", self.whois_python_package_not_installed),
            ("command_failed", self.command_failed),
            ("command_timed_out", self.command_timed_out),
            ("datetime_unknown_date_format", self.datetime_unknown_date_format),
            ("datetime_created_missing_or_invalid", self.datetime_created_missing_or_invalid),
            ("datetime_updated_missing_or_invalid", self.datetime_updated_missing_or_invalid),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    /// True when any flag describing a failed or empty lookup is set.
    pub fn any_failure(&self) -> bool {
        self.tld_not_supported
            || self.domain_not_found
            || self.whois_linux_not_installed
            || self.whois_python_package_not_installed
            || self.command_failed
            || self.command_timed_out
            || self.datetime_unknown_date_format
    }
}

/// Finalized result of one whois analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub zone_name: Option<String>,
    pub datetime_created: Option<String>,
    pub datetime_of_last_update: Option<String>,
    pub age_created_in_days: Option<String>,
    pub age_last_updated_in_days: Option<String>,
    pub datetime_of_analysis: String,
    pub nameservers: Option<Vec<String>>,
    pub registrar: Option<String>,
    #[serde(flatten)]
    pub flags: ConditionFlags,
}

impl AnalysisRecord {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            zone_name: None,
            datetime_created: None,
            datetime_of_last_update: None,
            age_created_in_days: None,
            age_last_updated_in_days: None,
            datetime_of_analysis: format_timestamp(now),
            nameservers: None,
            registrar: None,
            flags: ConditionFlags::default(),
        }
    }

    /// Plain-text summary for analysts. Never empty.
    ///
    /// A failed or empty lookup yields a single message naming the failure.
    /// Otherwise the zone name is reported with both ages, each replaced by
    /// "missing or invalid" text when the underlying date was unusable.
    pub fn summary(&self) -> String {
        let flags = &self.flags;
        let failure = if flags.tld_not_supported {
            Some("TLD not supported by whois resolver.")
        } else if flags.domain_not_found {
            Some("FQDN doesn't exist.")
        } else if flags.datetime_unknown_date_format {
            Some("Whois resolver returned a date in an unknown format.")
        } else if flags.whois_linux_not_installed {
            Some("Whois linux program not installed on analysis server.")
        } else if flags.whois_python_package_not_installed {
            Some("Whois resolver not available on analysis server.")
        } else if flags.command_failed {
            Some("Whois command failed or returned unparseable output.")
        } else if flags.command_timed_out {
            Some("Whois lookup timed out.")
        } else {
            None
        };

        if let Some(message) = failure {
            return format!("{SUMMARY_PREFIX}{message}");
        }

        let zone = self.zone_name.as_deref().unwrap_or(NO_ZONE_NAME);
        let created = match &self.age_created_in_days {
            Some(age) if !flags.datetime_created_missing_or_invalid => {
                format!("created {age} days ago")
            }
            _ => "creation datetime missing or invalid".to_string(),
        };
        let updated = match &self.age_last_updated_in_days {
            Some(age) if !flags.datetime_updated_missing_or_invalid => {
                format!("last updated {age} days ago")
            }
            _ => "last updated datetime missing or invalid".to_string(),
        };

        format!("{SUMMARY_PREFIX}{zone} - {created}, {updated}.")
    }
}

/// Classify a lookup outcome relative to `now`.
pub fn classify(outcome: &LookupOutcome, now: DateTime<Utc>) -> AnalysisRecord {
    let mut record = AnalysisRecord::empty(now);

    let raw = match outcome {
        Err(error) => {
            record.flags.record_failure(error);
            return record;
        }
        Ok(None) => {
            record.flags.domain_not_found = true;
            return record;
        }
        Ok(Some(raw)) => raw,
    };

    record.zone_name = Some(match raw.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => NO_ZONE_NAME.to_string(),
    });

    match raw.creation_date.valid() {
        Some(created) => {
            record.datetime_created = Some(format_timestamp(created));
            record.age_created_in_days = Some(age_in_days(created, now).to_string());
        }
        None => record.flags.datetime_created_missing_or_invalid = true,
    }

    match raw.last_updated.valid() {
        Some(updated) => {
            record.datetime_of_last_update = Some(format_timestamp(updated));
            record.age_last_updated_in_days = Some(age_in_days(updated, now).to_string());
        }
        None => record.flags.datetime_updated_missing_or_invalid = true,
    }

    record.registrar = raw.registrar.clone();
    record.nameservers = raw.nameservers.clone();

    record
}

/// Whole days elapsed from `then` to `now`, floored. Timestamps in the
/// future (clock or timezone skew) clamp to zero.
pub fn age_in_days(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - then).num_days().max(0)
}

/// ISO-8601 with a space separator and no offset, e.g. `2024-06-01 12:00:00`.
/// Fractional seconds are only printed when non-zero.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DateField, RawWhoisRecord};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn record_with(name: Option<&str>, created: DateField, updated: DateField) -> RawWhoisRecord {
        RawWhoisRecord {
            name: name.map(str::to_string),
            creation_date: created,
            last_updated: updated,
            ..Default::default()
        }
    }

    #[test]
    fn test_not_found_sets_only_domain_not_found() {
        let record = classify(&Ok(None), now());

        assert_eq!(
            record.flags,
            ConditionFlags {
                domain_not_found: true,
                ..Default::default()
            }
        );
        assert!(record.zone_name.is_none());
        assert!(record.age_created_in_days.is_none());
        assert!(record.age_last_updated_in_days.is_none());
        assert_eq!(record.datetime_of_analysis, "2024-06-01 12:00:00");
        assert_eq!(record.summary(), "Whois Analysis - FQDN doesn't exist.");
    }

    #[test]
    fn test_unsupported_tld_sets_single_flag() {
        let outcome = Err(LookupError::UnsupportedTld("zz".to_string()));
        let record = classify(&outcome, now());

        assert_eq!(
            record.flags,
            ConditionFlags {
                tld_not_supported: true,
                ..Default::default()
            }
        );
        assert_eq!(
            record.summary(),
            "Whois Analysis - TLD not supported by whois resolver."
        );
    }

    #[test]
    fn test_each_error_kind_maps_to_its_own_flag() {
        let cases = [
            (LookupError::ResolverBinaryMissing("whois".to_string()), "linux program not installed"),
            (LookupError::ResolverPackageMissing, "resolver not available"),
            (LookupError::CommandExecutionFailed("exit status 1".to_string()), "command failed"),
            (LookupError::UnknownDateFormat("tomorrow".to_string()), "unknown format"),
            (LookupError::Timeout, "timed out"),
        ];

        for (error, phrase) in cases {
            let record = classify(&Err(error.clone()), now());
            assert_eq!(record.flags.active().len(), 1, "{:?} should set exactly one flag", error);
            assert!(record.zone_name.is_none());
            assert!(
                record.summary().contains(phrase),
                "summary for {:?} was {:?}",
                error,
                record.summary()
            );
        }
    }

    #[test]
    fn test_full_record_computes_ages() {
        let raw = RawWhoisRecord {
            name: Some("EXAMPLE.COM".to_string()),
            creation_date: DateField::Valid(now() - Duration::days(3650)),
            last_updated: DateField::Valid(now() - Duration::days(10)),
            registrar: Some("RESERVED-Internet Assigned Numbers Authority".to_string()),
            nameservers: Some(vec!["a.iana-servers.net".to_string()]),
        };

        let record = classify(&Ok(Some(raw)), now());

        assert_eq!(record.zone_name.as_deref(), Some("EXAMPLE.COM"));
        assert_eq!(record.age_created_in_days.as_deref(), Some("3650"));
        assert_eq!(record.age_last_updated_in_days.as_deref(), Some("10"));
        assert_eq!(record.datetime_created.as_deref(), Some("2014-06-04 12:00:00"));
        assert_eq!(record.datetime_of_last_update.as_deref(), Some("2024-05-22 12:00:00"));
        assert!(record.flags.active().is_empty());
        assert_eq!(record.nameservers.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            record.summary(),
            "Whois Analysis - EXAMPLE.COM - created 3650 days ago, last updated 10 days ago."
        );
    }

    #[test]
    fn test_missing_name_and_creation_date() {
        let raw = record_with(
            None,
            DateField::Absent,
            DateField::Valid(now() - Duration::days(42)),
        );

        let record = classify(&Ok(Some(raw)), now());

        assert_eq!(record.zone_name.as_deref(), Some(NO_ZONE_NAME));
        assert!(record.flags.datetime_created_missing_or_invalid);
        assert!(!record.flags.datetime_updated_missing_or_invalid);
        assert!(record.age_created_in_days.is_none());
        assert!(record.datetime_created.is_none());
        assert_eq!(record.age_last_updated_in_days.as_deref(), Some("42"));
        assert_eq!(
            record.summary(),
            "Whois Analysis - NO_ZONE_NAME_RETURNED - creation datetime missing or invalid, last updated 42 days ago."
        );
    }

    #[test]
    fn test_missing_update_date_is_independent() {
        let raw = record_with(
            Some("example.org"),
            DateField::Valid(now() - Duration::days(100)),
            DateField::Absent,
        );

        let record = classify(&Ok(Some(raw)), now());

        assert!(!record.flags.datetime_created_missing_or_invalid);
        assert!(record.flags.datetime_updated_missing_or_invalid);
        assert_eq!(record.age_created_in_days.as_deref(), Some("100"));
        assert!(record.age_last_updated_in_days.is_none());
        assert!(!record.flags.any_failure());
        assert_eq!(
            record.summary(),
            "Whois Analysis - example.org - created 100 days ago, last updated datetime missing or invalid."
        );
    }

    #[test]
    fn test_invalid_date_counts_as_missing() {
        let raw = record_with(
            Some("example.org"),
            DateField::Invalid("N/A".to_string()),
            DateField::Invalid("".to_string()),
        );

        let record = classify(&Ok(Some(raw)), now());

        assert_eq!(
            record.flags.active(),
            ["datetime_created_missing_or_invalid", "datetime_updated_missing_or_invalid"]
        );
        assert!(record.datetime_created.is_none());
        assert!(record.datetime_of_last_update.is_none());
    }

    #[test]
    fn test_empty_name_uses_sentinel() {
        let raw = record_with(Some(""), DateField::Absent, DateField::Absent);
        let record = classify(&Ok(Some(raw)), now());
        assert_eq!(record.zone_name.as_deref(), Some(NO_ZONE_NAME));
    }

    #[test]
    fn test_future_dates_clamp_to_zero() {
        let raw = record_with(
            Some("example.net"),
            DateField::Valid(now() + Duration::days(3)),
            DateField::Valid(now() + Duration::hours(5)),
        );

        let record = classify(&Ok(Some(raw)), now());

        assert_eq!(record.age_created_in_days.as_deref(), Some("0"));
        assert_eq!(record.age_last_updated_in_days.as_deref(), Some("0"));
        assert!(!record.flags.datetime_created_missing_or_invalid);
    }

    #[test]
    fn test_age_floors_partial_days() {
        let then = now() - Duration::days(7) - Duration::hours(23);
        assert_eq!(age_in_days(then, now()), 7);
        assert_eq!(age_in_days(now() - Duration::hours(23), now()), 0);
        assert_eq!(age_in_days(now(), now()), 0);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let outcome = Ok(Some(record_with(
            Some("example.com"),
            DateField::Valid(now() - Duration::days(5)),
            DateField::Absent,
        )));

        let first = serde_json::to_string(&classify(&outcome, now())).unwrap();
        let second = serde_json::to_string(&classify(&outcome, now())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_timestamp_format_keeps_fraction_only_when_present() {
        let whole = Utc.with_ymd_and_hms(1995, 8, 14, 4, 0, 0).unwrap();
        assert_eq!(format_timestamp(whole), "1995-08-14 04:00:00");

        let fractional = whole + Duration::milliseconds(250);
        assert_eq!(format_timestamp(fractional), "1995-08-14 04:00:00.250");
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = classify(&Ok(None), now());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["domain_not_found"], serde_json::Value::Bool(true));
        assert_eq!(value["tld_not_supported"], serde_json::Value::Bool(false));
        assert_eq!(value["datetime_of_analysis"], "2024-06-01 12:00:00");
        assert!(value["zone_name"].is_null());
    }
}
