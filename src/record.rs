//! Typed view of what a whois resolver returned for one domain.

use chrono::{DateTime, Utc};

/// A date field as reported by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DateField {
    /// The response carried no such field.
    #[default]
    Absent,
    /// The field was present but held no usable point in time (e.g. "N/A").
    Invalid(String),
    Valid(DateTime<Utc>),
}

impl DateField {
    pub fn valid(&self) -> Option<DateTime<Utc>> {
        match self {
            DateField::Valid(dt) => Some(*dt),
            _ => None,
        }
    }
}

/// Raw whois record. Only the fields the analysis consumes are kept; each
/// carries its own presence information.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawWhoisRecord {
    /// Domain name reported by the registry, usually the registrable zone.
    pub name: Option<String>,
    pub creation_date: DateField,
    pub last_updated: DateField,
    pub registrar: Option<String>,
    pub nameservers: Option<Vec<String>>,
}
