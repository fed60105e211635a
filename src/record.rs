use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::parser::ProfileKind;

/// Email sits behind the contact-info dialog; it is never scraped.
pub const EMAIL_PLACEHOLDER: &str = "Check Contact Info Section (Usually hidden)";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub company_name: String,
    pub location: String,
    pub about_summary: String,
    pub email: String,
    #[serde(rename = "url")]
    pub source_url: String,
    #[serde(rename = "timestamp", serialize_with = "iso_millis")]
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRecord {
    pub company_name: String,
    pub industry: String,
    pub domain: String,
    pub employee_size: String,
    pub headquarters: String,
    #[serde(rename = "url")]
    pub source_url: String,
    #[serde(rename = "timestamp", serialize_with = "iso_millis")]
    pub captured_at: DateTime<Utc>,
}

/// What one extraction pass hands to the sink. Untagged on the wire; the
/// collector tells the two apart by the presence of `firstName`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProfileRecord {
    Person(PersonRecord),
    Company(CompanyRecord),
}

impl ProfileRecord {
    pub fn kind(&self) -> ProfileKind {
        match self {
            ProfileRecord::Person(_) => ProfileKind::Person,
            ProfileRecord::Company(_) => ProfileKind::Company,
        }
    }

    pub fn source_url(&self) -> &str {
        match self {
            ProfileRecord::Person(p) => &p.source_url,
            ProfileRecord::Company(c) => &c.source_url,
        }
    }

    /// Type label used by the collector's storage.
    pub fn type_label(&self) -> &'static str {
        match self {
            ProfileRecord::Person(_) => "Prospect",
            ProfileRecord::Company(_) => "Company",
        }
    }
}

fn iso_millis<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true))
}
