use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;

use crate::record::ProfileRecord;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            url           TEXT PRIMARY KEY,
            type          TEXT NOT NULL CHECK(type IN ('Prospect','Company')),
            first_name    TEXT,
            last_name     TEXT,
            job_title     TEXT,
            company_name  TEXT,
            location      TEXT,
            industry      TEXT,
            domain        TEXT,
            employee_size TEXT,
            headquarters  TEXT,
            timestamp     TEXT NOT NULL,
            full_data     TEXT NOT NULL,
            updated_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_profiles_type ON profiles(type);
        ",
    )?;
    Ok(())
}

// ── Profiles ──

/// Flattened columns for one record; person-only and company-only
/// columns are left NULL for the other kind.
pub struct ProfileRow<'a> {
    pub url: &'a str,
    pub kind: &'static str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub job_title: Option<&'a str>,
    pub company_name: &'a str,
    pub location: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub domain: Option<&'a str>,
    pub employee_size: Option<&'a str>,
    pub headquarters: Option<&'a str>,
    pub timestamp: String,
}

impl<'a> ProfileRow<'a> {
    pub fn from_record(record: &'a ProfileRecord) -> Self {
        let millis = chrono::SecondsFormat::Millis;
        match record {
            ProfileRecord::Person(p) => ProfileRow {
                url: &p.source_url,
                kind: record.type_label(),
                first_name: Some(p.first_name.as_str()),
                last_name: Some(p.last_name.as_str()),
                job_title: Some(p.job_title.as_str()),
                company_name: &p.company_name,
                location: Some(p.location.as_str()),
                industry: None,
                domain: None,
                employee_size: None,
                headquarters: None,
                timestamp: p.captured_at.to_rfc3339_opts(millis, true),
            },
            ProfileRecord::Company(c) => ProfileRow {
                url: &c.source_url,
                kind: record.type_label(),
                first_name: None,
                last_name: None,
                job_title: None,
                company_name: &c.company_name,
                location: None,
                industry: Some(c.industry.as_str()),
                domain: Some(c.domain.as_str()),
                employee_size: Some(c.employee_size.as_str()),
                headquarters: Some(c.headquarters.as_str()),
                timestamp: c.captured_at.to_rfc3339_opts(millis, true),
            },
        }
    }
}

/// Insert or refresh the row for this URL. A later capture of the same page
/// replaces every column.
pub fn upsert_profile(conn: &Connection, row: &ProfileRow, full_data: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO profiles (
            url, type, first_name, last_name, job_title, company_name, location,
            industry, domain, employee_size, headquarters, timestamp, full_data
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(url) DO UPDATE SET
            type = excluded.type,
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            job_title = excluded.job_title,
            company_name = excluded.company_name,
            location = excluded.location,
            industry = excluded.industry,
            domain = excluded.domain,
            employee_size = excluded.employee_size,
            headquarters = excluded.headquarters,
            timestamp = excluded.timestamp,
            full_data = excluded.full_data,
            updated_at = datetime('now')",
        rusqlite::params![
            row.url, row.kind, row.first_name, row.last_name, row.job_title, row.company_name,
            row.location, row.industry, row.domain, row.employee_size, row.headquarters,
            row.timestamp, full_data,
        ],
    )
}

pub fn count_by_type(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare("SELECT type, COUNT(*) FROM profiles GROUP BY type ORDER BY type")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
