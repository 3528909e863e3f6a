use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::pdb::models::PdbObsolete;
use crate::pdb::PdbError;

fn obsolete_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^OBSLTE\s+(?P<date>\d{2}-[A-Za-z]{3}-\d{2})\s+(?P<id>\S+)\s*(?P<replaced>.*)$")
            .expect("obsolete line pattern is valid")
    })
}

/// Parses the `OBSLTE` records of the obsolete-entries status file:
///
/// ```text
/// OBSLTE    31-JAN-94 116L     216L
/// OBSLTE    26-SEP-06 1O1W     2I9H 2I9I
/// ```
///
/// Other lines (the file header) are skipped.
pub fn parse_obsolete(body: &str) -> Result<Vec<PdbObsolete>, PdbError> {
    let mut entries = Vec::new();

    for line in body.lines() {
        if !line.starts_with("OBSLTE") {
            continue;
        }
        let caps = obsolete_line()
            .captures(line.trim_end())
            .ok_or_else(|| PdbError::ObsoleteLine(line.to_string()))?;

        let date = &caps["date"];
        let obsolete_date = NaiveDate::parse_from_str(date, "%d-%b-%y")
            .map_err(|_| PdbError::Date(date.to_string()))?;

        let replacements: Vec<String> = caps["replaced"]
            .split_whitespace()
            .map(str::to_uppercase)
            .collect();

        entries.push(PdbObsolete {
            obsolete_id: caps["id"].to_uppercase(),
            obsolete_date,
            replaced_by: if replacements.is_empty() {
                None
            } else {
                Some(replacements.join(","))
            },
        });
    }

    Ok(entries)
}
