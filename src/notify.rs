/// What happens after a release is committed: cached pages are invalidated
/// and a plain-text report is left in the report directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use reqwest::blocking::Client;
use thiserror::Error;

use crate::releases::ReleaseSummary;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Requests every cache-invalidation URL. Failures are logged and skipped;
/// returns how many succeeded.
pub fn invalidate_caches(urls: &[String]) -> Result<usize, NotifyError> {
    if urls.is_empty() {
        return Ok(0);
    }
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

    let mut succeeded = 0;
    for url in urls {
        match client.get(url).send() {
            Ok(response) if response.status().is_success() => {
                info!("Invalidated {}", url);
                succeeded += 1;
            }
            Ok(response) => warn!("{} returned status {}", url, response.status().as_u16()),
            Err(err) => warn!("Could not reach {}: {}", url, err),
        }
    }
    Ok(succeeded)
}

pub fn render_report(summary: &ReleaseSummary) -> String {
    let previous = summary
        .previous
        .map(|p| p.to_string())
        .unwrap_or_else(|| "none".to_string());
    let mut report = format!(
        "{} release {} (previous release: {})\n",
        summary.kind, summary.release_id, previous
    );

    for (label, diff) in &summary.diffs {
        report.push_str(&format!("\n[{}] {}\n", label, diff));
        for (title, ids) in [
            ("updated", &diff.updated_groups),
            ("added", &diff.added_groups),
            ("removed", &diff.removed_groups),
        ] {
            if !ids.is_empty() {
                report.push_str(&format!("  {}: {}\n", title, ids.join(" ")));
            }
        }
    }
    report
}

/// Writes `{kind}_{release}.txt` into `dir` and logs its content.
pub fn write_report(dir: &Path, summary: &ReleaseSummary) -> Result<PathBuf, NotifyError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_{}.txt", summary.kind, summary.release_id));
    let report = render_report(summary);
    fs::write(&path, &report)?;

    for line in report.lines().filter(|l| !l.is_empty()) {
        info!("{}", line);
    }
    info!("Release report written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::releases::{ReleaseDiff, ReleaseId};

    fn summary() -> ReleaseSummary {
        ReleaseSummary {
            kind: "ml".to_string(),
            release_id: ReleaseId::new(1, 2),
            previous: Some(ReleaseId::new(1, 1)),
            diffs: vec![(
                "HL".to_string(),
                ReleaseDiff {
                    same_groups: vec!["HL_10000.1".to_string()],
                    updated_groups: vec!["HL_20000.3".to_string()],
                    added_groups: vec![],
                    removed_groups: vec!["HL_30000.1".to_string()],
                    added_members: vec!["HL_2AW7_001".to_string()],
                    removed_members: vec![],
                },
            )],
        }
    }

    #[test]
    fn report_lists_changed_groups() {
        let report = render_report(&summary());
        assert!(report.starts_with("ml release 1.2 (previous release: 1.1)"));
        assert!(report.contains("[HL] 1 same, 1 updated, 0 added, 1 removed groups"));
        assert!(report.contains("  updated: HL_20000.3"));
        assert!(report.contains("  removed: HL_30000.1"));
        assert!(!report.contains("added:"));
        assert_eq!(report.lines().count(), 5);
        assert!(report.ends_with('\n'));
    }

    #[test]
    fn writes_report_into_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(&dir.path().join("reports"), &summary()).unwrap();
        assert_eq!(path.file_name().unwrap(), "ml_1.2.txt");
        assert!(fs::read_to_string(path).unwrap().contains("HL_20000.3"));
    }

    #[test]
    fn nothing_to_invalidate() {
        assert_eq!(invalidate_caches(&[]).unwrap(), 0);
    }

    #[test]
    fn unreachable_caches_are_not_fatal() {
        let urls = vec!["http://127.0.0.1:9/cache".to_string()];
        assert_eq!(invalidate_caches(&urls).unwrap(), 0);
    }
}
