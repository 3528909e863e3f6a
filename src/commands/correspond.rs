use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use crate::correspondence::collection::Collection;
use crate::correspondence::merger::{Decision, MergeOutcome, Merger, DEFAULT_MIN_OVERLAP};

#[derive(Parser, Debug, Clone)]
pub struct CorrespondCommand {
    /// New groups, `group_id,member_id`
    new: PathBuf,

    /// Old groups, `group_id,member_id`
    old: PathBuf,

    /// Overlap both ways needed to keep an old identity
    #[arg(long, default_value_t = DEFAULT_MIN_OVERLAP)]
    min_overlap: f64,
}

pub fn command(cmd: CorrespondCommand) -> Result<(), Box<dyn Error>> {
    let new = Collection::from_path(&cmd.new)?;
    let old = Collection::from_path(&cmd.old)?;
    let outcome = Merger::new(cmd.min_overlap)?.merge(&new, &old);
    info!(
        "{} exact matches, {} updated, {} new ids, {} removed",
        outcome.count(Decision::ExactMatch),
        outcome.count(Decision::Correspond),
        outcome.count(Decision::NewId),
        outcome.removed.len()
    );

    for line in render(&outcome) {
        println!("{}", line);
    }
    Ok(())
}

/// One tab separated line per new group, then one per removed old group.
pub fn render(outcome: &MergeOutcome) -> Vec<String> {
    let mut lines = vec!["group\tdecision\tmatched\tparents\texplanation".to_string()];
    for correspondence in outcome.correspondences.values() {
        lines.push(format!(
            "{}\t{}\t{}\t{}\t{}",
            correspondence.group,
            correspondence.decision,
            correspondence.matched.as_deref().unwrap_or("-"),
            correspondence.parents.join(","),
            correspondence.explanation
        ));
    }
    for removed in &outcome.removed {
        lines.push(format!("{}\tremoved\t-\t-\tNo new group", removed));
    }
    lines
}
