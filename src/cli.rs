use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Structure metadata from the PDB
    #[command(subcommand)]
    Pdbs(commands::pdbs::Commands),
    #[command(subcommand)]
    Loops(commands::loops::Commands),
    /// Per-nucleotide annotations
    #[command(subcommand)]
    Units(commands::units::Commands),
    #[command(subcommand)]
    Motifs(commands::motifs::Commands),
    /// Non-redundant equivalence classes
    #[command(subcommand)]
    Nr(commands::nr::Commands),
    /// Match two membership files without touching the database
    Correspond(commands::correspond::CorrespondCommand),
}

#[derive(Parser)]
#[command(
    name = "motif-atlas",
    color = clap::ColorChoice::Always,
    version,
    about = "RNA 3D structure pipeline: loops, motif atlas and non-redundant releases",
)]
pub struct Cli {
    /// Config file, without extension
    #[arg(short, long, global = true, default_value = "assets/config")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}
