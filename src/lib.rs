pub mod cli;
pub mod commands;
pub mod correspondence;
pub mod db;
pub mod loops;
pub mod motifs;
pub mod notify;
pub mod nr;
pub mod pdb;
pub mod records;
pub mod releases;
pub mod runner;
pub mod schema;
pub mod settings;
pub mod stage;
pub mod status;
pub mod toolkit;
pub mod units;
