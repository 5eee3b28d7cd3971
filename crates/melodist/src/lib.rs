//! melodist - key detection, correction and melody embellishment for MIDI
//! files.
//!
//! - `commands`: the work behind each subcommand
//! - `naming`: numbered output file names

pub mod commands;
pub mod naming;
