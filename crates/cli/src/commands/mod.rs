//! `pos-cli` subcommands.

pub mod run;
pub mod search;
