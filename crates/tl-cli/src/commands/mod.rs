//! CLI subcommand implementations.

pub mod detect;
pub mod parsers;
pub mod scan;
pub mod util;
