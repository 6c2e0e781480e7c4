//! Command implementations for the rekeg CLI
//!
//! - **reinstall**: argument parsing, name resolution and the reinstall run

pub mod reinstall;

pub use reinstall::{
    Outcome, ReinstallArgs, ReinstallContext, ReinstallRequest, Targets, Treatment,
    formula_candidates, reinstall, resolve_targets,
};
