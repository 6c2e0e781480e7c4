//! Library interface for rekeg
//!
//! The reinstall core (closure, sizing, confirmation, pipeline, dependents)
//! is generic over the [`formula::Registry`], [`bottle::BottleFetcher`] and
//! [`backend::Backend`] traits; the binary wires in the Homebrew-backed
//! implementations.

pub mod api;
pub mod backend;
pub mod bottle;
pub mod brew;
pub mod cask;
pub mod cellar;
pub mod cleanup;
pub mod closure;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod dependents;
pub mod devtools;
pub mod error;
pub mod formula;
pub mod messages;
pub mod migrate;
pub mod pipeline;
pub mod platform;
pub mod sizing;

pub use error::{RekegError, Result};
