//! Shared utilities for the marionette-rs CLI

pub mod table;

pub use table::*;
