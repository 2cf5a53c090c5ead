//! Configuration management for targetscan.
//!
//! Provides XDG-compliant configuration storage and application settings.

mod settings;

pub use settings::{AppSettings, Paths};
