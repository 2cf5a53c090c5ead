//! Output formatting module.
//!
//! Provides plain text and JSON renderings of stored targets for the CLI.

mod json_format;
mod plain;

pub use json_format::print_json;
pub use plain::{
    print_error, print_info, print_serve_header, print_success, print_targets, print_warning,
};

use crate::cli::OutputFormat;
use crate::types::TargetRecord;
use std::io;

/// Print a target list according to the specified format.
pub fn format_targets(targets: &[TargetRecord], format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => plain::print_targets(targets),
        OutputFormat::Json => json_format::print_json(targets),
    }
}
