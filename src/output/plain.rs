//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::types::{TargetRecord, TargetType};
use console::style;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;

const RULE: &str = "───────────────────────────────────────────────────────────────";

/// Print stored targets as a table.
pub fn print_targets(targets: &[TargetRecord]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_targets(&mut out, targets)
}

fn write_targets<W: Write>(out: &mut W, targets: &[TargetRecord]) -> io::Result<()> {
    writeln!(out)?;

    if targets.is_empty() {
        writeln!(out, "  {}", style("No targets stored.").dim())?;
        writeln!(out)?;
        return Ok(());
    }

    let domains = targets
        .iter()
        .filter(|t| t.kind == TargetType::Domain)
        .count();
    writeln!(
        out,
        "  {} {} total ({} domains, {} addresses)",
        style("Targets:").bold(),
        style(targets.len()).white().bold(),
        style(domains).cyan(),
        style(targets.len() - domains).yellow()
    )?;
    writeln!(out, "  {}", style(RULE).dim())?;
    writeln!(
        out,
        "  {:>6}  {:<12}  {}",
        style("#").bold(),
        style("TYPE").bold(),
        style("VALUE").bold()
    )?;
    writeln!(out, "  {}", style(RULE).dim())?;

    for (index, target) in targets.iter().enumerate() {
        let kind = match target.kind {
            TargetType::Domain => style(target.kind.as_str()).cyan(),
            TargetType::IpAddress => style(target.kind.as_str()).yellow(),
        };
        writeln!(out, "  {:>6}  {:<12}  {}", index + 1, kind, target.value)?;
    }

    writeln!(out, "  {}", style(RULE).dim())?;
    writeln!(out)?;
    Ok(())
}

/// Print the banner shown when the server starts.
pub fn print_serve_header(addr: SocketAddr, database: &Path, scanner: &str) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("targetscan").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Listening on {}",
        style("•").dim(),
        style(addr).white().bold()
    );
    println!(
        "{} Database: {}",
        style("•").dim(),
        database.display()
    );
    println!("{} Scanner: {}", style("•").dim(), style(scanner).yellow());
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}
