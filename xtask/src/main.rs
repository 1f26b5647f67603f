// Copyright 2025-Present Lumigo LTD. https://lumigo.io/
// SPDX-License-Identifier: Apache-2.0

//! CI helper tasks.

use anyhow::{Context, Result};

mod versions;

fn main() {
    if let Err(e) = try_main() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("supported-ranges") => supported_ranges(args),
        _ => print_help(),
    }
}

/// Print the supported version ranges for each tested-versions file given
/// on the command line.
fn supported_ranges(files: impl Iterator<Item = String>) -> Result<()> {
    let mut seen_any = false;
    for path in files {
        seen_any = true;
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading tested versions from {path}"))?;
        let mut versions = versions::parse_tested_versions(&contents)
            .with_context(|| format!("parsing tested versions from {path}"))?;
        versions.sort();
        let ranges = versions::supported_ranges(&versions);
        println!("{path}: {}", ranges.join(", "));
    }
    if !seen_any {
        anyhow::bail!("supported-ranges requires at least one tested-versions file");
    }
    Ok(())
}

fn print_help() -> Result<()> {
    eprintln!(
        "Tasks:
  - supported-ranges <file>...
"
    );
    Ok(())
}
