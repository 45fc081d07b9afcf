//! Check command - validate configuration, feeds and content

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use tagpress_generator::Builder;

use super::load_site;

/// Run the check command.
///
/// Loads everything a build would and resolves every canonical path, but
/// writes no output. With `strict`, warnings fail the check.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "checking site");

    let (config, root) = load_site(config_path)?;
    let report = Builder::new(config, &root)
        .check()
        .wrap_err("check failed")?;

    println!("  ✓ {} documents, {} feeds, {} pages", report.documents, report.feeds, report.files);
    for warning in &report.warnings {
        println!("  ⚠ {warning}");
    }

    if strict && !report.warnings.is_empty() {
        bail!("{} warning(s) in strict mode", report.warnings.len());
    }
    Ok(())
}
