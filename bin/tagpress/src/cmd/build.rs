//! Build command - publishes every feed into the output directory

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use tagpress_core::BuildMeta;
use tagpress_generator::Builder;

use super::load_site;

/// Run the build command.
///
/// `output` overrides the configured output directory. With `list` every
/// written file is printed.
pub fn run(config_path: &Path, output: Option<&Path>, list: bool, meta: BuildMeta) -> Result<()> {
    tracing::info!(?config_path, ?output, generator = %meta.generator(), "starting build");

    let (config, root) = load_site(config_path)?;
    let mut builder = Builder::new(config, &root).with_meta(meta);
    if let Some(output) = output {
        builder = builder.with_output_dir(output);
    }

    let stats = builder.build().wrap_err("build failed")?;

    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Documents:  {}", stats.documents);
    println!("  Feeds:      {}", stats.feeds);
    println!("  Pages:      {}", stats.files);
    println!("  Outputs:    {}", stats.manifest.len());
    println!();
    println!("  Duration:   {:.2}s", stats.duration_ms as f64 / 1000.0);
    println!("  Output:     {}", builder.output_dir().display());
    println!();

    if list {
        for entry in &stats.manifest {
            println!(
                "  {}  {}",
                entry.content_type.as_deref().unwrap_or("-"),
                entry.path.display()
            );
        }
    }

    Ok(())
}
