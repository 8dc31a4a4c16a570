//! The `snapshot` command: export the composed config with metadata.

use std::path::PathBuf;

use anyhow::Result;
use strata_config::{ConfigBackend, ConfigError};

use crate::commands::{context_from_pairs, mapping_from_pairs, sources_declaration};

pub fn run(
    sources: &[String],
    meta: &[String],
    context: &[String],
    output_file: Option<PathBuf>,
) -> Result<()> {
    let declaration = sources_declaration(sources);
    let context = context_from_pairs(context)?;
    let mut backend = ConfigBackend::new_with_context(declaration, context)?;

    let meta = mapping_from_pairs(meta, "--meta")?;
    let snapshot = backend.snapshot(meta)?;
    let text = snapshot.to_yaml()?;

    match output_file {
        Some(path) => {
            std::fs::write(&path, &text).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            tracing::info!(path = %path.display(), "Snapshot written");
        }
        None => println!("{}", text.trim_end()),
    }
    Ok(())
}
