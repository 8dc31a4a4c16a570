//! The `resolve` command: compose sources and print the result.

use anyhow::Result;
use strata_config::{ConfigBackend, flat_from_nested};

use crate::args::OutputFormat;
use crate::commands::{context_from_pairs, override_from_pairs, sources_declaration};

pub fn run(
    sources: &[String],
    set: &[String],
    context: &[String],
    output: OutputFormat,
    exclude_runtime_info: bool,
) -> Result<()> {
    let declaration = sources_declaration(sources);
    let context = context_from_pairs(context)?;
    let mut backend = ConfigBackend::new_with_context(declaration, context)?;

    if !set.is_empty() {
        backend.set_override_config(override_from_pairs(set)?)?;
    }

    let mapping = backend.to_mapping(exclude_runtime_info)?;
    let rendered = match output {
        OutputFormat::Yaml => serde_yaml::to_string(&mapping)?,
        OutputFormat::Json => serde_json::to_string_pretty(&mapping)?,
        OutputFormat::Flat => serde_yaml::to_string(&flat_from_nested(&mapping))?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
