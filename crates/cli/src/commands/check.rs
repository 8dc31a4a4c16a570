//! The `check` command: validate sources and report per-source status.

use anyhow::Result;
use strata_config::{ConfigError, ConfigSourceList};

use crate::commands::{context_from_pairs, sources_declaration};

pub fn run(sources: &[String], context: &[String]) -> Result<()> {
    let declaration = sources_declaration(sources);
    let context = context_from_pairs(context)?;
    let list = ConfigSourceList::from_value(declaration)?;

    let mut first_failure: Option<ConfigError> = None;
    for source in list.iter() {
        let name = source.name().unwrap_or("<unnamed>");
        if !source.is_enabled_for(context.as_ref()) {
            println!(
                "skip  order={} format={} {name}",
                source.order(),
                source.format()
            );
            continue;
        }
        match source.load(context.as_ref()) {
            Ok(_) => println!(
                "ok    order={} format={} {name}",
                source.order(),
                source.format()
            ),
            Err(error) => {
                println!(
                    "fail  order={} format={} {name}: {error}",
                    source.order(),
                    source.format()
                );
                if first_failure.is_none() {
                    first_failure = Some(ConfigError::Source {
                        name: name.to_string(),
                        order: source.order(),
                        source: Box::new(error),
                    });
                }
            }
        }
    }

    // cross-source merges can fail even when every member loads
    if first_failure.is_none() {
        match list.load(context.as_ref()) {
            Ok(_) => println!("ok    merged load"),
            Err(error) => {
                println!("fail  merged load: {error}");
                first_failure = Some(error);
            }
        }
    }

    match first_failure {
        None => Ok(()),
        Some(error) => Err(error.into()),
    }
}
