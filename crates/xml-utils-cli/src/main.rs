//! xmlutils
//!
//! Command-line front end for the Helios XML utilities.

mod config;

use std::path::Path;

use clap::Parser;
use helios_xml_utils::{ElementStream, root_element_name, root_element_name_async};
use tracing::{debug, info};

use crate::config::{CliConfig, Command};

/// Initializes the tracing subscriber. Output goes to stderr so that stdout
/// carries only command results.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "helios_xml_utils={level},helios_xml_utils_cli={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Prints or checks the root element name. Returns false on a mismatch.
async fn run_root(file: &Path, expect: Option<&str>, use_async: bool) -> anyhow::Result<bool> {
    let name = if use_async {
        root_element_name_async(file).await?
    } else {
        root_element_name(file)?
    };
    debug!(file = %file.display(), root = %name, "Probed root element");

    match expect {
        Some(expected) if expected != name => {
            eprintln!("Root element is <{}>, expected <{}>", name, expected);
            Ok(false)
        }
        Some(_) => Ok(true),
        None => {
            println!("{}", name);
            Ok(true)
        }
    }
}

fn run_enumerate(file: &Path, element: &str, skip_empty: bool, count_only: bool) -> anyhow::Result<()> {
    let stream = ElementStream::from_file(file, element)?.include_empty_elements(!skip_empty);
    let mut count = 0usize;
    for item in stream {
        let item = item?;
        count += 1;
        if !count_only {
            println!("{}", item.to_xml_string()?);
        }
    }
    if count_only {
        println!("{}", count);
    }
    info!(file = %file.display(), element = %element, count, "Enumeration finished");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    match config.command {
        Command::Root {
            file,
            expect,
            use_async,
        } => {
            if !run_root(&file, expect.as_deref(), use_async).await? {
                std::process::exit(1);
            }
        }
        Command::Enumerate {
            file,
            element,
            skip_empty,
            count_only,
        } => run_enumerate(&file, &element, skip_empty, count_only)?,
    }

    Ok(())
}
