//! Command-line configuration for `xmlutils`.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `XMLUTILS_LOG_LEVEL` | warn | Log level; `RUST_LOG` takes precedence |

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Inspect XML documents.
#[derive(Debug, Clone, Parser)]
#[command(name = "xmlutils")]
#[command(about = "Probe root elements and stream elements out of XML documents")]
pub struct CliConfig {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true, env = "XMLUTILS_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the root element name, or check it against an expected name.
    Root {
        /// Document to probe.
        file: PathBuf,

        /// Exit with status 1 unless the root element has this local name.
        #[arg(long)]
        expect: Option<String>,

        /// Use the non-blocking reader.
        #[arg(long = "async")]
        use_async: bool,
    },

    /// Print every element with the given qualified name.
    Enumerate {
        /// Document to read.
        file: PathBuf,

        /// Qualified element name to look for.
        element: String,

        /// Skip self-closing matches such as `<Item/>`.
        #[arg(long)]
        skip_empty: bool,

        /// Print only the number of matches.
        #[arg(long)]
        count_only: bool,
    },
}
