//! # CLI Argument Definitions
//!
//! Flags of the `anvil` binary, parsed with `clap`.

use anvil::domain::PropertyKey;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "anvil")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Loads configuration domains and runs the demo activators")]
pub struct Cli {
    /// Folder holding the `<domain>.config` files (defaults to `ANVIL__CONFIG_FOLDER` or `config`)
    #[arg(long, value_name = "DIR")]
    pub config_folder: Option<PathBuf>,

    /// Print the properties of a domain after the run (repeatable)
    #[arg(long = "domain", value_name = "NAME")]
    pub domains: Vec<String>,

    /// Override a property for this run, as `domain:key=value` or `key=value`
    #[arg(long = "set", value_name = "[DOMAIN:]KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<(PropertyKey, String)>,

    /// Print the activation order and exit
    #[arg(long)]
    pub plan: bool,

    /// Leave dirty domains unsaved
    #[arg(long)]
    pub no_save: bool,

    /// Also write rolled log files into this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Increase log verbosity (`-v` debug, `-vv` trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Parses `domain:key=value`; a key without a domain lands in the default domain.
pub fn parse_override(raw: &str) -> Result<(PropertyKey, String), String> {
    let (key, value) = raw.split_once('=').ok_or_else(|| format!("`{raw}` is not KEY=VALUE"))?;
    let key = match key.split_once(':') {
        Some((domain, name)) if !domain.trim().is_empty() => {
            PropertyKey::new(domain.trim().to_owned(), name.trim().to_owned())
        },
        Some(_) => return Err(format!("`{raw}` has an empty domain")),
        None => PropertyKey::in_default(key.trim().to_owned()),
    };

    if key.name.is_empty() {
        return Err(format!("`{raw}` has an empty key"));
    }
    Ok((key, value.to_owned()))
}
