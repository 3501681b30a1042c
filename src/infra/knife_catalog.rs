use crate::domain::{CommandOutput, CookbookCatalog};
use crate::infra::process::run_captured;
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::path::Path;
use tracing::info;

const KNIFE: &str = "knife";
pub const UNPUBLISHED_VERSION: &str = "0.0.0";

/// `CookbookCatalog` backed by `knife` talking to the chef server
#[derive(Debug, Clone, Default)]
pub struct KnifeCatalog;

impl KnifeCatalog {
    pub fn new() -> Self {
        Self
    }

    fn knife(&self, args: &[&str]) -> Result<CommandOutput> {
        run_captured(KNIFE, args).with_context(|| format!("running knife {}", args.join(" ")))
    }

    /// No readable client key means there is no chef server to ask
    fn is_local(&self) -> Result<bool> {
        let output = self.knife(&["config", "get", "client_key"])?;
        if !output.success {
            bail!("Failed to read your knife configuration, please check your config");
        }
        let key = parse_client_key(&output.stdout).context(
            "Failed to get \"client_key\" from knife configuration, please check your config",
        )?;
        Ok(!Path::new(&key).exists())
    }
}

impl CookbookCatalog for KnifeCatalog {
    fn cookbook_version(&self, cookbook: &str) -> Result<String> {
        if self.is_local()? {
            info!("No chef server configured, assuming {cookbook} was never published");
            return Ok(UNPUBLISHED_VERSION.to_string());
        }

        let listing = self.knife(&["cookbook", "list"])?;
        if !listing.success {
            bail!("Failed to get cookbook list: {}", listing.message());
        }
        if !is_listed(&listing.stdout, cookbook)? {
            return Ok(UNPUBLISHED_VERSION.to_string());
        }

        let shown = self.knife(&["cookbook", "show", cookbook])?;
        if !shown.success {
            bail!("Failed to get cookbook version: {}", shown.message());
        }
        parse_shown_version(&shown.stdout)
            .with_context(|| format!("no version in `knife cookbook show {cookbook}` output"))
    }
}

/// Extracts the path from a `client_key: /path/to/key.pem` line
fn parse_client_key(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let value = line.trim_start().strip_prefix("client_key:")?.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn is_listed(listing: &str, cookbook: &str) -> Result<bool> {
    let pattern = Regex::new(&format!(r"(?m)^{}\s+", regex::escape(cookbook)))
        .context("building cookbook pattern")?;
    Ok(pattern.is_match(listing))
}

/// `knife cookbook show NAME` prints `NAME   1.2.3  1.2.2 ...`, newest first
fn parse_shown_version(output: &str) -> Option<String> {
    output.split_whitespace().nth(1).map(str::to_string)
}
