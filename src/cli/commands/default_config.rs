//! Print a default configuration.

use anyhow::Result;
use volbreak_config::default_toml;

pub async fn run() -> Result<()> {
    print!("{}", default_toml()?);
    Ok(())
}
