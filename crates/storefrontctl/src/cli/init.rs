use clap::Parser;
use eyre::{bail, Result as EyreResult};
use storefront_config::ConfigFile;
use tracing::info;
use url::Url;

use crate::cli::Environment;
use crate::output::InfoLine;

/// Write a configuration for a shop into the home directory
#[derive(Debug, Parser)]
pub struct InitCommand {
    /// Origin of the storefront
    #[arg(long, value_name = "URL")]
    pub shop: Url,

    /// Overwrite an existing configuration
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        let home = &environment.home;

        if ConfigFile::exists(home) && !self.force {
            bail!("Configuration already exists at {home:?}, pass `--force` to overwrite");
        }

        let config = ConfigFile::new(self.shop);
        config.save(home)?;

        info!(%home, base_url = %config.shop.base_url, "Wrote configuration");

        environment
            .output
            .write(&InfoLine(&format!("Initialized storefront configuration in {home}")));

        Ok(())
    }
}
