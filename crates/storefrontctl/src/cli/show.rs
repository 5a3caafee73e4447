use clap::Parser;
use eyre::Result as EyreResult;

use crate::cli::Environment;

/// Print the current cart
#[derive(Copy, Clone, Debug, Parser)]
pub struct ShowCommand;

impl ShowCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        let cart = environment.cart()?.refresh().await?;

        environment.output.write(&*cart);

        Ok(())
    }
}
