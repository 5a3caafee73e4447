use clap::Parser;
use eyre::Result as EyreResult;
use storefront_primitives::cart::VariantId;

use crate::cli::Environment;

/// Add units of a variant to the cart
#[derive(Copy, Clone, Debug, Parser)]
pub struct AddCommand {
    #[arg(value_name = "VARIANT")]
    pub variant_id: VariantId,

    #[arg(long, short, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub quantity: u32,
}

impl AddCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        let cart = environment
            .cart()?
            .add(self.variant_id, self.quantity)
            .await?;

        environment.output.write(&*cart);

        Ok(())
    }
}
