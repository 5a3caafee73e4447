use core::time::Duration;

use clap::Parser;
use eyre::{bail, Result as EyreResult};
use storefront_cart::{CartError, Outcome, QuantityControl, WidgetConfig};
use storefront_primitives::cart::VariantId;
use tracing::debug;

use crate::cli::Environment;
use crate::output::QuantityReport;

/// Set a variant's quantity the way a quantity widget does
#[derive(Copy, Clone, Debug, Parser)]
pub struct SetCommand {
    #[arg(value_name = "VARIANT")]
    pub variant_id: VariantId,

    #[arg(value_name = "QUANTITY")]
    pub quantity: u32,

    /// Reject quantities above this bound without contacting the shop
    #[arg(long, value_name = "MAX")]
    pub max: Option<u32>,
}

impl SetCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        let ctx = environment.cart()?;

        let mut config = WidgetConfig::new(self.variant_id).with_debounce(Duration::ZERO);
        if let Some(max) = self.max {
            config = config.with_max(max);
        }

        let cart = ctx.cache().get().await.map_err(CartError::from)?;
        let widget = QuantityControl::mount(ctx, config);
        widget.coordinator().observe(&cart);

        let outcome = match widget.set_quantity(self.quantity) {
            Ok(handle) => handle.outcome().await,
            Err(err) => Outcome::Failed(err),
        };

        widget.teardown().await;

        debug!(variant_id = %self.variant_id, ?outcome, "Quantity widget settled");

        let (quantity, changed) = match outcome {
            Outcome::Applied(quantity) => (quantity, true),
            Outcome::Unchanged(quantity) => (quantity, false),
            Outcome::Failed(err) => return Err(err.into()),
            Outcome::Ignored | Outcome::Superseded => {
                bail!("Quantity change for variant {} did not complete", self.variant_id)
            }
        };

        environment.output.write(&QuantityReport {
            variant_id: self.variant_id,
            quantity,
            changed,
        });

        Ok(())
    }
}
