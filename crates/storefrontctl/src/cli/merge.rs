use std::sync::Arc;

use clap::Parser;
use eyre::Result as EyreResult;
use storefront_cart::{CartMergeProtocol, PageReloader};
use storefront_primitives::cart::Cart;
use tracing::info;

use crate::cli::Environment;

/// Merge the current cart into another cart, once per session
#[derive(Debug, Parser)]
pub struct MergeCommand {
    /// Target cart, `gid://<vendor>/Cart/<token>`
    #[arg(value_name = "CART_ID")]
    pub cart_id: String,
}

/// The CLI has no page; a reload is a log line and the next invocation
/// starts from the merged cart.
#[derive(Copy, Clone, Debug)]
struct LogReloader;

impl PageReloader for LogReloader {
    fn reload(&self, cart: &Cart) {
        info!(item_count = cart.item_count, token = %cart.token, "Reloading against merged cart");
    }
}

impl MergeCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        let ctx = environment.cart()?;
        let session = environment.session()?;

        let protocol = CartMergeProtocol::new(ctx.clone(), session, Arc::new(LogReloader));
        let outcome = protocol.run(&self.cart_id).await?;

        environment.output.write(&outcome);

        Ok(())
    }
}
