use clap::Parser;
use eyre::{bail, Result as EyreResult};
use storefront_cart::{CartError, CartNote, Outcome};

use crate::cli::Environment;
use crate::output::NoteReport;

/// Replace the cart note
#[derive(Debug, Parser)]
pub struct NoteCommand {
    /// New note, an empty string clears it
    #[arg(value_name = "TEXT")]
    pub text: String,
}

impl NoteCommand {
    pub async fn run(self, environment: &Environment) -> EyreResult<()> {
        let ctx = environment.cart()?;

        // the editor starts from the stored note
        let _cart = ctx.cache().get().await.map_err(CartError::from)?;
        let note = CartNote::mount(ctx);

        let outcome = note.set_note(self.text).outcome().await;

        note.teardown().await;

        let report = match outcome {
            Outcome::Applied(note) => NoteReport {
                note,
                changed: true,
            },
            Outcome::Unchanged(note) => NoteReport {
                note,
                changed: false,
            },
            Outcome::Failed(err) => return Err(err.into()),
            Outcome::Ignored | Outcome::Superseded => bail!("Note update did not complete"),
        };

        environment.output.write(&report);

        Ok(())
    }
}
