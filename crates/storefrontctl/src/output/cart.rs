use comfy_table::{Cell, Color, Table};
use serde::Serialize;
use storefront_cart::{MergeOutcome, MergeReport};
use storefront_primitives::cart::{Cart, VariantId};

use super::Report;

impl Report for Cart {
    fn report(&self) {
        let mut table = Table::new();
        let _ = table.set_header(vec![
            Cell::new("Variant").fg(Color::Blue),
            Cell::new("Product").fg(Color::Blue),
            Cell::new("Quantity").fg(Color::Blue),
            Cell::new("Line Key").fg(Color::Blue),
        ]);

        for item in &self.items {
            let _ = table.add_row(vec![
                item.variant_id.to_string(),
                item.product_id
                    .map_or_else(|| "-".to_owned(), |product_id| product_id.to_string()),
                item.quantity.to_string(),
                item.key.to_string(),
            ]);
        }

        println!("{table}");

        let mut summary = Table::new();
        let _ = summary.add_row(vec!["Items", &self.item_count.to_string()]);
        let _ = summary.add_row(vec!["Note", self.note.as_deref().unwrap_or("-")]);
        let _ = summary.add_row(vec!["Cart", self.token.as_str()]);
        println!("{summary}");
    }
}

impl Report for MergeOutcome {
    fn report(&self) {
        match self {
            Self::AlreadyRan => {
                let mut table = Table::new();
                let _ = table.set_header(vec![Cell::new("Cart Merge").fg(Color::Yellow)]);
                let _ = table.add_row(vec!["Already ran in this session, nothing to do"]);
                println!("{table}");
            }
            Self::Completed(report) => report.report(),
        }
    }
}

impl Report for MergeReport {
    fn report(&self) {
        let transitions = self
            .transitions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");

        let mut table = Table::new();
        let _ = table.set_header(vec![
            Cell::new("Cart Merged").fg(Color::Green),
            Cell::new("Value").fg(Color::Blue),
        ]);
        let _ = table.add_row(vec!["Local items", &self.local.item_count.to_string()]);
        let _ = table.add_row(vec!["Remote items", &self.remote.item_count.to_string()]);
        let _ = table.add_row(vec!["Merged items", &self.merged.item_count.to_string()]);
        let _ = table.add_row(vec!["Transitions", &transitions]);
        println!("{table}");

        self.merged.report();
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityReport {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub changed: bool,
}

impl Report for QuantityReport {
    fn report(&self) {
        let status = if self.changed {
            Cell::new("Quantity Updated").fg(Color::Green)
        } else {
            Cell::new("Quantity Unchanged").fg(Color::Yellow)
        };

        let mut table = Table::new();
        let _ = table.set_header(vec![status, Cell::new("Value").fg(Color::Blue)]);
        let _ = table.add_row(vec!["Variant", &self.variant_id.to_string()]);
        let _ = table.add_row(vec!["Quantity", &self.quantity.to_string()]);
        println!("{table}");
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct NoteReport {
    pub note: String,
    pub changed: bool,
}

impl Report for NoteReport {
    fn report(&self) {
        let status = if self.changed {
            Cell::new("Note Saved").fg(Color::Green)
        } else {
            Cell::new("Note Unchanged").fg(Color::Yellow)
        };

        let mut table = Table::new();
        let _ = table.set_header(vec![status]);
        let _ = table.add_row(vec![&self.note]);
        println!("{table}");
    }
}
