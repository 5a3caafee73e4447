use comfy_table::{Cell, Color, Table};
use serde::Serialize;

use super::Report;

#[derive(Clone, Debug, Serialize)]
pub struct KeyReport {
    pub key: &'static str,
    pub value: Option<String>,
    pub examples: Vec<&'static str>,
    pub description: Option<&'static str>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConfigReport {
    pub keys: Vec<KeyReport>,
}

impl Report for ConfigReport {
    fn report(&self) {
        let mut table = Table::new();
        let _ = table.set_header(vec![
            Cell::new("Key").fg(Color::Blue),
            Cell::new("Value").fg(Color::Blue),
            Cell::new("Examples").fg(Color::Blue),
            Cell::new("Description").fg(Color::Blue),
        ]);

        for key in &self.keys {
            let _ = table.add_row(vec![
                key.key.to_owned(),
                key.value.clone().unwrap_or_else(|| "-".to_owned()),
                key.examples.join(", "),
                key.description.unwrap_or_default().to_owned(),
            ]);
        }

        println!("{table}");
    }
}
