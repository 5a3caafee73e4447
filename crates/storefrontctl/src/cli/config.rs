use clap::Parser;
use eyre::{bail, Result as EyreResult};
use storefront_config::hints::hint_for;
use storefront_config::ConfigFile;

use crate::cli::Environment;
use crate::output::{ConfigReport, KeyReport};

/// Show configuration values with their hints
#[derive(Debug, Parser)]
pub struct ConfigCommand {
    /// Only show this key, e.g. `widgets.in_flight`
    #[arg(value_name = "KEY")]
    pub key: Option<String>,
}

impl ConfigCommand {
    pub fn run(self, environment: &Environment) -> EyreResult<()> {
        let config = environment.config()?;
        let editable = ConfigFile::editable_keys();

        let keys = match &self.key {
            Some(key) => {
                let Some((key, examples)) = editable.get_key_value(key.as_str()) else {
                    bail!("Unknown configuration key `{key}`");
                };
                vec![key_report(config, *key, examples)]
            }
            None => editable
                .iter()
                .map(|(key, examples)| key_report(config, *key, examples))
                .collect(),
        };

        environment.output.write(&ConfigReport { keys });

        Ok(())
    }
}

fn key_report(config: &ConfigFile, key: &'static str, examples: &[&'static str]) -> KeyReport {
    KeyReport {
        key,
        value: config.get_value(key),
        examples: examples.to_vec(),
        description: hint_for(key).map(|hint| hint.description),
    }
}
