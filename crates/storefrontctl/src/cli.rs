use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, Subcommand};
use comfy_table::{Cell, Color, Table};
use const_format::concatcp;
use eyre::{OptionExt, Report as EyreReport, Result as EyreResult};
use serde::{Serialize, Serializer};
use storefront_cart::{CartContext, CartError, FetchError, FileSessionStore, SessionStore};
use storefront_client::{CartApi, CartClient, ConnectionInfo};
use storefront_config::ConfigFile;
use storefront_primitives::cart::CartToken;
use storefront_primitives::events::ErrorKind;
use thiserror::Error as ThisError;
use tracing::{debug, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::defaults;
use crate::output::{Format, Output, Report};

mod add;
mod config;
mod init;
mod merge;
mod note;
mod set;
mod show;

#[cfg(test)]
#[path = "tests/cli.rs"]
mod tests;

use add::AddCommand;
use config::ConfigCommand;
use init::InitCommand;
use merge::MergeCommand;
use note::NoteCommand;
use set::SetCommand;
use show::ShowCommand;

/// Session key holding the cart identity between invocations.
pub const CART_TOKEN_KEY: &str = "cart_token";

pub const EXAMPLES: &str = r"
  # Point the CLI at a shop
  $ storefrontctl init --shop https://shop.example

  # Add two units of a variant, then show the cart
  $ storefrontctl add 42 --quantity 2
  $ storefrontctl show

  # Merge the current cart into a customer's cart
  $ storefrontctl merge gid://shopify/Cart/c1-abc
";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(after_help = concatcp!(
    "Environment variables:\n",
    "  STOREFRONT_HOME    Directory for config and session state\n\n",
    "Examples:",
    EXAMPLES
))]
pub struct RootCommand {
    #[command(flatten)]
    pub args: RootArgs,

    #[command(subcommand)]
    pub action: SubCommands,
}

#[derive(Debug, Subcommand)]
pub enum SubCommands {
    Init(InitCommand),
    Config(ConfigCommand),
    Show(ShowCommand),
    Add(AddCommand),
    Set(SetCommand),
    Note(NoteCommand),
    Merge(MergeCommand),
}

#[derive(Debug, Parser)]
pub struct RootArgs {
    /// Directory for config and session state
    #[arg(long, value_name = "PATH", default_value_t = defaults::default_home_dir())]
    #[arg(env = "STOREFRONT_HOME", hide_env_values = true)]
    pub home: Utf8PathBuf,

    #[arg(long, value_name = "FORMAT", default_value_t, value_enum)]
    pub output_format: Format,

    /// Enable verbose logging (can be specified multiple times)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl RootArgs {
    /// Logs go to stderr so JSON output stays machine readable.
    pub fn init_tracing(&self) {
        let filter = match self.verbose {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| "storefront=info".into()),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[derive(Debug)]
pub struct Environment {
    pub output: Output,
    pub home: Utf8PathBuf,
    config: Option<ConfigFile>,
    session: Option<Arc<FileSessionStore>>,
    cart: Option<CartContext>,
}

impl Environment {
    pub const fn new(output: Output, home: Utf8PathBuf) -> Self {
        Self {
            output,
            home,
            config: None,
            session: None,
            cart: None,
        }
    }

    /// Connects to the configured shop, resuming the stored cart identity.
    pub async fn load(output: Output, home: Utf8PathBuf) -> EyreResult<Self> {
        let mut environment = Self::new(output, home);

        if !ConfigFile::exists(&environment.home) {
            debug!(home = %environment.home, "No configuration found");
            return Ok(environment);
        }

        let config = ConfigFile::load(&environment.home)?;
        let session = Arc::new(FileSessionStore::new(config.session_path(&environment.home)));

        let connection =
            ConnectionInfo::new(config.shop.base_url.clone(), config.routes.clone());
        let client = CartClient::new(connection);

        if let Some(token) = session.get(CART_TOKEN_KEY).await? {
            debug!(token = %token, "Resuming cart identity");
            let _previous = client.set_identity(Some(CartToken::from(token)));
        }

        environment.cart = Some(CartContext::new(Arc::new(client), config.settings()));
        environment.session = Some(session);
        environment.config = Some(config);

        Ok(environment)
    }

    pub fn config(&self) -> EyreResult<&ConfigFile> {
        self.config.as_ref().ok_or_eyre(
            "No configuration found: run `storefrontctl init --shop <URL>` or pass `--home`",
        )
    }

    pub fn cart(&self) -> EyreResult<&CartContext> {
        self.cart.as_ref().ok_or_eyre(
            "No shop configured: run `storefrontctl init --shop <URL>` or pass `--home`",
        )
    }

    pub fn session(&self) -> EyreResult<Arc<FileSessionStore>> {
        self.session
            .clone()
            .ok_or_eyre("No session store: run `storefrontctl init --shop <URL>` first")
    }

    /// Stores whatever cart identity is active now for the next invocation.
    pub async fn persist_identity(&self) {
        let (Some(cart), Some(session)) = (&self.cart, &self.session) else {
            return;
        };

        let Some(token) = cart.api().identity() else {
            return;
        };

        if let Err(err) = session.set(CART_TOKEN_KEY, token.as_str()).await {
            warn!(%err, "Failed to store cart identity");
        }
    }
}

impl RootCommand {
    pub async fn run(self) -> Result<(), CliError> {
        let output = Output::new(self.args.output_format);

        let environment = match Environment::load(output, self.args.home.clone()).await {
            Ok(environment) => environment,
            Err(err) => {
                let err = CliError::Other(err);
                Output::new(self.args.output_format).write(&err);
                return Err(err);
            }
        };

        let result = match self.action {
            SubCommands::Init(init) => init.run(&environment).await,
            SubCommands::Config(config) => config.run(&environment),
            SubCommands::Show(show) => show.run(&environment).await,
            SubCommands::Add(add) => add.run(&environment).await,
            SubCommands::Set(set) => set.run(&environment).await,
            SubCommands::Note(note) => note.run(&environment).await,
            SubCommands::Merge(merge) => merge.run(&environment).await,
        };

        environment.persist_identity().await;

        if let Err(err) = result {
            let err = CliError::from_report(err);
            environment.output.write(&err);
            return Err(err);
        }

        Ok(())
    }
}

#[derive(Debug, Serialize, ThisError)]
pub enum CliError {
    #[error("{message}")]
    Cart {
        kind: Option<ErrorKind>,
        message: String,
    },

    #[error(transparent)]
    Other(
        #[from]
        #[serde(serialize_with = "serialize_eyre_report")]
        EyreReport,
    ),
}

impl CliError {
    fn from_report(report: EyreReport) -> Self {
        let report = match report.downcast::<CartError>() {
            Ok(err) => return Self::from(err),
            Err(report) => report,
        };

        match report.downcast::<FetchError>() {
            Ok(err) => Self::from(CartError::from(err)),
            Err(report) => Self::Other(report),
        }
    }
}

impl From<CartError> for CliError {
    fn from(err: CartError) -> Self {
        Self::Cart {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<CliError> for ExitCode {
    fn from(error: CliError) -> Self {
        match error {
            CliError::Cart { .. } => Self::from(101),
            CliError::Other(_) => Self::FAILURE,
        }
    }
}

impl Report for CliError {
    fn report(&self) {
        let mut table = Table::new();
        let _ = table.set_header(vec![Cell::new("ERROR").fg(Color::Red)]);
        let _ = table.add_row(vec![match self {
            Self::Cart { kind, message } => match kind {
                Some(kind) => format!("Cart error ({kind:?}): {message}"),
                None => format!("Cart error: {message}"),
            },
            Self::Other(e) => format!("Error: {e:?}"),
        }]);
        println!("{table}");
    }
}

fn serialize_eyre_report<S>(report: &EyreReport, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(report.chain().map(ToString::to_string))
}
