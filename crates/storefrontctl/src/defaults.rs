use camino::Utf8PathBuf;
use storefront_config::dirs::{default_home, DEFAULT_HOME_DIR};

/// `~/.storefront`, or `.storefront` in the working directory when the user
/// has no usable home directory.
pub fn default_home_dir() -> Utf8PathBuf {
    default_home().unwrap_or_else(|_| Utf8PathBuf::from(DEFAULT_HOME_DIR))
}
