//! Home directory resolution.

use camino::Utf8PathBuf;
use eyre::{eyre, Result as EyreResult};

/// Name of the default home directory under the user's home.
pub const DEFAULT_HOME_DIR: &str = ".storefront";

/// `~/.storefront`
///
/// # Errors
/// Fails when the user's home directory is unknown or not valid UTF-8.
pub fn default_home() -> EyreResult<Utf8PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| eyre!("cannot determine home directory"))?;

    let home = Utf8PathBuf::from_path_buf(home)
        .map_err(|path| eyre!("home directory {} is not valid UTF-8", path.display()))?;

    Ok(home.join(DEFAULT_HOME_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_home_is_absolute() {
        let Ok(home) = default_home() else {
            // no home directory in this environment
            return;
        };

        assert!(home.is_absolute(), "home should be absolute");
        assert!(home.ends_with(DEFAULT_HOME_DIR));
    }
}
