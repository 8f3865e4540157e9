// (c) 2025 Ross Younger
//! Configuration file wrangling

use std::path::PathBuf;

use figment::{
    providers::{Env, Format as _, Serialized, Toml},
    Figment, Provider,
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Configuration, ConfigurationOverrides};

/// Prefix for configuration environment variables
pub(crate) const ENV_PREFIX: &str = "BOOKZ_";

/// Base name of the user configuration file
pub(crate) const CONFIG_FILE_NAME: &str = "bookz.toml";

/// Processes and merges all possible configuration sources.
///
/// To see which file applies on the current platform, run `bookz --config-files`.
#[derive(Debug)]
pub struct Manager {
    /// Configuration data
    pub(super) data: Figment,
}

impl Manager {
    fn new(apply_config_files: bool, apply_env: bool) -> Self {
        let mut new1 = Self {
            data: Figment::new(),
        };
        new1.apply_system_default();
        if apply_config_files {
            if let Some(path) = Self::user_config_path() {
                new1.add_config(&path);
            } else {
                warn!("could not determine user configuration file path");
            }
        }
        if apply_env {
            new1.merge_provider(Env::prefixed(ENV_PREFIX));
        }
        new1
    }

    /// General constructor for production use.
    ///
    /// Reads the user's configuration file (if present) and the environment.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(true, true)
    }

    /// Testing constructor: system defaults only
    #[must_use]
    #[cfg(test)]
    pub(crate) fn without_files() -> Self {
        Self::new(false, false)
    }

    /// The user configuration file, if the platform has a configuration directory
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("bookz").join(CONFIG_FILE_NAME))
    }

    /// Returns the list of configuration files we read
    #[must_use]
    pub fn config_files() -> Vec<String> {
        Self::user_config_path()
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect()
    }

    /// Merges a TOML configuration file, if it exists
    pub fn add_config(&mut self, path: &std::path::Path) {
        if !path.exists() {
            debug!("configuration file {path:?} not present");
            return;
        }
        debug!("reading configuration file {path:?}");
        self.merge_provider(Toml::file(path));
    }

    /// Merges in a data set, which is some sort of [`figment::Provider`].
    /// Later merges take precedence.
    pub fn merge_provider<T>(&mut self, provider: T)
    where
        T: Provider,
    {
        let f = std::mem::take(&mut self.data);
        self.data = f.merge(provider);
    }

    /// Applies the system default settings, at a lower priority than everything else
    pub fn apply_system_default(&mut self) {
        let f = std::mem::take(&mut self.data);
        self.data = f.join(Serialized::defaults(Configuration::system_default()));
    }

    /// Applies command-line overrides, at a higher priority than everything else
    pub fn apply_overrides(&mut self, overrides: &ConfigurationOverrides) {
        self.merge_provider(Serialized::defaults(overrides));
    }

    /// Sets a single value, at a higher priority than everything so far
    pub fn set<V: serde::Serialize>(&mut self, key: &str, value: V) {
        self.merge_provider(Serialized::default(key, value));
    }

    /// Attempts to extract a particular struct from the data
    pub fn get<'de, T>(&self) -> Result<T, figment::Error>
    where
        T: Deserialize<'de>,
    {
        self.data.extract::<T>()
    }

    /// Extracts and validates the final [`Configuration`]
    pub fn configuration(&self) -> anyhow::Result<Configuration> {
        self.get::<Configuration>()?.validate()
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::Manager;
    use crate::catalog::RequestStyle;
    use crate::config::{Configuration, ConfigurationOverrides};
    use crate::util::littertray::LitterTray;
    use crate::util::TimeFormat;
    use pretty_assertions::assert_eq;
    use rusty_fork::rusty_fork_test;

    #[test]
    fn defaults_only() {
        let mgr = Manager::without_files();
        let cfg = mgr.get::<Configuration>().unwrap();
        assert_eq!(&cfg, Configuration::system_default());
    }

    #[test]
    fn file_then_overrides() {
        LitterTray::try_with(|tray| {
            let _ = tray.create_text(
                "bookz.toml",
                r##"
                server = "irc.example.org"
                nickname = "reader"
                channel = "#ebooks"
                request_style = "marker"
                time_format = "UTC"
                "##,
            )?;
            let mut mgr = Manager::without_files();
            mgr.add_config(&tray.directory().join("bookz.toml"));
            mgr.apply_overrides(&ConfigurationOverrides {
                channel: Some("#books".into()),
                download_dir: Some(PathBuf::from("/tmp/books")),
                ..Default::default()
            });
            let cfg = mgr.configuration()?;
            assert_eq!(cfg.server, "irc.example.org");
            assert_eq!(cfg.channel, "#books");
            assert_eq!(cfg.request_style, RequestStyle::Marker);
            assert_eq!(cfg.time_format, TimeFormat::Utc);
            assert_eq!(cfg.download_dir, PathBuf::from("/tmp/books"));
            assert_eq!(cfg.port, 6667);
            Ok(())
        })
        .unwrap();
    }

    // the environment is process-wide, so this runs in a fork
    rusty_fork_test! {
        #[test]
        fn environment_sits_between_file_and_cli() {
            std::env::set_var("BOOKZ_PORT", "7000");
            std::env::set_var("BOOKZ_SEARCH_COMMAND", "@find");
            let mut mgr = Manager::without_files();
            mgr.merge_provider(figment::providers::Env::prefixed(super::ENV_PREFIX));
            mgr.apply_overrides(&ConfigurationOverrides {
                port: Some(7001),
                ..Default::default()
            });
            let cfg = mgr.get::<Configuration>().unwrap();
            assert_eq!(cfg.port, 7001);
            assert_eq!(cfg.search_command, "@find");
        }
    }

    #[test]
    fn unset_overrides_do_not_clobber() {
        let mut mgr = Manager::without_files();
        mgr.set("channel", "#elsewhere");
        mgr.apply_overrides(&ConfigurationOverrides::default());
        let cfg = mgr.get::<Configuration>().unwrap();
        assert_eq!(cfg.channel, "#elsewhere");
    }

    #[test]
    fn invalid_configuration() {
        let mgr = Manager::without_files();
        assert!(mgr.configuration().is_err());
    }

    #[test]
    fn bad_file_is_reported() {
        LitterTray::try_with(|tray| {
            let _ = tray.create_text("bookz.toml", "port = \"seventy\"\n")?;
            let mut mgr = Manager::without_files();
            mgr.add_config(&tray.directory().join("bookz.toml"));
            assert!(mgr.get::<Configuration>().is_err());
            Ok(())
        })
        .unwrap();
    }
}
