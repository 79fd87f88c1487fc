use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "parts_archiver.toml";
const ENV_PREFIX: &str = "PARTS";

/// Runtime settings. Defaults reproduce the fixed constants of a plain run;
/// a TOML file and `PARTS_*` environment variables may override them.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Landing page holding the category menu.
    pub base_url: String,
    /// Related-parts side channel endpoint.
    pub xhr_url: String,
    /// Base for section images given as relative paths.
    pub section_images_url: String,
    pub output_dir: PathBuf,
    pub cookies_path: PathBuf,
    /// Concurrent requests allowed within one stage.
    pub concurrency: usize,
    /// Pause after a failed request before moving on.
    pub backoff_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Settings {
    /// Defaults, then `path` (required if given, else the default file if it
    /// exists), then environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => ::config::File::from(p).required(true),
            None => ::config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = ::config::Config::builder()
            .set_default("base_url", "https://parts.ford.com/shop/en/us/shop-parts")?
            .set_default("xhr_url", "https://parts.ford.com/shop/FordRelatedItemsView")?
            .set_default(
                "section_images_url",
                "https://parts.ford.com/images/section-images/",
            )?
            .set_default("output_dir", "output")?
            .set_default("cookies_path", "cookies.json")?
            .set_default("concurrency", 4)?
            .set_default("backoff_secs", 15)?
            .set_default("timeout_secs", 60)?
            .set_default("user_agent", concat!("parts_archiver/", env!("CARGO_PKG_VERSION")))?
            .add_source(file)
            .add_source(::config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to build settings")?
            .try_deserialize()
            .context("Invalid settings")?;

        anyhow::ensure!(settings.concurrency > 0, "concurrency must be at least 1");
        Ok(settings)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Tests ──
