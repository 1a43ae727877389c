//! # ward-config
//!
//! Layered configuration loading for Warden using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`WARDEN_*` prefix, `__` as separator)
//! 2. Conventional backend variables (`SUPABASE_URL`, `NEXT_PUBLIC_SUPABASE_URL`,
//!    `SUPABASE_ANON_KEY`, `NEXT_PUBLIC_SUPABASE_ANON_KEY`, `SUPABASE_SERVICE_ROLE_KEY`)
//! 3. Project-level `.warden/config.toml`
//! 4. User-level `~/.config/warden/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `WARDEN_BACKEND__URL` -> `backend.url`, `WARDEN_DEMO__EMAIL` -> `demo.email`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use ward_config::WardenConfig;
//!
//! let config = WardenConfig::load_with_dotenv().expect("config");
//! if config.backend.is_configured() {
//!     println!("backend: {}", config.backend.url);
//! }
//! ```

mod backend;
mod checks;
mod demo;
mod error;

pub use backend::BackendConfig;
pub use checks::ChecksConfig;
pub use demo::DemoConfig;
pub use error::ConfigError;

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
}

impl WardenConfig {
    /// Load configuration from all sources, resolving the project config
    /// relative to the current directory.
    ///
    /// `.env` is not read; see [`Self::load_with_dotenv`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed or a
    /// value has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load configuration for an explicit project root: its `.env` and its
    /// `.warden/config.toml` are used instead of the current directory's.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_for_project(root: &Path) -> Result<Self, ConfigError> {
        let env_path = root.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }
        Self::figment_for(root).extract().map_err(ConfigError::from)
    }

    /// Provider chain rooted at the current directory.
    pub fn figment() -> Figment {
        Self::figment_for(Path::new("."))
    }

    /// Build the provider chain rooted at `project_root`, lowest priority first.
    pub fn figment_for(project_root: &Path) -> Figment {
        let files = [
            Self::global_config_path(),
            Some(project_root.join(".warden").join("config.toml")),
        ];

        files
            .into_iter()
            .flatten()
            .filter(|path| path.exists())
            .fold(
                Figment::from(Serialized::defaults(Self::default())),
                |figment, path| figment.merge(Toml::file(path)),
            )
            .merge(conventional_env())
            .merge(Env::prefixed("WARDEN_").split("__"))
    }

    /// `~/.config/warden/config.toml` on Linux; the platform config dir elsewhere.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("warden").join("config.toml"))
    }
}

/// Unprefixed variables most projects already keep in their `.env`.
fn conventional_env() -> Env {
    Env::raw().filter_map(|key| {
        let mapped = match key.as_str().to_ascii_uppercase().as_str() {
            "SUPABASE_URL" | "NEXT_PUBLIC_SUPABASE_URL" => "backend.url",
            "SUPABASE_ANON_KEY" | "NEXT_PUBLIC_SUPABASE_ANON_KEY" => "backend.anon_key",
            "SUPABASE_SERVICE_ROLE_KEY" => "backend.service_role_key",
            _ => return None,
        };
        Some(mapped.into())
    })
}
