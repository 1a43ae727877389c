use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use ward_backend::HttpBackend;
use ward_config::WardenConfig;
use ward_core::Backend;

use crate::cli::GlobalFlags;

/// Load `.env` and layered config for the project root.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<WardenConfig> {
    let root = project_root(flags)?;
    if !root.join(".env").exists() {
        dotenvy::dotenv().ok();
    }
    WardenConfig::load_for_project(&root)
        .with_context(|| format!("failed to load configuration for {}", root.display()))
}

/// Build the HTTP backend from the `backend` config section.
pub fn backend(config: &WardenConfig) -> anyhow::Result<Arc<dyn Backend>> {
    let backend = HttpBackend::from_config(&config.backend)
        .context("backend is not configured; set WARDEN_BACKEND__URL and WARDEN_BACKEND__ANON_KEY")?;
    tracing::debug!(url = backend.base_url(), "backend client ready");
    Ok(Arc::new(backend))
}

fn project_root(flags: &GlobalFlags) -> anyhow::Result<PathBuf> {
    let Some(project) = &flags.project else {
        return std::env::current_dir().context("failed to determine current directory");
    };

    let path = PathBuf::from(project);
    if path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name == ".warden")
    {
        return path
            .parent()
            .map(std::path::Path::to_path_buf)
            .context("invalid --project path: '.warden' directory has no parent");
    }
    if !path.is_dir() {
        anyhow::bail!("invalid --project '{}': directory does not exist", path.display());
    }
    Ok(path)
}
