pub mod chart;
pub mod config;
pub mod dataset;
pub mod query;
pub mod results;

pub use config::{Settings, Theme};

use std::path::PathBuf;

pub const APP_DIR: &str = "trendsketch";

#[derive(thiserror::Error, Debug, Clone)]
pub enum InternalError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// `<data dir>/trendsketch[/path_name]`, or the working directory when the
/// platform has no data directory.
pub fn data_path(path_name: Option<&str>) -> PathBuf {
    let base = dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);

    match path_name {
        Some(name) => base.join(name),
        None => base,
    }
}

pub fn open_data_folder() -> Result<(), InternalError> {
    let path = data_path(None);

    if !path.exists() {
        std::fs::create_dir_all(&path).map_err(|e| InternalError::Io(e.to_string()))?;
    }

    open::that(&path).map_err(|e| InternalError::Io(e.to_string()))?;
    log::info!("Opened data folder: {}", path.display());
    Ok(())
}
