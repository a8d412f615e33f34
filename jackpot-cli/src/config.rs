use anyhow::{Context, Result};
use jackpot_core::JackpotConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub engine: JackpotConfig,
}

impl CliConfig {
    pub async fn load(data_dir: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("jackpot")
        });

        let engine = match config_path {
            Some(path) => JackpotConfig::from_file(path)
                .await
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => JackpotConfig::default(),
        };

        Ok(Self { data_dir, engine })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("jackpot.db")
    }
}
