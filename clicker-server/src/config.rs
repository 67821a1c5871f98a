use {
    std::{net::SocketAddr, path::{Path, PathBuf}},
    serde::Deserialize,
    thiserror::Error,
    tokio::{io, fs},
};

/// scrypt work factor as log2 of N.
pub const DEFAULT_PASSWORD_COST: u8 = 15;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(skip_deserializing)]
    pub config_path: Option<PathBuf>,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// In-memory database when not set.
    pub database_path: Option<PathBuf>,
    /// Directory served under `/static`, holds the wasm client bundle.
    pub static_dir: Option<PathBuf>,
    #[serde(default = "default_password_cost")]
    pub password_cost: u8,
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0:?}")]
    FailedToRead(io::Error),

    #[error("failed to parse config file: {0}")]
    FailedToParse(serde_yml::Error),
}

impl ServerConfig {
    pub async fn load(file_path: PathBuf) -> Result<Self, ConfigLoadError> {
        let content = fs::read(&file_path).await.map_err(ConfigLoadError::FailedToRead)?;
        let mut config = Self::parse(&content)?;
        config.config_path = Some(file_path);
        Ok(config)
    }

    pub fn parse(content: &[u8]) -> Result<Self, ConfigLoadError> {
        serde_yml::from_slice(content).map_err(ConfigLoadError::FailedToParse)
    }

    /// Relative paths in the config are resolved against the config file location.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match self.config_path.as_ref().and_then(|v| v.parent()) {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            listen_addr: default_listen_addr(),
            database_path: None,
            static_dir: None,
            password_cost: DEFAULT_PASSWORD_COST,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    ([0, 0, 0, 0], 8080).into()
}

fn default_password_cost() -> u8 {
    DEFAULT_PASSWORD_COST
}
