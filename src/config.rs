use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    band::{BandId, BandSet, DEFAULT_BANDS},
    decompress::default_workers,
    error::{HimawariArchError, Result},
    remote::SessionParams,
    satellite::Satellite,
    scanner::DEFAULT_REMOTE_ROOT,
    time_window::DEFAULT_INTERVAL_MINUTES,
};
use serde::Deserialize;

pub const PASSWORD_ENV: &str = "HIMAWARI_PASSWORD";

/// Archive settings, read from a RON file such as
///
/// ```text
/// ArchiveConfig(
///     host: "ftp.example.org",
///     user: "me",
///     password: "secret",
///     default_bands: ["01", "02", "03", "13"],
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_remote_root")]
    pub remote_root: String,
    #[serde(default)]
    pub satellite: Satellite,
    #[serde(default = "default_bands")]
    pub default_bands: Vec<String>,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_decompressed_dir")]
    pub decompressed_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: i64,
    #[serde(default = "default_workers")]
    pub max_workers: usize,

    /// external imaging program and its leading arguments
    #[serde(default)]
    pub composite_command: Option<Vec<String>>,
}

impl ArchiveConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            HimawariArchError::Config(format!("failed to read {:?}: {}", path, err))
        })?;

        let mut config = Self::from_ron(&content)?;
        if let Ok(pw) = env::var(PASSWORD_ENV) {
            config.password = pw;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_ron(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() || self.user.trim().is_empty() {
            return Err(HimawariArchError::Config(
                "remote credentials are not configured (host and user required)".into(),
            ));
        }
        if self.interval_minutes <= 0 {
            return Err(HimawariArchError::Config(format!(
                "interval_minutes has to be positive, got {}",
                self.interval_minutes
            )));
        }
        if self.band_set()?.is_empty() {
            return Err(HimawariArchError::Config("default_bands is empty".into()));
        }
        Ok(())
    }

    pub fn band_set(&self) -> Result<BandSet> {
        let bands = self
            .default_bands
            .iter()
            .map(|b| b.parse::<BandId>())
            .collect::<Result<Vec<BandId>>>()
            .map_err(|err| HimawariArchError::Config(err.to_string()))?;
        Ok(BandSet::new(bands))
    }

    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

fn default_port() -> u16 {
    2051
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_remote_root() -> String {
    DEFAULT_REMOTE_ROOT.to_owned()
}

fn default_bands() -> Vec<String> {
    DEFAULT_BANDS.iter().map(|b| b.to_string()).collect()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_decompressed_dir() -> PathBuf {
    PathBuf::from("./decompressed_data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output_images")
}

fn default_interval_minutes() -> i64 {
    DEFAULT_INTERVAL_MINUTES
}
