//! Configuration management for redplanet.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`REDPLANET_*`)
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::datasets::crust::CrustModelParams;
use crate::error::{RedPlanetError, Result};
use crate::interpolation::InterpolationMethod;

/// Command-line arguments for redplanet
#[derive(Parser, Debug, Default)]
#[command(name = "redplanet")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "REDPLANET_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "REDPLANET_PORT")]
    pub port: Option<u16>,

    /// Number of worker threads
    #[arg(short, long, env = "REDPLANET_WORKERS")]
    pub workers: Option<usize>,

    /// Path to JSON configuration file
    #[arg(short, long, env = "REDPLANET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "REDPLANET_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Default interpolation method (nearest, linear)
    #[arg(long, env = "REDPLANET_INTERPOLATION")]
    pub interpolation_method: Option<String>,

    /// GRS raw grid file
    #[arg(long, env = "REDPLANET_GRS_PATH")]
    pub grs_path: Option<PathBuf>,

    /// Crust topography/moho raw grid file
    #[arg(long, env = "REDPLANET_CRUST_PATH")]
    pub crust_path: Option<PathBuf>,

    /// Dichotomy boundary curve file
    #[arg(long, env = "REDPLANET_DICHOTOMY_PATH")]
    pub dichotomy_path: Option<PathBuf>,

    /// Magnetic field raw grid file
    #[arg(long, env = "REDPLANET_MAG_PATH")]
    pub mag_path: Option<PathBuf>,

    /// Crater catalogue file
    #[arg(long, env = "REDPLANET_CRATERS_PATH")]
    pub craters_path: Option<PathBuf>,

    /// Load every configured dataset at startup instead of on first use
    #[arg(long, env = "REDPLANET_PRELOAD")]
    pub preload: bool,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads (None = number of CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Dataset sources and query defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Default interpolation method
    #[serde(default = "default_interpolation")]
    pub interpolation_method: String,

    #[serde(default)]
    pub grs_path: Option<PathBuf>,

    #[serde(default)]
    pub crust_path: Option<PathBuf>,

    #[serde(default)]
    pub dichotomy_path: Option<PathBuf>,

    #[serde(default)]
    pub mag_path: Option<PathBuf>,

    #[serde(default)]
    pub craters_path: Option<PathBuf>,

    /// Crust model parameters; read from the crust grid's attributes when absent
    #[serde(default)]
    pub crust_model: Option<CrustModelParams>,

    /// Build every configured dataset at startup
    #[serde(default)]
    pub preload: bool,

    /// Upper bound on points in one region request
    #[serde(default = "default_max_region_points")]
    pub max_region_points: usize,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Data configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Layer parsed arguments over the config file and defaults
    pub fn from_args(args: Args) -> Result<Self> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if let Some(host) = args.host {
            config.server.host = host;
        }
        if let Some(port) = args.port {
            config.server.port = port;
        }
        if args.workers.is_some() {
            config.server.workers = args.workers;
        }
        if let Some(log_level) = args.log_level {
            config.log_level = log_level;
        }
        if let Some(method) = args.interpolation_method {
            config.data.interpolation_method = method;
        }

        let paths = [
            (&mut config.data.grs_path, args.grs_path),
            (&mut config.data.crust_path, args.crust_path),
            (&mut config.data.dichotomy_path, args.dichotomy_path),
            (&mut config.data.mag_path, args.mag_path),
            (&mut config.data.craters_path, args.craters_path),
        ];
        for (slot, arg) in paths {
            if arg.is_some() {
                *slot = arg;
            }
        }
        config.data.preload |= args.preload;

        Ok(config)
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RedPlanetError::Config {
            message: format!("Cannot read config file {}: {}", path.display(), e),
        })?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.server.host = other.server.host;
        self.server.port = other.server.port;
        if other.server.workers.is_some() {
            self.server.workers = other.server.workers;
        }
        self.data = other.data;
        self.log_level = other.log_level;
    }

    /// Parsed default interpolation method
    pub fn interpolation_method(&self) -> Result<InterpolationMethod> {
        self.data
            .interpolation_method
            .parse()
            .map_err(|_| RedPlanetError::Config {
                message: format!(
                    "Invalid interpolation method: {}. Must be one of: nearest, linear",
                    self.data.interpolation_method
                ),
            })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(RedPlanetError::Config {
                message: "Server host cannot be empty".to_string(),
            });
        }

        if self.server.port == 0 {
            return Err(RedPlanetError::Config {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.workers == Some(0) {
            return Err(RedPlanetError::Config {
                message: "Worker count must be at least 1".to_string(),
            });
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(RedPlanetError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        self.interpolation_method()?;

        if self.data.max_region_points == 0 {
            return Err(RedPlanetError::Config {
                message: "max_region_points must be at least 1".to_string(),
            });
        }

        // The crust model is unusable without the dichotomy
        if self.data.crust_path.is_some() && self.data.dichotomy_path.is_none() {
            return Err(RedPlanetError::Config {
                message: "crust_path requires dichotomy_path".to_string(),
            });
        }

        for (name, path) in self.data_paths() {
            if let Some(path) = path {
                if !path.exists() {
                    return Err(RedPlanetError::Config {
                        message: format!("{} does not exist: {}", name, path.display()),
                    });
                }
            }
        }

        Ok(())
    }

    fn data_paths(&self) -> [(&'static str, Option<&PathBuf>); 5] {
        [
            ("grs_path", self.data.grs_path.as_ref()),
            ("crust_path", self.data.crust_path.as_ref()),
            ("dichotomy_path", self.data.dichotomy_path.as_ref()),
            ("mag_path", self.data.mag_path.as_ref()),
            ("craters_path", self.data.craters_path.as_ref()),
        ]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            data: DataConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            interpolation_method: default_interpolation(),
            grs_path: None,
            crust_path: None,
            dichotomy_path: None,
            mag_path: None,
            craters_path: None,
            crust_model: None,
            preload: false,
            max_region_points: default_max_region_points(),
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_interpolation() -> String {
    "linear".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_region_points() -> usize {
    1_000_000
}
