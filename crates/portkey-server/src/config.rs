use clap::Parser;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Server configuration.
///
/// Source priority, highest first: command-line flags, environment
/// variables, the optional JSON config file, built-in defaults. Flags and
/// environment are handled by clap; the JSON file only fills fields still
/// at their built-in default.
#[derive(Debug, Clone, Parser)]
#[command(name = "portkey-server", version)]
pub struct Config {
    /// HTTP listen address.
    #[arg(short = 'a', long, env = "SERVER_ADDRESS", default_value = DEFAULT_SERVER_ADDRESS)]
    pub server_address: String,

    /// Prefix prepended to every short id in responses.
    #[arg(short = 'b', long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Path for the file backend; empty disables it.
    #[arg(short = 'f', long, env = "FILE_STORAGE_PATH", default_value = "")]
    pub file_storage_path: String,

    /// Database connection string; empty disables the database backend.
    #[arg(short = 'd', long, env = "DATABASE_DSN", default_value = "")]
    pub database_dsn: String,

    /// Serve TLS on the HTTP port.
    #[arg(short = 's', long, env = "ENABLE_HTTPS")]
    pub enable_https: bool,

    /// Path to a JSON config file.
    #[arg(short = 'c', long, env = "CONFIG", default_value = "")]
    pub config: String,

    /// CIDR allowed to call /api/internal/stats; empty closes the endpoint.
    #[arg(short = 't', long, env = "TRUSTED_SUBNET", default_value = "")]
    pub trusted_subnet: String,
}

/// Which backend the configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Database,
    File,
    Memory,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server_address: Option<String>,
    base_url: Option<String>,
    file_storage_path: Option<String>,
    database_dsn: Option<String>,
    enable_https: Option<bool>,
    trusted_subnet: Option<String>,
}

impl Config {
    /// Parses flags and environment, then merges the JSON config file.
    pub fn load() -> Self {
        let mut config = Self::parse();
        config.merge_config_file();
        config
    }

    /// Database if a DSN is set, else file if a path is set, else memory.
    pub fn backend(&self) -> Backend {
        if !self.database_dsn.is_empty() {
            Backend::Database
        } else if !self.file_storage_path.is_empty() {
            Backend::File
        } else {
            Backend::Memory
        }
    }

    fn merge_config_file(&mut self) {
        if self.config.is_empty() {
            return;
        }
        let raw = match std::fs::read_to_string(&self.config) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.config, error = %e, "failed to read config file");
                return;
            }
        };
        let file: FileConfig = match serde_json::from_str(&raw) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %self.config, error = %e, "failed to parse config file");
                return;
            }
        };
        self.apply_file(file);
    }

    // Flags and env already won; the file only fills untouched fields.
    fn apply_file(&mut self, file: FileConfig) {
        if self.server_address == DEFAULT_SERVER_ADDRESS {
            if let Some(value) = file.server_address {
                self.server_address = value;
            }
        }
        if self.base_url == DEFAULT_BASE_URL {
            if let Some(value) = file.base_url {
                self.base_url = value;
            }
        }
        if self.file_storage_path.is_empty() {
            if let Some(value) = file.file_storage_path {
                self.file_storage_path = value;
            }
        }
        if self.database_dsn.is_empty() {
            if let Some(value) = file.database_dsn {
                self.database_dsn = value;
            }
        }
        if !self.enable_https {
            if let Some(value) = file.enable_https {
                self.enable_https = value;
            }
        }
        if self.trusted_subnet.is_empty() {
            if let Some(value) = file.trusted_subnet {
                self.trusted_subnet = value;
            }
        }
    }
}
