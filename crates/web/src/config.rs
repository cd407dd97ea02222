//! Server configuration from command-line flags and environment variables.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Web front end for generating song decks from uploaded text files.
#[derive(Parser, Debug, Clone)]
#[command(name = "songdeck-web")]
#[command(author, version, about, long_about = None)]
pub struct ServiceConfig {
    /// Address to listen on
    #[arg(long, env = "SONGDECK_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "SONGDECK_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory uploaded song and template files are stored in
    #[arg(long, env = "SONGDECK_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Directory generated presentations are written to
    #[arg(long, env = "SONGDECK_GENERATED_DIR", default_value = "generated")]
    pub generated_dir: PathBuf,

    /// Largest accepted upload request, in megabytes
    #[arg(long, env = "SONGDECK_MAX_UPLOAD_MB", default_value_t = 16)]
    pub max_upload_mb: u64,

    /// Hours uploaded and generated files are kept before cleanup
    #[arg(long, env = "SONGDECK_RETENTION_HOURS", default_value_t = 2)]
    pub retention_hours: u64,

    /// Minutes between background cleanup runs
    #[arg(long, env = "SONGDECK_CLEANUP_INTERVAL_MINUTES", default_value_t = 10)]
    pub cleanup_interval_minutes: u64,
}

impl ServiceConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours.saturating_mul(3600))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_minutes.max(1).saturating_mul(60))
    }

    /// Create the upload and output directories if needed.
    pub fn prepare_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.generated_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::parse_from(["songdeck-web"]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.generated_dir, PathBuf::from("generated"));
        assert_eq!(config.max_upload_bytes(), 16 * 1024 * 1024);
        assert_eq!(config.retention(), Duration::from_secs(2 * 3600));
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_flags() {
        let config = ServiceConfig::parse_from([
            "songdeck-web",
            "--host",
            "127.0.0.1",
            "--port",
            "3000",
            "--max-upload-mb",
            "4",
            "--retention-hours",
            "1",
            "--cleanup-interval-minutes",
            "0",
        ]);
        assert_eq!(config.listen_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.max_upload_bytes(), 4 * 1024 * 1024);
        assert_eq!(config.retention(), Duration::from_secs(3600));
        assert_eq!(config.cleanup_interval(), Duration::from_secs(60));
    }
}
