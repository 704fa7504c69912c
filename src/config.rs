//! Server configuration and builder

use crate::error::{RemovalError, Result};
use crate::models::ModelSpec;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Maximum accepted payload size: 10 MiB, same cap on every ingestion path
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Timeout applied to remote image fetches
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// JPEG quality used when flattening onto a background color
pub const JPEG_QUALITY: u8 = 95;

/// Configuration for the background removal server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Payload size cap in bytes for uploads, fetches, and base64 payloads
    pub max_upload_bytes: usize,
    /// Timeout for fetching remote image URLs
    pub fetch_timeout: Duration,
    /// JPEG quality (1-100) for composited output
    pub jpeg_quality: u8,
    /// Number of intra-op inference threads (0 = runtime default)
    pub intra_threads: usize,
    /// Model to load
    pub model: ModelSpec,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            fetch_timeout: FETCH_TIMEOUT,
            jpeg_quality: JPEG_QUALITY,
            intra_threads: 0,
            model: ModelSpec::default_model(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Socket address the listener binds to
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(RemovalError::config_value_error(
                "jpeg_quality",
                self.jpeg_quality,
                "1-100",
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(RemovalError::config_value_error(
                "max_upload_bytes",
                self.max_upload_bytes,
                ">= 1",
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(RemovalError::invalid_config(
                "fetch_timeout must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Builder for [`ServerConfig`]
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn model(mut self, model: ModelSpec) -> Self {
        self.config.model = model;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
