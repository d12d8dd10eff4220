use std::path::PathBuf;

/// Smallest accepted streaming chunk
pub const MIN_CHUNK_SIZE: usize = 512;
/// Largest accepted streaming chunk
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    /// Serve this directory, encoded at start-up, instead of the demo bundle
    pub bundle_dir: Option<PathBuf>,
    /// Gzip entries encoded from `bundle_dir`
    pub bundle_gzip: bool,
    /// Bytes per body chunk when streaming an entry
    pub stream_chunk_size: usize,
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            bundle_dir: None,
            bundle_gzip: false,
            stream_chunk_size: 16 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            bundle_dir: std::env::var("BUNDLE_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            bundle_gzip: std::env::var("BUNDLE_GZIP")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.bundle_gzip),
            stream_chunk_size: std::env::var("STREAM_CHUNK_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.stream_chunk_size),
        }
    }

    /// Apply the optional listen address given on the command line
    pub fn with_args(mut self, mut args: impl Iterator<Item = String>) -> Self {
        if let Some(addr) = args.next() {
            self.listen_addr = addr;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("LISTEN_ADDR cannot be empty".to_string());
        }

        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.stream_chunk_size) {
            return Err(format!(
                "STREAM_CHUNK_SIZE must be between {} and {}",
                MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            ));
        }

        if let Some(dir) = &self.bundle_dir {
            if !dir.exists() {
                return Err(format!("BUNDLE_DIR {:?} does not exist", dir));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.stream_chunk_size, 16384);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_first_argument_overrides_listen_addr() {
        let config = Config::default().with_args(["0.0.0.0:9000".to_string()].into_iter());
        assert_eq!(config.listen_addr, "0.0.0.0:9000");

        let config = Config::default().with_args(std::iter::empty());
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_chunk_size_bounds() {
        let mut config = Config::default();
        config.stream_chunk_size = 100;
        assert!(config.validate().is_err());
        config.stream_chunk_size = 2 * 1024 * 1024;
        assert!(config.validate().is_err());
        config.stream_chunk_size = MIN_CHUNK_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_bundle_dir_rejected() {
        let config = Config {
            bundle_dir: Some(PathBuf::from("/definitely/not/here")),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
