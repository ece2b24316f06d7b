use std::path::PathBuf;

pub const DEFAULT_DISPATCH_QUEUE: usize = 256;

/// Journal file name inside the data directory.
pub const JOURNAL_FILE: &str = "tandem.journal";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory for the journal. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub metrics_port: Option<u16>,
    /// Capacity of the lifecycle event channel.
    pub dispatch_queue: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            metrics_port: None,
            dispatch_queue: DEFAULT_DISPATCH_QUEUE,
        }
    }
}

impl Config {
    /// Read `TANDEM_DATA_DIR`, `TANDEM_METRICS_PORT` and `TANDEM_DISPATCH_QUEUE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparsable numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("TANDEM_DATA_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        let metrics_port = lookup("TANDEM_METRICS_PORT").and_then(|s| s.parse().ok());
        let dispatch_queue = lookup("TANDEM_DISPATCH_QUEUE")
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(DEFAULT_DISPATCH_QUEUE);
        Self {
            data_dir,
            metrics_port,
            dispatch_queue,
        }
    }

    pub fn journal_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(JOURNAL_FILE))
    }
}
