use config::{Config, Environment, File as ConfigFile, FileFormat};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Prefix of environment overrides, e.g. `SKILOAD_MAXTHREADS=64`.
pub const ENV_PREFIX: &str = "SKILOAD";

pub const DEFAULT_NUM_SKIERS: u32 = 50_000;
pub const DEFAULT_NUM_LIFTS: u32 = 40;
pub const DEFAULT_SKI_DAY: u32 = 1;
pub const DEFAULT_CSV_FILENAME: &str = "request-stats";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

const MIN_THREADS: i64 = 4;

/// Configuration errors. All of them are raised before any phase starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {0} not found")]
    NotFound(PathBuf),
    #[error("configuration source error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("missing required configuration key '{key}'")]
    MissingKey { key: &'static str },
    #[error("'{key}' must be a whole number, got '{value}'")]
    Malformed { key: &'static str, value: String },
    #[error("'{key}' = {value} is outside the allowed range [{min}, {max}]")]
    OutOfRange {
        key: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Validated run parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub max_threads: usize,
    pub num_skiers: u32,
    pub num_lifts: u32,
    pub ski_day: u32,
    pub resort: String,
    pub host_address: String,
    /// Base name of the output files, without extension.
    pub csv_filename: String,
    pub request_timeout: Duration,
}

struct Key {
    name: &'static str,
    aliases: &'static [&'static str],
}

const MAX_THREADS: Key = Key {
    name: "maxThreads",
    aliases: &["maxThreads", "maxthreads", "max_threads"],
};
const NUM_SKIERS: Key = Key {
    name: "numSkiers",
    aliases: &["numSkiers", "numskiers", "num_skiers"],
};
const NUM_LIFTS: Key = Key {
    name: "numSkiLifts",
    aliases: &["numSkiLifts", "numskilifts", "num_ski_lifts"],
};
const SKI_DAY: Key = Key {
    name: "skiDay",
    aliases: &["skiDay", "skiday", "ski_day"],
};
const RESORT: Key = Key {
    name: "resort",
    aliases: &["resort"],
};
const HOST_ADDRESS: Key = Key {
    name: "hostAddress",
    aliases: &["hostAddress", "hostaddress", "host_address"],
};
const CSV_FILENAME: Key = Key {
    name: "csvFilename",
    aliases: &["csvFilename", "csvfilename", "csv_filename"],
};
const REQUEST_TIMEOUT_MS: Key = Key {
    name: "requestTimeoutMs",
    aliases: &["requestTimeoutMs", "requesttimeoutms", "request_timeout_ms"],
};

impl RunConfig {
    /// Loads `path` layered with `SKILOAD_*` environment overrides.
    ///
    /// `.properties` files are read as INI; any other extension is left to
    /// the config crate's format detection.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let file = match path.extension().and_then(|ext| ext.to_str()) {
            Some("properties") => ConfigFile::from(path).format(FileFormat::Ini),
            _ => ConfigFile::from(path),
        };
        let config = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Self::from_source(&config)
    }

    /// Parses properties text, as found in an `arguments.properties` file.
    pub fn from_properties(contents: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(ConfigFile::from_str(contents, FileFormat::Ini))
            .build()?;
        Self::from_source(&config)
    }

    /// Validates an already assembled source.
    pub fn from_source(config: &Config) -> Result<Self, ConfigError> {
        let resort = required(config, &RESORT)?;
        let host_address = required(config, &HOST_ADDRESS)?;
        let max_threads_raw = required(config, &MAX_THREADS)?;

        let max_threads = parse_number(&MAX_THREADS, &max_threads_raw)?;
        let num_skiers = optional_number(config, &NUM_SKIERS, DEFAULT_NUM_SKIERS as i64)?;
        let num_lifts = optional_number(config, &NUM_LIFTS, DEFAULT_NUM_LIFTS as i64)?;
        let ski_day = optional_number(config, &SKI_DAY, DEFAULT_SKI_DAY as i64)?;
        let timeout_ms = optional_number(
            config,
            &REQUEST_TIMEOUT_MS,
            DEFAULT_REQUEST_TIMEOUT_MS as i64,
        )?;

        let max_threads = bounded(&MAX_THREADS, max_threads, MIN_THREADS, u32::MAX as i64)?;
        let num_skiers = bounded(&NUM_SKIERS, num_skiers, 1, DEFAULT_NUM_SKIERS as i64)?;
        let num_lifts = bounded(&NUM_LIFTS, num_lifts, 5, 60)?;
        let ski_day = bounded(&SKI_DAY, ski_day, 1, 366)?;
        let timeout_ms = bounded(&REQUEST_TIMEOUT_MS, timeout_ms, 1, 600_000)?;

        let csv_filename = get_string_value(config, CSV_FILENAME.aliases)
            .unwrap_or_else(|| DEFAULT_CSV_FILENAME.to_string());

        Ok(Self {
            max_threads: max_threads as usize,
            num_skiers: num_skiers as u32,
            num_lifts: num_lifts as u32,
            ski_day: ski_day as u32,
            resort,
            host_address,
            csv_filename,
            request_timeout: Duration::from_millis(timeout_ms as u64),
        })
    }

    /// `<csvFilename>.csv`
    pub fn csv_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.csv", self.csv_filename))
    }

    /// `<csvFilename>-req-start-hist-data.csv`
    pub fn histogram_path(&self) -> PathBuf {
        PathBuf::from(format!("{}-req-start-hist-data.csv", self.csv_filename))
    }
}

fn get_string_value(config: &Config, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        config
            .get_string(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn required(config: &Config, key: &Key) -> Result<String, ConfigError> {
    get_string_value(config, key.aliases).ok_or(ConfigError::MissingKey { key: key.name })
}

fn optional_number(config: &Config, key: &Key, default: i64) -> Result<i64, ConfigError> {
    match get_string_value(config, key.aliases) {
        Some(raw) => parse_number(key, &raw),
        None => Ok(default),
    }
}

fn parse_number(key: &Key, raw: &str) -> Result<i64, ConfigError> {
    raw.parse::<i64>().map_err(|_| ConfigError::Malformed {
        key: key.name,
        value: raw.to_string(),
    })
}

fn bounded(key: &Key, value: i64, min: i64, max: i64) -> Result<i64, ConfigError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            key: key.name,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = "maxThreads=32\nresort=whistler\nhostAddress=http://localhost:8080/skiapi\n";

    #[test]
    fn defaults_fill_optional_keys() {
        let config = RunConfig::from_properties(MINIMAL).unwrap();
        assert_eq!(config.max_threads, 32);
        assert_eq!(config.num_skiers, DEFAULT_NUM_SKIERS);
        assert_eq!(config.num_lifts, DEFAULT_NUM_LIFTS);
        assert_eq!(config.ski_day, DEFAULT_SKI_DAY);
        assert_eq!(config.resort, "whistler");
        assert_eq!(config.host_address, "http://localhost:8080/skiapi");
        assert_eq!(config.csv_filename, DEFAULT_CSV_FILENAME);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.csv_path(), PathBuf::from("request-stats.csv"));
        assert_eq!(
            config.histogram_path(),
            PathBuf::from("request-stats-req-start-hist-data.csv")
        );
    }

    #[test]
    fn optional_keys_override_defaults() {
        let text = format!(
            "{MINIMAL}numSkiers=20000\nnumSkiLifts=60\nskiDay=366\ncsvFilename=out/run1\nrequestTimeoutMs=1500\n"
        );
        let config = RunConfig::from_properties(&text).unwrap();
        assert_eq!(config.num_skiers, 20_000);
        assert_eq!(config.num_lifts, 60);
        assert_eq!(config.ski_day, 366);
        assert_eq!(config.csv_path(), PathBuf::from("out/run1.csv"));
        assert_eq!(config.request_timeout, Duration::from_millis(1_500));
    }

    #[test]
    fn missing_required_key_is_named() {
        let err = RunConfig::from_properties("maxThreads=8\nresort=whistler\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key: "hostAddress" }));
    }

    #[test]
    fn malformed_number_is_rejected() {
        let text = "maxThreads=lots\nresort=whistler\nhostAddress=http://localhost\n";
        let err = RunConfig::from_properties(text).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { key: "maxThreads", .. }));
    }

    #[test]
    fn bounds_are_enforced() {
        let cases = [
            ("maxThreads=3\n", "maxThreads", 3),
            ("maxThreads=8\nnumSkiers=0\n", "numSkiers", 0),
            ("maxThreads=8\nnumSkiers=50001\n", "numSkiers", 50_001),
            ("maxThreads=8\nnumSkiLifts=4\n", "numSkiLifts", 4),
            ("maxThreads=8\nnumSkiLifts=61\n", "numSkiLifts", 61),
            ("maxThreads=8\nskiDay=0\n", "skiDay", 0),
            ("maxThreads=8\nskiDay=367\n", "skiDay", 367),
            ("maxThreads=8\nnumSkiers=-5\n", "numSkiers", -5),
        ];
        for (extra, expected_key, expected_value) in cases {
            let text = format!("resort=whistler\nhostAddress=http://localhost\n{extra}");
            match RunConfig::from_properties(&text) {
                Err(ConfigError::OutOfRange { key, value, .. }) => {
                    assert_eq!(key, expected_key);
                    assert_eq!(value, expected_value);
                }
                other => panic!("expected {expected_key} out of range, got {other:?}"),
            }
        }
    }

    #[test]
    fn load_reads_properties_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".properties")
            .tempfile()
            .unwrap();
        writeln!(file, "{MINIMAL}skiDay=7").unwrap();

        let config = RunConfig::load(file.path()).unwrap();
        assert_eq!(config.ski_day, 7);
        assert_eq!(config.max_threads, 32);
    }

    #[test]
    fn load_reports_missing_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("gone");
        assert!(matches!(
            RunConfig::load(&path),
            Err(ConfigError::NotFound(missing)) if missing == path
        ));
    }
}
