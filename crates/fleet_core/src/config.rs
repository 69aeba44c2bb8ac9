//! Minimal `key=value` properties file support for pricing and repair
//! coefficient configuration.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub(crate) struct Properties {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl Properties {
    /// Loads a properties file. Blank lines and `#` comments are skipped;
    /// lines without `=` are ignored.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut values = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub(crate) fn require_f64(&self, key: &str) -> Result<f64, ConfigError> {
        let raw = self.values.get(key).ok_or_else(|| ConfigError::MissingKey {
            path: self.path.clone(),
            key: key.to_string(),
        })?;
        raw.parse().map_err(|_| ConfigError::InvalidNumber {
            path: self.path.clone(),
            key: key.to_string(),
            value: raw.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_keys_and_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "# pricing").expect("write");
        writeln!(file, "CAR_UNIT_PRICE = 120.5").expect("write");
        writeln!(file).expect("write");
        writeln!(file, "DISCOUNT=0.1").expect("write");
        let props = Properties::load(file.path()).expect("load");
        assert_eq!(props.require_f64("CAR_UNIT_PRICE").expect("key"), 120.5);
        assert_eq!(props.require_f64("DISCOUNT").expect("key"), 0.1);
    }

    #[test]
    fn missing_and_invalid_keys_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "TAX=abc").expect("write");
        let props = Properties::load(file.path()).expect("load");
        assert!(matches!(
            props.require_f64("NOPE"),
            Err(ConfigError::MissingKey { .. })
        ));
        assert!(matches!(
            props.require_f64("TAX"),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }
}
