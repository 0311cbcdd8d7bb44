//! `tally.toml` loading.
//!
//! ```toml
//! [log]
//! filter = "info"
//!
//! [output]
//! format = "json"
//! pretty = true
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::OutputFormat;

pub(crate) const DEFAULT_CONFIG: &str = "tally.toml";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TallyConfig {
    pub log: LogConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LogConfig {
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct OutputConfig {
    pub format: Option<OutputFormat>,
    /// Pretty-print JSON output (default true).
    pub pretty: Option<bool>,
}

impl TallyConfig {
    /// The `--output` flag wins over the file.
    pub fn output_format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.output.format).unwrap_or(OutputFormat::Text)
    }

    pub fn pretty(&self) -> bool {
        self.output.pretty.unwrap_or(true)
    }

    pub fn log_filter(&self) -> &str {
        self.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

pub(crate) fn parse_config(content: &str, origin: &Path) -> Result<TallyConfig, String> {
    toml::from_str(content).map_err(|e| format!("could not parse '{}': {}", origin.display(), e))
}

/// Read and parse a config file from `path`.
pub(crate) fn read_config(path: &Path) -> Result<TallyConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    parse_config(&content, path)
}

/// An explicit path must exist; the default file is optional.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<TallyConfig, String> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG);
            if path.is_file() {
                read_config(path)
            } else {
                Ok(TallyConfig::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<TallyConfig, String> {
        parse_config(content, Path::new("tally.toml"))
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.output_format(None), OutputFormat::Text);
        assert!(config.pretty());
        assert_eq!(config.log_filter(), "warn");
    }

    #[test]
    fn flag_overrides_file() {
        let config = parse("[output]\nformat = \"json\"\npretty = false\n").unwrap();
        assert_eq!(config.output_format(None), OutputFormat::Json);
        assert_eq!(config.output_format(Some(OutputFormat::Text)), OutputFormat::Text);
        assert!(!config.pretty());
    }

    #[test]
    fn log_filter_is_read() {
        let config = parse("[log]\nfilter = \"tally_receipt=debug\"\n").unwrap();
        assert_eq!(config.log_filter(), "tally_receipt=debug");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("[output]\ncolour = true\n").unwrap_err();
        assert!(err.starts_with("could not parse 'tally.toml'"));
        assert!(parse("[output]\nformat = \"yaml\"\n").is_err());
    }
}
