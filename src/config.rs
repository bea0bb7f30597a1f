//! Configuration for row filtering.
//!
//! Mirrors the usual settings layer: serde-backed, `deny_unknown_fields`,
//! with `with_*` builders and JSON (always) or TOML (`toml` feature) loading.
use serde::de::Error;

/// Row filter configuration
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Filter row batches on the rayon pool when the `parallel` feature is on
    #[serde(default = "FilterConfig::default_parallel")]
    pub parallel: bool,

    /// Minimum batch size before rows are fanned out across threads
    #[serde(default = "FilterConfig::default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Emit rows whose cells were all filtered out (without a `columns` field)
    #[serde(default = "FilterConfig::default_keep_empty_rows")]
    pub keep_empty_rows: bool,

    /// Maintain kept/dropped counters
    #[serde(default = "FilterConfig::default_collect_stats")]
    pub collect_stats: bool,
}

impl FilterConfig {
    const fn default_parallel() -> bool {
        true
    }

    const fn default_parallel_threshold() -> usize {
        1024
    }

    const fn default_keep_empty_rows() -> bool {
        true
    }

    const fn default_collect_stats() -> bool {
        true
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        assert!(threshold > 0, "Parallel threshold must be greater than zero");
        self.parallel_threshold = threshold;
        self
    }

    pub fn with_keep_empty_rows(mut self, keep: bool) -> Self {
        self.keep_empty_rows = keep;
        self
    }

    pub fn with_collect_stats(mut self, collect: bool) -> Self {
        self.collect_stats = collect;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.parallel_threshold == 0 {
            return Err("Parallel threshold must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: FilterConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: FilterConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            parallel: Self::default_parallel(),
            parallel_threshold: Self::default_parallel_threshold(),
            keep_empty_rows: Self::default_keep_empty_rows(),
            collect_stats: Self::default_collect_stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = FilterConfig::default();
        assert!(config.parallel);
        assert_eq!(config.parallel_threshold, 1024);
        assert!(config.keep_empty_rows);
        assert!(config.collect_stats);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = FilterConfig::default()
            .with_parallel(false)
            .with_parallel_threshold(16)
            .with_keep_empty_rows(false);

        let json = config.to_json().unwrap();
        let deserialized = FilterConfig::from_json(&json).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config = FilterConfig::from_json(r#"{ "parallel": false }"#).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.parallel_threshold, 1024);
    }

    #[test]
    fn test_config_rejects_unknown_and_invalid() {
        assert!(FilterConfig::from_json(r#"{ "paralel": true }"#).is_err());
        assert!(FilterConfig::from_json(r#"{ "parallel_threshold": 0 }"#).is_err());
    }

    #[test]
    #[should_panic(expected = "Parallel threshold must be greater than zero")]
    fn test_config_zero_threshold_panics() {
        let _ = FilterConfig::default().with_parallel_threshold(0);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_config_toml() {
        let config = FilterConfig::from_toml("parallel = false\nkeep_empty_rows = false\n").unwrap();
        assert!(!config.parallel);
        assert!(!config.keep_empty_rows);
        let text = config.to_toml().unwrap();
        assert_eq!(FilterConfig::from_toml(&text).unwrap(), config);
    }
}
