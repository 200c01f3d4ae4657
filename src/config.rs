//! Executor configuration.
//!
//! Options come from code, from environment variables, or (with the `config`
//! feature) from JSON.

use std::env;
use std::str::FromStr;
use std::time::Duration;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Configuration every executor is built from.
///
/// # Examples
///
/// ```
/// use ferrous_scoped::ExecutorOptions;
/// use std::time::Duration;
///
/// let options = ExecutorOptions {
///     name: "ingest".to_string(),
///     max_concurrency: 8,
///     ..ExecutorOptions::default()
/// };
/// assert!(options.validate().is_ok());
/// assert_eq!(options.timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ExecutorOptions {
    /// Executor name, used in logs
    pub name: String,
    /// Upper bound on work items run at once
    pub max_concurrency: usize,
    /// Per-item timeout
    #[cfg_attr(feature = "config", serde(rename = "timeout_ms", with = "duration_ms"))]
    pub timeout: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_concurrency: 1,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ExecutorOptions {
    /// Reads options from `{prefix}NAME`, `{prefix}MAX_CONCURRENCY` and
    /// `{prefix}TIMEOUT_MS`.
    ///
    /// Unset variables keep their defaults. A set but unparsable variable is
    /// `InvalidArgument`. The result is validated before it is returned.
    pub fn from_env(prefix: &str) -> DiResult<Self> {
        let mut options = Self::default();

        if let Some(name) = read_var(prefix, "NAME")? {
            options.name = name;
        }
        if let Some(max) = read_var(prefix, "MAX_CONCURRENCY")? {
            options.max_concurrency = parse_var(prefix, "MAX_CONCURRENCY", &max)?;
        }
        if let Some(ms) = read_var(prefix, "TIMEOUT_MS")? {
            options.timeout = Duration::from_millis(parse_var(prefix, "TIMEOUT_MS", &ms)?);
        }

        options.validate()?;
        Ok(options)
    }

    /// Parses options from JSON; missing fields keep their defaults.
    ///
    /// ```
    /// use ferrous_scoped::ExecutorOptions;
    /// use std::time::Duration;
    ///
    /// let options = ExecutorOptions::from_json(r#"{"name": "batch", "timeout_ms": 250}"#).unwrap();
    /// assert_eq!(options.name, "batch");
    /// assert_eq!(options.max_concurrency, 1);
    /// assert_eq!(options.timeout, Duration::from_millis(250));
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| DiError::InvalidArgument(format!("invalid executor options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Rejects options no executor can run with.
    pub fn validate(&self) -> DiResult<()> {
        if self.name.trim().is_empty() {
            return Err(DiError::InvalidArgument("executor name must not be empty".into()));
        }
        if self.max_concurrency == 0 {
            return Err(DiError::InvalidArgument(
                "max_concurrency must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn read_var(prefix: &str, key: &str) -> DiResult<Option<String>> {
    let var = format!("{}{}", prefix, key);
    match env::var(&var) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(DiError::InvalidArgument(format!("{} is not valid unicode", var)))
        }
    }
}

fn parse_var<T: FromStr>(prefix: &str, key: &str, raw: &str) -> DiResult<T> {
    raw.trim().parse().map_err(|_| {
        DiError::InvalidArgument(format!("{}{} has an invalid value: {:?}", prefix, key, raw))
    })
}

#[cfg(feature = "config")]
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        assert!(ExecutorOptions::default().validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let options = ExecutorOptions {
            max_concurrency: 0,
            ..ExecutorOptions::default()
        };
        assert!(matches!(options.validate(), Err(DiError::InvalidArgument(_))));
    }

    #[test]
    fn blank_name_is_rejected() {
        let options = ExecutorOptions {
            name: "  ".to_string(),
            ..ExecutorOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn unset_prefix_yields_defaults() {
        let options = ExecutorOptions::from_env("FERROUS_SCOPED_UNIT_UNSET_").unwrap();
        assert_eq!(options, ExecutorOptions::default());
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_round_trips_timeout_in_millis() {
        let options = ExecutorOptions {
            timeout: Duration::from_millis(1500),
            ..ExecutorOptions::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"timeout_ms\":1500"));
        assert_eq!(ExecutorOptions::from_json(&json).unwrap(), options);
    }
}
