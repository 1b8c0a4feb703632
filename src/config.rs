//! Settings read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::resource::Backoff;

/// Directory to record cassettes into.
pub const RECORD_VAR: &str = "CLAIM_MIGRATOR_RECORD";
/// Monolithic cassette to replay instead of talking to a cluster.
pub const REPLAY_VAR: &str = "CLAIM_MIGRATOR_REPLAY";
const RETRY_STEPS_VAR: &str = "CLAIM_MIGRATOR_RETRY_STEPS";
const RETRY_BASE_MS_VAR: &str = "CLAIM_MIGRATOR_RETRY_BASE_MS";
const RETRY_MAX_MS_VAR: &str = "CLAIM_MIGRATOR_RETRY_MAX_MS";
const RETRY_FACTOR_VAR: &str = "CLAIM_MIGRATOR_RETRY_FACTOR";

/// Largest accepted backoff multiplier.
const MAX_FACTOR: f64 = 10.0;
/// Largest accepted single retry delay.
const MAX_DELAY: Duration = Duration::from_secs(300);

/// A setting is present but unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The value does not parse.
    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
        /// What was expected.
        expected: &'static str,
    },
    /// Recording and replaying were both requested.
    #[error("{RECORD_VAR} and {REPLAY_VAR} cannot be set together")]
    RecordAndReplay,
}

/// Where store and discovery traffic goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Talk to the cluster.
    Live,
    /// Talk to the cluster and record every interaction under the directory.
    Record(PathBuf),
    /// Serve every interaction from the cassette file.
    Replay(PathBuf),
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Traffic mode.
    pub mode: Mode,
    /// Conflict retry budget.
    pub backoff: Backoff,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through `lookup`; empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let mode = match (get(RECORD_VAR), get(REPLAY_VAR)) {
            (Some(_), Some(_)) => return Err(ConfigError::RecordAndReplay),
            (Some(dir), None) => Mode::Record(PathBuf::from(dir)),
            (None, Some(file)) => Mode::Replay(PathBuf::from(file)),
            (None, None) => Mode::Live,
        };

        let defaults = Backoff::default();
        let steps: u32 = parse(&get, RETRY_STEPS_VAR, "attempt count")?.unwrap_or(defaults.steps);
        if steps == 0 {
            return Err(ConfigError::Invalid {
                var: RETRY_STEPS_VAR,
                value: "0".into(),
                expected: "attempt count",
            });
        }
        let initial = delay(&get, RETRY_BASE_MS_VAR)?.unwrap_or(defaults.initial);
        let cap = delay(&get, RETRY_MAX_MS_VAR)?.unwrap_or(defaults.cap);
        let factor: f64 = parse(&get, RETRY_FACTOR_VAR, "multiplier")?.unwrap_or(defaults.factor);
        if !(1.0..=MAX_FACTOR).contains(&factor) {
            return Err(ConfigError::Invalid {
                var: RETRY_FACTOR_VAR,
                value: factor.to_string(),
                expected: "multiplier between 1 and 10",
            });
        }

        Ok(Self { mode, backoff: Backoff { steps, initial, factor, cap } })
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    get(var)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid { var, value, expected })
        })
        .transpose()
}

/// A delay in milliseconds, no longer than [`MAX_DELAY`].
fn delay(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let expected = "delay in milliseconds of at most 300000";
    let Some(millis) = parse::<u64>(get, var, expected)? else {
        return Ok(None);
    };
    let delay = Duration::from_millis(millis);
    if delay > MAX_DELAY {
        return Err(ConfigError::Invalid { var, value: millis.to_string(), expected });
    }
    Ok(Some(delay))
}
