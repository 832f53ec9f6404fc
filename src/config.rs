//! Bot configuration.
//!
//! ## Environment variables
//!
//! Credentials (required, the bot refuses to schedule without them):
//! - `DUNE_API_KEY`
//! - `NEYNAR_API_KEY`
//! - `SIGNER_UUID`
//!
//! Schedule:
//! - `PUBLISH_CAST_TIME`: `HH:MM` (default: 09:00)
//! - `TIME_ZONE`: IANA zone (default: UTC)
//! - `RUN_ON_START`: run one cycle before waiting for the trigger (default: false)
//!
//! Tracking:
//! - `LEADERBOARD_SIZE` (default: 150)
//! - `CURRENT_LEADERBOARD_QUERY_ID` (default: 3380826)
//! - `USERNAME_LOOKUP_QUERY_ID` (default: 3386538)
//! - `INTRO_MESSAGE`: bootstrap announcement override
//! - `SNAPSHOT_PATH`: held snapshot file (default: held_snapshot.json)
//!
//! Transport:
//! - `DUNE_BASE_URL`, `NEYNAR_BASE_URL`
//! - `HTTP_TIMEOUT_SECS` (default: 30)
//! - `DUNE_POLL_INTERVAL_MS` (default: 2000)
//! - `DUNE_MAX_POLLS` (default: 150)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::controller::ControllerConfig;
use crate::publisher::NeynarConfig;
use crate::schedule::{DailySchedule, ScheduleError};
use crate::source::DuneConfig;

/// Error type for configuration loading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required credential is absent or empty.
    #[error("{0} is not defined")]
    MissingCredential(&'static str),
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
    /// Publish time or time zone is invalid.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Everything the binary needs to run.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Query service adapter.
    pub dune: DuneConfig,
    /// Casting adapter.
    pub neynar: NeynarConfig,
    /// Daily trigger.
    pub schedule: DailySchedule,
    /// Cycle tunables.
    pub controller: ControllerConfig,
    /// Held snapshot file.
    pub snapshot_path: PathBuf,
    /// Run a cycle at startup.
    pub run_on_start: bool,
}

impl BotConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let dune_key = vars.credential("DUNE_API_KEY")?;
        let neynar_key = vars.credential("NEYNAR_API_KEY")?;
        let signer = vars.credential("SIGNER_UUID")?;

        let timeout_secs = vars.parse("HTTP_TIMEOUT_SECS", 30u64)?;

        let mut dune = DuneConfig::new(dune_key);
        if let Some(url) = vars.get("DUNE_BASE_URL") {
            dune.base_url = url;
        }
        dune.leaderboard_query_id = vars.parse("CURRENT_LEADERBOARD_QUERY_ID", dune.leaderboard_query_id)?;
        dune.lookup_query_id = vars.parse("USERNAME_LOOKUP_QUERY_ID", dune.lookup_query_id)?;
        dune.poll_interval = Duration::from_millis(vars.parse("DUNE_POLL_INTERVAL_MS", 2000u64)?);
        dune.max_polls = vars.parse("DUNE_MAX_POLLS", dune.max_polls)?;
        dune.timeout_secs = timeout_secs;

        let mut neynar = NeynarConfig::new(neynar_key, signer);
        if let Some(url) = vars.get("NEYNAR_BASE_URL") {
            neynar.base_url = url;
        }
        neynar.timeout_secs = timeout_secs;

        let schedule = DailySchedule::parse(
            &vars.get("PUBLISH_CAST_TIME").unwrap_or_else(|| "09:00".to_string()),
            &vars.get("TIME_ZONE").unwrap_or_else(|| "UTC".to_string()),
        )?;

        let mut controller = ControllerConfig::default();
        controller.leaderboard_size = vars.parse("LEADERBOARD_SIZE", controller.leaderboard_size)?;
        if let Some(message) = vars.get("INTRO_MESSAGE") {
            controller.intro_message = message;
        }

        Ok(Self {
            dune,
            neynar,
            schedule,
            controller,
            snapshot_path: vars
                .get("SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("held_snapshot.json")),
            run_on_start: vars.parse("RUN_ON_START", false)?,
        })
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Non-empty value of `key`.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn credential(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingCredential(key))
    }

    fn parse<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| map.get(key).cloned())
    }

    const CREDENTIALS: [(&str, &str); 3] = [
        ("DUNE_API_KEY", "dune"),
        ("NEYNAR_API_KEY", "neynar"),
        ("SIGNER_UUID", "19d0c5fd-9b33-4a48-a0e2-bc7b0555baec"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&CREDENTIALS).unwrap();

        assert_eq!(config.controller.leaderboard_size, 150);
        assert_eq!(config.dune.leaderboard_query_id, 3380826);
        assert_eq!(config.dune.lookup_query_id, 3386538);
        assert_eq!(config.schedule, DailySchedule::parse("09:00", "UTC").unwrap());
        assert_eq!(config.snapshot_path, PathBuf::from("held_snapshot.json"));
        assert!(!config.run_on_start);
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        for missing in ["DUNE_API_KEY", "NEYNAR_API_KEY", "SIGNER_UUID"] {
            let pairs: Vec<_> = CREDENTIALS.iter().copied().filter(|(k, _)| *k != missing).collect();
            assert_eq!(load(&pairs).unwrap_err(), ConfigError::MissingCredential(missing));
        }
    }

    #[test]
    fn test_empty_credential_counts_as_missing() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs[2] = ("SIGNER_UUID", "  ");
        assert_eq!(load(&pairs).unwrap_err(), ConfigError::MissingCredential("SIGNER_UUID"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.extend([
            ("PUBLISH_CAST_TIME", "17:45"),
            ("TIME_ZONE", "Europe/Berlin"),
            ("LEADERBOARD_SIZE", "50"),
            ("RUN_ON_START", "true"),
            ("DUNE_POLL_INTERVAL_MS", "500"),
            ("SNAPSHOT_PATH", "/var/lib/bot/held.json"),
        ]);
        let config = load(&pairs).unwrap();

        assert_eq!(config.schedule, DailySchedule::parse("17:45", "Europe/Berlin").unwrap());
        assert_eq!(config.controller.leaderboard_size, 50);
        assert!(config.run_on_start);
        assert_eq!(config.dune.poll_interval, Duration::from_millis(500));
        assert_eq!(config.snapshot_path, PathBuf::from("/var/lib/bot/held.json"));
    }

    #[test]
    fn test_invalid_number() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("LEADERBOARD_SIZE", "lots"));

        assert!(matches!(
            load(&pairs),
            Err(ConfigError::InvalidValue { key: "LEADERBOARD_SIZE", .. })
        ));
    }

    #[test]
    fn test_invalid_time_zone() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("TIME_ZONE", "Nowhere/City"));

        assert!(matches!(load(&pairs), Err(ConfigError::Schedule(ScheduleError::UnknownTimeZone(_)))));
    }
}
