use crate::clock::StudyClock;
use serde::{Deserialize, Serialize};
use std::env;

/// Default significance level for confidence intervals.
pub const DEFAULT_ALPHA: f64 = 0.05;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiftConfig {
    /// SQLite database holding `lift_studies` and `lift_studies_groups`.
    pub db_path: String,
    /// Root directory of the file-backed blob store.
    pub bucket_dir: String,
    pub bucket: String,
    /// Key of the conversion event log inside `bucket`.
    pub events_key: String,
    pub alpha: f64,
    pub assignment_seed: Option<u64>,
    #[serde(default)]
    pub clock: StudyClock,
}

impl LiftConfig {
    /// Load from `LIFT_*` environment variables, falling back to defaults.
    /// In tests, use LiftConfig::default_test().
    pub fn from_env() -> anyhow::Result<Self> {
        let alpha = match env::var("LIFT_ALPHA") {
            Ok(raw) => raw
                .parse::<f64>()
                .map_err(|e| anyhow::anyhow!("Invalid LIFT_ALPHA '{raw}': {e}"))?,
            Err(_) => DEFAULT_ALPHA,
        };
        if !(alpha > 0.0 && alpha < 1.0) {
            anyhow::bail!("LIFT_ALPHA must be in (0, 1), got {alpha}");
        }

        let assignment_seed = match env::var("LIFT_ASSIGNMENT_SEED") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|e| anyhow::anyhow!("Invalid LIFT_ASSIGNMENT_SEED '{raw}': {e}"))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            db_path: env_or("LIFT_DB_PATH", "lift.db"),
            bucket_dir: env_or("LIFT_BUCKET_DIR", "./bucket"),
            bucket: env_or("LIFT_BUCKET", "lift-events"),
            events_key: env_or("LIFT_EVENTS_KEY", "events.csv"),
            alpha,
            assignment_seed,
            clock: StudyClock::System,
        })
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            db_path: ":memory:".into(),
            bucket_dir: "./bucket".into(),
            bucket: "lift-events".into(),
            events_key: "events.csv".into(),
            alpha: DEFAULT_ALPHA,
            assignment_seed: Some(42),
            clock: StudyClock::System,
        }
    }

    pub fn with_clock(mut self, clock: StudyClock) -> Self {
        self.clock = clock;
        self
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
