//! Layered configuration: defaults, then `config/antrian.toml` (or the file named by
//! `ANTRIAN_CONFIG`), then `ANTRIAN__*` environment variables.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | bind | 127.0.0.1:8000 | Gateway listen address. |
//! | storage_path | ./data/antrian | Sled directory for the state record. |
//! | state_key | antrian-ptsp-queue | Key of the state record. |
//! | utc_offset_hours | 7 | Fixed timezone of the daily reset (Asia/Jakarta). |
//! | counters | LOKET 1–4, shared, prefix A | Counter configuration. |

use crate::error::QueueResult;
use crate::model::{default_counters, Counter};
use crate::store::DEFAULT_STATE_KEY;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

/// One configured counter. Runtime fields (number, timestamp) always start empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSpec {
    pub id: String,
    pub name: String,
    pub prefix: String,
    #[serde(default = "default_true")]
    pub shared_queue: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<&CounterSpec> for Counter {
    fn from(spec: &CounterSpec) -> Self {
        let mut counter = Counter::new(&spec.id, &spec.name, &spec.prefix, spec.shared_queue);
        counter.is_active = spec.is_active;
        counter
    }
}

fn default_counter_specs() -> Vec<CounterSpec> {
    default_counters()
        .into_iter()
        .map(|c| CounterSpec {
            id: c.id,
            name: c.name,
            prefix: c.prefix,
            shared_queue: c.shared_queue,
            is_active: c.is_active,
        })
        .collect()
}

/// Gateway and store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub bind: String,
    pub storage_path: String,
    pub state_key: String,
    pub utc_offset_hours: i32,
    #[serde(default = "default_counter_specs")]
    pub counters: Vec<CounterSpec>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            storage_path: "./data/antrian".to_string(),
            state_key: DEFAULT_STATE_KEY.to_string(),
            utc_offset_hours: 7,
            counters: default_counter_specs(),
        }
    }
}

impl QueueConfig {
    /// Load from file and environment (see module docs for precedence).
    pub fn load() -> QueueResult<Self> {
        let builder = config::Config::builder()
            .set_default("bind", "127.0.0.1:8000")?
            .set_default("storage_path", "./data/antrian")?
            .set_default("state_key", DEFAULT_STATE_KEY)?
            .set_default("utc_offset_hours", 7_i64)?;
        load_layered(builder)
    }

    /// Counters as runtime values (zeroed).
    pub fn counters(&self) -> Vec<Counter> {
        self.counters.iter().map(Counter::from).collect()
    }
}

/// Apply the config file and `ANTRIAN__*` environment on top of `builder` and
/// deserialize into any settings type (the display runner reuses this).
pub fn load_layered<T: DeserializeOwned>(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> QueueResult<T> {
    let config_path =
        std::env::var("ANTRIAN_CONFIG").unwrap_or_else(|_| "config/antrian.toml".to_string());
    let path = Path::new(&config_path);
    let builder = if path.exists() {
        builder.add_source(config::File::from(path))
    } else {
        builder
    };

    let built = builder
        .add_source(config::Environment::with_prefix("ANTRIAN").separator("__"))
        .build()?;

    Ok(built.try_deserialize()?)
}
