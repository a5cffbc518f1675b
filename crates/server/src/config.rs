//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub snack: SnackConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from `path`, writing the defaults there if the
    /// file does not exist yet.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Parse configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Server networking and scheduling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Simulation tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Snapshot broadcast interval in milliseconds.
    #[serde(default = "default_broadcast_interval")]
    pub broadcast_interval_ms: u64,
    /// Per-write timeout on a session socket, in milliseconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
    /// Frames that may wait in a session's outbound queue.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Largest inbound frame accepted, in bytes.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms.max(1))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms.max(1))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            tick_interval_ms: default_tick_interval(),
            broadcast_interval_ms: default_broadcast_interval(),
            send_timeout_ms: default_send_timeout(),
            outbound_queue: default_outbound_queue(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

fn default_port() -> u16 {
    1340
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_tick_interval() -> u64 {
    16
}
fn default_broadcast_interval() -> u64 {
    50
}
fn default_send_timeout() -> u64 {
    1000
}
fn default_outbound_queue() -> usize {
    8
}
fn default_max_frame_len() -> usize {
    protocol::DEFAULT_MAX_FRAME_LEN
}

/// World bounds and cell limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_size")]
    pub width: f64,
    #[serde(default = "default_world_size")]
    pub height: f64,
    /// Radius of a freshly spawned player cell.
    #[serde(default = "default_min_radius")]
    pub min_radius: f64,
    /// Maximum cells per player; 0 means unlimited.
    #[serde(default)]
    pub max_cells: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_size(),
            height: default_world_size(),
            min_radius: default_min_radius(),
            max_cells: 0,
        }
    }
}

fn default_world_size() -> f64 {
    500.0
}
fn default_min_radius() -> f64 {
    1.0
}

/// Player movement and growth.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Base speed in world units per second. Boosting allows up to twice this.
    #[serde(default = "default_min_speed")]
    pub min_speed: f64,
    /// Growth credit a new player starts with.
    #[serde(default = "default_initial_grow")]
    pub initial_grow: f64,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl PlayerConfig {
    /// Whether a requested speed is inside `[min_speed, 2 * min_speed]`.
    pub fn accepts_speed(&self, speed: f64) -> bool {
        (self.min_speed..=2.0 * self.min_speed).contains(&speed)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            min_speed: default_min_speed(),
            initial_grow: default_initial_grow(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_min_speed() -> f64 {
    10.0
}
fn default_initial_grow() -> f64 {
    2.0
}
fn default_max_name_length() -> usize {
    32
}

/// Snack seeding and replenishment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnackConfig {
    /// Snacks spawned before the first tick.
    #[serde(default = "default_snack_initial")]
    pub initial_amount: usize,
    /// Target snacks per unit of world area.
    #[serde(default = "default_snack_density")]
    pub density: f64,
    /// Snacks added per tick while below target.
    #[serde(default = "default_snack_spawn")]
    pub spawn_per_tick: usize,
    #[serde(default = "default_snack_min_radius")]
    pub min_radius: f64,
    #[serde(default = "default_snack_max_radius")]
    pub max_radius: f64,
}

impl Default for SnackConfig {
    fn default() -> Self {
        Self {
            initial_amount: default_snack_initial(),
            density: default_snack_density(),
            spawn_per_tick: default_snack_spawn(),
            min_radius: default_snack_min_radius(),
            max_radius: default_snack_max_radius(),
        }
    }
}

fn default_snack_initial() -> usize {
    100
}
fn default_snack_density() -> f64 {
    0.01
}
fn default_snack_spawn() -> usize {
    1
}
fn default_snack_min_radius() -> f64 {
    0.1
}
fn default_snack_max_radius() -> f64 {
    1.0
}

/// Logging verbosity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl LogConfig {
    /// Build the subscriber filter: `RUST_LOG` first, then the configured level.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
