use anyhow::{Context, Result, ensure};
use config::{Config, Environment, File, FileFormat};
use gulde_common::{Cell, convert};
use gulde_navigation::{Connectivity, Grid, GridMap};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Top-level simulation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub map: MapConfig,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed ticks per simulated second.
    pub tick_hz: f32,
    /// Global clock multiplier, 0 pauses movement.
    pub time_scale: f32,
    /// Hard stop for the tick loop.
    pub max_ticks: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_hz: 50.0,
            time_scale: 1.0,
            max_ticks: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub origin: [i32; 2],
    #[serde(default)]
    pub connectivity: Connectivity,
    /// Rows of `.` (open) and `#` (blocked), top row first.
    pub layout: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    pub start: [i32; 2],
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub route: Vec<[i32; 2]>,
    /// Share of each leg after which a milestone is logged.
    #[serde(default = "default_announce_at")]
    pub announce_at: f32,
}

fn default_speed() -> f32 {
    1.0
}

fn default_announce_at() -> f32 {
    0.5
}

impl EntityConfig {
    pub fn start_cell(&self) -> Cell {
        convert::cell_from_pair(self.start)
    }

    pub fn route_cells(&self) -> Vec<Cell> {
        convert::cells_from_pairs(&self.route)
    }
}

impl SimConfig {
    /// Duration of one fixed tick in simulated seconds.
    pub fn timestep(&self) -> f32 {
        1.0 / self.simulation.tick_hz
    }

    /// Wall-clock period of the tick loop.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f32(self.timestep())
    }

    /// Builds the walkability grid described by `[map]`.
    pub fn build_grid(&self) -> Result<GridMap> {
        let grid = GridMap::from_layout(&self.map.layout, convert::cell_from_pair(self.map.origin))
            .context("Invalid [map] layout")?;
        Ok(grid.with_connectivity(self.map.connectivity))
    }

    /// Checks value ranges and that every entity starts inside the map.
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        ensure!(
            sim.tick_hz.is_finite() && sim.tick_hz > 0.0,
            "simulation.tick_hz must be positive, got {}",
            sim.tick_hz
        );
        ensure!(
            sim.time_scale.is_finite() && sim.time_scale >= 0.0,
            "simulation.time_scale must be non-negative, got {}",
            sim.time_scale
        );

        let grid = self.build_grid()?;
        let bounds = grid.bounds();

        for entity in &self.entities {
            ensure!(
                entity.speed.is_finite() && entity.speed >= 0.0,
                "Entity '{}': speed must be non-negative, got {}",
                entity.name,
                entity.speed
            );
            ensure!(
                (0.0..=1.0).contains(&entity.announce_at),
                "Entity '{}': announce_at must be within [0, 1], got {}",
                entity.name,
                entity.announce_at
            );
            ensure!(
                bounds.contains(&entity.start_cell()),
                "Entity '{}': start {:?} lies outside the map",
                entity.name,
                entity.start
            );
        }
        Ok(())
    }
}

/// Loads settings from a TOML file, then applies `GULDE_` environment
/// overrides (`GULDE_SIMULATION__TIME_SCALE=2`).
pub fn load_config(path: &str) -> Result<SimConfig> {
    info!("Attempting to load configuration from {}", path);

    let settings = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(true))
        .add_source(
            Environment::with_prefix("GULDE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build();

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e).with_context(|| format!("Failed to load configuration from {}", path));
        }
    };

    let config: SimConfig = settings
        .try_deserialize()
        .with_context(|| format!("Malformed configuration in {}", path))?;
    config.validate()?;

    info!(
        entities = config.entities.len(),
        tick_hz = config.simulation.tick_hz,
        "Successfully loaded configuration"
    );
    Ok(config)
}

/// Parses settings from TOML text without environment overrides.
#[cfg(test)]
pub fn from_toml_str(toml: &str) -> Result<SimConfig> {
    let config: SimConfig = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?
        .try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
        [simulation]
        tick_hz = 10.0
        time_scale = 2.0
        max_ticks = 100

        [map]
        origin = [-1, -1]
        connectivity = "eight"
        layout = [
            "...",
            ".#.",
            "...",
        ]

        [[entities]]
        name = "carter"
        start = [-1, -1]
        speed = 1.5
        route = [[1, 1], [-1, 1]]
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = from_toml_str(SMALL).unwrap();
        assert_eq!(config.simulation.tick_hz, 10.0);
        assert_eq!(config.simulation.time_scale, 2.0);
        assert_eq!(config.simulation.max_ticks, 100);
        assert!((config.timestep() - 0.1).abs() < 1e-6);

        let grid = config.build_grid().unwrap();
        assert_eq!(grid.connectivity(), Connectivity::Eight);
        assert_eq!(grid.bounds().origin, Cell::new(-1, -1));
        assert!(!grid.is_walkable(&Cell::new(0, 0)));

        let entity = &config.entities[0];
        assert_eq!(entity.start_cell(), Cell::new(-1, -1));
        assert_eq!(entity.route_cells(), vec![Cell::new(1, 1), Cell::new(-1, 1)]);
        assert_eq!(entity.announce_at, 0.5);
    }

    #[test]
    fn test_defaults_apply() {
        let config = from_toml_str(
            r#"
            [map]
            layout = ["..", ".."]

            [[entities]]
            name = "mira"
            start = [0, 0]
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.tick_hz, 50.0);
        assert_eq!(config.simulation.time_scale, 1.0);
        assert_eq!(config.map.connectivity, Connectivity::Four);
        assert_eq!(config.map.origin, [0, 0]);
        assert_eq!(config.entities[0].speed, 1.0);
        assert!(config.entities[0].route.is_empty());
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_tick = SMALL.replace("tick_hz = 10.0", "tick_hz = 0.0");
        assert!(from_toml_str(&bad_tick).is_err());

        let bad_scale = SMALL.replace("time_scale = 2.0", "time_scale = -1.0");
        assert!(from_toml_str(&bad_scale).is_err());

        let bad_speed = SMALL.replace("speed = 1.5", "speed = -0.5");
        assert!(from_toml_str(&bad_speed).is_err());

        let bad_start = SMALL.replace("start = [-1, -1]", "start = [5, 5]");
        let err = from_toml_str(&bad_start).unwrap_err();
        assert!(err.to_string().contains("outside the map"));

        let bad_announce = SMALL.replace("speed = 1.5", "speed = 1.5\nannounce_at = 1.5");
        assert!(from_toml_str(&bad_announce).is_err());
    }

    #[test]
    fn test_rejects_malformed_layout() {
        let ragged = SMALL.replace("\".#.\",", "\".#\",");
        assert!(from_toml_str(&ragged).is_err());

        let unknown = SMALL.replace("\".#.\",", "\".x.\",");
        assert!(from_toml_str(&unknown).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_config("config/does-not-exist.toml").is_err());
    }

    #[test]
    fn test_bundled_default_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = load_config(path).unwrap();
        assert!(!config.entities.is_empty());
    }
}
