use serde::{Deserialize, Serialize};
use smartvend_machine::{MachineConfig, TypeWhitelist};
use std::{fs, path::Path};
use tracing::warn;

const DEFAULT_MACHINE_PATH: &str = "config/machine.toml";

/// On-disk definition of one machine: tuning knobs plus an initial stock
/// manifest used to seed the demo crate.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MachineFileConfig {
    /// Seconds spent in the eject animation before release.
    pub eject_delay: f32,
    /// Seconds spent in the deny animation.
    pub deny_delay: f32,
    /// Probability that a qualifying hit dispenses an item (0 disables).
    pub dispense_on_hit_chance: f64,
    /// Minimum damage per hit to roll for a dispense.
    pub dispense_on_hit_threshold: f32,
    /// Seconds between hit-triggered dispenses.
    pub dispense_on_hit_cooldown: f32,
    /// Whether user vends are thrown.
    pub throw_on_vend: bool,
    /// Accepted item type ids; empty means accept everything.
    pub whitelist: Vec<String>,
    /// Accepted restock source kinds; empty means accept everything.
    pub source_whitelist: Vec<String>,
    /// RNG seed for the demo world.
    pub seed: u64,
    /// Items loaded into the demo restock crate.
    pub stock: Vec<StockItemConfig>,
}

/// One line of the initial stock manifest.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StockItemConfig {
    pub type_id: String,
    pub display_name: String,
    pub count: u32,
}

impl Default for MachineFileConfig {
    fn default() -> Self {
        Self {
            eject_delay: 0.6,
            deny_delay: 1.0,
            dispense_on_hit_chance: 0.3,
            dispense_on_hit_threshold: 2.0,
            dispense_on_hit_cooldown: 1.0,
            throw_on_vend: false,
            whitelist: Vec::new(),
            source_whitelist: Vec::new(),
            seed: 1234,
            stock: vec![
                StockItemConfig {
                    type_id: "cola".into(),
                    display_name: "Cola".into(),
                    count: 3,
                },
                StockItemConfig {
                    type_id: "chips".into(),
                    display_name: "Chips".into(),
                    count: 2,
                },
            ],
        }
    }
}

impl MachineFileConfig {
    /// Load the machine definition from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_MACHINE_PATH))
    }

    /// Load from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<MachineFileConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    MachineFileConfig::default()
                }
            },
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                MachineFileConfig::default()
            }
        }
    }

    /// Convert to the engine's machine configuration.
    pub fn machine_config(&self) -> MachineConfig {
        let whitelist = |ids: &[String]| {
            if ids.is_empty() {
                TypeWhitelist::Any
            } else {
                TypeWhitelist::types(ids.iter().cloned())
            }
        };
        MachineConfig {
            eject_delay: self.eject_delay,
            deny_delay: self.deny_delay,
            dispense_on_hit_chance: (self.dispense_on_hit_chance > 0.0)
                .then_some(self.dispense_on_hit_chance),
            dispense_on_hit_threshold: self.dispense_on_hit_threshold,
            dispense_on_hit_cooldown: self.dispense_on_hit_cooldown,
            throw_on_vend: self.throw_on_vend,
            item_whitelist: whitelist(&self.whitelist),
            source_whitelist: whitelist(&self.source_whitelist),
            ..MachineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = MachineFileConfig::load_from_path(Path::new("/nonexistent/machine.toml"));
        assert_eq!(cfg.stock.len(), 2);
        assert!(matches!(
            cfg.machine_config().item_whitelist,
            TypeWhitelist::Any
        ));
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: MachineFileConfig = toml::from_str(
            r#"
            eject_delay = 0.3
            whitelist = ["cola"]

            [[stock]]
            type_id = "cola"
            display_name = "Cola"
            count = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.eject_delay, 0.3);
        assert_eq!(cfg.deny_delay, 1.0);
        assert_eq!(cfg.stock[0].count, 5);
        assert!(cfg.machine_config().item_whitelist.matches("cola"));
        assert!(!cfg.machine_config().item_whitelist.matches("beer"));
    }
}
