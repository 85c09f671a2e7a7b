use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use super::config::{DecisionConfig, DecisionConfigError};

/// Holds the active decision configuration. Evaluations take an `Arc` snapshot at start,
/// so a reload never changes the thresholds of an evaluation already in flight.
#[derive(Debug)]
pub struct ConfigStore {
    active: RwLock<Arc<DecisionConfig>>,
}

impl ConfigStore {
    pub fn new(config: DecisionConfig) -> Result<Self, DecisionConfigError> {
        config.validate()?;
        Ok(Self {
            active: RwLock::new(Arc::new(config)),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, DecisionConfigError> {
        Self::new(read_config(path)?)
    }

    pub fn current(&self) -> Arc<DecisionConfig> {
        match self.active.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Activates `config` only if it validates; the previous version stays active otherwise.
    pub fn replace(&self, config: DecisionConfig) -> Result<Arc<DecisionConfig>, DecisionConfigError> {
        if let Err(err) = config.validate() {
            warn!(version = %config.version, error = %err, "rejected decision config");
            return Err(err);
        }

        let next = Arc::new(config);
        let previous = {
            let mut guard = match self.active.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::replace(&mut *guard, Arc::clone(&next))
        };
        info!(
            from = %previous.version,
            to = %next.version,
            "decision config activated"
        );
        Ok(next)
    }

    pub fn reload_from_path(&self, path: &Path) -> Result<Arc<DecisionConfig>, DecisionConfigError> {
        self.replace(read_config(path)?)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self {
            active: RwLock::new(Arc::new(DecisionConfig::default())),
        }
    }
}

fn read_config(path: &Path) -> Result<DecisionConfig, DecisionConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        DecisionConfigError::Parse(format!("unable to read {}: {err}", path.display()))
    })?;
    let config: DecisionConfig =
        serde_json::from_str(&raw).map_err(|err| DecisionConfigError::Parse(err.to_string()))?;
    Ok(config)
}
