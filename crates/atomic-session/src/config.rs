//! Engine configuration loading.
//!
//! Settings come from `atomic.toml` in the current directory; every field is
//! optional and a missing file means the defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use atomic_ai::{
    ConvScorer, HeuristicEvaluator, HeuristicWeights, LayeredEvaluator, SearchBudget,
    SearchOptions, EXPLORATION_CONSTANT,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// How hard the engine tries on its own turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Alpha-beta, one ply.
    Easy,
    /// Alpha-beta, two plies.
    #[default]
    Medium,
    /// Alpha-beta, three plies.
    Hard,
    /// Monte Carlo tree search, two seconds or 1000 simulations.
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub const fn budget(self) -> SearchBudget {
        match self {
            Difficulty::Easy => SearchBudget::AlphaBeta { depth: 1 },
            Difficulty::Medium => SearchBudget::AlphaBeta { depth: 2 },
            Difficulty::Hard => SearchBudget::AlphaBeta { depth: 3 },
            Difficulty::Expert => SearchBudget::Mcts {
                time_limit: Duration::from_secs(2),
                simulations: 1000,
            },
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown difficulty: {}", s))
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Budget used when an AI move is requested without one.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// JSON weights for the learned evaluator. Without them, or if they fail
    /// to load, the heuristic evaluator is used.
    #[serde(default)]
    pub weights: Option<PathBuf>,
    /// Seed for the search RNG; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Maximum plies of a Monte Carlo playout. Defaults to 100.
    #[serde(default = "default_rollout_cap")]
    pub rollout_cap: u32,
    /// Terms of the heuristic evaluator.
    #[serde(default)]
    pub heuristic: HeuristicWeights,
}

fn default_rollout_cap() -> u32 {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            difficulty: Difficulty::default(),
            weights: None,
            seed: None,
            rollout_cap: default_rollout_cap(),
            heuristic: HeuristicWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Loads `atomic.toml` from the current directory, or the defaults if
    /// there is no such file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads a configuration file that must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        PathBuf::from("atomic.toml")
    }

    /// Builds the evaluator, with the learned scorer when its weights load.
    pub fn evaluator(&self) -> LayeredEvaluator {
        let evaluator = LayeredEvaluator::new(HeuristicEvaluator::new(self.heuristic.clone()));
        let Some(path) = &self.weights else {
            return evaluator;
        };
        match ConvScorer::load(path) {
            Ok(scorer) => {
                tracing::info!("Loaded evaluator weights from {}", path.display());
                evaluator.with_learned(Box::new(scorer))
            }
            Err(e) => {
                tracing::warn!(
                    "Could not load weights from {}, using heuristic: {}",
                    path.display(),
                    e
                );
                evaluator
            }
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            rollout_cap: self.rollout_cap,
            exploration: EXPLORATION_CONSTANT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config = EngineConfig::from_toml_str(
            r#"
difficulty = "hard"
weights = "net.json"
seed = 42
rollout_cap = 60

[heuristic]
king_adjacent = 200
"#,
        )
        .unwrap();

        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.weights, Some(PathBuf::from("net.json")));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.rollout_cap, 60);
        assert_eq!(config.heuristic.king_adjacent, 200);
        assert_eq!(config.heuristic.king_near, 60);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.difficulty, Difficulty::Medium);
        assert_eq!(config.rollout_cap, 100);
    }

    #[test]
    fn test_invalid_toml() {
        let result = EngineConfig::from_toml_str("difficulty = [");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));

        let result = EngineConfig::from_toml_str(r#"difficulty = "impossible""#);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::load_from(Path::new("/nonexistent/atomic.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "difficulty = \"expert\"").unwrap();
        let config = EngineConfig::load_from(file.path()).unwrap();
        assert_eq!(config.difficulty, Difficulty::Expert);
    }

    #[test]
    fn test_difficulty_presets() {
        assert_eq!(
            Difficulty::Easy.budget(),
            SearchBudget::AlphaBeta { depth: 1 }
        );
        assert_eq!(
            Difficulty::Hard.budget(),
            SearchBudget::AlphaBeta { depth: 3 }
        );
        assert_eq!(
            Difficulty::Expert.budget(),
            SearchBudget::Mcts {
                time_limit: Duration::from_secs(2),
                simulations: 1000
            }
        );
    }

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!("Expert".parse::<Difficulty>(), Ok(Difficulty::Expert));
        assert!("grandmaster".parse::<Difficulty>().is_err());
        for d in Difficulty::ALL {
            assert_eq!(d.to_string().parse::<Difficulty>(), Ok(d));
        }
    }

    #[test]
    fn test_bad_weights_fall_back() {
        let config = EngineConfig {
            weights: Some(PathBuf::from("/nonexistent/net.json")),
            ..EngineConfig::default()
        };
        assert!(!config.evaluator().has_learned());
        assert!(!EngineConfig::default().evaluator().has_learned());
    }
}
