use crate::utils::normalize_key;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Who the analysis is about, and which distributor values mean "nobody bid".
#[derive(Debug, Clone, Deserialize)]
pub struct FocalDistributorConfig {
    pub name: String,
    #[serde(default = "default_no_bidder_phrases")]
    pub no_bidder_phrases: Vec<String>,
}

impl FocalDistributorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            no_bidder_phrases: default_no_bidder_phrases(),
        }
    }

    /// Compares in the normalized form the dataset stores, so accented names match.
    pub fn is_focal(&self, distributor: &str) -> bool {
        normalize_key(distributor) == normalize_key(&self.name)
    }

    /// Case-insensitive exact match against the sentinel phrases.
    pub fn is_no_bidder(&self, distributor: &str) -> bool {
        let value = normalize_key(distributor);
        self.no_bidder_phrases
            .iter()
            .any(|phrase| normalize_key(phrase) == value)
    }
}

fn default_no_bidder_phrases() -> Vec<String> {
    vec!["no bidder".into(), "none".into(), "non".into()]
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ShareThresholds {
    pub strong: f64,
    pub weak: f64,
}

impl Default for ShareThresholds {
    fn default() -> Self {
        Self { strong: 20.0, weak: 10.0 }
    }
}

/// Lower edges of the Leader / StrongCompetitor / ModerateCompetitor tiers, in percent.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PositionTiers {
    pub leader: f64,
    pub strong: f64,
    pub moderate: f64,
}

impl Default for PositionTiers {
    fn default() -> Self {
        Self {
            leader: 30.0,
            strong: 15.0,
            moderate: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            high: 1.0,
            medium: 0.7,
            low: 0.4,
        }
    }
}

/// Lower edges of the Medium and High priority bins, in score units.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PriorityCutoffs {
    pub medium: f64,
    pub high: f64,
}

impl Default for PriorityCutoffs {
    fn default() -> Self {
        Self {
            medium: 1.0,
            high: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// Similar items needed before their median is trusted.
    pub min_similar: usize,
    /// Markdown applied to the global median when a category has no data.
    pub global_discount: f64,
    /// Currency units per opportunity-score unit.
    pub score_scale: f64,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            min_similar: 2,
            global_discount: 0.7,
            score_scale: 1_000_000.0,
        }
    }
}

/// Business constants of the engine. Defaults are the calibrated values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub shares: ShareThresholds,
    pub tiers: PositionTiers,
    pub confidence: ConfidenceWeights,
    pub priority: PriorityCutoffs,
    pub estimation: EstimationConfig,
    /// Distributors kept by name before the rest collapse into "OTHERS".
    pub others_threshold: usize,
    /// Competitors listed next to the focal distributor in comparisons.
    pub top_n: usize,
    /// Groups kept in "top groups" listings.
    pub top_groups: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            shares: ShareThresholds::default(),
            tiers: PositionTiers::default(),
            confidence: ConfidenceWeights::default(),
            priority: PriorityCutoffs::default(),
            estimation: EstimationConfig::default(),
            others_threshold: 8,
            top_n: 5,
            top_groups: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub sources: Vec<PathBuf>,
    pub focal: FocalDistributorConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub datasets: Vec<DatasetConfig>,
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(default)]
    pub watch: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_check_interval() -> u64 {
    60
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    Ok(config)
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
