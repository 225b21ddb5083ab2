use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Parameters of the fixed report: which cause and accident type are in
/// focus, and how many entries each ranked table keeps.
///
/// Stored as a JSON object on disk; every key is optional:
/// ```json
/// {
///   "focus_cause": "Falta de Atenção à Condução",
///   "focus_accident_type": "Colisão traseira",
///   "top_causes": 15
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub focus_cause: String,
    pub focus_accident_type: String,
    pub straight_layout: String,
    /// Case-insensitive substring selecting the causes for the severity table.
    pub severity_cause_pattern: String,
    pub top_causes: usize,
    pub top_rear_collision_causes: usize,
    pub top_victim_causes: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            focus_cause: "Falta de Atenção à Condução".to_string(),
            focus_accident_type: "Colisão traseira".to_string(),
            straight_layout: "Reta".to_string(),
            severity_cause_pattern: "FALTA DE ATENÇÃO".to_string(),
            top_causes: 15,
            top_rear_collision_causes: 10,
            top_victim_causes: 5,
        }
    }
}

impl ReportConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
