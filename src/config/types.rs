use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Top-level configuration: the listen address plus the section and
/// scenario tables loaded at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub listen: Option<String>,

    /// Insertion order is significant — it is the tie-break order for
    /// section matching (spec §4.1).
    #[serde(default)]
    pub sections: IndexMap<String, SectionConfig>,

    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    pub path_pattern: String,

    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    #[serde(default)]
    pub strict_path: bool,

    #[serde(default)]
    pub return_body: bool,

    #[serde(default)]
    pub header_id_names: Vec<String>,

    #[serde(default)]
    pub body_id_paths: Vec<String>,

    #[serde(default)]
    pub transformations: TransformConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub request: Vec<TransformOpConfig>,
    #[serde(default)]
    pub response: Vec<TransformOpConfig>,
}

/// A single transform op, as authored in configuration. Compiled once into
/// `crate::transform::TransformOp` at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformOpConfig {
    SetField { path: String, value: serde_json::Value },
    RemoveField { path: String },
    UppercaseField { path: String },
    LowercaseField { path: String },
    AddTimestamp { field: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub uuid: Option<uuid::Uuid>,
    pub request_path: String,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}
