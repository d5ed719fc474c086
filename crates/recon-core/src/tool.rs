//! Tool System
//!
//! The model may call exactly two tools. Names arriving from the model are
//! parsed into [`ToolKind`] and routed through a [`Toolbox`] holding one
//! adapter per kind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bbox::BoundingBox;
use crate::error::Result;

/// Closed set of tools the model can invoke
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    WebSearch,
    CropImage,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::WebSearch, ToolKind::CropImage];

    /// Wire name used in function declarations
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::CropImage => "crop_image",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Function declaration advertised to the model
    pub fn schema(self) -> ToolSchema {
        match self {
            ToolKind::WebSearch => ToolSchema {
                name: self.name().into(),
                description: "Performs a web search to verify location clues.".into(),
                parameters: vec![ParameterSchema::new(
                    "query",
                    "string",
                    "Search query, e.g. a shop name plus visible street text",
                )],
            },
            ToolKind::CropImage => {
                let edge = |name: &str, what: &str| {
                    ParameterSchema::new(
                        name,
                        "integer",
                        &format!("{} edge of the crop box in a 1000x1000 frame", what),
                    )
                };
                ToolSchema {
                    name: self.name().into(),
                    description: "Crops the original image to investigate a specific area (zoom in)."
                        .into(),
                    parameters: vec![
                        edge("box_ymin", "Top"),
                        edge("box_xmin", "Left"),
                        edge("box_ymax", "Bottom"),
                        edge("box_xmax", "Right"),
                    ],
                }
            }
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, integer, number, boolean)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ParameterSchema {
    pub fn new(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// JSON Schema object describing the parameters
    pub fn parameters_json(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.param_type,
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Text search capability. Failures are reported inside the returned string.
#[async_trait]
pub trait SearchTool: Send + Sync {
    async fn web_search(&self, query: &str) -> String;
}

/// Image crop capability
#[async_trait]
pub trait CropTool: Send + Sync {
    /// Pixel dimensions `(width, height)` of the image at `path`
    async fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;

    /// Crop `bbox` (pixel space) out of `path` and return the derived file
    async fn crop_image(&self, path: &Path, bbox: BoundingBox) -> Result<PathBuf>;
}

/// Adapter set bound to one process (or one session)
#[derive(Clone)]
pub struct Toolbox {
    search: Arc<dyn SearchTool>,
    crop: Arc<dyn CropTool>,
}

impl Toolbox {
    pub fn new(search: Arc<dyn SearchTool>, crop: Arc<dyn CropTool>) -> Self {
        Self { search, crop }
    }

    pub fn search(&self) -> &dyn SearchTool {
        self.search.as_ref()
    }

    pub fn crop(&self) -> &dyn CropTool {
        self.crop.as_ref()
    }

    /// Function declarations for every tool
    pub fn schemas(&self) -> Vec<ToolSchema> {
        ToolKind::ALL.into_iter().map(ToolKind::schema).collect()
    }
}

/// Read a string argument, falling back to `default`
pub fn arg_str<'a>(args: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Read an integer argument leniently.
///
/// Numbers are truncated toward zero and numeric strings are parsed; anything
/// else yields `default`.
#[allow(clippy::cast_possible_truncation)]
pub fn arg_i64(args: &Map<String, Value>, key: &str, default: i64) -> i64 {
    match args.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(default)
        }
        _ => default,
    }
}

/// Crop box from `crop_image` arguments, defaulting to `(0, 0, 100, 100)`
pub fn crop_box_from_args(args: &Map<String, Value>) -> BoundingBox {
    BoundingBox::new(
        arg_i64(args, "box_ymin", 0),
        arg_i64(args, "box_xmin", 0),
        arg_i64(args, "box_ymax", 100),
        arg_i64(args, "box_xmax", 100),
    )
}
