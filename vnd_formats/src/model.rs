use serde::{Deserialize, Serialize};

/// Outcome of one full parse: the recovered scenes plus the diagnostic
/// log produced alongside them. Serializes to the JSON shape consumed by
/// the viewer and the analysis tooling (camelCase keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub scenes: Vec<ParsedScene>,
    pub logs: Vec<String>,
    pub total_bytes: usize,
}

/// How a scene region was decoded, strictest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMethod {
    /// File table and config anchor both located via the end signature.
    Signature,
    /// No anchor; a structurally valid hotspot table was found by raw scan.
    HeuristicRecovered,
    /// No hotspot structure at all; the region is treated as init script.
    Heuristic,
    /// The 9-byte "Empty" sentinel marking an intentionally vacant slot.
    EmptySlot,
}

/// Rule-based label for a finished scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneType {
    Game,
    GlobalVars,
    Toolbar,
    Options,
    Credits,
    GameOver,
    Empty,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedScene {
    /// Sequential index in the output list (toolbar scenes are skipped).
    pub id: usize,
    pub offset: usize,
    /// Byte span owned by this scene: gap to the next scene's offset, or
    /// to the end of the buffer for the last one.
    pub length: usize,
    pub files: Vec<SceneFile>,
    pub init_script: InitScript,
    pub config: SceneConfig,
    pub hotspots: Vec<Hotspot>,
    pub warnings: Vec<String>,
    pub parse_method: ParseMethod,
    pub scene_type: SceneType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFile {
    /// 1-based position in the decoded file table.
    pub slot: usize,
    pub filename: String,
    pub param: u32,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitScript {
    pub offset: usize,
    pub length: usize,
    pub commands: Vec<InitCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitCommand {
    pub id: u32,
    pub subtype: u32,
    pub param: String,
    pub offset: usize,
    pub is_recovered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfig {
    /// Byte offset of the end signature, or -1 when no anchor was found.
    pub offset: i64,
    pub flag: u32,
    /// Exactly five entries when the anchor was found, empty otherwise.
    pub ints: Vec<u32>,
    pub found_signature: bool,
}

impl SceneConfig {
    pub fn absent() -> Self {
        SceneConfig {
            offset: -1,
            flag: 0,
            ints: Vec::new(),
            found_signature: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// Position in the decoded table, or -1 for recovered hotspots.
    pub index: i64,
    pub offset: usize,
    pub commands: Vec<HotspotCommand>,
    pub geometry: HotspotGeometry,
    pub is_recovered: bool,
    pub is_tooltip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<TooltipInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotCommand {
    pub id: u32,
    pub subtype: u32,
    pub param: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotGeometry {
    pub cursor_id: u32,
    pub point_count: u32,
    pub points: Vec<Point>,
    pub extra_flag: u32,
}

impl HotspotGeometry {
    /// Placeholder for recovered command fragments awaiting coalescence.
    pub fn empty() -> Self {
        HotspotGeometry {
            cursor_id: 0,
            point_count: 0,
            points: Vec::new(),
            extra_flag: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipInfo {
    pub kind: u32,
    pub rect: TooltipRect,
    pub flag: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TooltipRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}
