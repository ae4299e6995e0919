pub mod classify;
pub mod command;
pub mod limits;
pub mod model;
pub mod parse;
pub mod reader;
pub mod recover;
pub mod scan;
pub mod validate;

pub use command::CommandKind;
pub use limits::ParserLimits;
pub use model::{
    Hotspot, HotspotCommand, HotspotGeometry, InitCommand, InitScript, ParseMethod, ParseResult,
    ParsedScene, Point, SceneConfig, SceneFile, SceneType, TooltipInfo, TooltipRect,
};
pub use parse::{parse, ParseOptions};
pub use reader::{VndFile, VndReader};
pub use validate::{ScriptLiteralDetector, SceneDetector, END_SIGNATURE};
