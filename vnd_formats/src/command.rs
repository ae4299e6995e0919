use crate::validate::looks_like_script_param;

/// The closed set of command meanings the engine is known to use,
/// identified on disk by an `(id, subtype)` pair.
///
/// Strictly decoded commands keep their raw ids; this enum exists for the
/// opposite direction, when gap recovery salvages a bare string and has
/// to reconstruct a plausible header for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// "scene N" navigation, including bare scene labels like "48i".
    SceneNav,
    /// `.wav` sound effect playback.
    AudioFx,
    /// `.avi` video playback.
    Video,
    /// Conditional / assignment script logic.
    ScriptLogic,
    /// runprj / rundll system invocations.
    System,
    /// Direct `.dll` reference.
    Dll,
    /// Font or text configuration.
    FontConfig,
    /// A numeric or positional script parameter.
    ScriptParam,
    /// addbmp / playbmp image display.
    Image,
    /// Bare `.bmp` overlay reference.
    ImageOverlay,
    /// Tooltip record (synthesized during tooltip recovery).
    Tooltip,
    /// Nothing matched; the sentinel id 9999 flags it for review.
    Unknown,
}

impl CommandKind {
    /// The `(id, subtype)` pair written for this kind.
    pub fn codes(self) -> (u32, u32) {
        match self {
            CommandKind::SceneNav => (3, 6),
            CommandKind::AudioFx => (1, 11),
            CommandKind::Video => (1, 9),
            CommandKind::ScriptLogic => (3, 21),
            CommandKind::System => (3, 0),
            CommandKind::Dll => (3, 5),
            CommandKind::FontConfig => (0, 39),
            CommandKind::ScriptParam => (0, 0),
            CommandKind::Image => (0, 24),
            CommandKind::ImageOverlay => (0, 27),
            CommandKind::Tooltip => (8, 0),
            CommandKind::Unknown => (9999, 0),
        }
    }

    /// Classifies a salvaged string. Navigation wins over everything:
    /// a misfiled "scene 12" must stay clickable after recovery.
    pub fn infer(text: &str) -> CommandKind {
        let lower = text.to_lowercase();

        if lower.starts_with("scene ") || lower.contains(" then scene ") {
            return CommandKind::SceneNav;
        }
        if is_scene_label(&lower) {
            return CommandKind::SceneNav;
        }

        if lower.ends_with(".wav") {
            return CommandKind::AudioFx;
        }
        if lower.ends_with(".avi") {
            return CommandKind::Video;
        }
        if lower.contains(" = ") || lower.starts_with("if ") || lower.contains(" then ") {
            return CommandKind::ScriptLogic;
        }
        if lower.starts_with("runprj") || lower.starts_with("rundll") {
            return CommandKind::System;
        }
        if lower.ends_with(".dll") {
            return CommandKind::Dll;
        }
        if lower.starts_with("font ") || lower.contains("comic sans") || lower.contains("arial") {
            return CommandKind::FontConfig;
        }
        if looks_like_script_param(text) && !text.contains('=') {
            return CommandKind::ScriptParam;
        }
        if lower.contains("addbmp") || lower.contains("playbmp") {
            return CommandKind::Image;
        }
        if lower.ends_with(".bmp") {
            return CommandKind::ImageOverlay;
        }
        CommandKind::Unknown
    }
}

/// Bare navigation labels: one or more digits followed by exactly one
/// lowercase letter, e.g. "48i".
fn is_scene_label(lower: &str) -> bool {
    let mut chars = lower.chars().peekable();
    let mut digits = 0;
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            digits += 1;
            chars.next();
        } else {
            break;
        }
    }
    if digits == 0 {
        return false;
    }
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_takes_priority() {
        assert_eq!(CommandKind::infer("scene 5"), CommandKind::SceneNav);
        assert_eq!(
            CommandKind::infer("if score = 3 then scene 12"),
            CommandKind::SceneNav
        );
        assert_eq!(CommandKind::infer("48i"), CommandKind::SceneNav);
        assert_eq!(CommandKind::SceneNav.codes(), (3, 6));
    }

    #[test]
    fn media_extensions_map_to_playback() {
        assert_eq!(CommandKind::infer("ding.wav"), CommandKind::AudioFx);
        assert_eq!(CommandKind::AudioFx.codes(), (1, 11));
        assert_eq!(CommandKind::infer("intro.avi"), CommandKind::Video);
        assert_eq!(CommandKind::Video.codes(), (1, 9));
    }

    #[test]
    fn logic_and_system_forms() {
        assert_eq!(CommandKind::infer("score = 0"), CommandKind::ScriptLogic);
        assert_eq!(
            CommandKind::infer("if lampe then addbmp"),
            CommandKind::ScriptLogic
        );
        assert_eq!(CommandKind::infer("runprj calc.vnp"), CommandKind::System);
        assert_eq!(CommandKind::infer("vnoption.dll"), CommandKind::Dll);
    }

    #[test]
    fn font_and_image_forms() {
        assert_eq!(
            CommandKind::infer("Comic Sans MS 12"),
            CommandKind::FontConfig
        );
        assert_eq!(CommandKind::FontConfig.codes(), (0, 39));
        assert_eq!(CommandKind::infer("addbmp lampe"), CommandKind::Image);
        assert_eq!(CommandKind::infer("fond.bmp"), CommandKind::ImageOverlay);
    }

    #[test]
    fn unknown_gets_the_sentinel_id() {
        assert_eq!(CommandKind::infer("???"), CommandKind::Unknown);
        assert_eq!(CommandKind::Unknown.codes(), (9999, 0));
    }

    #[test]
    fn scene_label_shape() {
        assert!(is_scene_label("48i"));
        assert!(is_scene_label("7b"));
        assert!(!is_scene_label("48"));
        assert!(!is_scene_label("i48"));
        assert!(!is_scene_label("48ii"));
    }
}
