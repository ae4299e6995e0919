use crate::model::{SceneFile, SceneType};

/// Labels a finished scene from its file list. Rules are ordered from
/// most to least specific; the first match wins.
pub fn infer_scene_type(index: usize, files: &[SceneFile], is_toolbar: bool) -> SceneType {
    let filenames: Vec<String> = files.iter().map(|f| f.filename.to_lowercase()).collect();
    let all = filenames.join(" ");

    // The first slot of a container is the global-variable store when it
    // carries an outsized file list.
    if index == 0 && files.len() > 50 {
        return SceneType::GlobalVars;
    }
    if is_toolbar || filenames.iter().any(|f| f == "toolbar") {
        return SceneType::Toolbar;
    }
    if filenames
        .iter()
        .any(|f| f.contains("vnoption") || f.contains("option.dll"))
    {
        return SceneType::Options;
    }
    if all.contains("credit") || all.contains("générique") {
        return SceneType::Credits;
    }
    if all.contains("perdu")
        || all.contains("gagné")
        || all.contains("fin ")
        || filenames.iter().any(|f| f.starts_with("fin "))
    {
        return SceneType::GameOver;
    }
    // A lone cursor file is decoration, not a playable scene.
    if files.len() == 1 && filenames[0].ends_with(".cur") {
        return SceneType::Unknown;
    }

    SceneType::Game
}
