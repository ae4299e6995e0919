use encoding_rs::WINDOWS_1252;

use crate::command::CommandKind;
use crate::limits::ParserLimits;
use crate::model::{
    Hotspot, HotspotCommand, HotspotGeometry, InitCommand, InitScript, Point,
};
use crate::reader::VndReader;
use crate::validate::{is_label_shape, looks_like_script_param, try_parse_tooltip};

/// Script keywords that mark a salvaged printable run as engine data
/// rather than coincidental text.
const SCRIPT_KEYWORDS: [&str; 33] = [
    " = ", "if ", "then ", "else", "addbmp", "playavi", "playwave", "playwav", "runprj", "scene",
    "set_var", "inc_var", "dec_var", "rundll", "closedll", "closewav", ".bmp", ".wav", ".avi",
    ".dll", ".vnp", ".htm", "font ", "text", "rgb", "quit", "save", "load", "telep", "sac", "calc",
    "bouteille", "levure",
];

/// An orphaned point-list structure found outside any decoded hotspot,
/// possibly with a label reconstructed from the bytes just before it.
#[derive(Debug, Clone)]
pub struct RecoveredGeometry {
    pub offset: usize,
    pub geometry: HotspotGeometry,
    pub label: Option<String>,
}

/// Sweeps a region for tooltip records. Each match becomes a dedicated
/// tooltip hotspot carrying a synthetic command and a two-point rectangle
/// geometry.
pub fn scan_tooltips(
    reader: &VndReader<'_>,
    start: usize,
    end: usize,
    limits: &ParserLimits,
) -> Vec<Hotspot> {
    let mut tooltips = Vec::new();
    let mut ptr = start;

    while ptr + 28 < end {
        match try_parse_tooltip(reader, ptr, end, limits) {
            Some((tooltip, next)) => {
                let (id, _) = CommandKind::Tooltip.codes();
                tooltips.push(Hotspot {
                    index: -1,
                    offset: ptr,
                    commands: vec![HotspotCommand {
                        id,
                        subtype: tooltip.kind,
                        param: tooltip.text.clone(),
                    }],
                    geometry: HotspotGeometry {
                        cursor_id: 0,
                        point_count: 2,
                        points: vec![
                            Point {
                                x: tooltip.rect.x1 as i32,
                                y: tooltip.rect.y1 as i32,
                            },
                            Point {
                                x: tooltip.rect.x2 as i32,
                                y: tooltip.rect.y2 as i32,
                            },
                        ],
                        extra_flag: tooltip.flag,
                    },
                    is_recovered: true,
                    is_tooltip: true,
                    tooltip: Some(tooltip),
                });
                ptr = next;
            }
            None => ptr += 1,
        }
    }
    tooltips
}

/// Salvages command strings from a byte range that failed strict
/// decoding.
///
/// Walks printable runs; a run is kept when it contains a script keyword,
/// reads like a capitalized sentence, or matches the short-label shape.
/// The 12 bytes before an accepted string are probed for a surviving
/// `(id, subtype, length)` header consistent with the string; failing
/// that, the command type is inferred from the content alone.
pub fn recover_gap_commands(
    reader: &VndReader<'_>,
    start: usize,
    end: usize,
    limits: &ParserLimits,
) -> Vec<Hotspot> {
    let mut items = Vec::new();
    let mut ptr = start;

    // If the range opens mid-string, back up to the start of the run.
    if ptr < reader.len() && (32..=126).contains(&reader.read_u8(ptr)) {
        let backtrack_limit = ptr.saturating_sub(limits.gap_backtrack);
        while ptr > backtrack_limit && (32..=126).contains(&reader.read_u8(ptr - 1)) {
            ptr -= 1;
        }
    }

    while ptr < end {
        let head = reader.read_u8(ptr);
        if head < 32 && head != 0 {
            ptr += 1;
            continue;
        }

        let mut temp = ptr;
        let mut collected: Vec<u8> = Vec::new();
        while temp < reader.len() && collected.len() < limits.gap_string_max {
            let c = reader.read_u8(temp);
            if c == 0 {
                break;
            }
            if c < 32 && c != 9 && c != 10 && c != 13 {
                break;
            }
            collected.push(c);
            temp += 1;
        }

        let text = decode_candidate(&collected);

        if text.chars().count() >= 2 {
            let lower = text.to_lowercase();
            let has_keyword = SCRIPT_KEYWORDS.iter().any(|k| lower.contains(k));
            let looks_like_sentence = text.contains(' ')
                && text.chars().next().is_some_and(|c| {
                    c.is_ascii_uppercase() || c.is_ascii_digit() || ('\u{C0}'..='\u{FF}').contains(&c)
                });
            let looks_like_param = looks_like_script_param(&text);

            if has_keyword || looks_like_sentence || looks_like_param {
                let (start_offset, cmd_id, cmd_sub) =
                    resolve_command_header(reader, ptr, &text);
                items.push(Hotspot {
                    index: -1,
                    offset: start_offset,
                    commands: vec![HotspotCommand {
                        id: cmd_id,
                        subtype: cmd_sub,
                        param: text,
                    }],
                    geometry: HotspotGeometry::empty(),
                    is_recovered: true,
                    is_tooltip: false,
                    tooltip: None,
                });
                ptr = temp;
                continue;
            }
        }

        if temp > ptr {
            ptr = temp;
        } else {
            ptr += 1;
        }
    }
    items
}

/// Runs of three or more bytes decode unconditionally; two-byte runs are
/// kept only when they form a label like "48".
fn decode_candidate(collected: &[u8]) -> String {
    match collected.len() {
        0 | 1 => String::new(),
        2 => {
            let (decoded, _, _) = WINDOWS_1252.decode(collected);
            let s = decoded.into_owned();
            if is_label_shape(&s) {
                s
            } else {
                String::new()
            }
        }
        _ => {
            let (decoded, _, _) = WINDOWS_1252.decode(collected);
            decoded.into_owned()
        }
    }
}

/// Tries to adopt the `(id, subtype, length)` header preceding a
/// salvaged string; an implausible or missing header falls back to
/// content inference.
fn resolve_command_header(reader: &VndReader<'_>, ptr: usize, text: &str) -> (usize, u32, u32) {
    let char_count = text.chars().count();
    let mut start_offset = ptr;
    let mut cmd_id = 9999u32;
    let mut cmd_sub = 0u32;

    if ptr >= 12 {
        let declared = reader.read_u32(ptr - 4) as usize;
        if declared >= char_count && declared < char_count + 100 {
            start_offset = ptr - 12;
            cmd_id = reader.read_u32(start_offset);
            cmd_sub = reader.read_u32(start_offset + 4);
        }
    }
    if cmd_id == 9999 || cmd_id > 10_000 {
        let (id, sub) = CommandKind::infer(text).codes();
        cmd_id = id;
        cmd_sub = sub;
    }
    (start_offset, cmd_id, cmd_sub)
}

/// Scans for orphaned point-list structures in two on-disk shapes:
/// cursor-id-prefixed (`cursor, count, points…, flag`) and compact
/// (`count, points…, flag`). Regions already claimed by decoded hotspots
/// are skipped.
pub fn scan_geometry(
    reader: &VndReader<'_>,
    start: usize,
    end: usize,
    existing: &[Hotspot],
    limits: &ParserLimits,
    log: &mut Vec<String>,
) -> Vec<RecoveredGeometry> {
    let occupied: Vec<(usize, usize)> = existing
        .iter()
        .map(|h| (h.offset, h.offset + limits.hotspot_zone_estimate))
        .collect();

    let mut found = Vec::new();
    let mut ptr = start;

    while ptr + 16 < end {
        if occupied.iter().any(|&(s, e)| ptr >= s && ptr < e) {
            ptr += 1;
            continue;
        }

        let val1 = reader.read_u32(ptr);
        let val2 = reader.read_u32(ptr + 4);
        let val3 = reader.read_i32(ptr + 8);

        // Cursor-id-prefixed shape. A cursor id outside the typical range
        // is tolerated for polygons (3+ points), where corrupt tables
        // often stash label bytes in that slot.
        let cursor_plausible = val1 < 20_000 || val2 >= 3;
        if cursor_plausible
            && val2 >= limits.recovered_min_points
            && val2 < limits.recovered_max_points
            && i64::from(val3).abs() < limits.recovered_coord_bound
        {
            if let Some((points, after)) = read_point_run(reader, ptr + 8, val2, end, limits) {
                let extra_flag = if after + 4 <= end {
                    reader.read_u32(after)
                } else {
                    0
                };
                let label = reconstruct_label(reader, ptr, val1);
                if let Some(ref l) = label {
                    log.push(format!("  [PEEK] label \"{l}\" reconstructed @ 0x{ptr:X}"));
                }
                found.push(RecoveredGeometry {
                    offset: ptr,
                    geometry: HotspotGeometry {
                        cursor_id: val1,
                        point_count: val2,
                        points,
                        extra_flag,
                    },
                    label,
                });
                ptr = after + 4;
                continue;
            }
        }

        // Compact shape: the count comes first and points follow at once.
        let x_cand = reader.read_i32(ptr + 4);
        let y_cand = reader.read_i32(ptr + 8);
        if val1 >= limits.recovered_min_points
            && val1 < limits.recovered_max_points
            && i64::from(x_cand).abs() < limits.recovered_coord_bound
            && i64::from(y_cand).abs() < limits.recovered_coord_bound
        {
            if let Some((points, after)) = read_point_run(reader, ptr + 4, val1, end, limits) {
                let extra_flag = if after + 4 <= end {
                    reader.read_u32(after)
                } else {
                    0
                };
                found.push(RecoveredGeometry {
                    offset: ptr,
                    geometry: HotspotGeometry {
                        cursor_id: 0,
                        point_count: val1,
                        points,
                        extra_flag,
                    },
                    label: None,
                });
                ptr = after + 4;
                continue;
            }
        }

        ptr += 1;
    }
    found
}

fn read_point_run(
    reader: &VndReader<'_>,
    from: usize,
    count: u32,
    end: usize,
    limits: &ParserLimits,
) -> Option<(Vec<Point>, usize)> {
    let size = count as usize * 8;
    if from + size > end {
        return None;
    }
    let mut points = Vec::with_capacity(count as usize);
    let mut ptr = from;
    for _ in 0..count {
        let x = reader.read_i32(ptr);
        let y = reader.read_i32(ptr + 4);
        if i64::from(x).abs() > limits.recovered_coord_bound
            || i64::from(y).abs() > limits.recovered_coord_bound
        {
            return None;
        }
        points.push(Point { x, y });
        ptr += 8;
    }
    Some((points, ptr))
}

/// When a cursor id is a plausible printable character, the bytes just
/// before it often hold the digits of a scene label the table decoder
/// destroyed; digits `"48"` plus char `'i'` rebuild `"48i"`.
fn reconstruct_label(reader: &VndReader<'_>, ptr: usize, cursor_id: u32) -> Option<String> {
    if !(32..=126).contains(&cursor_id) || ptr < 4 {
        return None;
    }
    let cursor_char = cursor_id as u8 as char;
    let mut digits = String::new();
    for back in 1..=4usize {
        let b = reader.read_u8(ptr - back);
        if b.is_ascii_digit() {
            digits.insert(0, b as char);
        } else if b == 0 {
            // NUL padding between the digits and the structure is fine.
        } else {
            break;
        }
    }
    if digits.is_empty() {
        None
    } else {
        Some(format!("{digits}{cursor_char}"))
    }
}

/// Merges recovered fragments into logical hotspots.
///
/// Fragments are grouped by proximity (a font/config fragment forces a
/// new group, since it opens a new on-screen object). Each geometry-less
/// group claims the first unclaimed recovered geometry within the
/// pairing window after it. Groups left without geometry survive as
/// hotspots only when they navigate somewhere; pure logic folds into the
/// init script, and leftover geometries become low-confidence orphans.
pub fn coalesce_recovered(
    mut recovered: Vec<Hotspot>,
    geometries: Vec<RecoveredGeometry>,
    decoded: Vec<Hotspot>,
    init_script: &mut InitScript,
    limits: &ParserLimits,
    log: &mut Vec<String>,
) -> Vec<Hotspot> {
    recovered.sort_by_key(|h| h.offset);

    let mut coalesced: Vec<Hotspot> = Vec::new();
    let mut current: Option<usize> = None;

    for item in recovered {
        if item.is_tooltip || item.geometry.point_count > 0 {
            coalesced.push(item);
            current = None;
            continue;
        }

        if is_structural_start(&item) {
            current = None;
        }

        match current {
            Some(idx) if item.offset - coalesced[idx].offset < limits.coalesce_window => {
                coalesced[idx].commands.extend(item.commands);
            }
            _ => {
                current = Some(coalesced.len());
                coalesced.push(item);
            }
        }
    }

    let mut merged = decoded;
    let mut pool = geometries;

    for mut group in coalesced {
        if group.is_tooltip || group.geometry.point_count > 0 {
            merged.push(group);
            continue;
        }

        let claim = pool.iter().position(|g| {
            g.offset > group.offset && g.offset - group.offset < limits.geometry_pair_window
        });

        if let Some(idx) = claim {
            let geo = pool.remove(idx);
            log.push(format!(
                "  [MERGE] command group @0x{:X} paired with geometry @0x{:X}",
                group.offset, geo.offset
            ));
            group.geometry = geo.geometry;
            merged.push(group);
            continue;
        }

        let has_nav = group
            .commands
            .iter()
            .any(|c| c.subtype == 6 || c.param.to_lowercase().contains("scene "));
        if has_nav {
            merged.push(group);
            continue;
        }

        let is_logic = group.commands.iter().all(|c| {
            if c.id == 3 {
                return true;
            }
            let t = c.param.to_lowercase();
            t.contains(" = ")
                || t.contains(" if ")
                || t.starts_with("run")
                || t.starts_with("set_")
                || t.starts_with("inc_")
        });
        if is_logic {
            for cmd in &group.commands {
                init_script.commands.push(InitCommand {
                    id: cmd.id,
                    subtype: cmd.subtype,
                    param: cmd.param.clone(),
                    offset: group.offset,
                    is_recovered: true,
                });
            }
        } else {
            // Incomplete but interactive-looking: keep it visible.
            merged.push(group);
        }
    }

    for geo in pool {
        let mut commands = Vec::new();
        if let Some(label) = geo.label {
            let (id, subtype) = CommandKind::infer(&label).codes();
            commands.push(HotspotCommand {
                id,
                subtype,
                param: label,
            });
        }
        merged.push(Hotspot {
            index: -1,
            offset: geo.offset,
            commands,
            geometry: geo.geometry,
            is_recovered: true,
            is_tooltip: false,
            tooltip: None,
        });
    }

    merged
}

/// Font/config fragments open a new logical object on screen, so a group
/// in progress must not swallow them.
fn is_structural_start(item: &Hotspot) -> bool {
    item.commands.iter().any(|c| {
        if c.subtype == 39 {
            return true;
        }
        let lower = c.param.to_lowercase();
        lower.contains("comic sans") || lower.contains("arial")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ParserLimits {
        ParserLimits::default()
    }

    fn fragment(offset: usize, id: u32, subtype: u32, param: &str) -> Hotspot {
        Hotspot {
            index: -1,
            offset,
            commands: vec![HotspotCommand {
                id,
                subtype,
                param: param.to_string(),
            }],
            geometry: HotspotGeometry::empty(),
            is_recovered: true,
            is_tooltip: false,
            tooltip: None,
        }
    }

    fn empty_init() -> InitScript {
        InitScript {
            offset: 0,
            length: 0,
            commands: Vec::new(),
        }
    }

    #[test]
    fn recovers_stray_scene_navigation_string() {
        let mut data = vec![0u8; 24];
        data.extend_from_slice(b"scene 5");
        data.extend_from_slice(&[0u8; 24]);

        let reader = VndReader::new(&data);
        let items = recover_gap_commands(&reader, 0, data.len(), &limits());
        assert_eq!(items.len(), 1);
        let cmd = &items[0].commands[0];
        assert_eq!(cmd.id, 3);
        assert_eq!(cmd.subtype, 6);
        assert_eq!(cmd.param, "scene 5");
        assert!(items[0].is_recovered);
        assert_eq!(items[0].index, -1);
    }

    #[test]
    fn adopts_surviving_header_before_string() {
        // [id=3][subtype=21][len=14] "lampe = lampe1"
        let mut data = vec![0u8; 4];
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&21u32.to_le_bytes());
        data.extend_from_slice(&14u32.to_le_bytes());
        let text_at = data.len();
        data.extend_from_slice(b"lampe = lampe1");
        data.extend_from_slice(&[0u8; 16]);

        let reader = VndReader::new(&data);
        let items = recover_gap_commands(&reader, text_at, data.len(), &limits());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].offset, text_at - 12);
        assert_eq!(items[0].commands[0].id, 3);
        assert_eq!(items[0].commands[0].subtype, 21);
    }

    #[test]
    fn ignores_uninteresting_prose() {
        let mut data = vec![0u8; 8];
        data.extend_from_slice(b"zzzz");
        data.extend_from_slice(&[0u8; 8]);
        let reader = VndReader::new(&data);
        let items = recover_gap_commands(&reader, 0, data.len(), &limits());
        assert!(items.is_empty());
    }

    #[test]
    fn keyword_levure_marks_run_as_engine_data() {
        let mut data = vec![0u8; 24];
        data.extend_from_slice(b"prends la levure");
        data.extend_from_slice(&[0u8; 24]);

        let reader = VndReader::new(&data);
        let items = recover_gap_commands(&reader, 0, data.len(), &limits());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].commands[0].param, "prends la levure");
        assert!(items[0].is_recovered);
    }

    #[test]
    fn finds_compact_geometry_shape() {
        // A 2-point run keeps the cursor-prefixed shape from matching one
        // word early (its tolerance needs 3+ points when the id is big).
        let mut data = vec![0xFFu8; 8];
        let geo_at = data.len();
        data.extend_from_slice(&2u32.to_le_bytes()); // count
        for v in [10i32, 20, 200, 20] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&1u32.to_le_bytes()); // extra flag
        data.extend_from_slice(&[0xFFu8; 16]);

        let reader = VndReader::new(&data);
        let mut log = Vec::new();
        let found = scan_geometry(&reader, 0, data.len(), &[], &limits(), &mut log);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].offset, geo_at);
        assert_eq!(found[0].geometry.cursor_id, 0);
        assert_eq!(found[0].geometry.point_count, 2);
        assert_eq!(found[0].geometry.points[1], Point { x: 200, y: 20 });
        assert_eq!(found[0].geometry.extra_flag, 1);
    }

    #[test]
    fn rejects_geometry_with_out_of_bound_points() {
        let mut data = Vec::new();
        data.extend_from_slice(&2u32.to_le_bytes());
        for v in [10i32, 20, 9000, 20] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[0u8; 16]);
        let reader = VndReader::new(&data);
        let mut log = Vec::new();
        let found = scan_geometry(&reader, 0, data.len(), &[], &limits(), &mut log);
        assert!(found.is_empty());
    }

    #[test]
    fn reconstructs_label_from_backward_digit_peek() {
        // digits "48" then cursor id 'i' (0x69) opening a 3-point run
        let mut data = vec![0xFFu8, 0xFF];
        data.extend_from_slice(b"48");
        let geo_at = data.len();
        data.extend_from_slice(&(b'i' as u32).to_le_bytes()); // cursor id
        data.extend_from_slice(&3u32.to_le_bytes()); // point count
        for v in [10i32, 20, 200, 20, 100, 150] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&[0xFFu8; 16]);

        let reader = VndReader::new(&data);
        let mut log = Vec::new();
        let found = scan_geometry(&reader, geo_at, data.len(), &[], &limits(), &mut log);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].label.as_deref(), Some("48i"));
        assert!(log.iter().any(|l| l.contains("48i")));
    }

    #[test]
    fn coalesces_nearby_fragments_into_one_group() {
        let recovered = vec![
            fragment(100, 0, 39, "Comic Sans MS 12"),
            fragment(200, 9999, 0, "Question Bonus"),
            fragment(5000, 3, 21, "score = 0"),
        ];
        let mut init = empty_init();
        let mut log = Vec::new();
        let merged = coalesce_recovered(
            recovered,
            Vec::new(),
            Vec::new(),
            &mut init,
            &limits(),
            &mut log,
        );
        // Fragments at 100 and 200 merge; the distant logic command is
        // geometry-less and folds into the init script.
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].offset, 100);
        assert_eq!(merged[0].commands.len(), 2);
        assert_eq!(init.commands.len(), 1);
        assert!(init.commands[0].is_recovered);
        assert_eq!(init.commands[0].param, "score = 0");
    }

    #[test]
    fn font_fragment_forces_a_new_group() {
        let recovered = vec![
            fragment(100, 0, 39, "Comic Sans MS 12"),
            fragment(150, 9999, 0, "Question Bonus"),
            fragment(300, 0, 39, "Arial 10"),
            fragment(320, 9999, 0, "La Momie"),
        ];
        let mut init = empty_init();
        let mut log = Vec::new();
        let merged = coalesce_recovered(
            recovered,
            Vec::new(),
            Vec::new(),
            &mut init,
            &limits(),
            &mut log,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].commands.len(), 2);
        assert_eq!(merged[1].offset, 300);
        assert_eq!(merged[1].commands.len(), 2);
    }

    #[test]
    fn group_claims_first_geometry_after_it() {
        let recovered = vec![fragment(100, 3, 6, "scene 7")];
        let geometries = vec![
            RecoveredGeometry {
                offset: 50, // before the group: not claimable
                geometry: HotspotGeometry {
                    cursor_id: 1,
                    point_count: 2,
                    points: vec![Point { x: 0, y: 0 }, Point { x: 10, y: 10 }],
                    extra_flag: 0,
                },
                label: None,
            },
            RecoveredGeometry {
                offset: 400,
                geometry: HotspotGeometry {
                    cursor_id: 2,
                    point_count: 2,
                    points: vec![Point { x: 5, y: 5 }, Point { x: 50, y: 50 }],
                    extra_flag: 0,
                },
                label: None,
            },
        ];
        let mut init = empty_init();
        let mut log = Vec::new();
        let merged = coalesce_recovered(
            recovered,
            geometries,
            Vec::new(),
            &mut init,
            &limits(),
            &mut log,
        );
        // The navigation group takes the geometry at 400; the one at 50
        // stays behind as an orphan hotspot.
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].offset, 100);
        assert_eq!(merged[0].geometry.cursor_id, 2);
        assert_eq!(merged[1].offset, 50);
        assert!(merged[1].commands.is_empty());
        assert!(merged[1].is_recovered);
    }

    #[test]
    fn geometry_less_navigation_survives_as_hotspot() {
        let recovered = vec![fragment(100, 3, 6, "scene 7")];
        let mut init = empty_init();
        let mut log = Vec::new();
        let merged = coalesce_recovered(
            recovered,
            Vec::new(),
            Vec::new(),
            &mut init,
            &limits(),
            &mut log,
        );
        assert_eq!(merged.len(), 1);
        assert!(init.commands.is_empty());
    }

    #[test]
    fn orphan_geometry_keeps_its_reconstructed_label() {
        let geometries = vec![RecoveredGeometry {
            offset: 10,
            geometry: HotspotGeometry {
                cursor_id: b'i' as u32,
                point_count: 2,
                points: vec![Point { x: 0, y: 0 }, Point { x: 10, y: 10 }],
                extra_flag: 0,
            },
            label: Some("48i".to_string()),
        }];
        let mut init = empty_init();
        let mut log = Vec::new();
        let merged = coalesce_recovered(
            Vec::new(),
            geometries,
            Vec::new(),
            &mut init,
            &limits(),
            &mut log,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].commands[0].param, "48i");
        assert_eq!(merged[0].commands[0].id, 3);
        assert_eq!(merged[0].commands[0].subtype, 6);
    }

    #[test]
    fn tooltip_scan_emits_tooltip_hotspot() {
        let mut data = vec![0xEEu8; 4];
        let tip_at = data.len();
        for v in [2u32, 100, 100, 300, 160, 1, 9] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(b"La lampe!");
        data.extend_from_slice(&[0xEEu8; 8]);

        let reader = VndReader::new(&data);
        let tips = scan_tooltips(&reader, 0, data.len(), &limits());
        assert_eq!(tips.len(), 1);
        let tip = &tips[0];
        assert_eq!(tip.offset, tip_at);
        assert!(tip.is_tooltip && tip.is_recovered);
        assert_eq!(tip.commands[0].id, 8);
        assert_eq!(tip.commands[0].subtype, 2);
        assert_eq!(tip.geometry.points[1], Point { x: 300, y: 160 });
        assert_eq!(tip.tooltip.as_ref().unwrap().text, "La lampe!");
    }
}
