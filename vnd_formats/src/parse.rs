use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::classify::infer_scene_type;
use crate::limits::ParserLimits;
use crate::model::{
    Hotspot, HotspotCommand, HotspotGeometry, InitCommand, InitScript, ParseMethod, ParseResult,
    ParsedScene, Point, SceneConfig, SceneFile, SceneType,
};
use crate::reader::VndReader;
use crate::recover::{coalesce_recovered, recover_gap_commands, scan_geometry, scan_tooltips};
use crate::scan::find_scene_offsets;
use crate::validate::{
    has_known_extension, is_empty_slot_marker, is_plain_name, is_valid_hotspot_table,
    looks_like_script_param, perdu_htm_resync, scan_for_hotspot_table, SceneDetector,
    EMPTY_MARKER_LEN, END_SIGNATURE,
};

/// Tuning for one parse run.
pub struct ParseOptions {
    /// Hard cap on the number of segments decoded.
    pub max_scenes: usize,
    pub limits: ParserLimits,
    /// Game-specific boundary rules, consulted ahead of the generic
    /// scanner. Empty by default.
    pub detectors: Vec<Box<dyn SceneDetector>>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_scenes: 100,
            limits: ParserLimits::default(),
            detectors: Vec::new(),
        }
    }
}

/// Parses a whole container image.
///
/// Never fails: damaged regions degrade to weaker parse methods or are
/// skipped with a CRITICAL log line, and whatever was recovered is
/// returned alongside the diagnostic log.
pub fn parse(bytes: &[u8], options: &ParseOptions) -> ParseResult {
    let reader = VndReader::new(bytes);
    let mut logs = Vec::new();

    let offsets = find_scene_offsets(&reader, &options.detectors, &options.limits, &mut logs);

    logs.push(format!(
        "PHASE 2: analyzing {} detected segments.",
        offsets.len()
    ));

    let mut scenes: Vec<ParsedScene> = Vec::new();
    let mut slot_id = 0usize;

    for (i, &start) in offsets.iter().take(options.max_scenes).enumerate() {
        let limit = if i + 1 < offsets.len() {
            offsets[i + 1]
        } else {
            bytes.len()
        };

        let mut scene_log = Vec::new();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            parse_scene_block(&reader, slot_id, start, limit, options, &mut scene_log)
        }));

        match outcome {
            Ok(scene) => {
                if scene.scene_type == SceneType::Toolbar {
                    logs.append(&mut scene_log);
                    logs.push(format!(
                        "  [INFO] toolbar scene at 0x{start:X} excluded from slot numbering"
                    ));
                    continue;
                }
                logs.push(format!(
                    "--- scene #{slot_id} (0x{start:X} -> 0x{limit:X}) ---"
                ));
                logs.append(&mut scene_log);
                scenes.push(scene);
                slot_id += 1;
            }
            Err(panic) => {
                logs.append(&mut scene_log);
                logs.push(format!(
                    "CRITICAL: fatal error on segment {i}: {}",
                    panic_message(&panic)
                ));
            }
        }
    }

    ParseResult {
        scenes,
        logs,
        total_bytes: bytes.len(),
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown error".to_string()
    }
}

struct FileTable {
    files: Vec<SceneFile>,
    end: usize,
    scene_name: Option<String>,
    is_toolbar: bool,
}

fn parse_scene_block(
    reader: &VndReader<'_>,
    id: usize,
    start: usize,
    limit: usize,
    options: &ParseOptions,
    log: &mut Vec<String>,
) -> ParsedScene {
    let limits = &options.limits;

    if is_empty_slot_marker(reader, start) {
        return ParsedScene {
            id,
            offset: start,
            length: EMPTY_MARKER_LEN,
            files: Vec::new(),
            init_script: InitScript {
                offset: start,
                length: 0,
                commands: Vec::new(),
            },
            config: SceneConfig::absent(),
            hotspots: Vec::new(),
            warnings: Vec::new(),
            parse_method: ParseMethod::EmptySlot,
            scene_type: SceneType::Empty,
            scene_name: Some("Empty Slot".to_string()),
        };
    }

    let mut warnings = Vec::new();

    let table = extract_file_table(reader, start, limit, limits, log);
    let mut scene_name = table.scene_name.clone();
    let mut cursor = table.end;

    let anchor = find_config_anchor(reader, cursor, limit, limits);

    let mut parse_method = ParseMethod::Signature;
    let (script_end, mut hotspot_start) = match anchor {
        Some(a) => (a, a),
        None => match scan_for_hotspot_table(reader, cursor, limit, limits) {
            Some(h) => {
                if table.is_toolbar {
                    parse_method = ParseMethod::Signature;
                } else {
                    parse_method = ParseMethod::HeuristicRecovered;
                    warnings.push(format!(
                        "[RECOVERY] hotspot table detected heuristically at 0x{h:X}"
                    ));
                }
                (h, h)
            }
            None => {
                parse_method = ParseMethod::Heuristic;
                warnings.push("no hotspot structure detected, fallback mode".to_string());
                (limit, limit)
            }
        },
    };

    let (mut init_script, cursor_after, label) =
        decode_init_script(reader, cursor, script_end, limits, &options.detectors);
    if label.is_some() {
        scene_name = label;
    }
    cursor = cursor_after;

    let mut config = SceneConfig::absent();
    if let Some(a) = anchor {
        config.found_signature = true;
        config.offset = a as i64;
        config.flag = reader.read_u32(a);
        let mut ptr = a + 4;
        for _ in 0..5 {
            config.ints.push(reader.read_u32(ptr));
            ptr += 4;
        }
        hotspot_start = ptr;
    }

    let (hotspots, hs_end) = if hotspot_start < limit {
        decode_hotspot_table(reader, hotspot_start, limit, limits, log)
    } else {
        (Vec::new(), hotspot_start)
    };

    // Salvage pass over everything the strict decode left behind.
    let tooltip_scan_start = hs_end.min(cursor);
    let mut recovered = scan_tooltips(reader, tooltip_scan_start, limit, limits);
    if !recovered.is_empty() {
        log.push(format!("  [INFO] {} tooltip(s) found", recovered.len()));
    }

    if cursor < script_end {
        recovered.extend(recover_gap_commands(reader, cursor, script_end, limits));
    }

    let final_gap = hs_end;
    if final_gap + 16 < limit {
        recovered.extend(recover_gap_commands(reader, final_gap, limit, limits));
    }

    let geometries = scan_geometry(reader, final_gap, limit, &hotspots, limits, log);
    if !geometries.is_empty() {
        log.push(format!(
            "  [DEEP SCAN] {} orphan geometry structures found",
            geometries.len()
        ));
    }

    let merged = coalesce_recovered(
        recovered,
        geometries,
        hotspots,
        &mut init_script,
        limits,
        log,
    );

    // A title-specific rule may name the scene after its first file.
    if let Some(first) = table.files.first() {
        for detector in &options.detectors {
            if let Some(l) = detector.label(&first.filename) {
                scene_name = Some(l);
            }
        }
    }

    let scene_type = infer_scene_type(id, &table.files, table.is_toolbar);

    ParsedScene {
        id,
        offset: start,
        length: limit - start,
        files: table.files,
        init_script,
        config,
        hotspots: merged,
        warnings,
        parse_method,
        scene_type,
        scene_name,
    }
}

/// Decodes the file table at `start`, riding out the corruption patterns
/// seen in the wild: zero-word padding, a few bytes of garbage before the
/// next entry, and the mangled bytes that follow a "perdu.htm" entry.
fn extract_file_table(
    reader: &VndReader<'_>,
    start: usize,
    limit: usize,
    limits: &ParserLimits,
    log: &mut Vec<String>,
) -> FileTable {
    let mut files = Vec::new();
    let mut slot_index = 1usize;
    let table_limit = limit.min(start + limits.file_table_window);
    let mut cursor = start;
    let mut is_toolbar = false;
    let mut scene_name = None;

    while cursor < table_limit {
        if reader.read_u32(cursor) == END_SIGNATURE {
            break;
        }
        if is_valid_hotspot_table(reader, cursor, limit, limits) {
            log.push(format!(
                "  [INFO] file table end found by valid hotspot structure at 0x{cursor:X}"
            ));
            break;
        }

        let len = reader.read_u32(cursor);
        if len == 0 {
            let param_check = reader.read_u32(cursor + 4);
            if param_check == END_SIGNATURE {
                break;
            }
            if cursor + 8 <= limit && param_check == 0 {
                cursor += 8;
                continue;
            }

            // Zero length with a nonzero second word: padding of odd
            // width, or the start of the init script. Scan a short window
            // for the next plausible entry.
            let mut found_next = false;
            for scan in 1..limits.padding_resync_window {
                let probe = cursor + scan;
                if probe + 4 > limit {
                    break;
                }
                if reader.read_u32(probe) == END_SIGNATURE {
                    cursor = probe;
                    found_next = true;
                    break;
                }
                let possible = reader.read_u32(probe);
                if possible > 0 && possible < 260 {
                    if let Some(check) = reader.try_read_string(probe, limits) {
                        if !check.text.is_empty() {
                            if looks_like_script_param(&check.text) {
                                break;
                            }
                            if is_plain_name(&check.text) || check.text.len() > 3 {
                                log.push(format!(
                                    "  [RECOVERY] skipped {scan} padding bytes at 0x{cursor:X} -> 0x{probe:X}"
                                ));
                                cursor = probe;
                                found_next = true;
                                break;
                            }
                        }
                    }
                }
            }
            if found_next {
                continue;
            }
            break;
        }

        let Some(res) = reader.try_read_string(cursor, limits) else {
            if is_valid_hotspot_table(reader, cursor, limit, limits) {
                log.push(format!(
                    "  [INFO] file table end (on string failure) found by valid hotspot structure at 0x{cursor:X}"
                ));
                break;
            }

            let mut recovered = false;
            for scan in 4..limits.string_resync_window {
                let probe = cursor + scan;
                if probe + 4 > limit {
                    break;
                }
                let possible = reader.read_u32(probe);
                if possible > 0 && possible < 260 {
                    if let Some(check) = reader.try_read_string(probe, limits) {
                        if looks_like_script_param(&check.text) {
                            break;
                        }
                        if check.text.len() > 3 && is_plain_name(&check.text) {
                            log.push(format!(
                                "  [RECOVERY] invalid structure skipped (+{scan} bytes) at 0x{cursor:X} -> 0x{probe:X} (\"{}\")",
                                check.text
                            ));
                            cursor = probe;
                            recovered = true;
                            break;
                        }
                    }
                }
            }
            if recovered {
                continue;
            }
            break;
        };

        let filename = res.text;
        let lower = filename.to_lowercase();
        if lower == "toolbar" {
            is_toolbar = true;
        }

        if lower.contains(" if ") || filename.contains(" = ") || filename.contains(" then ") {
            break;
        }
        if looks_like_script_param(&filename) {
            log.push(format!(
                "  [INFO] table end found by script parameter: \"{filename}\""
            ));
            break;
        }

        let param_offset = res.next;
        if param_offset + 4 > limit {
            break;
        }
        let param = reader.read_u32(param_offset);

        let is_extension = has_known_extension(&lower);
        let is_empty_name = lower == "empty";
        let is_system_name = lower == "toolbar";

        // A bare first entry with no media extension is the scene's
        // display name, not a file.
        if slot_index == 1
            && !is_extension
            && !is_empty_name
            && !is_system_name
            && !filename.is_empty()
        {
            scene_name = Some(filename);
            cursor = param_offset + 4;
            continue;
        }

        files.push(SceneFile {
            slot: slot_index,
            filename,
            param,
            offset: cursor,
        });
        slot_index += 1;
        cursor = param_offset + 4;

        if lower == "perdu.htm" {
            if let Some(resync) = perdu_htm_resync(reader, cursor) {
                let skipped = resync - cursor;
                log.push(format!(
                    "  [FIX] corruption after 'perdu.htm' skipped (+{skipped} bytes), resynced on 'perdu.wav'"
                ));
                cursor = resync;
                continue;
            }
        }

        if files.len() > limits.max_file_slots {
            break;
        }
    }

    FileTable {
        files,
        end: cursor,
        scene_name,
        is_toolbar,
    }
}

/// Locates the config anchor: the LAST end-signature occurrence in the
/// search window that is followed 24 bytes later by a structurally valid
/// hotspot table. Script text routinely embeds stray copies of the
/// signature bytes, so the earliest occurrence is the wrong one to trust.
fn find_config_anchor(
    reader: &VndReader<'_>,
    from: usize,
    limit: usize,
    limits: &ParserLimits,
) -> Option<usize> {
    let search_limit = limit.min(from + limits.config_search_window);
    if search_limit < 4 {
        return None;
    }

    let mut last = None;
    for p in from..search_limit - 4 {
        if reader.read_u8(p) == 0xDB
            && reader.read_u8(p + 1) == 0xFF
            && reader.read_u8(p + 2) == 0xFF
            && reader.read_u8(p + 3) == 0xFF
            && is_valid_hotspot_table(reader, p + 24, search_limit, limits)
        {
            last = Some(p);
        }
    }
    last
}

/// Decodes the init script between the file table and the config anchor.
///
/// Three record shapes coexist: id 1 with a bare u32 value, id 2 with a
/// 7-int zone block, and the general `id, subtype, string, u32` form
/// (with a legacy variant lacking the subtype). Returns the script, the
/// final cursor, and any display name a detector matched in the text.
fn decode_init_script(
    reader: &VndReader<'_>,
    start: usize,
    script_end: usize,
    limits: &ParserLimits,
    detectors: &[Box<dyn SceneDetector>],
) -> (InitScript, usize, Option<String>) {
    let mut script = InitScript {
        offset: start,
        length: 0,
        commands: Vec::new(),
    };
    let mut label = None;
    let mut ptr = start;

    if script_end <= start {
        return (script, ptr, label);
    }
    script.length = script_end - start;

    while ptr + 8 < script_end {
        let cmd_offset = ptr;
        let id = reader.read_u32(ptr);
        ptr += 4;

        if (id == 21 || id == 3) && !detectors.is_empty() {
            if let Some(res) = reader.try_read_string(ptr + 4, limits) {
                for detector in detectors {
                    if let Some(l) = detector.label(&res.text) {
                        label = Some(l);
                    }
                }
            }
        }

        if id > limits.script_id_ceiling {
            break;
        }

        if id == 1
            && reader.read_u32(ptr) < 100_000
            && reader.try_read_string(ptr + 4, limits).is_none()
        {
            let val = reader.read_u32(ptr);
            ptr += 4;
            script.commands.push(InitCommand {
                id,
                subtype: 0,
                param: format!("Val: {val}"),
                offset: cmd_offset,
                is_recovered: false,
            });
            continue;
        }
        if id == 2
            && reader.read_u32(ptr) < 100_000
            && reader.try_read_string(ptr + 4, limits).is_none()
        {
            let mut ints = Vec::with_capacity(7);
            for _ in 0..7 {
                ints.push(reader.read_u32(ptr).to_string());
                ptr += 4;
            }
            script.commands.push(InitCommand {
                id,
                subtype: 0,
                param: format!("Zone: [{}]", ints.join(",")),
                offset: cmd_offset,
                is_recovered: false,
            });
            continue;
        }

        let subtype = reader.read_u32(ptr);
        if let Some(res) = reader.try_read_string(ptr + 4, limits) {
            script.commands.push(InitCommand {
                id,
                subtype,
                param: res.text,
                offset: cmd_offset,
                is_recovered: false,
            });
            // A trailing u32 follows the string.
            ptr = res.next + 4;
        } else if let Some(res) = reader.try_read_string(ptr, limits) {
            // Legacy shape without the subtype field.
            script.commands.push(InitCommand {
                id,
                subtype: 0,
                param: res.text,
                offset: cmd_offset,
                is_recovered: false,
            });
            ptr = res.next + 4;
        } else {
            break;
        }
    }

    (script, ptr, label)
}

/// Decodes the hotspot table at `start`. Returns the decoded hotspots and
/// the final cursor, from which the salvage scans resume.
fn decode_hotspot_table(
    reader: &VndReader<'_>,
    start: usize,
    limit: usize,
    limits: &ParserLimits,
    log: &mut Vec<String>,
) -> (Vec<Hotspot>, usize) {
    let mut hotspots = Vec::new();
    let mut hs_ptr = start;

    let obj_count = reader.read_u32(hs_ptr);
    hs_ptr += 4;
    if obj_count >= limits.max_object_count {
        return (hotspots, hs_ptr);
    }

    'objects: for i in 0..obj_count {
        if hs_ptr >= limit {
            break;
        }

        let hs_offset = hs_ptr;
        let mut cmd_count = reader.read_u32(hs_ptr);

        // A wild count often means a 2-byte padding shift.
        if cmd_count > limits.realign_threshold && hs_ptr + 6 <= limit {
            let aligned = reader.read_u32(hs_ptr + 2);
            if aligned < limits.realign_plausible {
                hs_ptr += 2;
                cmd_count = aligned;
            }
        }
        hs_ptr += 4;

        if cmd_count > limits.max_commands_per_object {
            hs_ptr -= 4;
            break;
        }

        let mut commands = Vec::new();
        let mut cmd_read_error = false;
        for _ in 0..cmd_count {
            if hs_ptr >= limit {
                break;
            }
            let id = reader.read_u32(hs_ptr);
            if id > limits.script_id_ceiling {
                cmd_read_error = true;
                break;
            }
            let subtype = reader.read_u32(hs_ptr + 4);
            match reader.try_read_string(hs_ptr + 8, limits) {
                Some(res) => {
                    commands.push(HotspotCommand {
                        id,
                        subtype,
                        param: res.text,
                    });
                    hs_ptr = res.next;
                }
                None => {
                    cmd_read_error = true;
                    break;
                }
            }
        }
        if cmd_read_error {
            break;
        }

        if hs_ptr + 8 > limit {
            break;
        }
        // The cursor id slot holds label bytes in corrupt tables; any
        // value passes.
        let cursor_id = reader.read_u32(hs_ptr);
        let point_count = reader.read_u32(hs_ptr + 4);
        if point_count > limits.max_point_count {
            break;
        }
        hs_ptr += 8;

        let mut points = Vec::new();
        for _ in 0..point_count {
            if hs_ptr + 8 > limit {
                break;
            }
            let x = reader.read_i32(hs_ptr);
            let y = reader.read_i32(hs_ptr + 4);
            if i64::from(x).abs() > limits.coord_bound || i64::from(y).abs() > limits.coord_bound {
                log.push(format!(
                    "  [WARN] hotspot {i}: coordinates ({x}, {y}) out of bounds, table rejected"
                ));
                break 'objects;
            }
            points.push(Point { x, y });
            hs_ptr += 8;
        }

        // Hybrid layout: some tables store the commands after the
        // geometry. Re-probe when the leading count was zero, allowing 2
        // or 4 bytes of padding before the trailing count.
        if cmd_count == 0 && !points.is_empty() && hs_ptr + 8 < limit {
            let mut potential = reader.read_u32(hs_ptr);
            if potential == 0 && reader.read_u32(hs_ptr + 2) > 0 && reader.read_u32(hs_ptr + 2) < 20
            {
                hs_ptr += 2;
                potential = reader.read_u32(hs_ptr);
            }
            if potential == 0 && reader.read_u32(hs_ptr + 4) > 0 && reader.read_u32(hs_ptr + 4) < 20
            {
                hs_ptr += 4;
                potential = reader.read_u32(hs_ptr);
            }
            if potential > 0 && potential < 20 {
                let next_id = reader.read_u32(hs_ptr + 4);
                if next_id < 50 || next_id == 9999 {
                    hs_ptr += 4;
                    for _ in 0..potential {
                        if hs_ptr >= limit {
                            break;
                        }
                        let id = reader.read_u32(hs_ptr);
                        let subtype = reader.read_u32(hs_ptr + 4);
                        match reader.try_read_string(hs_ptr + 8, limits) {
                            Some(res) => {
                                commands.push(HotspotCommand {
                                    id,
                                    subtype,
                                    param: res.text,
                                });
                                hs_ptr = res.next;
                            }
                            None => break,
                        }
                    }
                }
            }
        }

        let mut extra_flag = 0;
        if hs_ptr + 4 <= limit {
            extra_flag = reader.read_u32(hs_ptr);
            hs_ptr += 4;
        }

        hotspots.push(Hotspot {
            index: i as i64,
            offset: hs_offset,
            commands,
            geometry: HotspotGeometry {
                cursor_id,
                point_count,
                points,
                extra_flag,
            },
            is_recovered: false,
            is_tooltip: false,
            tooltip: None,
        });
    }

    (hotspots, hs_ptr)
}
