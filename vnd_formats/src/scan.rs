use crate::limits::ParserLimits;
use crate::reader::VndReader;
use crate::validate::{
    is_empty_slot_marker, is_valid_file_table, SceneDetector, EMPTY_MARKER_LEN,
};

/// Pass 1: a single left-to-right walk marking candidate scene starts.
///
/// At each position, in priority order: installed game-specific
/// detectors, then the empty-slot marker, then the file-table validator.
/// The first match wins and the cursor jumps past the matched structure;
/// otherwise it advances one byte. Each scene's region runs from its
/// offset to the next candidate (or the end of the buffer).
pub fn find_scene_offsets(
    reader: &VndReader<'_>,
    detectors: &[Box<dyn SceneDetector>],
    limits: &ParserLimits,
    log: &mut Vec<String>,
) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut ptr = 0usize;
    let len = reader.len();

    log.push("PHASE 1: scanning for file tables...".to_string());

    'walk: while ptr + 20 < len {
        for detector in detectors {
            if detector.matches(reader, ptr) {
                offsets.push(ptr);
                log.push(format!(
                    "  [{}] scene boundary detected @ 0x{ptr:X}",
                    detector.name()
                ));
                // Nudge forward so the same offset cannot match twice;
                // the scene block parser finds the exact extent.
                ptr += detector.advance();
                continue 'walk;
            }
        }

        if is_empty_slot_marker(reader, ptr) {
            offsets.push(ptr);
            // Jump just past the sentinel; any padding after it belongs
            // to the slot's region.
            ptr += EMPTY_MARKER_LEN;
            continue;
        }

        match is_valid_file_table(reader, ptr, limits) {
            Some(table_end) if table_end > ptr => {
                offsets.push(ptr);
                log.push(format!(
                    "  [+] scene detected @ 0x{ptr:X} (table -> 0x{table_end:X})"
                ));
                ptr = table_end;
            }
            _ => ptr += 1,
        }
    }

    offsets
}
