/// Every heuristic threshold the decoders rely on, in one tunable place.
///
/// `.VND` files drift between titles: some scenes scroll past the nominal
/// 800x600 screen, some carry hundreds of global-variable slots. The two
/// known corpora disagree on a handful of bounds, so none of them is
/// hardcoded; `Default` is the strict profile validated against the
/// reference corpus and [`ParserLimits::scrollable`] relaxes the
/// coordinate bounds for titles with scrolling scenes.
#[derive(Debug, Clone)]
pub struct ParserLimits {
    /// Pascal string length ceiling; longer declared lengths are treated
    /// as misaligned reads.
    pub max_string_len: usize,
    /// Percentage of control bytes (outside tab/LF/CR) a string may carry
    /// before it is rejected as binary garbage.
    pub max_control_percent: usize,
    /// File slots accepted before the file-table extraction gives up.
    pub max_file_slots: usize,
    /// Declared string length above which a file-table entry is rejected.
    pub max_filename_len: usize,
    /// Byte window past the scene start searched for file-table entries.
    pub file_table_window: usize,
    /// Bytes probed past a stalled file table for a late end signature.
    pub signature_probe_window: usize,
    /// Bytes scanned forward when resynchronizing after zero-length
    /// padding that is not a clean 8-byte block.
    pub padding_resync_window: usize,
    /// Bytes scanned forward when a file-table string read fails.
    pub string_resync_window: usize,
    /// Byte window past the file table searched for the config anchor.
    pub config_search_window: usize,
    /// Command ids above this value terminate script decoding.
    pub script_id_ceiling: u32,
    /// Hotspot count ceiling for the real decoder.
    pub max_object_count: u32,
    /// Command count ceiling per hotspot for the real decoder.
    pub max_commands_per_object: u32,
    /// Point count ceiling per hotspot for the real decoder.
    pub max_point_count: u32,
    /// Absolute coordinate bound for strictly decoded hotspot points.
    pub coord_bound: i64,
    /// Hotspot count ceiling when merely validating a candidate table.
    pub probe_object_count: u32,
    /// Command count ceiling when validating a candidate table.
    pub probe_command_count: u32,
    /// Point count ceiling when validating a candidate table.
    pub probe_point_count: u32,
    /// Objects sampled when validating a candidate hotspot table.
    pub probe_sample_objects: u32,
    /// A raw command count above this triggers the 2-byte realignment
    /// probe; the shifted value must fall below `realign_plausible`.
    pub realign_threshold: u32,
    pub realign_plausible: u32,
    /// Absolute coordinate bound for recovered (orphan) geometry.
    pub recovered_coord_bound: i64,
    /// Point count range accepted by the orphan geometry scanner.
    pub recovered_min_points: u32,
    pub recovered_max_points: u32,
    /// Bytes walked backwards to the start of a printable run before gap
    /// recovery starts collecting.
    pub gap_backtrack: usize,
    /// Longest printable run the gap scanner will collect.
    pub gap_string_max: usize,
    /// Estimated byte footprint of a decoded hotspot, used to keep the
    /// geometry scanner out of already-claimed regions.
    pub hotspot_zone_estimate: usize,
    /// Recovered command fragments closer than this merge into one group.
    pub coalesce_window: usize,
    /// A command group claims the first recovered geometry within this
    /// many bytes after it.
    pub geometry_pair_window: usize,
    /// Tooltip header plausibility bounds.
    pub tooltip_max_kind: u32,
    pub tooltip_max_flag: u32,
    pub tooltip_screen_width: u32,
    pub tooltip_screen_height: u32,
    pub tooltip_min_extent: u32,
    pub tooltip_max_text_len: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        ParserLimits {
            max_string_len: 5000,
            max_control_percent: 10,
            max_file_slots: 500,
            max_filename_len: 500,
            file_table_window: 8192,
            signature_probe_window: 100,
            padding_resync_window: 128,
            string_resync_window: 64,
            config_search_window: 50_000,
            script_id_ceiling: 50_000,
            max_object_count: 5000,
            max_commands_per_object: 200,
            max_point_count: 500,
            coord_bound: 2000,
            probe_object_count: 200,
            probe_command_count: 100,
            probe_point_count: 200,
            probe_sample_objects: 3,
            realign_threshold: 1000,
            realign_plausible: 100,
            recovered_coord_bound: 3000,
            recovered_min_points: 2,
            recovered_max_points: 50,
            gap_backtrack: 500,
            gap_string_max: 2000,
            hotspot_zone_estimate: 200,
            coalesce_window: 1000,
            geometry_pair_window: 2000,
            tooltip_max_kind: 20,
            tooltip_max_flag: 10,
            tooltip_screen_width: 800,
            tooltip_screen_height: 600,
            tooltip_min_extent: 10,
            tooltip_max_text_len: 100,
        }
    }
}

impl ParserLimits {
    /// Profile for titles with scrolling scenes, where legitimate point
    /// coordinates run well past the visible screen.
    pub fn scrollable() -> Self {
        ParserLimits {
            coord_bound: 5000,
            recovered_coord_bound: 5000,
            ..ParserLimits::default()
        }
    }
}
