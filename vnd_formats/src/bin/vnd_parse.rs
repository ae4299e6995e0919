//! Recover the scenes of a single `.VND` container and write the decoded
//! JSON next to it, along with the diagnostic log.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use vnd_formats::{ParseOptions, ParserLimits, ScriptLiteralDetector, VndFile};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Input `.VND` container
    path: PathBuf,

    /// Maximum number of scenes to decode
    #[arg(long, default_value_t = 50)]
    max_scenes: usize,

    /// Raise the coordinate bounds for titles with scrollable playfields
    #[arg(long, default_value_t = false)]
    scrollable: bool,

    /// Install the stock script-literal scene detector
    #[arg(long, default_value_t = false)]
    literal_scenes: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let vnd = VndFile::open(&args.path)?;

    let mut options = ParseOptions {
        max_scenes: args.max_scenes,
        ..ParseOptions::default()
    };
    if args.scrollable {
        options.limits = ParserLimits::scrollable();
    }
    if args.literal_scenes {
        options
            .detectors
            .push(Box::new(ScriptLiteralDetector::default()));
    }

    let result = vnd.parse(&options);

    let stem = args
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let json_path = args.path.with_file_name(format!("{stem}_parsed.json"));
    let log_path = args.path.with_file_name(format!("{stem}_logs.txt"));

    let file = File::create(&json_path)
        .with_context(|| format!("creating {}", json_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &result)?;
    writer.flush()?;

    fs::write(&log_path, result.logs.join("\n"))
        .with_context(|| format!("writing {}", log_path.display()))?;

    println!(
        "{}: {} bytes, {} scene(s)",
        args.path.display(),
        result.total_bytes,
        result.scenes.len()
    );
    for scene in &result.scenes {
        println!(
            "  #{:<3} @0x{:06X}  {:<20} files {:>3}  hotspots {:>3}  [{}]",
            scene.id,
            scene.offset,
            scene
                .scene_name
                .as_deref()
                .unwrap_or("-"),
            scene.files.len(),
            scene.hotspots.len(),
            serde_json::to_value(scene.parse_method)?
                .as_str()
                .unwrap_or("?")
        );
    }
    println!("wrote {}", json_path.display());
    println!("wrote {}", log_path.display());

    Ok(())
}
