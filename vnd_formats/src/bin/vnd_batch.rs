//! Walk a directory tree, parse every `.VND` container found, and write a
//! per-file JSON dump plus a one-line summary to stdout.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use vnd_formats::{ParseOptions, ParserLimits, VndFile};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory to scan for `.VND` files
    root: PathBuf,

    /// Directory for the JSON dumps (defaults to alongside each input)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Maximum number of scenes to decode per file
    #[arg(long, default_value_t = 50)]
    max_scenes: usize,

    /// Raise the coordinate bounds for titles with scrollable playfields
    #[arg(long, default_value_t = false)]
    scrollable: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    }

    let mut options = ParseOptions {
        max_scenes: args.max_scenes,
        ..ParseOptions::default()
    };
    if args.scrollable {
        options.limits = ParserLimits::scrollable();
    }

    let mut seen = 0usize;
    let mut failed = 0usize;

    for entry in WalkDir::new(&args.root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let is_vnd = entry
            .path()
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("vnd"));
        if !is_vnd {
            continue;
        }
        seen += 1;

        let vnd = match VndFile::open(entry.path()) {
            Ok(vnd) => vnd,
            Err(err) => {
                eprintln!("{}: {err:#}", entry.path().display());
                failed += 1;
                continue;
            }
        };
        let result = vnd.parse(&options);

        let stem = entry
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let json_name = format!("{stem}_parsed.json");
        let json_path = match &args.out_dir {
            Some(dir) => dir.join(json_name),
            None => entry.path().with_file_name(json_name),
        };

        let file = File::create(&json_path)
            .with_context(|| format!("creating {}", json_path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &result)?;
        writer.flush()?;

        let recovered = result
            .scenes
            .iter()
            .flat_map(|s| s.hotspots.iter())
            .filter(|h| h.is_recovered)
            .count();
        println!(
            "{}: {} scene(s), {} recovered hotspot(s) -> {}",
            entry.path().display(),
            result.scenes.len(),
            recovered,
            json_path.display()
        );
    }

    println!("{seen} container(s) processed, {failed} failed to open");
    Ok(())
}
