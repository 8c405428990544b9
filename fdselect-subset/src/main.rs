//! binary FDSelect subset tool
//!
//! Takes a CFF or CFF2 flavored font and a list of glyph ids to retain, and
//! reports (and optionally writes) the FDSelect table of the subset font.

use clap::Parser;
use fdselect_subset::{populate_gids, subset_font_fdselect, FdSelectSubset, Plan};
use skrifa::raw::FontRef;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The input font file.
    #[arg(short, long)]
    path: std::path::PathBuf,

    /// List of glyph ids, e.g. "1,5,7-9" or "*"
    #[arg(short, long)]
    gids: Option<String>,

    /// Where to write the new FDSelect table
    #[arg(short, long)]
    output_file: Option<std::path::PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let gids = match populate_gids(&args.gids.unwrap_or_default()) {
        Ok(gids) => gids,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let font_bytes = match std::fs::read(&args.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", args.path.display());
            std::process::exit(1);
        }
    };
    let font = match FontRef::new(&font_bytes) {
        Ok(font) => font,
        Err(e) => {
            eprintln!("Error reading font bytes: {e}");
            std::process::exit(1);
        }
    };

    let result =
        Plan::from_font(&gids, &font).and_then(|plan| subset_font_fdselect(&font, &plan));
    let (data, fd_map) = match result {
        Ok(FdSelectSubset::Subset {
            format,
            data,
            fd_map,
        }) => {
            println!("FDSelect format {format}, {} bytes", data.len());
            (data, fd_map)
        }
        Ok(FdSelectSubset::Unchanged) => {
            println!("All font DICTs are retained, FDSelect doesn't need to be subset");
            return;
        }
        Ok(FdSelectSubset::Empty) => {
            println!("No glyphs retained, FDSelect is empty");
            return;
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    for (new_fd, old_fd) in fd_map.keys().enumerate() {
        println!("font DICT {old_fd} -> {new_fd}");
    }

    if let Some(output_file) = args.output_file {
        if let Err(e) = std::fs::write(&output_file, data) {
            eprintln!("Failed to write {}: {e}", output_file.display());
            std::process::exit(1);
        }
    }
}
