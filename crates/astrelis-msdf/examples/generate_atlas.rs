//! Atlas Generation Example
//!
//! Builds an MSDF atlas and writes it to disk as a PNG plus a JSON glyph
//! table:
//! - Loading a font from a file, or the built-in sample font
//! - Configuring glyph size, padding, range and edge colouring
//! - Saving with a bottom-left origin for OpenGL-style consumers
//!
//! ## Usage
//! ```bash
//! cargo run -p astrelis-msdf --example generate_atlas -- [FONT.ttf] [CHARSET] [OUT_DIR]
//! ```
//!
//! Without a font path the sample font from `astrelis-test-utils` is used.
//! Set `PUFFIN=1` to serve profiling data on the default puffin port.

use astrelis_core::logging;
use astrelis_core::profiling::{ProfilingBackend, init_profiling};
use astrelis_msdf::{AtlasConfig, ColoringConfig, ColoringMode, YOrigin, generate_atlas, load_font};
use astrelis_test_utils::{SAMPLE_CHARS, sample_font_bytes};

const DEFAULT_OUT_DIR: &str = "target/msdf-atlas";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    if std::env::var_os("PUFFIN").is_some() {
        init_profiling(ProfilingBackend::default());
    }

    let mut args = std::env::args().skip(1);
    let (bytes, name, default_chars) = match args.next() {
        Some(path) => {
            let name = std::path::Path::new(&path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "atlas".to_string());
            (std::fs::read(&path)?, name, printable_ascii())
        }
        None => (sample_font_bytes(), "sample".to_string(), SAMPLE_CHARS.to_string()),
    };
    let chars = args.next().unwrap_or(default_chars);
    let out_dir = args.next().unwrap_or_else(|| DEFAULT_OUT_DIR.to_string());

    let font = load_font(bytes)?;
    let config = AtlasConfig::new(48, 4, 4.0)
        .with_coloring(
            ColoringConfig::default()
                .with_mode(ColoringMode::DistanceBased)
                .with_seed(7),
        )
        .with_correct_overlaps(true);

    let atlas = generate_atlas(&font, &chars, &config)?;
    if !atlas.missing_glyphs.is_empty() {
        tracing::warn!("Font has no glyphs for {:?}", atlas.missing_glyphs);
    }
    for (codepoint, report) in &atlas.uncorrected_overlaps {
        tracing::warn!(
            ?codepoint,
            unresolved = report.unresolved_pairs.len(),
            "Overlap artifacts may remain"
        );
    }

    let (png, json) = atlas.save(&out_dir, &name, YOrigin::Bottom)?;
    println!(
        "{}x{} atlas, {} glyphs\n  {}\n  {}",
        atlas.width,
        atlas.height,
        atlas.glyphs.len(),
        png.display(),
        json.display()
    );
    Ok(())
}

fn printable_ascii() -> String {
    (' '..='~').collect()
}
