//! Background Regeneration Example
//!
//! Shows how a render loop swaps atlases without stalling:
//! - Spawning an `AtlasWorker` with a new configuration
//! - Polling it once per simulated frame while the old atlas stays in use
//! - Swapping in the new atlas when it arrives
//!
//! ## Usage
//! ```bash
//! cargo run -p astrelis-msdf --example background_worker
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use astrelis_core::logging;
use astrelis_msdf::{AtlasConfig, AtlasResult, AtlasWorker, generate_atlas, load_font};
use astrelis_test_utils::{SAMPLE_CHARS, sample_font_bytes};

const FRAME_TIME: Duration = Duration::from_millis(16);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let font = Arc::new(load_font(sample_font_bytes())?);
    let mut current: AtlasResult =
        generate_atlas(&font, SAMPLE_CHARS, &AtlasConfig::new(16, 2, 2.0))?;
    tracing::info!("Starting with a {}x{} atlas", current.width, current.height);

    // The user asked for sharper text: regenerate at a larger size.
    let mut pending = Some(AtlasWorker::spawn(
        font.clone(),
        SAMPLE_CHARS,
        AtlasConfig::new(64, 6, 6.0).with_correct_overlaps(true),
    )?);

    let started = Instant::now();
    let mut frame = 0u32;
    while let Some(worker) = pending.take() {
        match worker.try_take() {
            Ok(result) => {
                current = result?;
                tracing::info!(
                    "Swapped in a {}x{} atlas after {} frames ({:.1?})",
                    current.width,
                    current.height,
                    frame,
                    started.elapsed()
                );
            }
            Err(worker) => {
                // Draw with `current` here.
                frame += 1;
                std::thread::sleep(FRAME_TIME);
                pending = Some(worker);
            }
        }
    }

    println!(
        "Final atlas: {}x{} with {} glyphs",
        current.width,
        current.height,
        current.glyphs.len()
    );
    Ok(())
}
