// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::{parse_normalization, Args};
pub use output::{print_presets, print_summary, RenderSummary};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

use crate::core::audio::{AudioSource, MemoryAudioSource};
use crate::core::view::{OffscreenView, View};
use crate::layer::SpectrogramLayer;

/// Run the CLI
pub fn run(args: Args) -> Result<()> {
    if args.list_presets {
        print_presets();
        return Ok(());
    }
    let input = args.input.clone().context("no input file given")?;

    let config = args.configuration().context("invalid configuration")?;
    let source = MemoryAudioSource::from_wav(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let duration_secs = source.duration_secs();
    let frames = source.frame_count();
    let source: Arc<dyn AudioSource> = Arc::new(source);

    let mut layer = SpectrogramLayer::new(config);
    layer.set_source(Some(Arc::clone(&source)));

    let view = OffscreenView::covering(1, source.start_frame(), frames, args.width, args.height);
    info!(
        "Rendering {} frames at {} frames/pixel into {}x{}",
        frames,
        view.zoom_level(),
        args.width,
        args.height
    );

    let started = Instant::now();
    let (image, passes) = if args.incremental {
        paint_incrementally(&mut layer, &view)
    } else {
        layer.set_synchronous_painting(true);
        (layer.render_image(&view), 1)
    };
    let elapsed = started.elapsed();

    let summary = RenderSummary {
        sample_rate: source.sample_rate(),
        channels: source.channel_count(),
        duration_secs,
        width: args.width,
        height: args.height,
        fft_size: layer.fft_size(),
        window_increment: layer.window_increment(),
        frequency_range: layer.display_extents(),
        passes,
        elapsed,
        magnitudes: layer.magnitude_range(view.id()),
        error: layer.error().map(str::to_string),
    };

    if summary.error.is_none() {
        image
            .save(&args.output)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
    }
    print_summary(&input, &args.output, &summary);

    if args.print_attributes {
        println!("{}", crate::layer::format_attributes(&layer.to_attributes()));
    }
    Ok(())
}

/// Paint with time-budgeted passes until the view stops asking for repaints.
fn paint_incrementally(layer: &mut SpectrogramLayer, view: &OffscreenView) -> (image::RgbaImage, usize) {
    let mut image = image::RgbaImage::new(view.paint_width() as u32, view.paint_height() as u32);
    let pb = ProgressBar::new(view.paint_width() as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} Painting [{bar:40.cyan/blue}] {pos}/{len} columns ({eta})") {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut passes = 0;
    let mut pending = vec![view.paint_rect()];
    while let Some(rect) = pending.pop() {
        let result = layer.paint(view, &mut image, rect);
        passes += 1;
        pb.inc(result.rendered.width.max(0) as u64);
        debug!("pass {}: rendered {:?}", passes, result.rendered);

        pending = view.take_repaint_requests();
    }
    pb.finish_and_clear();
    (image, passes)
}
