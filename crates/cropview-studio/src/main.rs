mod cli;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use cropview_engine::config::EngineConfig;
use cropview_engine::coords::ColorRgba;
use cropview_engine::device::{GpuInit, HeadlessGpu};
use cropview_engine::editor::{CropEditor, CropHandle};
use cropview_engine::geometry::OffsetLimits;
use cropview_engine::logging::{init_logging, LoggingConfig};
use cropview_engine::render::WgpuRenderer;

use cli::Args;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(LoggingConfig::from_verbosity(args.verbosity));

    let image = image::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?
        .into_rgba8();
    log::info!("loaded {} ({}x{})", args.input.display(), image.width(), image.height());

    let (width, height) = (args.view[0], args.view[1]);
    let mut config = EngineConfig::default();
    if let Some([r, g, b]) = args.background {
        config.background = ColorRgba::rgb(r, g, b);
    }
    let timeout = Duration::from_secs(args.timeout_secs);

    let stop = Arc::new(AtomicBool::new(false));
    let (handle, render_thread) = spawn_render_thread(config, width, height, Arc::clone(&stop))?;

    let outcome = edit_and_capture(&args, &handle, image, width, height, timeout);

    stop.store(true, Ordering::Release);
    handle.request_render();
    render_thread
        .join()
        .map_err(|_| anyhow::anyhow!("render thread panicked"))??;

    outcome
}

/// Starts the render context and hands back its control handle once the
/// GPU is ready.
fn spawn_render_thread(
    config: EngineConfig,
    width: u32,
    height: u32,
    stop: Arc<AtomicBool>,
) -> Result<(CropHandle, thread::JoinHandle<Result<()>>)> {
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<CropHandle>>(1);

    let render_thread = thread::Builder::new()
        .name("cropview-render".into())
        .spawn(move || -> Result<()> {
            let setup = || -> Result<CropEditor<WgpuRenderer>> {
                let gpu = HeadlessGpu::new_blocking(GpuInit::default())?;
                let (mut editor, _) = CropEditor::new(WgpuRenderer::new(gpu), config);
                editor.on_surface_created().context("failed to build the quad program")?;
                editor
                    .on_surface_changed(width, height)
                    .context("failed to create the output target")?;
                Ok(editor)
            };

            let mut editor = match setup() {
                Ok(editor) => editor,
                Err(err) => {
                    let msg = format!("{err:#}");
                    let _ = ready_tx.send(Err(err));
                    anyhow::bail!("render thread setup failed: {msg}");
                }
            };
            let _ = ready_tx.send(Ok(editor.handle()));

            while !stop.load(Ordering::Acquire) {
                if editor.wait_for_redraw(FRAME_INTERVAL) {
                    if let Err(err) = editor.draw_frame() {
                        log::error!("frame failed: {err}");
                    }
                }
            }
            editor.destroy();
            Ok(())
        })
        .context("failed to spawn render thread")?;

    let handle = ready_rx
        .recv()
        .context("render thread exited before it was ready")??;
    Ok((handle, render_thread))
}

fn edit_and_capture(
    args: &Args,
    handle: &CropHandle,
    image: image::RgbaImage,
    width: u32,
    height: u32,
    timeout: Duration,
) -> Result<()> {
    handle
        .set_image_and_wait(image, timeout)
        .context("failed to show the image")?;

    if let Some(insets) = &args.insets {
        handle.set_offset_limits(OffsetLimits {
            left: insets[0],
            top: insets[1],
            right: insets[2],
            bottom: insets[3],
            output_width: width as f32,
            output_height: height as f32,
        });
    }
    if let Some(factor) = args.scale {
        handle.set_scale(factor);
    }
    for _ in 0..args.rotate_steps.unsigned_abs() {
        handle.rotate_step(args.rotate_steps > 0);
    }
    if let Some(angle) = args.angle {
        handle.set_rotation_angle(angle);
    }
    if let Some(pan) = &args.pan {
        handle.pan(pan[0], pan[1]);
    }

    let frame = match (&args.capture_size, &args.square) {
        (Some(size), _) => handle.capture_sized(size[0], size[1], timeout),
        (None, Some(square)) => handle.capture_cropped(square[0], square[1], timeout),
        (None, None) => handle.capture(timeout),
    }
    .context("capture failed")?;

    let state = handle.snapshot().state;
    log::info!(
        "crop: scale ratio {:.3}, rotation {:?} {:+.2} deg, center ({:.3}, {:.3})",
        state.scale_ratio,
        state.rotation,
        state.fine_angle,
        state.center.x,
        state.center.y
    );

    let (w, h) = (frame.width, frame.height);
    frame
        .into_rgba_image()
        .context("captured frame has inconsistent dimensions")?
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!("wrote {} ({w}x{h})", args.output.display());
    Ok(())
}
