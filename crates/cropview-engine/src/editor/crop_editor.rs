use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::coords::ColorRgba;
use crate::error::RenderError;
use crate::queue::CommandQueue;
use crate::readback::{self, CaptureRegion, PixelFrame};
use crate::render::{ProgramHandle, Renderer, TextureHandle};
use crate::transform::TransformEngine;

use super::command::{EditCommand, PostDrawAction};
use super::{CropHandle, CropSnapshot, Shared};

/// Render-context half of the editor.
///
/// The host drives it: `on_surface_created` once, `on_surface_changed` on
/// every resize, and `draw_frame` whenever a frame is due (typically after
/// `wait_for_redraw` returns). All engine mutations happen inside
/// `draw_frame`, so the coordinate buffers never change mid-draw.
pub struct CropEditor<R: Renderer> {
    renderer: R,
    engine: TransformEngine,
    shared: Arc<Shared>,
    post_draw: CommandQueue<PostDrawAction>,

    program: Option<ProgramHandle>,
    texture: Option<TextureHandle>,
    background: ColorRgba,

    /// Size reported by the host.
    surface_size: (u32, u32),
    /// Size currently applied to the renderer and engine.
    output_size: (u32, u32),
    forced_size: Option<(u32, u32)>,
}

impl<R: Renderer> CropEditor<R> {
    pub fn new(renderer: R, config: EngineConfig) -> (Self, CropHandle) {
        let background = config.background;
        let capture_timeout = config.capture_timeout;
        let engine = TransformEngine::new(config);
        let snapshot = CropSnapshot {
            state: engine.crop_state(),
            corners: engine.crop_corners(),
            output: (0, 0),
            has_image: false,
            frame: 0,
        };
        let shared = Arc::new(Shared::new(snapshot, capture_timeout));
        let handle = CropHandle::new(Arc::clone(&shared));
        let editor = Self {
            renderer,
            engine,
            shared,
            post_draw: CommandQueue::new(),
            program: None,
            texture: None,
            background,
            surface_size: (0, 0),
            output_size: (0, 0),
            forced_size: None,
        };
        (editor, handle)
    }

    /// Another handle to this editor.
    pub fn handle(&self) -> CropHandle {
        CropHandle::new(Arc::clone(&self.shared))
    }

    // ── surface lifecycle ─────────────────────────────────────────────────

    /// Binds the editor to the calling thread and builds the GPU program.
    pub fn on_surface_created(&mut self) -> Result<(), RenderError> {
        let current = thread::current().id();
        let bound = *self.shared.render_thread.get_or_init(|| current);
        if bound != current {
            log::warn!("surface recreated on {current:?}; render thread stays {bound:?}");
        }

        let program = self.renderer.init_program()?;
        self.renderer.bind_program(program)?;
        self.renderer.set_clear_color(self.background);
        self.program = Some(program);
        log::debug!("surface created, program {}", program.0);
        Ok(())
    }

    /// The host surface was measured at `width x height`.
    pub fn on_surface_changed(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.surface_size = (width, height);
        if self.forced_size.is_some() {
            log::debug!("surface now {width}x{height}; applied after the forced size is released");
            return Ok(());
        }
        self.apply_output_size(width, height)
    }

    fn apply_output_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.renderer.on_output_size_changed(width, height)?;
        self.engine.set_output_size(width, height);
        self.output_size = (width, height);
        Ok(())
    }

    /// Resizes the output while keeping the same texture region under the
    /// crop square. Resizing alone reseeds the transform.
    fn resize_keeping_crop(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let kept = self
            .engine
            .output()
            .is_valid()
            .then(|| self.engine.crop_corners());
        self.apply_output_size(width, height)?;
        if let Some(corners) = kept {
            if let Err(err) = self.engine.set_crop_from_corners(corners) {
                log::warn!("crop not carried over to {width}x{height}: {err}");
            }
        }
        Ok(())
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Applies queued commands, draws, then runs post-draw actions.
    ///
    /// Command failures are reported through their replies (or logged); the
    /// returned error is the draw's own. Pending captures and notifications
    /// receive that same error.
    pub fn draw_frame(&mut self) -> Result<(), RenderError> {
        for cmd in self.shared.commands.drain() {
            self.apply(cmd);
        }

        let drawn = match self.program {
            Some(_) => self.renderer.draw(self.texture, self.engine.buffers()),
            None => Err(RenderError::NoOutput),
        };
        if let Err(err) = &drawn {
            log::warn!("frame not drawn: {err}");
        }

        for action in self.post_draw.drain() {
            self.run_post_draw(action, &drawn);
        }

        if drawn.is_ok() {
            let frame = self.shared.frames() + 1;
            self.shared.publish(CropSnapshot {
                state: self.engine.crop_state(),
                corners: self.engine.crop_corners(),
                output: self.output_size,
                has_image: self.texture.is_some(),
                frame,
            });
        }
        drawn
    }

    fn apply(&mut self, cmd: EditCommand) {
        log::trace!("applying {}", cmd.name());
        match cmd {
            EditCommand::SetScale(factor) => {
                self.engine.set_scale(factor);
            }
            EditCommand::Pan { dx, dy } => self.engine.pan(dx, dy),
            EditCommand::SetRotationAngle(degrees) => self.engine.set_rotation_angle(degrees),
            EditCommand::SetRotation(rotation) => self.engine.set_rotation(rotation),
            EditCommand::RotateStep { clockwise } => self.engine.rotate_step(clockwise),
            EditCommand::SetCrop { corners, reply } => {
                let result = self.engine.set_crop_from_corners(corners);
                if let Err(err) = &result {
                    log::warn!("crop rejected: {err}");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            EditCommand::SetOffsetLimits(limits) => self.engine.set_offset_limits(limits),
            EditCommand::SetImage { image, reply } => match self.renderer.upload_texture(&image) {
                Ok(handle) => {
                    if let Some(old) = self.texture.replace(handle) {
                        self.post_draw.push(PostDrawAction::ReleaseTexture(old));
                    }
                    self.engine.set_image_size(image.width(), image.height());
                    if let Some(reply) = reply {
                        self.post_draw.push(PostDrawAction::Notify(reply));
                    }
                }
                Err(err) => {
                    log::warn!("image upload failed: {err}");
                    if let Some(reply) = reply {
                        let _ = reply.send(Err(err));
                    }
                }
            },
            EditCommand::DeleteImage => {
                if let Some(old) = self.texture.take() {
                    self.post_draw.push(PostDrawAction::ReleaseTexture(old));
                }
            }
            EditCommand::SetBackground(color) => {
                self.background = color;
                self.renderer.set_clear_color(color);
            }
            EditCommand::ForceOutputSize(size) => {
                self.forced_size = size;
                let (w, h) = size.unwrap_or(self.surface_size);
                if w == 0 || h == 0 {
                    return;
                }
                if let Err(err) = self.resize_keeping_crop(w, h) {
                    log::warn!("could not resize output to {w}x{h}: {err}");
                }
            }
            EditCommand::RequestCapture { region, reply } => {
                self.post_draw.push(PostDrawAction::Capture { region, reply });
            }
        }
    }

    fn run_post_draw(&mut self, action: PostDrawAction, drawn: &Result<(), RenderError>) {
        match action {
            PostDrawAction::ReleaseTexture(texture) => self.renderer.release_texture(texture),
            PostDrawAction::Notify(reply) => {
                let _ = reply.send(drawn.clone());
            }
            PostDrawAction::Capture { region, reply } => {
                let result = drawn.clone().and_then(|()| self.read_region(region));
                if reply.send(result).is_err() {
                    log::debug!("capture finished after its caller gave up");
                }
            }
        }
    }

    fn read_region(&mut self, region: CaptureRegion) -> Result<PixelFrame, RenderError> {
        let (w, h) = self.output_size;
        let resolved = region.resolve(w, h, self.renderer.row_order())?;
        readback::capture(&mut self.renderer, resolved)
    }

    // ── redraw scheduling ─────────────────────────────────────────────────

    /// Consumes a pending redraw request, if any.
    pub fn take_redraw_request(&self) -> bool {
        self.shared.redraw_rx.try_recv().is_ok()
    }

    /// Blocks until a redraw is requested or `timeout` elapses.
    pub fn wait_for_redraw(&self, timeout: Duration) -> bool {
        self.shared.redraw_rx.recv_timeout(timeout).is_ok()
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.output_size
    }

    pub fn has_image(&self) -> bool {
        self.texture.is_some()
    }

    /// Releases every GPU resource. Queued commands are dropped, which
    /// disconnects anyone still waiting on a reply.
    pub fn destroy(&mut self) {
        drop(self.shared.commands.drain());
        for action in self.post_draw.drain() {
            if let PostDrawAction::ReleaseTexture(texture) = action {
                self.renderer.release_texture(texture);
            }
        }
        if let Some(texture) = self.texture.take() {
            self.renderer.release_texture(texture);
        }
        self.program = None;
        self.renderer.destroy();
        log::debug!("crop editor destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::FrameBufferCache;
    use crate::coords::Vec2;
    use crate::error::{EditorError, TransformError};
    use crate::readback::RowOrder;
    use crate::transform::{CropCorners, Rotation};
    use image::RgbaImage;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Resize(u32, u32),
        Upload(u32),
        Release(u32),
        Draw(Option<u32>),
        Read,
        Destroy,
    }

    /// Records every call. The "framebuffer" holds `y * width + x` for each
    /// top-down pixel, stored bottom-up like a GL target.
    struct FakeRenderer {
        events: Vec<Event>,
        size: (u32, u32),
        next: u32,
        max_texture: u32,
        live: Vec<u32>,
    }

    impl FakeRenderer {
        fn new() -> Self {
            Self {
                events: Vec::new(),
                size: (0, 0),
                next: 1,
                max_texture: 4096,
                live: Vec::new(),
            }
        }
    }

    impl Renderer for FakeRenderer {
        fn init_program(&mut self) -> Result<ProgramHandle, RenderError> {
            Ok(ProgramHandle(7))
        }

        fn bind_program(&mut self, _program: ProgramHandle) -> Result<(), RenderError> {
            Ok(())
        }

        fn on_output_size_changed(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
            self.size = (width, height);
            self.events.push(Event::Resize(width, height));
            Ok(())
        }

        fn set_clear_color(&mut self, _color: ColorRgba) {}

        fn upload_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle, RenderError> {
            if image.width() > self.max_texture {
                return Err(RenderError::TextureUpload("too wide".into()));
            }
            let id = self.next;
            self.next += 1;
            self.live.push(id);
            self.events.push(Event::Upload(id));
            Ok(TextureHandle(id))
        }

        fn release_texture(&mut self, texture: TextureHandle) {
            self.live.retain(|&t| t != texture.0);
            self.events.push(Event::Release(texture.0));
        }

        fn draw(
            &mut self,
            texture: Option<TextureHandle>,
            _buffers: &FrameBufferCache,
        ) -> Result<(), RenderError> {
            if let Some(t) = texture {
                if !self.live.contains(&t.0) {
                    return Err(RenderError::UnknownTexture(t.0));
                }
            }
            self.events.push(Event::Draw(texture.map(|t| t.0)));
            Ok(())
        }

        fn read_pixels(
            &mut self,
            x: u32,
            y: u32,
            width: u32,
            height: u32,
        ) -> Result<Vec<u32>, RenderError> {
            self.events.push(Event::Read);
            let (fw, fh) = self.size;
            let mut out = Vec::with_capacity((width * height) as usize);
            for row in 0..height {
                let top_down_y = fh - 1 - (y + row);
                for col in 0..width {
                    out.push(top_down_y * fw + x + col);
                }
            }
            Ok(out)
        }

        fn row_order(&self) -> RowOrder {
            RowOrder::BottomUp
        }

        fn destroy(&mut self) {
            self.events.push(Event::Destroy);
        }
    }

    fn editor() -> (CropEditor<FakeRenderer>, CropHandle) {
        let (mut editor, handle) = CropEditor::new(FakeRenderer::new(), EngineConfig::default());
        editor.on_surface_created().unwrap();
        editor.on_surface_changed(8, 6).unwrap();
        (editor, handle)
    }

    /// Runs frames on this (render) thread until `work` finishes on another.
    fn drive<T: Send + 'static>(
        editor: &mut CropEditor<FakeRenderer>,
        work: impl FnOnce() -> T + Send + 'static,
    ) -> T {
        let worker = thread::spawn(work);
        while !worker.is_finished() {
            if editor.wait_for_redraw(Duration::from_millis(5)) {
                let _ = editor.draw_frame();
            }
        }
        worker.join().unwrap()
    }

    // ── commands ──────────────────────────────────────────────────────────

    #[test]
    fn mutations_apply_on_next_frame() {
        let (mut editor, handle) = editor();
        let _ = handle.set_image(RgbaImage::new(16, 12));
        editor.draw_frame().unwrap();

        handle.set_scale(2.0);
        assert_eq!(handle.scale_ratio(), 1.0);
        assert_eq!(editor.engine().scale_ratio(), 1.0);

        editor.draw_frame().unwrap();
        assert!((handle.scale_ratio() - 0.5).abs() < 1e-6);
        assert_eq!(handle.frames_rendered(), 2);
    }

    #[test]
    fn out_of_range_scale_is_ignored() {
        let (mut editor, handle) = editor();
        handle.set_scale(0.5);
        editor.draw_frame().unwrap();
        assert_eq!(handle.scale_ratio(), 1.0);
    }

    #[test]
    fn rotate_steps_are_applied_in_order() {
        let (mut editor, handle) = editor();
        let _ = handle.set_image(RgbaImage::new(16, 12));
        handle.rotate_step(true);
        handle.rotate_step(true);
        handle.rotate_step(false);
        editor.draw_frame().unwrap();
        assert_eq!(handle.rotation(), Rotation::Rotation90);
    }

    #[test]
    fn degenerate_crop_resolves_with_error() {
        let (mut editor, handle) = editor();
        let _ = handle.set_image(RgbaImage::new(16, 12));
        editor.draw_frame().unwrap();
        let before = handle.crop_corners();

        let p = Vec2::new(0.5, 0.5);
        let pending = handle.set_crop(CropCorners::new(p, p, p, p));
        editor.draw_frame().unwrap();

        assert!(matches!(
            pending.try_get(),
            Some(Err(TransformError::NonInvertible { .. }))
        ));
        assert_eq!(handle.crop_corners(), before);
    }

    #[test]
    fn failed_upload_resolves_with_error_and_keeps_old_image() {
        let (mut editor, handle) = editor();
        let _ = handle.set_image(RgbaImage::new(16, 12));
        editor.draw_frame().unwrap();

        editor.renderer.max_texture = 8;
        let pending = handle.set_image(RgbaImage::new(32, 12));
        editor.draw_frame().unwrap();

        assert!(matches!(pending.try_get(), Some(Err(RenderError::TextureUpload(_)))));
        assert_eq!(editor.renderer().events.last(), Some(&Event::Draw(Some(1))));
    }

    #[test]
    fn set_image_resolves_after_draw() {
        let (mut editor, handle) = editor();
        let pending = handle.set_image(RgbaImage::new(16, 12));
        assert!(pending.try_get().is_none());
        editor.draw_frame().unwrap();
        assert_eq!(pending.try_get(), Some(Ok(())));
        assert!(handle.snapshot().has_image);
    }

    // ── textures ──────────────────────────────────────────────────────────

    #[test]
    fn previous_texture_is_released_after_replacement_is_drawn() {
        let (mut editor, handle) = editor();
        let _ = handle.set_image(RgbaImage::new(16, 12));
        editor.draw_frame().unwrap();
        let _ = handle.set_image(RgbaImage::new(10, 10));
        editor.draw_frame().unwrap();

        let events = &editor.renderer().events;
        let drew_second = events.iter().position(|e| *e == Event::Draw(Some(2))).unwrap();
        let released_first = events.iter().position(|e| *e == Event::Release(1)).unwrap();
        assert!(drew_second < released_first);
        assert_eq!(editor.renderer().live, vec![2]);
    }

    #[test]
    fn delete_image_releases_after_draw() {
        let (mut editor, handle) = editor();
        let _ = handle.set_image(RgbaImage::new(16, 12));
        editor.draw_frame().unwrap();
        handle.delete_image();
        editor.draw_frame().unwrap();

        let events = &editor.renderer().events;
        let n = events.len();
        assert_eq!(&events[n - 2..], &[Event::Draw(None), Event::Release(1)]);
        assert!(!editor.has_image());
    }

    #[test]
    fn destroy_releases_everything() {
        let (mut editor, handle) = editor();
        let _ = handle.set_image(RgbaImage::new(16, 12));
        editor.draw_frame().unwrap();
        let pending = handle.set_image(RgbaImage::new(4, 4));
        editor.destroy();

        assert!(editor.renderer().live.is_empty());
        assert_eq!(editor.renderer().events.last(), Some(&Event::Destroy));
        drop(editor);
        assert!(pending.try_get().is_none());
    }

    // ── capture ───────────────────────────────────────────────────────────

    #[test]
    fn capture_on_render_thread_is_invalid() {
        let (mut editor, handle) = editor();
        editor.draw_frame().unwrap();
        assert!(matches!(
            handle.capture(Duration::from_secs(1)),
            Err(EditorError::InvalidState(_))
        ));
    }

    #[test]
    fn capture_before_first_frame_is_invalid() {
        let (_editor, handle) = editor();
        let result = thread::spawn(move || handle.capture(Duration::from_secs(1)))
            .join()
            .unwrap();
        assert!(matches!(result, Err(EditorError::InvalidState(_))));
    }

    #[test]
    fn capture_times_out_without_frames() {
        let (mut editor, handle) = editor();
        editor.draw_frame().unwrap();
        let result = thread::spawn(move || handle.capture(Duration::from_millis(30)))
            .join()
            .unwrap();
        assert_eq!(result, Err(EditorError::Timeout(Duration::from_millis(30))));
    }

    #[test]
    fn capture_returns_top_down_pixels() {
        let (mut editor, handle) = editor();
        editor.draw_frame().unwrap();

        let frame = drive(&mut editor, move || handle.capture(Duration::from_secs(5))).unwrap();
        assert_eq!((frame.width, frame.height), (8, 6));
        let expected: Vec<u32> = (0..48).collect();
        assert_eq!(frame.pixels, expected);
    }

    #[test]
    fn cropped_capture_reads_padded_square() {
        let (mut editor, handle) = editor();
        editor.draw_frame().unwrap();

        let frame = drive(&mut editor, move || {
            handle.capture_cropped(2, 1, Duration::from_secs(5))
        })
        .unwrap();
        assert_eq!((frame.width, frame.height), (4, 4));
        // First row is output row 1, columns 2..6.
        assert_eq!(&frame.pixels[..4], &[10, 11, 12, 13]);
    }

    #[test]
    fn sized_capture_restores_output_size() {
        let (mut editor, handle) = editor();
        editor.draw_frame().unwrap();

        let h = handle.clone();
        let frame = drive(&mut editor, move || h.capture_sized(20, 10, Duration::from_secs(5)))
            .unwrap();
        assert_eq!((frame.width, frame.height), (20, 10));

        editor.draw_frame().unwrap();
        assert_eq!(editor.output_size(), (8, 6));
        assert_eq!(handle.snapshot().output, (8, 6));
        let resizes: Vec<_> = editor
            .renderer()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Resize(..)))
            .cloned()
            .collect();
        assert_eq!(
            resizes,
            vec![Event::Resize(8, 6), Event::Resize(20, 10), Event::Resize(8, 6)]
        );
    }

    #[test]
    fn sized_capture_keeps_the_crop() {
        let (mut editor, handle) = editor();
        let _ = handle.set_image(RgbaImage::new(16, 12));
        handle.set_scale(2.0);
        handle.rotate_step(true);
        editor.draw_frame().unwrap();
        let before = handle.snapshot();

        let h = handle.clone();
        drive(&mut editor, move || h.capture_sized(20, 10, Duration::from_secs(5))).unwrap();
        editor.draw_frame().unwrap();

        let after = handle.snapshot();
        assert_eq!(after.output, (8, 6));
        assert!((after.state.scale_ratio - 0.5).abs() < 1e-4, "{:?}", after.state);
        assert_eq!(after.state.rotation, Rotation::Rotation90);
        assert!(after.state.fine_angle.abs() < 1e-3);
        for (a, b) in before.corners.to_array().iter().zip(after.corners.to_array()) {
            assert!(a.distance(b) < 1e-4, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn forced_size_shows_the_same_region() {
        let (mut editor, handle) = editor();
        let _ = handle.set_image(RgbaImage::new(16, 12));
        handle.set_scale(2.0);
        handle.set_rotation_angle(10.0);
        editor.draw_frame().unwrap();
        let before = editor.engine().crop_corners();

        editor.apply(EditCommand::ForceOutputSize(Some((20, 10))));
        assert_eq!(editor.output_size(), (20, 10));
        let during = editor.engine().crop_corners();
        for (a, b) in before.to_array().iter().zip(during.to_array()) {
            assert!(a.distance(b) < 1e-4, "{a:?} vs {b:?}");
        }
        assert!((editor.engine().rotation_angle() - 10.0).abs() < 1e-2);
    }

    #[test]
    fn surface_change_during_forced_size_is_deferred() {
        let (mut editor, handle) = editor();
        editor.draw_frame().unwrap();
        editor.apply(EditCommand::ForceOutputSize(Some((20, 10))));
        editor.on_surface_changed(12, 12).unwrap();
        assert_eq!(editor.output_size(), (20, 10));
        editor.apply(EditCommand::ForceOutputSize(None));
        assert_eq!(editor.output_size(), (12, 12));
        drop(handle);
    }

    #[test]
    fn concurrent_gestures_are_all_applied() {
        let (mut editor, handle) = editor();
        let _ = handle.set_image(RgbaImage::new(16, 12));
        editor.draw_frame().unwrap();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let h = handle.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        h.pan(0.0, 0.0);
                    }
                    h.rotate_step(true);
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        editor.draw_frame().unwrap();
        // Four quarter turns bring the quadrant back.
        assert_eq!(handle.rotation(), Rotation::Normal);
        assert!(editor.shared.commands.is_empty());
    }

    // ── redraw ────────────────────────────────────────────────────────────

    #[test]
    fn redraw_requests_coalesce() {
        let (editor, handle) = editor();
        handle.request_render();
        handle.request_render();
        handle.pan(1.0, 1.0);
        assert!(editor.take_redraw_request());
        assert!(!editor.take_redraw_request());
    }
}
