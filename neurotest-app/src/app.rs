use std::sync::Arc;

use ab_glyph::FontArc;
use anyhow::{Context, Result, anyhow};
use neurotest_render::SkiaRenderer;
use neurotest_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::StdRng;
use tracing::{debug, error, info, trace};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{Fullscreen, Window, WindowId},
};

use crate::keymap::map_key;
use crate::session::{Session, SessionControl};

pub type AppSession = Session<HighPrecisionTimer, StdRng>;

/// Fullscreen window around one [`Session`].
pub struct App {
    title: String,
    session: AppSession,
    /// Handed to the renderer once the window exists.
    font: Option<FontArc>,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    frame_timer: HighPrecisionTimer,
    refresh_rate: Option<f64>,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(title: impl Into<String>, session: AppSession, font: FontArc) -> Self {
        Self {
            title: title.into(),
            session,
            font: Some(font),
            window: None,
            pixels: None,
            renderer: None,
            frame_timer: HighPrecisionTimer::new(),
            refresh_rate: None,
            error: None,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            test = self.session.variant().test_name(),
            "press SPACE to start or ESC to exit"
        );
        event_loop.run_app(&mut self)?;
        self.log_timing();
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;
        self.refresh_rate = monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            refresh_hz = ?self.refresh_rate,
            "display configured"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);

        let font = self
            .font
            .take()
            .context("renderer was already created")?;
        let mut renderer = SkiaRenderer::new(size.width, size.height, font)?;
        let (_, total) = self.session.runner().trial_progress();
        renderer.prepare_run(self.session.variant(), total);
        self.renderer = Some(renderer);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        self.session.tick();

        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };
        let content = self.session.frame_content();
        let stats = renderer.render_frame(&content, pixels.frame_mut(), &mut self.frame_timer)?;

        let t = self.frame_timer.now();
        pixels.render()?;
        trace!(
            present_ms = self.frame_timer.elapsed(t).as_secs_f64() * 1e3,
            clear_ms = stats.clear.as_secs_f64() * 1e3,
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            dirty = stats.dirty_count,
            "frame"
        );

        if let Some(window) = &self.window {
            window.request_redraw();
        }
        Ok(())
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        if let Some(pixels) = self.pixels.as_mut() {
            pixels.resize_surface(size.width, size.height)?;
            pixels.resize_buffer(size.width, size.height)?;
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(size.width, size.height)?;
        }
        debug!(width = size.width, height = size.height, "display resized");
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!(error = %e, "stopping");
        self.error.get_or_insert(e);
        self.exit(event_loop);
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.session.abort();
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        event_loop.exit();
    }

    fn log_timing(&self) {
        let frames = self.frame_timer.calibration_stats();
        if frames.samples == 0 {
            return;
        }
        info!(
            samples = frames.samples,
            avg_ms = frames.average_frame_time_ns / 1e6,
            jitter_ms = frames.jitter_ns / 1e6,
            max_ms = frames.max_frame_time_ns / 1e6,
            "render timing"
        );
        if let Some(renderer) = &self.renderer {
            for (name, s) in renderer.component_stats() {
                debug!(
                    stage = name,
                    avg_ms = s.average_frame_time_ns / 1e6,
                    max_ms = s.max_frame_time_ns / 1e6,
                    "render stage timing"
                );
            }
            debug!(cached_text = renderer.cached_text_count(), "text cache");
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.fail(event_loop, e.context("creating window and surface"));
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let result = match event {
            WindowEvent::CloseRequested => {
                self.exit(event_loop);
                Ok(())
            }
            WindowEvent::RedrawRequested => self.redraw(),
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && !event.repeat =>
            {
                if let PhysicalKey::Code(key) = event.physical_key {
                    let action = map_key(self.session.phase(), self.session.variant(), key);
                    if let Some(action) = action {
                        if self.session.handle_key(action) == SessionControl::Exit {
                            self.exit(event_loop);
                        }
                    }
                }
                Ok(())
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => match self.window.as_ref() {
                Some(window) => {
                    let size = window.inner_size();
                    self.handle_resize(size)
                }
                None => Ok(()),
            },
            _ => Ok(()),
        };
        if let Err(e) = result {
            self.fail(event_loop, e);
        }
    }
}
