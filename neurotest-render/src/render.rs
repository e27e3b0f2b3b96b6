use std::collections::HashMap;
use std::time::Duration;

use ab_glyph::FontArc;
use anyhow::{Context, Result, bail};
use bytemuck::{cast_slice, cast_slice_mut};
use neurotest_cache::{Atom, get_text, intern_text, text_count};
use neurotest_core::{
    ArrowDirection, Scene, ScreenSide, SessionPhase, StimulusColor, StimulusType, TestVariant,
};
use neurotest_timing::{CalibrationStats, HighPrecisionTimer, Timer};
use tiny_skia::{Color, Pixmap, Rect};
use tracing::debug;

use crate::shapes;
use crate::text::TextCache;

/// Stroop sizes are authored for a 720 px tall screen.
const DIGIT_SCALE: f32 = 3.0;
const FLANKER_PX: f32 = 140.0;
const NUMBER_PX: f32 = 160.0;
const LABEL_PX: f32 = 32.0;
const SMALL_PX: f32 = 22.0;

#[repr(usize)]
#[derive(Debug, Clone, Copy)]
enum CacheIndex {
    FixationCross = 0,
    ArrowUp = 1,
    ArrowDown = 2,
    ArrowLeft = 3,
    ArrowRight = 4,
    PatchRed = 5,
    PatchBlue = 6,
    FlashCircle = 7,

    PressSpace = 8,
    Complete = 9,
    SubmitFailed = 10,
    RecallQuestion = 11,
    RecallKeys = 12,
    EscHint = 13,
}

impl CacheIndex {
    const STATIC_COUNT: usize = 14;

    fn arrow(direction: ArrowDirection) -> Self {
        match direction {
            ArrowDirection::Up => Self::ArrowUp,
            ArrowDirection::Down => Self::ArrowDown,
            ArrowDirection::Left => Self::ArrowLeft,
            ArrowDirection::Right => Self::ArrowRight,
        }
    }

    fn patch(color: StimulusColor) -> Self {
        match color {
            StimulusColor::Red => Self::PatchRed,
            StimulusColor::Blue => Self::PatchBlue,
        }
    }
}

/// Welcome-screen instructions for each test.
pub fn instructions(variant: TestVariant) -> &'static [&'static str] {
    match variant {
        TestVariant::DigitStroop => &[
            "Compare the VALUES of the two digits, not their size.",
            "LEFT: first is smaller   DOWN: equal   RIGHT: first is larger",
        ],
        TestVariant::GoNoGo => &[
            "Press SPACE as fast as you can when the arrow points UP.",
            "Do nothing when it points down.",
        ],
        TestVariant::SimonEffect => &[
            "Press F for a RED square and J for a BLUE square,",
            "whichever side of the screen it appears on.",
        ],
        TestVariant::FlankerTask => &[
            "Press the arrow key matching the CENTRAL arrow.",
            "Ignore the arrows around it.",
        ],
        TestVariant::DualTask => &[
            "Remember the number, then press SPACE when the red circle flashes.",
            "Afterwards answer 1, 2 or 3, or X if no number was shown.",
        ],
    }
}

pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub dirty_count: usize,
}

/// Everything drawn in one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameContent<'a> {
    pub session: SessionPhase,
    pub scene: Scene<'a>,
    /// (current, total), shown while running.
    pub progress: Option<(usize, usize)>,
    pub debrief: &'a [String],
    pub submission_failed: bool,
}

pub trait Renderer {
    fn clear_dirty(&mut self, dirty: &[Rect]);
    fn blit_cached(&mut self, index: usize, pos: (f32, f32));
    fn blit_text_by_intern_id(&mut self, intern_id: usize, pos: (f32, f32), size_px: f32);
}

pub trait SceneRenderer: Renderer {
    fn render_content(&mut self, content: &FrameContent<'_>) -> Result<()>;
}

pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),

    static_cache: Vec<Option<Pixmap>>,
    text_cache: TextCache,

    instruction_interns: Vec<usize>,
    /// Indexed by the 1-based trial position.
    progress_interns: Vec<usize>,

    canvas: Pixmap,
    dirty_regions: Vec<Rect>,
    first_frame: bool,

    component_timers: HashMap<&'static str, HighPrecisionTimer>,
    clear_buffer: Vec<u8>,
}

fn opaque_canvas(width: u32, height: u32) -> Result<(Pixmap, Vec<u8>)> {
    let mut canvas = Pixmap::new(width, height)
        .with_context(|| format!("cannot allocate a {width}x{height} canvas"))?;
    canvas.fill(Color::BLACK);
    let clear = [0u8, 0, 0, 255].repeat(width as usize * height as usize);
    Ok((canvas, clear))
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: FontArc) -> Result<Self> {
        let (canvas, clear_buffer) = opaque_canvas(width, height)?;
        let mut renderer = SkiaRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            static_cache: vec![None; CacheIndex::STATIC_COUNT],
            text_cache: TextCache::new(font),
            instruction_interns: Vec::new(),
            progress_interns: Vec::new(),
            canvas,
            dirty_regions: Vec::with_capacity(16),
            first_frame: true,
            component_timers: ["draw", "clear", "copy"]
                .into_iter()
                .map(|k| (k, HighPrecisionTimer::new()))
                .collect(),
            clear_buffer,
        };
        renderer.init_cache();
        Ok(renderer)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        let (canvas, clear_buffer) = opaque_canvas(new_width, new_height)?;
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        self.canvas = canvas;
        self.clear_buffer = clear_buffer;
        self.first_frame = true;
        Ok(())
    }

    /// Interns the labels a run of `variant` with `total` trials will show.
    pub fn prepare_run(&mut self, variant: TestVariant, total: usize) {
        self.instruction_interns = instructions(variant)
            .iter()
            .map(|line| intern_text(line))
            .collect();
        self.progress_interns = (0..=total)
            .map(|current| intern_text(&format!("Trial {current}/{total}")))
            .collect();
        for n in 1..=3u8 {
            intern_text(&n.to_string());
        }
        debug!(
            test = variant.test_name(),
            total,
            interned = text_count(),
            "labels prepared"
        );
    }

    fn init_cache(&mut self) {
        let unit = self.height as f32 / 720.0;
        let white = Color::WHITE;

        let fixed = [
            (
                CacheIndex::FixationCross,
                shapes::fixation_cross((40.0 * unit).round() as u32, (3.0 * unit).max(2.0)),
            ),
            (
                CacheIndex::FlashCircle,
                shapes::circle(60.0 * unit, Color::from_rgba8(230, 20, 20, 255)),
            ),
        ];
        for (index, pm) in fixed {
            self.static_cache[index as usize] = pm;
        }
        for direction in [
            ArrowDirection::Up,
            ArrowDirection::Down,
            ArrowDirection::Left,
            ArrowDirection::Right,
        ] {
            self.static_cache[CacheIndex::arrow(direction) as usize] =
                shapes::arrow(direction, 90.0 * unit, white);
        }
        for color in [StimulusColor::Red, StimulusColor::Blue] {
            let [r, g, b, a] = color.rgba();
            self.static_cache[CacheIndex::patch(color) as usize] =
                shapes::square((180.0 * unit) as u32, Color::from_rgba8(r, g, b, a));
        }

        let labels = [
            (CacheIndex::PressSpace, "Press SPACE to begin", LABEL_PX),
            (CacheIndex::Complete, "Test complete. Thank you!", 44.0),
            (
                CacheIndex::SubmitFailed,
                "Results could not be submitted. Please tell the examiner.",
                LABEL_PX,
            ),
            (CacheIndex::RecallQuestion, "Which number did you see?", 44.0),
            (
                CacheIndex::RecallKeys,
                "1      2      3      X = no number",
                LABEL_PX,
            ),
            (CacheIndex::EscHint, "ESC to exit", SMALL_PX),
        ];
        for (index, text, size) in labels {
            self.static_cache[index as usize] = self
                .text_cache
                .get_or_render(Atom::from(text), size * unit)
                .map(|pm| (*pm).clone());
        }
    }

    fn side_position(&self, side: ScreenSide) -> (f32, f32) {
        let x = match side {
            ScreenSide::Left => self.width as f32 * 0.25,
            ScreenSide::Right => self.width as f32 * 0.75,
        };
        (x, self.center.1)
    }

    fn draw_stimulus(&mut self, stimulus: &StimulusType) {
        let (cx, cy) = self.center;
        match stimulus {
            StimulusType::Arrow { direction } => {
                self.blit_cached(CacheIndex::arrow(*direction) as usize, self.center);
            }
            StimulusType::ColorPatch { color, side } => {
                self.blit_cached(
                    CacheIndex::patch(*color) as usize,
                    self.side_position(*side),
                );
            }
            StimulusType::DigitPair {
                num1,
                num2,
                size1,
                size2,
            } => {
                let gap = self.width as f32 * 0.1;
                let first = intern_text(&num1.to_string());
                let second = intern_text(&num2.to_string());
                self.blit_text_by_intern_id(first, (cx - gap, cy), size1 * DIGIT_SCALE);
                self.blit_text_by_intern_id(second, (cx + gap, cy), size2 * DIGIT_SCALE);
            }
            StimulusType::FlankerRow { .. } => {
                if let Some(id) = label_id(stimulus) {
                    self.blit_text_by_intern_id(id, self.center, FLANKER_PX);
                }
            }
            StimulusType::NumberFlash { number, .. } => self.draw_number(*number),
        }
    }

    fn draw_number(&mut self, number: Option<u8>) {
        if let Some(n) = number {
            let id = intern_text(&n.to_string());
            self.blit_text_by_intern_id(id, self.center, NUMBER_PX);
        }
    }

    fn render_scene(&mut self, scene: Scene<'_>) {
        let (cx, cy) = self.center;
        match scene {
            Scene::Blank | Scene::Done => {}
            Scene::Fixation => self.blit_cached(CacheIndex::FixationCross as usize, self.center),
            Scene::Stimulus(stimulus) => self.draw_stimulus(stimulus),
            Scene::DualNumber(number) => self.draw_number(number),
            Scene::ReflexCue {
                side,
                flash_visible,
            } => {
                if flash_visible {
                    self.blit_cached(CacheIndex::FlashCircle as usize, self.side_position(side));
                }
            }
            Scene::RecallPrompt => {
                self.blit_cached(CacheIndex::RecallQuestion as usize, (cx, cy - 50.0));
                self.blit_cached(CacheIndex::RecallKeys as usize, (cx, cy + 50.0));
            }
        }
    }

    /// Draws `content` and presents the changed regions into `frame_buffer`.
    pub fn render_frame<T: Timer>(
        &mut self,
        content: &FrameContent<'_>,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats> {
        if frame_buffer.len() != self.clear_buffer.len() {
            bail!(
                "frame buffer holds {} bytes, expected {} for {}x{}",
                frame_buffer.len(),
                self.clear_buffer.len(),
                self.width,
                self.height
            );
        }
        if self.first_frame {
            self.first_frame = false;
            self.canvas.fill(Color::BLACK);
            frame_buffer.copy_from_slice(&self.clear_buffer);
            self.dirty_regions.clear();
        }

        // Erase last frame's content from the offscreen canvas.
        let old_dirty = std::mem::take(&mut self.dirty_regions);
        let t_clear = {
            let t = timer.now();
            SkiaRenderer::clear_dirty(self, &old_dirty);
            timer.elapsed(t)
        };

        let t_draw = {
            let t = timer.now();
            self.render_content(content)?;
            timer.elapsed(t)
        };

        // Old regions must be presented too so erased content disappears.
        let mut present_rects = old_dirty;
        present_rects.extend_from_slice(&self.dirty_regions);
        coalesce_dirty(&mut present_rects);

        let t_copy = {
            let t = timer.now();
            for rect in &present_rects {
                self.copy_dirty_region(*rect, frame_buffer);
            }
            timer.elapsed(t)
        };

        let total = t_clear + t_draw + t_copy;
        for (key, d) in [("draw", t_draw), ("clear", t_clear), ("copy", t_copy)] {
            if let Some(component) = self.component_timers.get_mut(key) {
                component.record_frame(d);
            }
        }
        timer.record_frame(total);

        Ok(FrameStats {
            clear: t_clear,
            draw: t_draw,
            copy: t_copy,
            total,
            dirty_count: self.dirty_regions.len(),
        })
    }

    /// Per-stage render timings collected so far.
    pub fn component_stats(&self) -> Vec<(&'static str, CalibrationStats)> {
        let mut stats: Vec<_> = self
            .component_timers
            .iter()
            .map(|(k, t)| (*k, t.calibration_stats()))
            .collect();
        stats.sort_by_key(|(k, _)| *k);
        stats
    }

    pub fn cached_text_count(&self) -> usize {
        self.text_cache.len()
    }

    fn copy_dirty_region(&self, dirty: Rect, frame_buffer: &mut [u8]) {
        let Some((x0, y0, x1, y1)) = pixel_bounds(dirty, self.width, self.height) else {
            return;
        };
        let row_bytes = self.width as usize * 4;
        let canvas_data = self.canvas.data();
        for row in y0..y1 {
            let start = row * row_bytes + x0 * 4;
            let end = row * row_bytes + x1 * 4;
            frame_buffer[start..end].copy_from_slice(&canvas_data[start..end]);
        }
    }

    fn push_dirty(&mut self, rect: Option<Rect>) {
        if let Some(rect) = rect {
            self.dirty_regions.push(rect);
        }
    }
}

/// Integer pixel span of `rect` clipped to the canvas.
fn pixel_bounds(rect: Rect, width: u32, height: u32) -> Option<(usize, usize, usize, usize)> {
    let (w, h) = (width as f32, height as f32);
    let x0 = rect.x().floor().clamp(0.0, w) as usize;
    let y0 = rect.y().floor().clamp(0.0, h) as usize;
    let x1 = rect.right().ceil().clamp(0.0, w) as usize;
    let y1 = rect.bottom().ceil().clamp(0.0, h) as usize;
    (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
}

/// Clips `len` cells starting at `start` to `0..limit`.
/// Returns (destination start, source offset, length).
fn clip_span(start: i32, len: i32, limit: i32) -> Option<(usize, usize, usize)> {
    let lo = start.max(0);
    let hi = start.saturating_add(len).min(limit);
    (hi > lo).then(|| (lo as usize, (lo - start) as usize, (hi - lo) as usize))
}

/// Premultiplied source-over for one RGBA pixel.
pub(crate) fn blend_over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let inv = 255 - src[3] as u32;
    let mut out = [0u8; 4];
    for c in 0..4 {
        let v = src[c] as u32 + (dst[c] as u32 * inv + 127) / 255;
        out[c] = v.min(255) as u8;
    }
    out
}

/// Copies `src` centred on `pos` into `canvas`. Returns the touched area.
fn blit_centered(canvas: &mut Pixmap, src: &Pixmap, pos: (f32, f32)) -> Option<Rect> {
    let (cw, ch) = (canvas.width() as usize, canvas.height() as usize);
    let (w, h) = (src.width() as i32, src.height() as i32);
    let x = (pos.0 - w as f32 * 0.5).floor() as i32;
    let y = (pos.1 - h as f32 * 0.5).floor() as i32;
    let (dst_x, src_x, copy_w) = clip_span(x, w, cw as i32)?;
    let (dst_y, src_y, copy_h) = clip_span(y, h, ch as i32)?;

    let sw = src.width() as usize;
    let src_px: &[[u8; 4]] = cast_slice(src.data());
    let dst_px: &mut [[u8; 4]] = cast_slice_mut(canvas.data_mut());

    for row in 0..copy_h {
        let s0 = (src_y + row) * sw + src_x;
        let d0 = (dst_y + row) * cw + dst_x;
        let src_row = &src_px[s0..s0 + copy_w];
        let dst_row = &mut dst_px[d0..d0 + copy_w];
        if src_row.iter().all(|p| p[3] == 255) {
            dst_row.copy_from_slice(src_row);
        } else {
            for (d, s) in dst_row.iter_mut().zip(src_row) {
                *d = blend_over(*s, *d);
            }
        }
    }

    Rect::from_xywh(
        dst_x as f32,
        dst_y as f32,
        copy_w as f32,
        copy_h as f32,
    )
}

/// Merges rects on the same row that touch, after sorting top-left first.
fn coalesce_dirty(rects: &mut Vec<Rect>) {
    rects.sort_by(|a, b| a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x())));
    let mut out: Vec<Rect> = Vec::with_capacity(rects.len());
    for r in rects.drain(..) {
        if let Some(last) = out.last_mut() {
            let same_row =
                (r.y() - last.y()).abs() < 1.0 && (r.height() - last.height()).abs() < 1.0;
            let touching = r.x() <= last.right() + 1.0;
            if same_row && touching {
                let nx = last.x().min(r.x());
                let nx2 = last.right().max(r.right());
                if let Some(merged) = Rect::from_xywh(nx, last.y(), nx2 - nx, last.height()) {
                    *last = merged;
                    continue;
                }
            }
        }
        out.push(r);
    }
    *rects = out;
}

impl Renderer for SkiaRenderer {
    fn clear_dirty(&mut self, dirty: &[Rect]) {
        let stride = self.width as usize * 4;
        let canvas_data = self.canvas.data_mut();
        for rect in dirty {
            let Some((x0, y0, x1, y1)) = pixel_bounds(*rect, self.width, self.height) else {
                continue;
            };
            for y in y0..y1 {
                let start = y * stride + x0 * 4;
                let end = y * stride + x1 * 4;
                canvas_data[start..end].copy_from_slice(&self.clear_buffer[start..end]);
            }
        }
    }

    fn blit_cached(&mut self, index: usize, pos: (f32, f32)) {
        let Some(pixmap) = self.static_cache.get(index).and_then(Option::as_ref) else {
            return;
        };
        let rect = blit_centered(&mut self.canvas, pixmap, pos);
        self.push_dirty(rect);
    }

    fn blit_text_by_intern_id(&mut self, intern_id: usize, pos: (f32, f32), size_px: f32) {
        let Some(text) = get_text(intern_id) else {
            return;
        };
        let Some(pm) = self
            .text_cache
            .get_or_render(Atom::from(text.as_str()), size_px)
        else {
            return;
        };
        let rect = blit_centered(&mut self.canvas, &pm, pos);
        self.push_dirty(rect);
    }
}

impl SceneRenderer for SkiaRenderer {
    fn render_content(&mut self, content: &FrameContent<'_>) -> Result<()> {
        let (cx, cy) = self.center;
        let bottom = self.height as f32 - 40.0;
        match content.session {
            SessionPhase::Welcome => {
                let lines = self.instruction_interns.clone();
                for (i, id) in lines.into_iter().enumerate() {
                    self.blit_text_by_intern_id(id, (cx, cy - 120.0 + i as f32 * 50.0), LABEL_PX);
                }
                self.blit_cached(CacheIndex::PressSpace as usize, (cx, cy + 120.0));
                self.blit_cached(CacheIndex::EscHint as usize, (cx, bottom));
            }
            SessionPhase::Running => {
                self.render_scene(content.scene);
                if let Some((current, _)) = content.progress {
                    if let Some(&id) = self.progress_interns.get(current) {
                        self.blit_text_by_intern_id(id, (90.0, 30.0), SMALL_PX);
                    }
                }
            }
            SessionPhase::Debrief => {
                self.blit_cached(CacheIndex::Complete as usize, (cx, cy - 160.0));
                for (i, line) in content.debrief.iter().enumerate() {
                    let id = intern_text(line);
                    self.blit_text_by_intern_id(id, (cx, cy - 60.0 + i as f32 * 44.0), LABEL_PX);
                }
                if content.submission_failed {
                    self.blit_cached(CacheIndex::SubmitFailed as usize, (cx, cy + 200.0));
                }
                self.blit_cached(CacheIndex::EscHint as usize, (cx, bottom));
            }
        }
        Ok(())
    }
}

/// Intern id of the text drawn for `stimulus`, if it is drawn as text.
fn label_id(stimulus: &StimulusType) -> Option<usize> {
    stimulus.label().map(|label| intern_text(&label))
}
