use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use ab_glyph::{Font, FontArc, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use neurotest_cache::Atom;
use tiny_skia::{Color, Pixmap, PremultipliedColorU8};
use tracing::debug;

/// Fonts tried in order when none is configured.
pub const FONT_SEARCH_PATHS: &[&str] = &[
    "assets/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub fn load_font(path: &Path) -> Result<FontArc> {
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read font {}", path.display()))?;
    FontArc::try_from_vec(bytes).with_context(|| format!("invalid font file {}", path.display()))
}

/// Loads `preferred`, or the first font from [`FONT_SEARCH_PATHS`] that exists.
pub fn find_font(preferred: Option<&Path>) -> Result<FontArc> {
    if let Some(path) = preferred {
        return load_font(path);
    }
    for candidate in FONT_SEARCH_PATHS {
        let path = Path::new(candidate);
        if path.is_file() {
            debug!(font = %path.display(), "using system font");
            return load_font(path);
        }
    }
    Err(anyhow!(
        "no usable font found; pass --font or set font_path in the config file"
    ))
}

/// Rasterized labels keyed by text and pixel size.
pub(crate) struct TextCache {
    font: FontArc,
    map: HashMap<(Atom, u32), Arc<Pixmap>>,
}

impl TextCache {
    pub(crate) fn new(font: FontArc) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    pub(crate) fn get_or_render(&mut self, atom: Atom, size_px: f32) -> Option<Arc<Pixmap>> {
        let key = (atom, size_px.round() as u32);
        if let Some(p) = self.map.get(&key) {
            return Some(Arc::clone(p));
        }
        let pm = Arc::new(render_text_pixmap(
            &key.0,
            size_px,
            &self.font,
            Color::from_rgba8(255, 255, 255, 255),
        )?);
        self.map.insert(key, Arc::clone(&pm));
        Some(pm)
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

/// Renders one line of text into a tight, premultiplied pixmap.
/// Returns `None` for text without any visible glyph.
pub fn render_text_pixmap(
    text: &str,
    font_size: f32,
    font: &FontArc,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // Layout on a baseline at the ascent.
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    if outlines.is_empty() {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    // New pixmaps are fully transparent.
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();

    let cu = color.to_color_u8();
    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
            let src = [
                (cu.red() as f32 * a) as u8,
                (cu.green() as f32 * a) as u8,
                (cu.blue() as f32 * a) as u8,
                (a * 255.0) as u8,
            ];
            let bg = dst[i];
            let [r, g, b, a] =
                crate::render::blend_over(src, [bg.red(), bg.green(), bg.blue(), bg.alpha()]);
            if let Some(px) = PremultipliedColorU8::from_rgba(r, g, b, a) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}
