use neurotest_core::ArrowDirection;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint
}

/// White plus sign, `size` pixels across.
pub fn fixation_cross(size: u32, thickness: f32) -> Option<Pixmap> {
    let mut pm = Pixmap::new(size, size)?;
    let mut paint = solid(Color::WHITE);
    paint.anti_alias = false;
    let extent = size as f32;
    let h = Rect::from_xywh(0.0, (extent - thickness) * 0.5, extent, thickness)?;
    let v = Rect::from_xywh((extent - thickness) * 0.5, 0.0, thickness, extent)?;
    pm.fill_rect(h, &paint, Transform::identity(), None);
    pm.fill_rect(v, &paint, Transform::identity(), None);
    Some(pm)
}

/// Block arrow with a shaft, pointing `direction`, inside a `2 * half` square.
pub fn arrow(direction: ArrowDirection, half: f32, color: Color) -> Option<Pixmap> {
    let side = (half * 2.0).ceil() as u32;
    let mut pm = Pixmap::new(side, side)?;

    // Right-pointing outline in units of `half`, centred on the origin.
    const OUTLINE: [(f32, f32); 7] = [
        (-1.0, -0.25),
        (0.1, -0.25),
        (0.1, -0.7),
        (1.0, 0.0),
        (0.1, 0.7),
        (0.1, 0.25),
        (-1.0, 0.25),
    ];
    let rotate = |(x, y): (f32, f32)| match direction {
        ArrowDirection::Right => (x, y),
        ArrowDirection::Left => (-x, y),
        ArrowDirection::Up => (y, -x),
        ArrowDirection::Down => (-y, x),
    };

    let mut pb = PathBuilder::new();
    for (i, &p) in OUTLINE.iter().enumerate() {
        let (x, y) = rotate(p);
        let (px, py) = (half + x * half, half + y * half);
        if i == 0 {
            pb.move_to(px, py);
        } else {
            pb.line_to(px, py);
        }
    }
    pb.close();
    pm.fill_path(
        &pb.finish()?,
        &solid(color),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    Some(pm)
}

pub fn square(size: u32, color: Color) -> Option<Pixmap> {
    let mut pm = Pixmap::new(size, size)?;
    pm.fill(color);
    Some(pm)
}

pub fn circle(radius: f32, color: Color) -> Option<Pixmap> {
    let side = (radius * 2.0).ceil() as u32;
    let mut pm = Pixmap::new(side, side)?;
    let path = PathBuilder::from_circle(radius, radius, radius)?;
    pm.fill_path(
        &path,
        &solid(color),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    Some(pm)
}
