pub mod render;
pub mod shapes;
pub mod text;

pub use render::{FrameContent, FrameStats, Renderer, SceneRenderer, SkiaRenderer, instructions};
pub use text::{FONT_SEARCH_PATHS, find_font, load_font, render_text_pixmap};
