mod canvas;
mod render;

pub use canvas::DrawingSurface;
pub use render::{render_tick, RenderLoop};
