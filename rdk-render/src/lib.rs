pub mod render;
pub mod view;

pub use render::{CacheIndex, PhaseRenderer, RenderStats, Renderer, Scene, SkiaRenderer};
pub use view::{PanDirection, ViewTransform};
