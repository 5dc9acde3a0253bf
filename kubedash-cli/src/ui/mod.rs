pub mod render;
pub mod theme;

pub use render::draw;
pub use theme::Theme;
