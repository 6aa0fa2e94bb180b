pub mod overlay;
pub mod style;
pub mod text;

pub use overlay::{annotate, display_lines};
pub use style::OverlayStyle;
