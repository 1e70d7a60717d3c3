pub mod hand_kind;
pub mod point_system;

pub use hand_kind::HandKind;
pub use point_system::{LINES, PointSystem};
