pub mod error;
pub mod geometry;
pub mod hit;
pub mod id;
pub mod model;
pub mod viewport;

pub use error::GeometryError;
pub use hit::{HitTolerance, hit_vertex, hits_at, resolve_topmost};
pub use id::DetectionId;
pub use model::*;
pub use viewport::{ScaleLimits, Viewport};

// Re-export kurbo primitives so downstream crates share one point type
pub use kurbo::{Point, Rect, Size, Vec2};
