//! Coordinate filters applied to geometries by the wrapping handler.

pub mod offset;
pub mod wrapping;

pub use offset::OffsetOrdinateFilter;
pub use wrapping::WrappingCoordinateFilter;
