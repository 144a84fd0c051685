pub mod common;
pub mod fill;
pub mod image;
pub mod influence;

pub use common::*;
pub use fill::*;
pub use image::*;
pub use influence::*;
