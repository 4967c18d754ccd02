pub mod face;
pub mod photos;
