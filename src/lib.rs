//! Cumulus - procedural volumetric cloud density and light field generation

pub mod core;
pub mod math;
pub mod layer;
pub mod field;
pub mod compute;
pub mod animation;
pub mod generation;
pub mod render;
