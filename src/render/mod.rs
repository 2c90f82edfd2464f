//! GPU-facing side of the generated fields

pub mod context;
pub mod material;
pub mod upload;

pub use context::GpuContext;
pub use material::{MaterialParams, MaterialUniform, MaterialValue};
pub use upload::FieldTextures;
