//! Time-driven animation of the noise sampling domain

pub mod driver;

pub use driver::AnimationDriver;
