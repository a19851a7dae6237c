pub mod config;
pub mod constants;
pub mod core;
pub mod engine;
pub mod grading;
pub mod native;
pub mod remote;

#[cfg(test)]
mod stubs;

pub use engine::Engine;
