//! Rendering orchestration for the model viewer.
//!
//! This crate ties the RHI layer together:
//! - Depth buffer creation with format fallback
//! - The per-frame slot ring and scheduling protocol
//! - The orchestrating [`Renderer`]

pub mod depth_buffer;
pub mod frame;
pub mod renderer;
pub mod ubo;

pub use renderer::Renderer;
