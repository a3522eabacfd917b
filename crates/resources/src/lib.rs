//! Asset loading for the model viewer.
//!
//! This crate wraps the external loaders:
//! - OBJ model loading via tobj
//! - Texture image decoding via the image crate
//!
//! Loaders return flat arrays; nothing downstream re-interprets or
//! deduplicates their output.

mod error;
mod model;
mod texture;

pub use error::{ResourceError, ResourceResult};
pub use model::{Model, ModelVertex};
pub use texture::TextureData;
