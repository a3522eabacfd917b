//! RHI-specific error types.
//!
//! Swapchain staleness (out-of-date / suboptimal surfaces) is deliberately
//! not represented here: those conditions are classified from the raw
//! `vk::Result` by the frame scheduler and handled by rebuilding, never
//! surfaced as errors. Everything in this enum is fatal to setup or to the
//! frame that hit it.

use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// Failed to load Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    /// Shader compiler error
    #[error("Shader compiler error: {0}")]
    ShaderCompiler(#[from] shaderc::Error),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// No candidate format satisfies the requested features
    #[error("No supported format among candidates: {0}")]
    NoSupportedFormat(String),

    /// Image layout transition with no defined barrier rule
    #[error("Unsupported image layout transition: {0:?} -> {1:?}")]
    UnsupportedLayoutTransition(ash::vk::ImageLayout, ash::vk::ImageLayout),

    /// Shader loading or reflection error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface creation error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Invalid handle or argument error
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
