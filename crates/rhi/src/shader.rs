//! Shader compilation and module management.
//!
//! Shader handling follows the external-compiler model: GLSL source text is
//! read from disk, handed to shaderc, and the resulting SPIR-V words are
//! wrapped in a `VkShaderModule`. Compilation happens at startup (and at
//! pipeline rebuild), never per frame. Modules are only needed until the
//! pipeline is linked; callers drop them right after pipeline creation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::path::Path;
//! use viewer_rhi::device::Device;
//! use viewer_rhi::shader::{Shader, ShaderCompiler, ShaderStage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), viewer_rhi::RhiError> {
//! let compiler = ShaderCompiler::new()?;
//!
//! let vertex_shader = Shader::from_glsl_file(
//!     device.clone(),
//!     &compiler,
//!     Path::new("shaders/model.vert"),
//!     ShaderStage::Vertex,
//!     "main",
//! )?;
//!
//! let stage_info = vertex_shader.stage_create_info();
//! # Ok(())
//! # }
//! ```

use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Shader stage type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader stage - processes each vertex
    Vertex,
    /// Fragment (pixel) shader stage - processes each fragment
    Fragment,
}

impl ShaderStage {
    /// Converts the shader stage to Vulkan shader stage flags.
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    /// Converts the shader stage to the shaderc shader kind.
    pub fn to_shaderc_kind(self) -> shaderc::ShaderKind {
        match self {
            ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
            ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
        }
    }

    /// Returns a human-readable name for the shader stage.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// GLSL-to-SPIR-V compiler.
///
/// Thin wrapper over the shaderc compiler instance. Creating the compiler
/// is not free; callers build one and reuse it for every stage.
pub struct ShaderCompiler {
    compiler: shaderc::Compiler,
}

impl ShaderCompiler {
    /// Creates a new shader compiler.
    ///
    /// # Errors
    ///
    /// Returns an error if the shaderc compiler cannot be initialized.
    pub fn new() -> RhiResult<Self> {
        let compiler = shaderc::Compiler::new()?;
        Ok(Self { compiler })
    }

    /// Compiles GLSL source text into SPIR-V code words.
    ///
    /// # Arguments
    ///
    /// * `source` - The GLSL source text
    /// * `stage` - The shader stage kind
    /// * `input_name` - Name used in compiler diagnostics
    ///
    /// # Errors
    ///
    /// Returns the compiler's error description on compilation failure.
    pub fn compile_glsl(
        &self,
        source: &str,
        stage: ShaderStage,
        input_name: &str,
    ) -> RhiResult<Vec<u32>> {
        let artifact =
            self.compiler
                .compile_into_spirv(source, stage.to_shaderc_kind(), input_name, "main", None)?;

        if artifact.get_num_warnings() > 0 {
            tracing::warn!(
                "Shader '{}' compiled with warnings: {}",
                input_name,
                artifact.get_warning_messages()
            );
        }

        debug!("Compiled {} shader '{}'", stage, input_name);

        Ok(artifact.as_binary().to_vec())
    }
}

/// Vulkan shader module wrapper.
///
/// Manages the lifecycle of a VkShaderModule and provides the stage-create
/// info for pipeline creation.
pub struct Shader {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan shader module handle.
    module: vk::ShaderModule,
    /// Shader stage type.
    stage: ShaderStage,
    /// Entry point function name.
    entry_point: CString,
}

impl Shader {
    /// Creates a shader module by compiling a GLSL source file.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `compiler` - The shader compiler
    /// * `path` - Path to the GLSL source file
    /// * `stage` - The shader stage
    /// * `entry_point` - The entry point function name (typically "main")
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - Compilation fails
    /// - Shader module creation fails
    pub fn from_glsl_file(
        device: Arc<Device>,
        compiler: &ShaderCompiler,
        path: &Path,
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        debug!("Loading {} shader from {:?}", stage, path);

        let source = std::fs::read_to_string(path).map_err(|e| {
            RhiError::ShaderError(format!("Failed to read shader file {:?}: {}", path, e))
        })?;

        let input_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("shader");

        let code = compiler.compile_glsl(&source, stage, input_name)?;

        Self::from_spirv_words(device, &code, stage, entry_point)
    }

    /// Creates a shader module from SPIR-V code words.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry point name contains null bytes or
    /// module creation fails.
    pub fn from_spirv_words(
        device: Arc<Device>,
        code: &[u32],
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(code);

        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        let entry_point_cstring = CString::new(entry_point)
            .map_err(|e| RhiError::ShaderError(format!("Invalid entry point name: {}", e)))?;

        info!(
            "Created {} shader module with entry point '{}'",
            stage, entry_point
        );

        Ok(Self {
            device,
            module,
            stage,
            entry_point: entry_point_cstring,
        })
    }

    /// Returns the Vulkan shader module handle.
    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Returns the shader stage.
    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Creates a pipeline shader stage create info structure.
    ///
    /// The returned structure borrows from this shader and must not outlive
    /// it.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_stage_to_vk_stage() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn test_shader_stage_to_shaderc_kind() {
        assert!(matches!(
            ShaderStage::Vertex.to_shaderc_kind(),
            shaderc::ShaderKind::Vertex
        ));
        assert!(matches!(
            ShaderStage::Fragment.to_shaderc_kind(),
            shaderc::ShaderKind::Fragment
        ));
    }

    #[test]
    fn test_shader_stage_display() {
        assert_eq!(format!("{}", ShaderStage::Vertex), "vertex");
        assert_eq!(format!("{}", ShaderStage::Fragment), "fragment");
    }

    #[test]
    fn test_compile_valid_glsl() {
        let Ok(compiler) = ShaderCompiler::new() else {
            eprintln!("Skipping test: shaderc not available");
            return;
        };

        let source = "#version 450\nvoid main() { gl_Position = vec4(0.0); }\n";
        let code = compiler
            .compile_glsl(source, ShaderStage::Vertex, "test.vert")
            .expect("valid GLSL must compile");

        // SPIR-V magic number
        assert_eq!(code[0], 0x0723_0203);
    }

    #[test]
    fn test_compile_invalid_glsl_is_error() {
        let Ok(compiler) = ShaderCompiler::new() else {
            eprintln!("Skipping test: shaderc not available");
            return;
        };

        let source = "#version 450\nvoid main() { this is not glsl }\n";
        let result = compiler.compile_glsl(source, ShaderStage::Fragment, "test.frag");
        assert!(result.is_err());
    }
}
