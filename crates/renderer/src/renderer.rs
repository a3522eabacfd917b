//! Main renderer orchestration.
//!
//! This module provides the [`Renderer`] struct that owns the whole Vulkan
//! object graph and drives the per-frame loop.
//!
//! # Startup Order
//!
//! 1. Instance and window surface
//! 2. Physical device selection, logical device and queues
//! 3. Swapchain, render pass, depth buffer, framebuffers
//! 4. Shader compilation and the filled/wireframe pipelines
//! 5. Resident buffers and texture (staging uploads)
//! 6. Descriptor sets and the frame scheduler
//!
//! # Resource Destruction Order
//!
//! Teardown always starts with a device idle-wait so no in-flight command
//! references a freed object, then releases resources in reverse
//! acquisition order. `ManuallyDrop` makes that order explicit.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::vk;
use glam::{Vec2, Vec3};
use tracing::{debug, error, info, warn};

use viewer_core::{Config, Timer};
use viewer_platform::{Surface, Window};
use viewer_resources::{Model, TextureData};
use viewer_rhi::buffer::{Buffer, BufferUsage};
use viewer_rhi::command::CommandPool;
use viewer_rhi::descriptor::{
    DescriptorPool, DescriptorSetLayout, combined_image_sampler_binding, uniform_buffer_binding,
    update_descriptor_sets,
};
use viewer_rhi::device::{Device, DeviceFeatureRequest};
use viewer_rhi::instance::Instance;
use viewer_rhi::physical_device::select_physical_device;
use viewer_rhi::pipeline::{
    CullMode, FrontFace, GraphicsPipelineBuilder, Pipeline, PipelineLayout, PolygonMode,
};
use viewer_rhi::render_pass::{Framebuffer, RenderPass};
use viewer_rhi::sampler::Sampler;
use viewer_rhi::shader::{Shader, ShaderCompiler, ShaderStage};
use viewer_rhi::swapchain::Swapchain;
use viewer_rhi::texture::Texture;
use viewer_rhi::vertex::Vertex;
use viewer_rhi::{RhiError, RhiResult};

use crate::depth_buffer::{DepthBuffer, find_depth_format};
use crate::frame::{AcquireOutcome, FrameScheduler};
use crate::ubo::TransformUbo;

/// Per-frame mutable resources, indexed by the scheduler's frame counter.
struct FrameResources {
    /// Persistently mapped uniform buffer, rewritten every frame.
    uniform_buffer: Buffer,
    /// Descriptor set binding this frame's uniform buffer and the texture.
    descriptor_set: vk::DescriptorSet,
}

/// Main renderer owning all Vulkan resources.
pub struct Renderer {
    /// Startup configuration, immutable for the process lifetime.
    config: Config,

    // Core Vulkan resources (destroyed last, in reverse order)
    /// Vulkan instance.
    instance: ManuallyDrop<Instance>,
    /// Logical device; the Arc is released explicitly during teardown so
    /// the device is destroyed before the surface and instance.
    device: ManuallyDrop<Arc<Device>>,
    /// Window surface.
    surface: ManuallyDrop<Surface>,
    /// Swapchain and its image views.
    swapchain: ManuallyDrop<Swapchain>,

    // Presentation-dependent resources (rebuilt on invalidation)
    /// Render pass shared by all pipelines.
    render_pass: ManuallyDrop<RenderPass>,
    /// Depth buffer matching the swapchain extent.
    depth_buffer: ManuallyDrop<DepthBuffer>,
    /// One framebuffer per swapchain image.
    framebuffers: Vec<Framebuffer>,

    // Descriptor resources
    /// Layout: binding 0 transform UBO, binding 1 combined image sampler.
    descriptor_set_layout: ManuallyDrop<DescriptorSetLayout>,
    /// Pool sized to one set per frame slot.
    descriptor_pool: ManuallyDrop<DescriptorPool>,

    // Pipeline resources
    /// Layout shared by both pipelines.
    pipeline_layout: ManuallyDrop<PipelineLayout>,
    /// Filled-polygon pipeline.
    fill_pipeline: ManuallyDrop<Pipeline>,
    /// Wireframe pipeline, present when the device supports non-solid fill.
    wireframe_pipeline: Option<Pipeline>,

    // Resident GPU resources
    /// Texture sampled by the fragment shader.
    texture: ManuallyDrop<Texture>,
    /// Sampler for the texture.
    sampler: ManuallyDrop<Sampler>,
    /// Device-local vertex buffer.
    vertex_buffer: ManuallyDrop<Buffer>,
    /// Device-local index buffer.
    index_buffer: ManuallyDrop<Buffer>,
    /// Number of indices in the index buffer.
    index_count: u32,
    /// Number of vertices in the vertex buffer.
    vertex_count: u32,

    // Per-frame state
    /// Per-frame uniform buffers and descriptor sets.
    frame_resources: Vec<FrameResources>,
    /// Frame slot ring and synchronization.
    scheduler: ManuallyDrop<FrameScheduler>,

    // Cached SPIR-V so pipelines can be rebuilt without recompiling
    vertex_spirv: Vec<u32>,
    fragment_spirv: Vec<u32>,

    /// Wall-clock timer driving the model rotation.
    timer: Timer,
    /// Set by resize events; cleared after a successful rebuild.
    framebuffer_resized: bool,
    /// Current framebuffer width in pixels.
    width: u32,
    /// Current framebuffer height in pixels.
    height: u32,
}

impl Renderer {
    /// Creates a renderer for the given window.
    ///
    /// This builds the entire resource graph and uploads the configured
    /// model and texture.
    ///
    /// # Errors
    ///
    /// Every failure here is setup-fatal: no suitable device, failed
    /// object creation, failed shader compilation, failed asset load. The
    /// caller reports the error and exits.
    pub fn new(window: &Window, config: &Config) -> RhiResult<Self> {
        let (width, height) = window.framebuffer_size();

        info!("Initializing Vulkan renderer ({}x{})", width, height);

        let instance = Instance::new(config.validation, &config.window_title)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical_device_info = select_physical_device(
            instance.handle(),
            surface.handle(),
            surface.loader(),
            config.anisotropic_filter,
            config.choose_gpu_on_startup,
        )?;

        let wireframe_supported = physical_device_info.features.fill_mode_non_solid == vk::TRUE;
        let features = DeviceFeatureRequest {
            sampler_anisotropy: config.anisotropic_filter,
            fill_mode_non_solid: wireframe_supported,
        };

        let device = Device::new(&instance, &physical_device_info, features)?;

        let swapchain = Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            width,
            height,
            config.save_energy,
        )?;

        let depth_format = find_depth_format(instance.handle(), device.physical_device())?;
        let render_pass = RenderPass::new(device.clone(), swapchain.format(), depth_format)?;

        let extent = swapchain.extent();
        let depth_buffer =
            DepthBuffer::new(device.clone(), extent.width, extent.height, depth_format)?;

        let framebuffers =
            Self::create_framebuffers(&device, &render_pass, &swapchain, &depth_buffer)?;

        // Compile shader sources once; the words are kept for pipeline
        // rebuilds, the modules live only until the pipelines are linked.
        let compiler = ShaderCompiler::new()?;
        let vertex_spirv = Self::compile_shader_file(
            &compiler,
            &config.vertex_shader_path,
            ShaderStage::Vertex,
        )?;
        let fragment_spirv = Self::compile_shader_file(
            &compiler,
            &config.fragment_shader_path,
            ShaderStage::Fragment,
        )?;

        let bindings = [
            uniform_buffer_binding(0, vk::ShaderStageFlags::VERTEX),
            combined_image_sampler_binding(1, vk::ShaderStageFlags::FRAGMENT),
        ];
        let descriptor_set_layout = DescriptorSetLayout::new(device.clone(), &bindings)?;

        let pipeline_layout =
            PipelineLayout::new(device.clone(), &[descriptor_set_layout.handle()], &[])?;

        let (fill_pipeline, wireframe_pipeline) = Self::build_pipelines(
            &device,
            &vertex_spirv,
            &fragment_spirv,
            &pipeline_layout,
            &render_pass,
            wireframe_supported,
        )?;

        if config.wireframe && wireframe_pipeline.is_none() {
            warn!("Wireframe requested but the device lacks non-solid fill; drawing filled");
        }

        // One transient pool serves every setup upload, then goes away
        let graphics_family = physical_device_info
            .queue_families
            .graphics_family
            .ok_or_else(|| RhiError::InvalidHandle("graphics queue family unresolved".into()))?;
        let transfer_pool = CommandPool::new_transient(device.clone(), graphics_family)?;

        let (vertex_buffer, index_buffer, vertex_count, index_count) =
            Self::upload_model(&device, &transfer_pool, config)?;

        let texture_data = TextureData::load(&config.texture_path)
            .map_err(|e| RhiError::InvalidHandle(e.to_string()))?;
        let texture = Texture::from_rgba8(
            device.clone(),
            &transfer_pool,
            texture_data.width,
            texture_data.height,
            &texture_data.pixels,
        )?;

        let sampler = Sampler::new(device.clone(), config.anisotropic_filter)?;

        let (descriptor_pool, frame_resources) = Self::create_frame_resources(
            &device,
            &descriptor_set_layout,
            &texture,
            &sampler,
            config.frames_in_flight,
        )?;

        let scheduler = FrameScheduler::new(device.clone(), config.frames_in_flight)?;

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight, {} vertices",
            swapchain.image_count(),
            config.frames_in_flight,
            vertex_count
        );

        Ok(Self {
            config: config.clone(),
            instance: ManuallyDrop::new(instance),
            device: ManuallyDrop::new(device),
            surface: ManuallyDrop::new(surface),
            swapchain: ManuallyDrop::new(swapchain),
            render_pass: ManuallyDrop::new(render_pass),
            depth_buffer: ManuallyDrop::new(depth_buffer),
            framebuffers,
            descriptor_set_layout: ManuallyDrop::new(descriptor_set_layout),
            descriptor_pool: ManuallyDrop::new(descriptor_pool),
            pipeline_layout: ManuallyDrop::new(pipeline_layout),
            fill_pipeline: ManuallyDrop::new(fill_pipeline),
            wireframe_pipeline,
            texture: ManuallyDrop::new(texture),
            sampler: ManuallyDrop::new(sampler),
            vertex_buffer: ManuallyDrop::new(vertex_buffer),
            index_buffer: ManuallyDrop::new(index_buffer),
            index_count,
            vertex_count,
            frame_resources,
            scheduler: ManuallyDrop::new(scheduler),
            vertex_spirv,
            fragment_spirv,
            timer: Timer::new(),
            framebuffer_resized: false,
            width,
            height,
        })
    }

    /// Reads and compiles one GLSL shader file.
    fn compile_shader_file(
        compiler: &ShaderCompiler,
        path: &std::path::Path,
        stage: ShaderStage,
    ) -> RhiResult<Vec<u32>> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            RhiError::ShaderError(format!("Failed to read shader file {:?}: {}", path, e))
        })?;

        let input_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("shader");

        compiler.compile_glsl(&source, stage, input_name)
    }

    /// Builds the filled and (when supported) wireframe pipelines against
    /// one shared render pass and layout.
    ///
    /// The shader modules exist only for the duration of this call.
    fn build_pipelines(
        device: &Arc<Device>,
        vertex_spirv: &[u32],
        fragment_spirv: &[u32],
        layout: &PipelineLayout,
        render_pass: &RenderPass,
        wireframe_supported: bool,
    ) -> RhiResult<(Pipeline, Option<Pipeline>)> {
        let vertex_shader =
            Shader::from_spirv_words(device.clone(), vertex_spirv, ShaderStage::Vertex, "main")?;
        let fragment_shader = Shader::from_spirv_words(
            device.clone(),
            fragment_spirv,
            ShaderStage::Fragment,
            "main",
        )?;

        let fill_pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .cull_mode(CullMode::Back)
            .front_face(FrontFace::CounterClockwise)
            .build(device.clone(), layout, render_pass)?;

        let wireframe_pipeline = if wireframe_supported {
            let pipeline = GraphicsPipelineBuilder::new()
                .vertex_shader(&vertex_shader)
                .fragment_shader(&fragment_shader)
                .vertex_binding(Vertex::binding_description())
                .vertex_attributes(&Vertex::attribute_descriptions())
                .polygon_mode(PolygonMode::Line)
                .cull_mode(CullMode::None)
                .front_face(FrontFace::CounterClockwise)
                .build(device.clone(), layout, render_pass)?;
            Some(pipeline)
        } else {
            None
        };

        // Shader modules are dropped here, right after pipeline linking
        Ok((fill_pipeline, wireframe_pipeline))
    }

    /// Creates one framebuffer per swapchain image.
    fn create_framebuffers(
        device: &Arc<Device>,
        render_pass: &RenderPass,
        swapchain: &Swapchain,
        depth_buffer: &DepthBuffer,
    ) -> RhiResult<Vec<Framebuffer>> {
        swapchain
            .image_views()
            .iter()
            .map(|&color_view| {
                Framebuffer::new(
                    device.clone(),
                    render_pass,
                    color_view,
                    depth_buffer.view(),
                    swapchain.extent(),
                )
            })
            .collect()
    }

    /// Loads the configured model and uploads it into device-local
    /// buffers through the staging protocol.
    fn upload_model(
        device: &Arc<Device>,
        pool: &CommandPool,
        config: &Config,
    ) -> RhiResult<(Buffer, Buffer, u32, u32)> {
        let model = Model::load(&config.model_path)
            .map_err(|e| RhiError::InvalidHandle(e.to_string()))?;

        let vertices: Vec<Vertex> = model
            .vertices
            .iter()
            .map(|v| {
                Vertex::new(
                    Vec3::from_array(v.position),
                    Vec3::ONE,
                    Vec2::from_array(v.tex_coord),
                )
            })
            .collect();

        let vertex_buffer = Buffer::new_device_local(
            device.clone(),
            pool,
            BufferUsage::Vertex,
            bytemuck::cast_slice(&vertices),
        )?;

        let index_buffer = Buffer::new_device_local(
            device.clone(),
            pool,
            BufferUsage::Index,
            bytemuck::cast_slice(&model.indices),
        )?;

        debug!(
            "Model uploaded: {} vertices, {} indices",
            vertices.len(),
            model.indices.len()
        );

        Ok((
            vertex_buffer,
            index_buffer,
            vertices.len() as u32,
            model.indices.len() as u32,
        ))
    }

    /// Creates the per-frame uniform buffers and descriptor sets.
    fn create_frame_resources(
        device: &Arc<Device>,
        layout: &DescriptorSetLayout,
        texture: &Texture,
        sampler: &Sampler,
        frames_in_flight: usize,
    ) -> RhiResult<(DescriptorPool, Vec<FrameResources>)> {
        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(frames_in_flight as u32),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(frames_in_flight as u32),
        ];
        let descriptor_pool =
            DescriptorPool::new(device.clone(), frames_in_flight as u32, &pool_sizes)?;

        let layouts: Vec<_> = (0..frames_in_flight).map(|_| layout.handle()).collect();
        let descriptor_sets = descriptor_pool.allocate(&layouts)?;

        let mut frame_resources = Vec::with_capacity(frames_in_flight);

        for (i, &descriptor_set) in descriptor_sets.iter().enumerate() {
            let uniform_buffer = Buffer::new(
                device.clone(),
                BufferUsage::Uniform,
                TransformUbo::SIZE as u64,
            )?;

            let buffer_info = vk::DescriptorBufferInfo::default()
                .buffer(uniform_buffer.handle())
                .offset(0)
                .range(TransformUbo::SIZE as u64);
            let image_info = vk::DescriptorImageInfo::default()
                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .image_view(texture.view())
                .sampler(sampler.handle());

            let buffer_infos = [buffer_info];
            let image_infos = [image_info];

            let writes = [
                vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(0)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_infos),
                vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(1)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(&image_infos),
            ];
            update_descriptor_sets(device, &writes);

            debug!("Created frame resources for slot {}", i);

            frame_resources.push(FrameResources {
                uniform_buffer,
                descriptor_set,
            });
        }

        Ok((descriptor_pool, frame_resources))
    }

    /// Notifies the renderer that the framebuffer size changed.
    ///
    /// The rebuild happens on the next frame. A zero-area size (minimized
    /// window) keeps the rebuild pending; frames are skipped until a
    /// nonzero size arrives.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width != self.width || height != self.height {
            debug!(
                "Resize: {}x{} -> {}x{}",
                self.width, self.height, width, height
            );
            self.width = width;
            self.height = height;
            self.framebuffer_resized = true;
        }
    }

    /// Renders one frame.
    ///
    /// Swapchain staleness is the only retryable condition: the
    /// presentation set is rebuilt and the frame retried on the next loop
    /// iteration. Every other failure is propagated as fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if any non-retryable Vulkan operation fails.
    pub fn render_frame(&mut self) -> RhiResult<()> {
        // Minimized: nothing can be presented at a degenerate extent.
        // Skip frames until a nonzero size is observed.
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }

        if self.framebuffer_resized {
            debug!("Resize pending, rebuilding presentation set before acquire");
            self.rebuild_presentation()?;
        }

        // 1. Backpressure: wait for this slot's previous submission
        self.scheduler.wait_for_frame()?;

        // 2. Acquire; out-of-date aborts without touching fence or counter
        let (image_index, suboptimal) = match self.scheduler.acquire(&self.swapchain)? {
            AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            AcquireOutcome::OutOfDate => {
                self.rebuild_presentation()?;
                return Ok(());
            }
        };

        // 3. Per-frame mutable data for the current slot
        self.update_uniforms()?;

        // 4.-5. Fence reset (submission is now certain) and re-record
        self.scheduler.begin_recording()?;
        self.record_commands(image_index)?;
        self.scheduler.end_recording()?;

        // 6. Submit
        self.scheduler.submit()?;

        // 7. Present
        let stale = self.scheduler.present(&self.swapchain)?;

        // 8. Advance the ring - only on this successfully-submitted path
        self.scheduler.advance();

        if stale || suboptimal || self.framebuffer_resized {
            debug!("Presentation set stale after present, rebuilding");
            self.rebuild_presentation()?;
        }

        Ok(())
    }

    /// Rebuilds the swapchain and everything that depends on its extent
    /// or format: depth buffer, framebuffers, and (on a format change) the
    /// render pass and pipelines.
    ///
    /// A zero-area framebuffer defers the rebuild: the resized flag stays
    /// set and the frame loop keeps skipping until a usable size arrives.
    fn rebuild_presentation(&mut self) -> RhiResult<()> {
        if self.width == 0 || self.height == 0 {
            debug!("Deferring presentation rebuild while framebuffer is zero-area");
            return Ok(());
        }

        // No in-flight work may reference the resources we are about to
        // destroy
        self.device.wait_idle()?;

        self.framebuffers.clear();

        self.swapchain.recreate(
            &self.instance,
            self.surface.handle(),
            self.width,
            self.height,
            self.config.save_energy,
        )?;

        // Format changes invalidate the render pass and every pipeline
        // built against it
        if self.swapchain.format() != self.render_pass.color_format() {
            warn!(
                "Swapchain format changed to {:?}, rebuilding render pass and pipelines",
                self.swapchain.format()
            );

            let new_render_pass = RenderPass::new(
                (*self.device).clone(),
                self.swapchain.format(),
                self.render_pass.depth_format(),
            )?;
            unsafe {
                ManuallyDrop::drop(&mut self.render_pass);
            }
            self.render_pass = ManuallyDrop::new(new_render_pass);

            let wireframe_supported = self.wireframe_pipeline.is_some();
            let (fill, wireframe) = Self::build_pipelines(
                &self.device,
                &self.vertex_spirv,
                &self.fragment_spirv,
                &self.pipeline_layout,
                &self.render_pass,
                wireframe_supported,
            )?;
            unsafe {
                ManuallyDrop::drop(&mut self.fill_pipeline);
            }
            self.fill_pipeline = ManuallyDrop::new(fill);
            self.wireframe_pipeline = wireframe;
        }

        let extent = self.swapchain.extent();
        let new_depth_buffer = DepthBuffer::new(
            (*self.device).clone(),
            extent.width,
            extent.height,
            self.render_pass.depth_format(),
        )?;
        unsafe {
            ManuallyDrop::drop(&mut self.depth_buffer);
        }
        self.depth_buffer = ManuallyDrop::new(new_depth_buffer);

        self.framebuffers = Self::create_framebuffers(
            &self.device,
            &self.render_pass,
            &self.swapchain,
            &self.depth_buffer,
        )?;

        self.framebuffer_resized = false;
        Ok(())
    }

    /// Writes this frame's transform into the current slot's persistently
    /// mapped uniform buffer.
    fn update_uniforms(&self) -> RhiResult<()> {
        let extent = self.swapchain.extent();
        let aspect = extent.width as f32 / extent.height.max(1) as f32;

        let ubo = TransformUbo::rotating(self.timer.elapsed_secs(), aspect);

        self.frame_resources[self.scheduler.current_frame()]
            .uniform_buffer
            .write_bytes(0, bytemuck::bytes_of(&ubo))
    }

    /// Records the draw commands for the acquired image.
    fn record_commands(&self, image_index: u32) -> RhiResult<()> {
        let cmd = self.scheduler.current_command_buffer();
        let extent = self.swapchain.extent();
        let device = self.device.handle();

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.config.clear_color.0,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        let render_pass_begin = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass.handle())
            .framebuffer(self.framebuffers[image_index as usize].handle())
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        let pipeline = if self.config.wireframe {
            self.wireframe_pipeline
                .as_ref()
                .unwrap_or(&*self.fill_pipeline)
        } else {
            &*self.fill_pipeline
        };

        unsafe {
            device.cmd_begin_render_pass(cmd, &render_pass_begin, vk::SubpassContents::INLINE);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(cmd, 0, &[viewport]);

            let scissor = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            };
            device.cmd_set_scissor(cmd, 0, &[scissor]);

            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.handle());

            device.cmd_bind_vertex_buffers(cmd, 0, &[self.vertex_buffer.handle()], &[0]);

            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout.handle(),
                0,
                &[self.frame_resources[self.scheduler.current_frame()].descriptor_set],
                &[],
            );

            if self.config.use_indexed_vertices {
                device.cmd_bind_index_buffer(
                    cmd,
                    self.index_buffer.handle(),
                    0,
                    vk::IndexType::UINT32,
                );
                device.cmd_draw_indexed(cmd, self.index_count, 1, 0, 0, 0);
            } else {
                device.cmd_draw(cmd, self.vertex_count, 1, 0, 0);
            }

            device.cmd_end_render_pass(cmd);
        }

        Ok(())
    }

    /// Returns the current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // No resource may be destroyed while in-flight commands could
        // still reference it
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during teardown: {:?}", e);
        }

        // Per-frame resources (uniform buffers, slot ring)
        self.frame_resources.clear();

        unsafe {
            ManuallyDrop::drop(&mut self.scheduler);

            // Pipelines, then their layout and descriptors
            self.wireframe_pipeline.take();
            ManuallyDrop::drop(&mut self.fill_pipeline);
            ManuallyDrop::drop(&mut self.pipeline_layout);
            ManuallyDrop::drop(&mut self.descriptor_pool);
            ManuallyDrop::drop(&mut self.descriptor_set_layout);

            // Resident resources
            ManuallyDrop::drop(&mut self.vertex_buffer);
            ManuallyDrop::drop(&mut self.index_buffer);
            ManuallyDrop::drop(&mut self.sampler);
            ManuallyDrop::drop(&mut self.texture);

            // Presentation set
            self.framebuffers.clear();
            ManuallyDrop::drop(&mut self.depth_buffer);
            ManuallyDrop::drop(&mut self.render_pass);
            ManuallyDrop::drop(&mut self.swapchain);

            // Releasing the last device Arc destroys the logical device,
            // which must happen before the surface and instance go away
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}
