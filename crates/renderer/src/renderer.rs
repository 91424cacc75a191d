//! Demo renderer.
//!
//! [`Renderer`] owns every Vulkan object of the triangle/quad demo and drives
//! [`FrameLoop`] against its [`RenderContext`], which implements
//! [`FrameBackend`] with real GPU work.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info, trace, warn};

use practices_core::{RendererConfig, Timer};
use practices_platform::{DrawableSize, Surface, Window};
use practices_rhi::buffer::{Buffer, BufferUsage};
use practices_rhi::command::CommandPool;
use practices_rhi::descriptor::{
    DescriptorPool, DescriptorSetLayout, uniform_buffer_binding, write_uniform_buffer,
};
use practices_rhi::device::Device;
use practices_rhi::framebuffer::Framebuffers;
use practices_rhi::instance::Instance;
use practices_rhi::physical_device::select_physical_device;
use practices_rhi::pipeline::{CullMode, GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use practices_rhi::render_pass::RenderPass;
use practices_rhi::shader::{Shader, ShaderStage};
use practices_rhi::swapchain::Swapchain;
use practices_rhi::vertex::Vertex;

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::error::{RendererError, RendererResult};
use crate::frame::{
    AcquireOutcome, FrameBackend, FrameLoop, FrameOutcome, PresentOutcome, RecreateOutcome,
};
use crate::frame_slots::{FrameSlot, FrameSlots, RenderFinishedSemaphores};
use crate::mesh::MeshData;
use crate::recreate::{SwapchainTarget, recreate_swapchain};
use crate::ubo::{UniformBufferObject, aspect_ratio};

const APP_NAME: &std::ffi::CStr = c"Vulkan Practices";

pub const VERTEX_SHADER_FILE: &str = "shader.vert.spv";
pub const FRAGMENT_SHADER_FILE: &str = "shader.frag.spv";

/// Uniform buffer and the descriptor set pointing at it, one per slot.
struct SlotUniforms {
    buffer: Buffer,
    descriptor_set: vk::DescriptorSet,
}

/// Device-local geometry of the demo scene.
struct MeshBuffers {
    vertex_buffer: Buffer,
    index_buffer: Option<Buffer>,
    vertex_count: u32,
    index_count: u32,
}

impl MeshBuffers {
    fn upload(device: &Arc<Device>, pool: &CommandPool, mesh: &MeshData) -> RendererResult<Self> {
        let vertex_buffer = Buffer::device_local_with_data(
            device.clone(),
            pool,
            BufferUsage::Vertex,
            bytemuck::cast_slice(mesh.vertices),
        )?;

        let index_buffer = match mesh.indices {
            Some(indices) => Some(Buffer::device_local_with_data(
                device.clone(),
                pool,
                BufferUsage::Index,
                bytemuck::cast_slice(indices),
            )?),
            None => None,
        };

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count: mesh.vertex_count(),
            index_count: mesh.index_count().unwrap_or(0),
        })
    }
}

/// Every GPU object of the demo.
///
/// # Destruction Order
///
/// Fields drop in declaration order, which is the reverse of creation order:
/// sync objects and command buffers, uniform and mesh buffers, command pool,
/// framebuffers, pipeline, descriptor objects, render pass, swapchain, the
/// last `Arc<Device>`, surface and finally the instance. [`Drop`] waits for
/// the device to go idle before any of that happens. Fields with a leading
/// underscore are only held for that order.
pub struct RenderContext {
    slots: FrameSlots,
    /// Indexed by swapchain image. `None` only while the swapchain is rebuilt.
    render_finished: Option<RenderFinishedSemaphores>,
    uniforms: Vec<SlotUniforms>,
    mesh: MeshBuffers,
    _command_pool: CommandPool,
    /// `None` only while the swapchain is being rebuilt.
    framebuffers: Option<Framebuffers>,
    pipeline: Pipeline,
    pipeline_layout: PipelineLayout,
    _descriptor_pool: DescriptorPool,
    _descriptor_set_layout: DescriptorSetLayout,
    render_pass: RenderPass,
    swapchain: Swapchain,
    device: Arc<Device>,
    surface: Surface,
    instance: Instance,

    drawable_size: DrawableSize,
    timer: Timer,
    clear_color: [f32; 4],
    animate: bool,
}

impl RenderContext {
    fn new(window: &Window, config: &RendererConfig) -> RendererResult<Self> {
        let (width, height) = window.drawable_size();
        info!("Initializing Vulkan renderer ({}x{})", width, height);

        let extensions = window.required_extensions()?;
        let instance = Instance::new(APP_NAME, config.enable_validation, &extensions)?;

        let surface = window.create_surface(instance.entry(), instance.handle())?;

        let gpu = select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &gpu)?;

        let swapchain = Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            surface.loader(),
            (width, height),
            config.prefer_mailbox,
        )?;

        let render_pass = RenderPass::new(device.clone(), swapchain.format())?;

        let descriptor_set_layout = DescriptorSetLayout::new(
            device.clone(),
            &[uniform_buffer_binding(0, vk::ShaderStageFlags::VERTEX)],
        )?;
        let (pipeline, pipeline_layout) =
            create_pipeline(&device, config, &render_pass, &descriptor_set_layout)?;

        let framebuffers = Framebuffers::new(
            device.clone(),
            render_pass.handle(),
            swapchain.image_views(),
            swapchain.extent(),
        )?;

        let command_pool = CommandPool::new(device.clone(), device.graphics_family())?;

        let mesh = MeshBuffers::upload(&device, &command_pool, &MeshData::for_scene(config.scene))?;

        let descriptor_pool =
            DescriptorPool::for_uniform_buffers(device.clone(), MAX_FRAMES_IN_FLIGHT as u32)?;
        let uniforms = create_slot_uniforms(&device, &descriptor_pool, &descriptor_set_layout)?;

        let slots = FrameSlots::new(device.clone(), &command_pool, MAX_FRAMES_IN_FLIGHT)?;
        let render_finished =
            RenderFinishedSemaphores::new(device.clone(), swapchain.image_count())?;

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight, {:?} scene",
            swapchain.image_count(),
            MAX_FRAMES_IN_FLIGHT,
            config.scene
        );

        Ok(Self {
            slots,
            render_finished: Some(render_finished),
            uniforms,
            mesh,
            _command_pool: command_pool,
            framebuffers: Some(framebuffers),
            pipeline,
            pipeline_layout,
            _descriptor_pool: descriptor_pool,
            _descriptor_set_layout: descriptor_set_layout,
            render_pass,
            swapchain,
            device,
            surface,
            instance,
            drawable_size: window.drawable_size_handle(),
            timer: Timer::new(),
            clear_color: config.clear_color,
            animate: config.animate,
        })
    }

    fn slot(&self, slot: usize) -> RendererResult<&FrameSlot> {
        self.slots.get(slot).ok_or(RendererError::InvalidSlot(slot))
    }

    fn uniforms(&self, slot: usize) -> RendererResult<&SlotUniforms> {
        self.uniforms
            .get(slot)
            .ok_or(RendererError::InvalidSlot(slot))
    }

    fn render_finished(&self, image_index: u32) -> RendererResult<vk::Semaphore> {
        self.render_finished
            .as_ref()
            .and_then(|semaphores| semaphores.get(image_index))
            .map(|semaphore| semaphore.handle())
            .ok_or(RendererError::MissingImageResource(image_index))
    }

    fn framebuffer(&self, image_index: u32) -> RendererResult<vk::Framebuffer> {
        self.framebuffers
            .as_ref()
            .and_then(|framebuffers| framebuffers.get(image_index))
            .ok_or(RendererError::MissingImageResource(image_index))
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.swapchain.format()
    }

    #[inline]
    pub fn has_validation(&self) -> bool {
        self.instance.has_validation()
    }
}

impl FrameBackend for RenderContext {
    type Error = RendererError;

    fn wait_for_slot(&mut self, slot: usize) -> RendererResult<()> {
        let in_flight = self.slot(slot)?.in_flight();
        if !in_flight.is_signaled() {
            trace!("Slot {} still in flight, waiting", slot);
        }
        in_flight.wait(u64::MAX)?;
        Ok(())
    }

    fn acquire(&mut self, slot: usize) -> RendererResult<AcquireOutcome> {
        let semaphore = self.slot(slot)?.image_available().handle();
        Ok(self.swapchain.acquire_next_image(semaphore)?)
    }

    fn reset_slot(&mut self, slot: usize) -> RendererResult<()> {
        let frame = self.slot(slot)?;
        frame.in_flight().reset()?;
        frame.command_buffer().reset()?;
        Ok(())
    }

    fn update_slot(&mut self, slot: usize) -> RendererResult<()> {
        let extent = self.swapchain.extent();
        let ubo = UniformBufferObject::new(
            self.timer.elapsed_secs(),
            aspect_ratio(extent.width, extent.height),
            self.animate,
        );
        self.uniforms(slot)?.buffer.write_data(0, ubo.as_bytes())?;
        Ok(())
    }

    fn record(&mut self, slot: usize, image_index: u32) -> RendererResult<()> {
        let framebuffer = self.framebuffer(image_index)?;
        let descriptor_set = self.uniforms(slot)?.descriptor_set;
        let cmd = self.slot(slot)?.command_buffer();
        let extent = self.swapchain.extent();

        cmd.begin()?;
        cmd.begin_render_pass(
            self.render_pass.handle(),
            framebuffer,
            extent,
            self.clear_color,
        );

        cmd.bind_pipeline(self.pipeline.bind_point(), self.pipeline.handle());

        cmd.set_viewport(&vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        cmd.set_scissor(&vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        });

        cmd.bind_vertex_buffers(0, &[self.mesh.vertex_buffer.handle()], &[0]);
        cmd.bind_descriptor_sets(
            self.pipeline.bind_point(),
            self.pipeline_layout.handle(),
            0,
            &[descriptor_set],
        );

        match &self.mesh.index_buffer {
            Some(index_buffer) => {
                cmd.bind_index_buffer(index_buffer.handle(), 0, vk::IndexType::UINT16);
                cmd.draw_indexed(self.mesh.index_count, 1);
            }
            None => cmd.draw(self.mesh.vertex_count, 1),
        }

        cmd.end_render_pass();
        cmd.end()?;
        Ok(())
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> RendererResult<()> {
        let render_finished = self.render_finished(image_index)?;
        let frame = self.slot(slot)?;

        let wait_semaphores = [frame.image_available().handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [frame.command_buffer().handle()];
        let signal_semaphores = [render_finished];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        // SAFETY: the command buffer finished recording, the fence was reset
        // after the acquire and no other submission uses it.
        unsafe {
            self.device
                .submit_graphics(&[submit_info], frame.in_flight().handle())?;
        }
        Ok(())
    }

    fn present(&mut self, _slot: usize, image_index: u32) -> RendererResult<PresentOutcome> {
        let semaphore = self.render_finished(image_index)?;
        Ok(self
            .swapchain
            .present(self.device.present_queue(), image_index, semaphore)?)
    }

    fn recreate(&mut self) -> RendererResult<RecreateOutcome> {
        recreate_swapchain(self)
    }
}

impl SwapchainTarget for RenderContext {
    type Error = RendererError;

    fn drawable_size(&self) -> (u32, u32) {
        self.drawable_size.get()
    }

    fn wait_idle(&mut self) -> RendererResult<()> {
        self.device.wait_idle()?;
        Ok(())
    }

    fn release_image_resources(&mut self) {
        self.framebuffers = None;
        self.render_finished = None;
    }

    fn rebuild_swapchain(&mut self, size: (u32, u32)) -> RendererResult<()> {
        self.swapchain
            .recreate(self.surface.handle(), self.surface.loader(), size)?;

        if self.swapchain.format() != self.render_pass.color_format() {
            // Format selection is deterministic for a given surface
            warn!(
                "Swapchain format changed from {:?} to {:?}; render pass kept",
                self.render_pass.color_format(),
                self.swapchain.format()
            );
        }
        Ok(())
    }

    fn rebuild_image_resources(&mut self) -> RendererResult<()> {
        self.framebuffers = Some(Framebuffers::new(
            self.device.clone(),
            self.render_pass.handle(),
            self.swapchain.image_views(),
            self.swapchain.extent(),
        )?);
        self.render_finished = Some(RenderFinishedSemaphores::new(
            self.device.clone(),
            self.swapchain.image_count(),
        )?);
        Ok(())
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }
        info!("Renderer destroyed");
    }
}

/// Builds the graphics pipeline from the precompiled shaders in
/// `config.resource_dir`. The shader modules are released on return.
fn create_pipeline(
    device: &Arc<Device>,
    config: &RendererConfig,
    render_pass: &RenderPass,
    descriptor_set_layout: &DescriptorSetLayout,
) -> RendererResult<(Pipeline, PipelineLayout)> {
    let vertex_shader = Shader::from_resource(
        device.clone(),
        &config.resource_dir,
        VERTEX_SHADER_FILE,
        ShaderStage::Vertex,
    )?;
    let fragment_shader = Shader::from_resource(
        device.clone(),
        &config.resource_dir,
        FRAGMENT_SHADER_FILE,
        ShaderStage::Fragment,
    )?;

    let pipeline_layout = PipelineLayout::new(device.clone(), &[descriptor_set_layout.handle()])?;

    let pipeline = GraphicsPipelineBuilder::new()
        .vertex_shader(&vertex_shader)
        .fragment_shader(&fragment_shader)
        .vertex_binding(Vertex::binding_description())
        .vertex_attributes(&Vertex::attribute_descriptions())
        .cull_mode(CullMode::None)
        .render_pass(render_pass.handle(), 0)
        .build(device.clone(), &pipeline_layout)?;

    info!("Graphics pipeline created");

    Ok((pipeline, pipeline_layout))
}

/// Creates one persistently mapped uniform buffer and descriptor set per slot.
fn create_slot_uniforms(
    device: &Arc<Device>,
    descriptor_pool: &DescriptorPool,
    descriptor_set_layout: &DescriptorSetLayout,
) -> RendererResult<Vec<SlotUniforms>> {
    let layouts = vec![descriptor_set_layout.handle(); MAX_FRAMES_IN_FLIGHT];
    let descriptor_sets = descriptor_pool.allocate(&layouts)?;

    let mut uniforms = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
    for descriptor_set in descriptor_sets {
        let buffer = Buffer::new(
            device.clone(),
            BufferUsage::Uniform,
            UniformBufferObject::SIZE as vk::DeviceSize,
        )?;
        write_uniform_buffer(
            device,
            descriptor_set,
            0,
            buffer.handle(),
            UniformBufferObject::SIZE as vk::DeviceSize,
        );
        uniforms.push(SlotUniforms {
            buffer,
            descriptor_set,
        });
    }

    Ok(uniforms)
}

/// The demo renderer: a [`FrameLoop`] plus the context it draws with.
pub struct Renderer {
    frame_loop: FrameLoop,
    context: RenderContext,
}

impl Renderer {
    /// Creates every Vulkan object for `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if any object cannot be created, including a missing
    /// or malformed shader file under `config.resource_dir`.
    pub fn new(window: &Window, config: &RendererConfig) -> RendererResult<Self> {
        let context = RenderContext::new(window, config)?;

        Ok(Self {
            frame_loop: FrameLoop::new(MAX_FRAMES_IN_FLIGHT, window.resize_latch()),
            context,
        })
    }

    /// Runs one iteration of the frame loop.
    ///
    /// # Errors
    ///
    /// Any Vulkan failure other than an out-of-date or suboptimal swapchain.
    pub fn render_frame(&mut self) -> RendererResult<FrameOutcome> {
        let outcome = self.frame_loop.draw_frame(&mut self.context)?;
        if outcome == FrameOutcome::Recreated {
            debug!(
                "Frame {} skipped for swapchain recreation",
                self.frame_loop.frame_index()
            );
        }
        Ok(outcome)
    }

    /// Rebuild the swapchain before the next acquire.
    pub fn request_recreate(&mut self) {
        self.frame_loop.request_recreate();
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_loop.frame_index()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.context.extent()
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.context.format()
    }

    #[inline]
    pub fn has_validation(&self) -> bool {
        self.context.has_validation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_file_names() {
        assert!(VERTEX_SHADER_FILE.ends_with(".spv"));
        assert!(FRAGMENT_SHADER_FILE.ends_with(".spv"));
        assert_ne!(VERTEX_SHADER_FILE, FRAGMENT_SHADER_FILE);
    }

    #[test]
    fn test_missing_shader_is_fatal_before_device_work() {
        let dir = std::path::Path::new("definitely/not/a/resource/dir");
        let err = practices_rhi::shader::read_resource(dir, VERTEX_SHADER_FILE).unwrap_err();
        let err = RendererError::from(err);
        assert!(err.to_string().contains("failed to open file"));
    }

    #[test]
    fn test_render_context_is_a_frame_backend() {
        fn assert_backend<B: FrameBackend<Error = RendererError>>() {}
        assert_backend::<RenderContext>();
    }

    #[test]
    fn test_recreation_goes_through_ordered_steps() {
        fn assert_target<T: SwapchainTarget<Error = RendererError>>() {}
        assert_target::<RenderContext>();
    }
}
