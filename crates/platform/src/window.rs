//! Window management using winit.
//!
//! The [`Window`] owns the winit window and the [`ResizeLatch`] it raises on
//! `Resized` events. [`Surface`] owns the Vulkan surface created from it.

use std::ffi::c_char;
use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use practices_core::{Error, Result, WindowConfig};

use crate::ResizeLatch;

/// Owning wrapper for a `vk::SurfaceKHR`.
///
/// The Vulkan instance that created the surface must outlive it.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Loader for the capability, format and present-mode queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: the handle was created by ash_window::create_surface with the
        // instance the loader was built from, and nothing else destroys it.
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        tracing::debug!("Vulkan surface destroyed");
    }
}

/// Cloneable handle for querying the drawable size after the [`Window`]
/// borrow has ended.
#[derive(Clone)]
pub struct DrawableSize {
    window: Arc<WinitWindow>,
}

impl DrawableSize {
    /// Current framebuffer size in pixels, `(0, 0)` while minimized.
    pub fn get(&self) -> (u32, u32) {
        if self.window.is_minimized() == Some(true) {
            return (0, 0);
        }
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

/// The application window.
///
/// One `Window` exists per event loop; the windowing system itself is owned by
/// the `EventLoop` the application creates, so there is no global state.
pub struct Window {
    window: Arc<WinitWindow>,
    width: u32,
    height: u32,
    resize_latch: ResizeLatch,
}

impl Window {
    /// Create a window described by `config`.
    pub fn new(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        tracing::info!("Window created: {}x{}", config.width, config.height);

        Ok(Self {
            window: Arc::new(window),
            width: config.width,
            height: config.height,
            resize_latch: ResizeLatch::new(),
        })
    }

    /// Last size reported by a `Resized` event (or the creation size).
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Current framebuffer size in pixels, `(0, 0)` while minimized.
    pub fn drawable_size(&self) -> (u32, u32) {
        self.drawable_size_handle().get()
    }

    /// A handle the renderer keeps for size queries during recreation.
    pub fn drawable_size_handle(&self) -> DrawableSize {
        DrawableSize {
            window: self.window.clone(),
        }
    }

    /// Latch raised on every framebuffer resize. Clones share state.
    pub fn resize_latch(&self) -> ResizeLatch {
        self.resize_latch.clone()
    }

    /// Record a `Resized` event and raise the resize latch.
    ///
    /// Zero sizes are recorded too: the renderer defers recreation until the
    /// drawable size becomes non-zero again.
    pub fn handle_resized(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.resize_latch.raise();
        tracing::debug!("Window resized: {}x{}", width, height);
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Instance extensions needed to create a surface for this window.
    pub fn required_extensions(&self) -> Result<Vec<*const c_char>> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;
        required_extensions(display_handle.as_raw())
    }

    /// Create a Vulkan surface for this window.
    ///
    /// # Errors
    /// Returns an error if the raw handles are unavailable or surface creation
    /// fails.
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let window_handle = self
            .window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: entry and instance are valid for the caller's lifetime, the
        // handles come from a live winit window, and Surface::drop destroys it.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Vulkan(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        tracing::info!("Vulkan surface created");

        Ok(Surface {
            handle,
            surface_loader,
        })
    }
}

/// Instance extensions required to present to `display_handle`.
///
/// The returned pointers reference static strings owned by `ash-window`.
pub fn required_extensions(display_handle: RawDisplayHandle) -> Result<Vec<*const c_char>> {
    let extensions = ash_window::enumerate_required_extensions(display_handle)
        .map_err(|e| Error::Vulkan(format!("Failed to enumerate required extensions: {}", e)))?;

    tracing::debug!(
        "Required surface extensions: {:?}",
        extensions
            .iter()
            // SAFETY: ash-window hands out static, null-terminated names.
            .map(|&ext| unsafe { std::ffi::CStr::from_ptr(ext) })
            .collect::<Vec<_>>()
    );

    Ok(extensions.to_vec())
}
