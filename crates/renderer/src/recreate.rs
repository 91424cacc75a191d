//! Swapchain recreation procedure.
//!
//! ```text
//! drawable size zero? ──▶ Deferred (nothing touched)
//! wait_idle
//! release_image_resources     framebuffers, per-image semaphores
//! rebuild_swapchain(size)     re-queries surface support
//! rebuild_image_resources
//! ```
//!
//! Pipeline, layouts and buffers do not depend on the extent and are kept.

use tracing::debug;

use crate::frame::RecreateOutcome;

/// The steps [`recreate_swapchain`] runs, in order.
pub trait SwapchainTarget {
    type Error;

    /// Current drawable size in pixels, `(0, 0)` while minimized.
    fn drawable_size(&self) -> (u32, u32);

    /// Blocks until no submitted work references the swapchain.
    fn wait_idle(&mut self) -> Result<(), Self::Error>;

    /// Drops everything created from the swapchain images.
    fn release_image_resources(&mut self);

    fn rebuild_swapchain(&mut self, size: (u32, u32)) -> Result<(), Self::Error>;

    /// Recreates the per-image objects for the new swapchain.
    fn rebuild_image_resources(&mut self) -> Result<(), Self::Error>;
}

/// Rebuilds the swapchain of `target`, or defers while the window has no area.
///
/// # Errors
///
/// Propagates the first failing step. Later steps are not run.
pub fn recreate_swapchain<T: SwapchainTarget>(target: &mut T) -> Result<RecreateOutcome, T::Error> {
    let (width, height) = target.drawable_size();
    if width == 0 || height == 0 {
        debug!("Drawable size is zero, deferring swapchain recreation");
        return Ok(RecreateOutcome::Deferred);
    }

    target.wait_idle()?;
    target.release_image_resources();
    target.rebuild_swapchain((width, height))?;
    target.rebuild_image_resources()?;

    Ok(RecreateOutcome::Recreated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Step {
        WaitIdle,
        Release,
        RebuildSwapchain(u32, u32),
        RebuildImages,
    }

    #[derive(Debug, PartialEq, Eq)]
    struct StepError(&'static str);

    struct MockTarget {
        size: (u32, u32),
        steps: Vec<Step>,
        fail_wait: bool,
        fail_swapchain: bool,
    }

    impl MockTarget {
        fn new(size: (u32, u32)) -> Self {
            Self {
                size,
                steps: Vec::new(),
                fail_wait: false,
                fail_swapchain: false,
            }
        }
    }

    impl SwapchainTarget for MockTarget {
        type Error = StepError;

        fn drawable_size(&self) -> (u32, u32) {
            self.size
        }

        fn wait_idle(&mut self) -> Result<(), StepError> {
            self.steps.push(Step::WaitIdle);
            if self.fail_wait {
                return Err(StepError("device lost"));
            }
            Ok(())
        }

        fn release_image_resources(&mut self) {
            self.steps.push(Step::Release);
        }

        fn rebuild_swapchain(&mut self, (width, height): (u32, u32)) -> Result<(), StepError> {
            self.steps.push(Step::RebuildSwapchain(width, height));
            if self.fail_swapchain {
                return Err(StepError("surface lost"));
            }
            Ok(())
        }

        fn rebuild_image_resources(&mut self) -> Result<(), StepError> {
            self.steps.push(Step::RebuildImages);
            Ok(())
        }
    }

    #[test]
    fn test_idle_wait_precedes_destruction() {
        let mut target = MockTarget::new((1024, 768));

        let outcome = recreate_swapchain(&mut target).unwrap();

        assert_eq!(outcome, RecreateOutcome::Recreated);
        assert_eq!(
            target.steps,
            vec![
                Step::WaitIdle,
                Step::Release,
                Step::RebuildSwapchain(1024, 768),
                Step::RebuildImages,
            ]
        );
    }

    #[test]
    fn test_zero_size_touches_nothing() {
        for size in [(0, 0), (800, 0), (0, 600)] {
            let mut target = MockTarget::new(size);
            assert_eq!(
                recreate_swapchain(&mut target).unwrap(),
                RecreateOutcome::Deferred
            );
            assert!(target.steps.is_empty());
        }
    }

    #[test]
    fn test_failed_idle_wait_keeps_image_resources() {
        let mut target = MockTarget::new((800, 600));
        target.fail_wait = true;

        assert_eq!(
            recreate_swapchain(&mut target),
            Err(StepError("device lost"))
        );
        assert_eq!(target.steps, vec![Step::WaitIdle]);
    }

    #[test]
    fn test_failed_swapchain_rebuild_stops_before_image_resources() {
        let mut target = MockTarget::new((800, 600));
        target.fail_swapchain = true;

        assert!(recreate_swapchain(&mut target).is_err());
        assert_eq!(
            target.steps,
            vec![
                Step::WaitIdle,
                Step::Release,
                Step::RebuildSwapchain(800, 600),
            ]
        );
    }
}
