//! Frame lifecycle and swapchain-recreation state machine.
//!
//! [`FrameLoop`] sequences one frame as
//! `Idle → Acquiring → Recording → Submitted → Presenting → Idle` against a
//! [`FrameBackend`], and decides when the swapchain has to be rebuilt. It
//! owns no GPU objects, which keeps the ordering rules testable without a
//! device.
//!
//! Per iteration, with `slot = frame_index % frames_in_flight`:
//!
//! ```text
//! pending recreation? ── recreate ── Deferred ──▶ Suspended
//! wait_for_slot(slot)
//! acquire(slot) ── OutOfDate ──▶ recreate ──▶ Recreated (counter unchanged)
//! reset_slot(slot)
//! update_slot(slot)
//! record(slot, image)
//! submit(slot, image)            frame_index += 1
//! present(slot, image)
//! stale or resized? ── recreate
//! ```
//!
//! The fence of a slot is reset only after a successful acquire, so an
//! aborted frame leaves it signaled and the next wait returns.

use practices_platform::ResizeLatch;
use tracing::debug;

pub use practices_rhi::swapchain::{AcquireOutcome, PresentOutcome};

/// Where the loop is within the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameState {
    #[default]
    Idle,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
}

/// Result of a swapchain recreation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecreateOutcome {
    Recreated,
    /// The drawable size is zero (minimized); retry on a later frame.
    Deferred,
}

/// What a call to [`FrameLoop::draw_frame`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was submitted and presented.
    Presented { slot: usize, image_index: u32 },
    /// Acquire reported the swapchain out of date; nothing was submitted.
    Recreated,
    /// Recreation is waiting for a non-zero drawable size.
    Suspended,
}

/// Presentation operations the frame loop sequences.
///
/// Implementations report the two recoverable swapchain codes through
/// [`AcquireOutcome`] and [`PresentOutcome`]; every `Err` is fatal to the
/// frame.
pub trait FrameBackend {
    type Error;

    /// Blocks until the previous submission using `slot` has completed.
    fn wait_for_slot(&mut self, slot: usize) -> Result<(), Self::Error>;

    fn acquire(&mut self, slot: usize) -> Result<AcquireOutcome, Self::Error>;

    /// Resets the slot's fence and command buffer.
    fn reset_slot(&mut self, slot: usize) -> Result<(), Self::Error>;

    /// Writes per-slot resources such as the uniform buffer.
    fn update_slot(&mut self, slot: usize) -> Result<(), Self::Error>;

    fn record(&mut self, slot: usize, image_index: u32) -> Result<(), Self::Error>;

    fn submit(&mut self, slot: usize, image_index: u32) -> Result<(), Self::Error>;

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome, Self::Error>;

    /// Rebuilds the swapchain and everything sized by it.
    fn recreate(&mut self) -> Result<RecreateOutcome, Self::Error>;
}

/// Drives frames round-robin over `frames_in_flight` slots.
#[derive(Debug)]
pub struct FrameLoop {
    frames_in_flight: usize,
    frame_index: u64,
    state: FrameState,
    resize: ResizeLatch,
    recreate_pending: bool,
}

impl FrameLoop {
    /// Creates a loop over `frames_in_flight` slots reading `resize`.
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is zero.
    pub fn new(frames_in_flight: usize, resize: ResizeLatch) -> Self {
        assert!(frames_in_flight > 0, "frames_in_flight must be at least 1");
        Self {
            frames_in_flight,
            frame_index: 0,
            state: FrameState::Idle,
            resize,
            recreate_pending: false,
        }
    }

    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Number of frames submitted so far.
    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Slot the next frame will use.
    #[inline]
    pub fn current_slot(&self) -> usize {
        (self.frame_index % self.frames_in_flight as u64) as usize
    }

    #[inline]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Whether a recreation will run before the next acquire.
    pub fn is_recreate_pending(&self) -> bool {
        self.recreate_pending || self.resize.is_raised()
    }

    /// Forces a recreation before the next acquire.
    pub fn request_recreate(&mut self) {
        self.recreate_pending = true;
    }

    /// Runs one frame iteration against `backend`.
    ///
    /// # Errors
    ///
    /// Propagates the first backend error. The state returns to
    /// [`FrameState::Idle`] either way.
    pub fn draw_frame<B: FrameBackend>(
        &mut self,
        backend: &mut B,
    ) -> Result<FrameOutcome, B::Error> {
        let result = self.run_frame(backend);
        self.state = FrameState::Idle;
        result
    }

    fn run_frame<B: FrameBackend>(&mut self, backend: &mut B) -> Result<FrameOutcome, B::Error> {
        if self.is_recreate_pending() {
            debug!("Recreating swapchain before acquire");
            if self.recreate(backend)? == RecreateOutcome::Deferred {
                return Ok(FrameOutcome::Suspended);
            }
        }

        let slot = self.current_slot();

        self.state = FrameState::Acquiring;
        backend.wait_for_slot(slot)?;
        let (image_index, acquire_suboptimal) = match backend.acquire(slot)? {
            AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            AcquireOutcome::OutOfDate => {
                debug!("Swapchain out of date at acquire (frame {})", self.frame_index);
                return Ok(match self.recreate(backend)? {
                    RecreateOutcome::Recreated => FrameOutcome::Recreated,
                    RecreateOutcome::Deferred => FrameOutcome::Suspended,
                });
            }
        };
        backend.reset_slot(slot)?;

        self.state = FrameState::Recording;
        backend.update_slot(slot)?;
        backend.record(slot, image_index)?;

        self.state = FrameState::Submitted;
        backend.submit(slot, image_index)?;
        self.frame_index += 1;

        self.state = FrameState::Presenting;
        let presented = backend.present(slot, image_index)?;

        let resized = self.resize.is_raised();
        if presented.needs_recreate() || acquire_suboptimal || resized {
            debug!(
                "Recreating swapchain after present: present={:?}, acquire_suboptimal={}, resized={}",
                presented, acquire_suboptimal, resized
            );
            self.recreate(backend)?;
        }

        Ok(FrameOutcome::Presented { slot, image_index })
    }

    /// Runs a recreation, keeping it pending until it actually happens.
    fn recreate<B: FrameBackend>(&mut self, backend: &mut B) -> Result<RecreateOutcome, B::Error> {
        self.recreate_pending = true;
        // Any resize seen so far is covered by this attempt.
        self.resize.take();

        let outcome = backend.recreate()?;
        match outcome {
            RecreateOutcome::Recreated => self.recreate_pending = false,
            RecreateOutcome::Deferred => debug!("Swapchain recreation deferred: zero drawable size"),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Acquire(usize),
        Reset(usize),
        Update(usize),
        Record(usize, u32),
        Submit(usize, u32),
        Present(usize, u32),
        Recreate,
    }

    #[derive(Debug, PartialEq, Eq)]
    struct MockError(&'static str);

    /// Records every call; scripted outcomes are consumed in order and fall
    /// back to success when exhausted.
    #[derive(Default)]
    struct MockBackend {
        calls: Vec<Call>,
        acquires: VecDeque<AcquireOutcome>,
        presents: VecDeque<PresentOutcome>,
        recreates: VecDeque<RecreateOutcome>,
        raise_on_submit: Option<ResizeLatch>,
        fail_submit: bool,
        image_count: u32,
        next_image: u32,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                image_count: 3,
                ..Default::default()
            }
        }

        fn count(&self, call: Call) -> usize {
            self.calls.iter().filter(|c| **c == call).count()
        }

        fn submits(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Submit(..)))
                .count()
        }

        fn position(&self, call: Call) -> Option<usize> {
            self.calls.iter().position(|c| *c == call)
        }
    }

    impl FrameBackend for MockBackend {
        type Error = MockError;

        fn wait_for_slot(&mut self, slot: usize) -> Result<(), MockError> {
            self.calls.push(Call::Wait(slot));
            Ok(())
        }

        fn acquire(&mut self, slot: usize) -> Result<AcquireOutcome, MockError> {
            self.calls.push(Call::Acquire(slot));
            Ok(self.acquires.pop_front().unwrap_or_else(|| {
                let image_index = self.next_image;
                self.next_image = (self.next_image + 1) % self.image_count;
                AcquireOutcome::Acquired {
                    image_index,
                    suboptimal: false,
                }
            }))
        }

        fn reset_slot(&mut self, slot: usize) -> Result<(), MockError> {
            self.calls.push(Call::Reset(slot));
            Ok(())
        }

        fn update_slot(&mut self, slot: usize) -> Result<(), MockError> {
            self.calls.push(Call::Update(slot));
            Ok(())
        }

        fn record(&mut self, slot: usize, image_index: u32) -> Result<(), MockError> {
            self.calls.push(Call::Record(slot, image_index));
            Ok(())
        }

        fn submit(&mut self, slot: usize, image_index: u32) -> Result<(), MockError> {
            self.calls.push(Call::Submit(slot, image_index));
            if self.fail_submit {
                return Err(MockError("device lost"));
            }
            if let Some(latch) = self.raise_on_submit.take() {
                latch.raise();
            }
            Ok(())
        }

        fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome, MockError> {
            self.calls.push(Call::Present(slot, image_index));
            Ok(self
                .presents
                .pop_front()
                .unwrap_or(PresentOutcome::Presented))
        }

        fn recreate(&mut self) -> Result<RecreateOutcome, MockError> {
            self.calls.push(Call::Recreate);
            Ok(self
                .recreates
                .pop_front()
                .unwrap_or(RecreateOutcome::Recreated))
        }
    }

    #[test]
    fn test_five_frames_cycle_two_slots() {
        let mut frames = FrameLoop::new(2, ResizeLatch::new());
        let mut backend = MockBackend::new();

        let mut slots = Vec::new();
        for _ in 0..5 {
            match frames.draw_frame(&mut backend).unwrap() {
                FrameOutcome::Presented { slot, .. } => slots.push(slot),
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        assert_eq!(slots, vec![0, 1, 0, 1, 0]);
        assert_eq!(frames.frame_index(), 5);

        let waits: Vec<usize> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Wait(slot) => Some(*slot),
                _ => None,
            })
            .collect();
        // Iterations 0, 2, 4 wait on slot 0; 1, 3 on slot 1.
        assert_eq!(waits, vec![0, 1, 0, 1, 0]);
        assert_eq!(backend.count(Call::Recreate), 0);
    }

    #[test]
    fn test_frame_call_order() {
        let mut frames = FrameLoop::new(2, ResizeLatch::new());
        let mut backend = MockBackend::new();

        frames.draw_frame(&mut backend).unwrap();

        assert_eq!(
            backend.calls,
            vec![
                Call::Wait(0),
                Call::Acquire(0),
                Call::Reset(0),
                Call::Update(0),
                Call::Record(0, 0),
                Call::Submit(0, 0),
                Call::Present(0, 0),
            ]
        );
        assert_eq!(frames.state(), FrameState::Idle);
    }

    #[test]
    fn test_out_of_date_acquire_skips_frame() {
        let mut frames = FrameLoop::new(2, ResizeLatch::new());
        let mut backend = MockBackend::new();

        frames.draw_frame(&mut backend).unwrap();
        frames.draw_frame(&mut backend).unwrap();
        assert_eq!(frames.frame_index(), 2);

        backend.calls.clear();
        backend.acquires.push_back(AcquireOutcome::OutOfDate);

        let outcome = frames.draw_frame(&mut backend).unwrap();
        assert_eq!(outcome, FrameOutcome::Recreated);
        assert_eq!(frames.frame_index(), 2);
        assert_eq!(
            backend.calls,
            vec![Call::Wait(0), Call::Acquire(0), Call::Recreate]
        );
        // The fence was never reset, so the retry can wait on it again.
        assert_eq!(backend.count(Call::Reset(0)), 0);

        let outcome = frames.draw_frame(&mut backend).unwrap();
        assert!(matches!(outcome, FrameOutcome::Presented { slot: 0, .. }));
        assert_eq!(frames.frame_index(), 3);
        assert_eq!(backend.submits(), 1);
    }

    #[test]
    fn test_resize_during_submit_recreates_before_next_acquire() {
        let latch = ResizeLatch::new();
        let mut frames = FrameLoop::new(2, latch.clone());
        let mut backend = MockBackend::new();
        backend.raise_on_submit = Some(latch.clone());

        frames.draw_frame(&mut backend).unwrap();
        frames.draw_frame(&mut backend).unwrap();

        let present = backend.position(Call::Present(0, 0)).unwrap();
        let recreate = backend.position(Call::Recreate).unwrap();
        let next_acquire = backend.position(Call::Acquire(1)).unwrap();
        assert!(present < recreate && recreate < next_acquire);
        assert_eq!(backend.count(Call::Recreate), 1);
        assert!(!latch.is_raised());
    }

    #[test]
    fn test_resize_while_idle_recreates_first() {
        let latch = ResizeLatch::new();
        let mut frames = FrameLoop::new(2, latch.clone());
        let mut backend = MockBackend::new();

        latch.raise();
        assert!(frames.is_recreate_pending());
        frames.draw_frame(&mut backend).unwrap();

        assert_eq!(backend.calls[0], Call::Recreate);
        assert_eq!(backend.count(Call::Recreate), 1);
        assert!(!frames.is_recreate_pending());
    }

    #[test]
    fn test_suboptimal_present_triggers_recreate() {
        let mut frames = FrameLoop::new(2, ResizeLatch::new());
        let mut backend = MockBackend::new();
        backend.presents.push_back(PresentOutcome::Suboptimal);

        let outcome = frames.draw_frame(&mut backend).unwrap();

        assert!(matches!(outcome, FrameOutcome::Presented { .. }));
        assert_eq!(backend.calls.last(), Some(&Call::Recreate));
        assert_eq!(frames.frame_index(), 1);
    }

    #[test]
    fn test_out_of_date_present_triggers_recreate() {
        let mut frames = FrameLoop::new(2, ResizeLatch::new());
        let mut backend = MockBackend::new();
        backend.presents.push_back(PresentOutcome::OutOfDate);

        frames.draw_frame(&mut backend).unwrap();

        assert_eq!(backend.calls.last(), Some(&Call::Recreate));
    }

    #[test]
    fn test_suboptimal_acquire_finishes_frame_then_recreates() {
        let mut frames = FrameLoop::new(2, ResizeLatch::new());
        let mut backend = MockBackend::new();
        backend.acquires.push_back(AcquireOutcome::Acquired {
            image_index: 2,
            suboptimal: true,
        });

        let outcome = frames.draw_frame(&mut backend).unwrap();

        assert_eq!(
            outcome,
            FrameOutcome::Presented {
                slot: 0,
                image_index: 2
            }
        );
        assert!(backend.position(Call::Present(0, 2)) < backend.position(Call::Recreate));
    }

    #[test]
    fn test_zero_size_suspends_until_recreated() {
        let latch = ResizeLatch::new();
        let mut frames = FrameLoop::new(2, latch.clone());
        let mut backend = MockBackend::new();
        backend.recreates.push_back(RecreateOutcome::Deferred);
        backend.recreates.push_back(RecreateOutcome::Deferred);

        latch.raise();
        assert_eq!(frames.draw_frame(&mut backend).unwrap(), FrameOutcome::Suspended);
        assert_eq!(frames.draw_frame(&mut backend).unwrap(), FrameOutcome::Suspended);
        assert!(frames.is_recreate_pending());
        assert_eq!(backend.calls, vec![Call::Recreate, Call::Recreate]);

        let outcome = frames.draw_frame(&mut backend).unwrap();
        assert!(matches!(outcome, FrameOutcome::Presented { slot: 0, .. }));
        assert!(!frames.is_recreate_pending());
        assert_eq!(frames.frame_index(), 1);
    }

    #[test]
    fn test_deferred_after_present_stays_pending() {
        let mut frames = FrameLoop::new(2, ResizeLatch::new());
        let mut backend = MockBackend::new();
        backend.presents.push_back(PresentOutcome::OutOfDate);
        backend.recreates.push_back(RecreateOutcome::Deferred);

        let outcome = frames.draw_frame(&mut backend).unwrap();
        assert!(matches!(outcome, FrameOutcome::Presented { .. }));
        assert!(frames.is_recreate_pending());

        backend.calls.clear();
        frames.draw_frame(&mut backend).unwrap();
        assert_eq!(backend.calls[0], Call::Recreate);
    }

    #[test]
    fn test_request_recreate() {
        let mut frames = FrameLoop::new(2, ResizeLatch::new());
        let mut backend = MockBackend::new();

        frames.request_recreate();
        frames.draw_frame(&mut backend).unwrap();

        assert_eq!(backend.calls[0], Call::Recreate);
        assert_eq!(backend.count(Call::Recreate), 1);
    }

    #[test]
    fn test_backend_error_propagates_and_resets_state() {
        let mut frames = FrameLoop::new(2, ResizeLatch::new());
        let mut backend = MockBackend::new();
        backend.fail_submit = true;

        let err = frames.draw_frame(&mut backend).unwrap_err();

        assert_eq!(err, MockError("device lost"));
        assert_eq!(frames.state(), FrameState::Idle);
        assert_eq!(frames.frame_index(), 0);
        assert_eq!(backend.count(Call::Present(0, 0)), 0);
    }

    #[test]
    fn test_single_slot_always_uses_slot_zero() {
        let mut frames = FrameLoop::new(1, ResizeLatch::new());
        let mut backend = MockBackend::new();

        for _ in 0..3 {
            frames.draw_frame(&mut backend).unwrap();
            assert_eq!(frames.current_slot(), 0);
        }
        assert_eq!(backend.count(Call::Wait(0)), 3);
    }

    #[test]
    #[should_panic(expected = "frames_in_flight")]
    fn test_zero_slots_rejected() {
        let _ = FrameLoop::new(0, ResizeLatch::new());
    }
}
