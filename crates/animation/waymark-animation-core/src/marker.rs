//! Marker that travels along a sampled path.
//!
//! One run: attach the marker at the first point, step it through the samples
//! paced by the frame scheduler, hold on the last point, then hide and detach.
//! Long paths skip samples so a run takes at most `max_steps` frames.
//!
//! Every suspension point races the run's [`CancelToken`]. Whatever ends the
//! run (completion, cancel, a surface error, or dropping the future) the
//! marker is hidden and removed exactly once.

use std::cell::RefCell;
use std::pin::pin;
use std::rc::Rc;

use futures::future::{select, Either, LocalBoxFuture};
use log::{trace, warn};
use waymark_geometry::LatLng;

use crate::cancel::{CancelToken, FireOnDrop};
use crate::clock::FrameScheduler;
use crate::config::AnimationConfig;
use crate::entity::{AnimationHandle, AnimationOutcome, PathAnimation};
use crate::error::SurfaceError;
use crate::ids::{LayerId, MarkerId};
use crate::surface::{MarkerOptions, RenderSurface};

pub struct MovingMarker {
    inner: Rc<MarkerInner>,
}

struct MarkerInner {
    layer: LayerId,
    marker: MarkerId,
    points: Rc<[LatLng]>,
    options: MarkerOptions,
    surface: Rc<dyn RenderSurface>,
    scheduler: Rc<dyn FrameScheduler>,
    hold_ms: f64,
    step_size: f64,
    steps: usize,
    current: RefCell<Option<RunSlot>>,
}

/// The latest run: its cancel token and a latch that fires once the run is gone.
struct RunSlot {
    token: CancelToken,
    done: CancelToken,
}

impl MovingMarker {
    pub fn new(
        layer: LayerId,
        marker: MarkerId,
        points: Vec<LatLng>,
        options: MarkerOptions,
        surface: Rc<dyn RenderSurface>,
        scheduler: Rc<dyn FrameScheduler>,
        cfg: &AnimationConfig,
    ) -> Self {
        // Paced by sample count rather than arc length: samples are already spread
        // evenly along the curve, and this keeps a run near `max_steps` frames
        // whatever units the coordinates are in.
        let samples = points.len();
        let max_steps = cfg.max_steps.max(1);
        let (step_size, steps) = if samples > max_steps {
            (samples as f64 / max_steps as f64, max_steps)
        } else {
            (1.0, samples)
        };
        Self {
            inner: Rc::new(MarkerInner {
                layer,
                marker,
                points: points.into(),
                options,
                surface,
                scheduler,
                hold_ms: cfg.hold_ms,
                step_size,
                steps,
                current: RefCell::new(None),
            }),
        }
    }

    pub fn marker_id(&self) -> MarkerId {
        self.inner.marker
    }

    /// Samples advanced per frame.
    pub fn step_size(&self) -> f64 {
        self.inner.step_size
    }

    /// Frames one run takes to reach the last point.
    pub fn steps(&self) -> usize {
        self.inner.steps
    }

    pub fn points(&self) -> &[LatLng] {
        &self.inner.points
    }

    /// Cancel the run in flight, if any.
    pub fn cancel(&self) {
        if let Some(slot) = self.inner.current.borrow().as_ref() {
            slot.token.cancel();
        }
    }
}

impl std::fmt::Debug for MovingMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovingMarker")
            .field("layer", &self.inner.layer)
            .field("marker", &self.inner.marker)
            .field("samples", &self.inner.points.len())
            .field("step_size", &self.inner.step_size)
            .finish()
    }
}

impl PathAnimation for MovingMarker {
    /// Starting a run cancels the previous one; the new run attaches only after
    /// the previous marker has been detached.
    fn start_animation(&self, duration_ms: f64) -> AnimationHandle {
        let token = CancelToken::new();
        let done = CancelToken::new();
        let previous = self.inner.current.replace(Some(RunSlot {
            token: token.clone(),
            done: done.clone(),
        }));
        if let Some(prev) = &previous {
            prev.token.cancel();
        }

        // Built outside the async block so an unpolled, dropped run still fires it.
        let latch = FireOnDrop(done);
        let inner = Rc::clone(&self.inner);
        let run_token = token.clone();
        AnimationHandle::new(token, async move {
            let _latch = latch;
            if let Some(prev) = previous {
                // An earlier handle may never be polled again; our own cancel still wins.
                let detached = prev.done.cancelled();
                let cancelled = run_token.cancelled();
                select(pin!(detached), pin!(cancelled)).await;
            }
            if run_token.is_cancelled() {
                return AnimationOutcome::Cancelled;
            }
            inner.run(duration_ms, &run_token).await
        })
    }
}

impl MarkerInner {
    async fn run(&self, duration_ms: f64, token: &CancelToken) -> AnimationOutcome {
        let Some(&first) = self.points.first() else {
            return AnimationOutcome::Completed;
        };
        let attached = match AttachedMarker::attach(self, first) {
            Ok(attached) => attached,
            Err(err) => {
                warn!("{}: could not attach {:?}: {err}", self.layer, self.marker);
                return AnimationOutcome::Failed(err.to_string());
            }
        };

        let duration = if duration_ms.is_finite() {
            duration_ms.max(0.0)
        } else {
            0.0
        };
        let delay = self.step_size * duration / self.points.len() as f64;
        trace!(
            "{}: {:?} runs {} steps, {delay:.2}ms apart",
            self.layer,
            self.marker,
            self.steps
        );

        let mut outcome = AnimationOutcome::Completed;
        for step in 0..self.steps {
            if !wait_or_cancel(self.scheduler.frame_after(delay), token).await {
                outcome = AnimationOutcome::Cancelled;
                break;
            }
            if let Err(err) = self.move_to(self.sample_index(step)) {
                warn!("{}: moving {:?} failed: {err}", self.layer, self.marker);
                outcome = AnimationOutcome::Failed(err.to_string());
                break;
            }
        }

        if outcome.is_completed() {
            let hold = self.scheduler.sleep(self.hold_ms);
            if !wait_or_cancel(hold, token).await {
                outcome = AnimationOutcome::Cancelled;
            }
        }

        if let Err(err) = attached.detach() {
            warn!("{}: detaching {:?} failed: {err}", self.layer, self.marker);
            if outcome.is_completed() {
                outcome = AnimationOutcome::Failed(err.to_string());
            }
        }
        outcome
    }

    /// Sample shown on `step`; the final step always lands on the last point.
    fn sample_index(&self, step: usize) -> usize {
        let last = self.points.len().saturating_sub(1);
        if step + 1 >= self.steps {
            return last;
        }
        ((step as f64 * self.step_size).floor() as usize).min(last)
    }

    fn move_to(&self, index: usize) -> Result<(), SurfaceError> {
        let at = self.points[index];
        self.surface.set_marker_location(&self.layer, self.marker, at)
    }
}

/// Resolves `true` when `wait` finishes first, `false` on cancellation.
async fn wait_or_cancel(wait: LocalBoxFuture<'static, ()>, token: &CancelToken) -> bool {
    if token.is_cancelled() {
        return false;
    }
    match select(wait, token.cancelled()).await {
        Either::Left(_) => !token.is_cancelled(),
        Either::Right(_) => false,
    }
}

/// A marker placed on the surface. Hidden and removed once, either through
/// [`detach`](Self::detach) or on drop.
struct AttachedMarker<'a> {
    owner: &'a MarkerInner,
    detached: bool,
}

impl<'a> AttachedMarker<'a> {
    fn attach(owner: &'a MarkerInner, at: LatLng) -> Result<Self, SurfaceError> {
        owner
            .surface
            .add_marker(&owner.layer, owner.marker, at, &owner.options)?;
        // From here on the guard owns cleanup, including on the error paths below.
        let guard = Self {
            owner,
            detached: false,
        };
        owner
            .surface
            .set_marker_location(&owner.layer, owner.marker, at)?;
        owner
            .surface
            .set_marker_visible(&owner.layer, owner.marker, true)?;
        Ok(guard)
    }

    fn detach(mut self) -> Result<(), SurfaceError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), SurfaceError> {
        if self.detached {
            return Ok(());
        }
        self.detached = true;
        let surface = &self.owner.surface;
        let hidden = surface.set_marker_visible(&self.owner.layer, self.owner.marker, false);
        let removed = surface.remove_marker(&self.owner.layer, self.owner.marker);
        hidden.and(removed)
    }
}

impl Drop for AttachedMarker<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(
                "{}: detaching {:?} on drop failed: {err}",
                self.owner.layer, self.owner.marker
            );
        }
    }
}
