use std::cell::RefCell;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::executor::LocalPool;
use futures::task::{noop_waker, LocalSpawnExt};
use futures::FutureExt;
use waymark_animation::{
    AnimationConfig, AnimationHandle, AnimationOutcome, FrameClock, LatLng, LayerId, MarkerId,
    MarkerOptions, MemorySurface, MovingMarker, PathAnimation, SurfaceOp,
};

type Slot = Rc<RefCell<Option<AnimationOutcome>>>;

struct Rig {
    pool: LocalPool,
    clock: FrameClock,
    surface: Rc<MemorySurface>,
    layer: LayerId,
}

impl Rig {
    fn new() -> Self {
        Self {
            pool: LocalPool::new(),
            clock: FrameClock::new(),
            surface: Rc::new(MemorySurface::new()),
            layer: LayerId::from("routes"),
        }
    }

    fn marker(&self, samples: usize) -> MovingMarker {
        let points = (0..samples)
            .map(|i| LatLng::new(i as f64, -(i as f64)))
            .collect();
        MovingMarker::new(
            self.layer.clone(),
            MarkerId(7),
            points,
            MarkerOptions::default(),
            self.surface.clone(),
            Rc::new(self.clock.clone()),
            &AnimationConfig::default(),
        )
    }

    fn spawn(&mut self, handle: AnimationHandle) -> Slot {
        let slot: Slot = Rc::new(RefCell::new(None));
        let out = Rc::clone(&slot);
        self.pool
            .spawner()
            .spawn_local(async move {
                *out.borrow_mut() = Some(handle.await);
            })
            .unwrap();
        self.pool.run_until_stalled();
        slot
    }

    fn frames(&mut self, count: usize, dt_ms: f64) {
        for _ in 0..count {
            self.clock.tick(dt_ms);
            self.pool.run_until_stalled();
        }
    }

    fn count(&self, pred: impl Fn(&SurfaceOp) -> bool) -> usize {
        self.surface.count_ops(pred)
    }
}

fn is_move(op: &SurfaceOp) -> bool {
    matches!(op, SurfaceOp::MarkerMoved { .. })
}

fn is_remove(op: &SurfaceOp) -> bool {
    matches!(op, SurfaceOp::MarkerRemoved { .. })
}

#[test]
fn run_attaches_steps_holds_then_detaches() {
    let mut rig = Rig::new();
    let marker = rig.marker(10);
    let outcome = rig.spawn(marker.start_animation(1000.0));

    // Attached hidden, placed on the first point, then shown.
    let ops = rig.surface.ops();
    assert!(matches!(ops[0], SurfaceOp::MarkerAdded { id: MarkerId(7), .. }));
    assert!(matches!(ops[1], SurfaceOp::MarkerMoved { .. }));
    assert!(matches!(ops[2], SurfaceOp::MarkerShown { .. }));
    let live = rig.surface.marker(&rig.layer, MarkerId(7)).unwrap();
    assert!(live.visible);
    assert_eq!(live.options.z_index, 1);

    // 10 samples over 1000ms: one sample per 100ms frame.
    rig.frames(10, 100.0);
    assert_eq!(rig.count(is_move), 11);
    let live = rig.surface.marker(&rig.layer, MarkerId(7)).unwrap();
    assert_eq!(live.location, LatLng::new(9.0, -9.0));

    // Holds on the last point for 500ms before leaving.
    rig.frames(4, 100.0);
    assert!(outcome.borrow().is_none());
    assert!(rig.surface.marker(&rig.layer, MarkerId(7)).unwrap().visible);

    rig.frames(1, 100.0);
    assert_eq!(*outcome.borrow(), Some(AnimationOutcome::Completed));
    let ops = rig.surface.ops();
    let tail = &ops[ops.len() - 2..];
    assert!(matches!(tail[0], SurfaceOp::MarkerHidden { .. }));
    assert!(matches!(tail[1], SurfaceOp::MarkerRemoved { .. }));
    assert_eq!(rig.surface.marker_count(), 0);
}

#[test]
fn long_path_is_bounded_to_max_steps() {
    let mut rig = Rig::new();
    let marker = rig.marker(250);
    assert_eq!(marker.step_size(), 2.5);
    let outcome = rig.spawn(marker.start_animation(1000.0));

    // 2.5 samples per step: 10ms apart, 100 steps.
    rig.frames(99, 10.0);
    assert_eq!(rig.count(is_move), 100);
    rig.frames(1, 10.0);
    assert_eq!(rig.count(is_move), 101);
    assert_eq!(
        rig.surface.marker(&rig.layer, MarkerId(7)).unwrap().location,
        LatLng::new(249.0, -249.0)
    );

    rig.frames(50, 10.0);
    assert_eq!(*outcome.borrow(), Some(AnimationOutcome::Completed));
    assert_eq!(rig.count(is_move), 101);
}

#[test]
fn cancel_mid_flight_detaches_exactly_once() {
    let mut rig = Rig::new();
    let marker = rig.marker(10);
    let handle = marker.start_animation(1000.0);
    let token = handle.cancel_token();
    let outcome = rig.spawn(handle);

    rig.frames(3, 100.0);
    token.cancel();
    rig.pool.run_until_stalled();

    assert_eq!(*outcome.borrow(), Some(AnimationOutcome::Cancelled));
    assert_eq!(rig.count(is_move), 4);
    assert_eq!(rig.count(is_remove), 1);
    assert_eq!(rig.surface.marker_count(), 0);

    token.cancel();
    rig.frames(20, 100.0);
    assert_eq!(rig.count(is_remove), 1);
    assert_eq!(rig.count(is_move), 4);
}

#[test]
fn cancel_during_hold_still_detaches() {
    let mut rig = Rig::new();
    let marker = rig.marker(5);
    let outcome = rig.spawn(marker.start_animation(500.0));

    rig.frames(5, 100.0);
    assert!(outcome.borrow().is_none());
    marker.cancel();
    rig.pool.run_until_stalled();

    assert_eq!(*outcome.borrow(), Some(AnimationOutcome::Cancelled));
    assert_eq!(rig.count(is_remove), 1);
}

#[test]
fn dropping_the_run_detaches_the_marker() {
    let rig = Rig::new();
    let marker = rig.marker(10);
    let mut handle = marker.start_animation(1000.0);

    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    assert!(matches!(handle.poll_unpin(&mut cx), Poll::Pending));
    assert_eq!(rig.surface.marker_count(), 1);

    drop(handle);
    assert_eq!(rig.surface.marker_count(), 0);
    assert_eq!(rig.count(is_remove), 1);
    assert_eq!(rig.clock.pending_timers(), 0);
}

#[test]
fn cancel_before_first_poll_never_attaches() {
    let mut rig = Rig::new();
    let marker = rig.marker(10);
    let handle = marker.start_animation(1000.0);
    handle.cancel();
    let outcome = rig.spawn(handle);

    assert_eq!(*outcome.borrow(), Some(AnimationOutcome::Cancelled));
    assert!(rig.surface.ops().is_empty());
}

#[test]
fn surface_failure_is_reported_and_cleaned_up() {
    let mut rig = Rig::new();
    let marker = rig.marker(10);
    // One move for the attach, two steps, then the surface refuses.
    rig.surface.fail_marker_moves_after(3);
    let outcome = rig.spawn(marker.start_animation(1000.0));

    rig.frames(3, 100.0);
    assert!(matches!(
        *outcome.borrow(),
        Some(AnimationOutcome::Failed(_))
    ));
    assert_eq!(rig.count(is_move), 3);
    assert_eq!(rig.count(is_remove), 1);
    assert_eq!(rig.surface.marker_count(), 0);
}

#[test]
fn restart_cancels_the_previous_run_before_attaching_again() {
    let mut rig = Rig::new();
    let marker = rig.marker(10);
    let first = rig.spawn(marker.start_animation(1000.0));
    rig.frames(2, 100.0);

    let second = rig.spawn(marker.start_animation(1000.0));
    assert_eq!(*first.borrow(), Some(AnimationOutcome::Cancelled));
    assert_eq!(rig.count(is_remove), 1);
    assert_eq!(
        rig.count(|op| matches!(op, SurfaceOp::MarkerAdded { .. })),
        2
    );
    assert_eq!(rig.surface.marker_count(), 1);

    rig.frames(15, 100.0);
    assert_eq!(*second.borrow(), Some(AnimationOutcome::Completed));
    assert_eq!(rig.surface.marker_count(), 0);
}

#[test]
fn cancelling_a_run_queued_behind_an_idle_handle_resolves_promptly() {
    let mut rig = Rig::new();
    let marker = rig.marker(10);
    // Never polled: its latch only fires when it is dropped.
    let idle = marker.start_animation(1000.0);

    let queued = marker.start_animation(1000.0);
    let token = queued.cancel_token();
    let outcome = rig.spawn(queued);
    assert!(outcome.borrow().is_none());

    token.cancel();
    rig.pool.run_until_stalled();
    assert_eq!(*outcome.borrow(), Some(AnimationOutcome::Cancelled));
    assert!(rig.surface.ops().is_empty());
    drop(idle);
}
