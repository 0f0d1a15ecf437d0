//! Level-by-level animation cycle.
//!
//! The manager is built from a snapshot of a layer's entities. Each cycle walks
//! the levels from lowest to highest; all animated entities on a level run
//! concurrently and the next level starts only once every one of them has
//! settled. `stop()` is cooperative: the level in flight finishes, no further
//! level begins.
//!
//! A cycle in which no level ever had to wait (every animation settled on its
//! first poll, e.g. because the surface refused to attach its marker) is
//! followed by a one-frame pause on the manager's scheduler, so a broken
//! surface costs one cycle per frame instead of hanging the executor. Without
//! a scheduler such a cycle ends the loop.

use std::cell::Cell;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;

use futures::future::{join_all, poll_fn, FutureExt, LocalBoxFuture};
use log::{debug, trace, warn};

use crate::budget::LevelBudget;
use crate::clock::FrameScheduler;
use crate::config::AnimationConfig;
use crate::entity::{AnimationOutcome, EntityDescriptor};

/// Cheap to clone; clones drive and observe the same cycle.
#[derive(Clone, Debug)]
pub struct MarkerPathAnimationManager {
    inner: Rc<ManagerInner>,
}

struct ManagerInner {
    entities: Vec<EntityDescriptor>,
    budget: LevelBudget,
    /// Paces cycles that never suspended.
    scheduler: Option<Rc<dyn FrameScheduler>>,
    running: Cell<bool>,
    /// Bumped on every start so a stale loop notices a restart.
    generation: Cell<u64>,
    levels_executed: Cell<u64>,
    cycles_completed: Cell<u64>,
}

impl std::fmt::Debug for ManagerInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerInner")
            .field("entities", &self.entities)
            .field("budget", &self.budget)
            .field("paced", &self.scheduler.is_some())
            .field("running", &self.running.get())
            .field("generation", &self.generation.get())
            .finish_non_exhaustive()
    }
}

impl ManagerInner {
    fn is_current(&self, generation: u64) -> bool {
        self.running.get() && self.generation.get() == generation
    }
}

impl MarkerPathAnimationManager {
    pub fn new(entities: Vec<EntityDescriptor>, total_duration_ms: f64) -> Self {
        Self::with_config(entities, total_duration_ms, &AnimationConfig::default())
    }

    pub fn with_config(
        entities: Vec<EntityDescriptor>,
        total_duration_ms: f64,
        cfg: &AnimationConfig,
    ) -> Self {
        Self::build(entities, total_duration_ms, cfg, None)
    }

    /// Like [`with_config`](Self::with_config), pausing one frame on `scheduler`
    /// after any cycle that completed without suspending.
    pub fn with_scheduler(
        entities: Vec<EntityDescriptor>,
        total_duration_ms: f64,
        cfg: &AnimationConfig,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Self {
        Self::build(entities, total_duration_ms, cfg, Some(scheduler))
    }

    fn build(
        entities: Vec<EntityDescriptor>,
        total_duration_ms: f64,
        cfg: &AnimationConfig,
        scheduler: Option<Rc<dyn FrameScheduler>>,
    ) -> Self {
        let budget = LevelBudget::compute(&entities, total_duration_ms, cfg);
        debug!(
            "animation manager built: {} entities, levels {}..={}, {}ms per cycle",
            entities.len(),
            budget.level_min,
            budget.level_max,
            total_duration_ms
        );
        Self {
            inner: Rc::new(ManagerInner {
                entities,
                budget,
                scheduler,
                running: Cell::new(false),
                generation: Cell::new(0),
                levels_executed: Cell::new(0),
                cycles_completed: Cell::new(0),
            }),
        }
    }

    /// Begin cycling. The returned future drives the cycle and resolves after
    /// `stop()`. Calling `start` while already running, or on a manager with no
    /// animated entity, yields a future that resolves immediately.
    pub fn start(&self) -> LocalBoxFuture<'static, ()> {
        let inner = Rc::clone(&self.inner);
        if inner.running.get() {
            trace!("animation manager already running");
            return futures::future::ready(()).boxed_local();
        }
        if !inner.entities.iter().any(EntityDescriptor::is_animated) {
            debug!("animation manager has nothing to animate");
            return futures::future::ready(()).boxed_local();
        }

        let generation = inner.generation.get().wrapping_add(1);
        inner.generation.set(generation);
        inner.running.set(true);
        debug!("animation manager started (generation {generation})");

        async move {
            while inner.is_current(generation) {
                let mut suspended = false;
                for level in inner.budget.level_min..=inner.budget.level_max {
                    if !inner.is_current(generation) {
                        break;
                    }
                    suspended |= run_level(&inner, level).await;
                }
                if !inner.is_current(generation) {
                    break;
                }
                inner.cycles_completed.set(inner.cycles_completed.get() + 1);
                if suspended {
                    continue;
                }
                match &inner.scheduler {
                    Some(scheduler) => {
                        trace!("cycle settled without waiting; pausing one frame");
                        scheduler.frame_after(0.0).await;
                    }
                    None => {
                        warn!("cycle settled without waiting and nothing paces it; stopping");
                        inner.running.set(false);
                    }
                }
            }
            debug!("animation manager loop exited (generation {generation})");
        }
        .boxed_local()
    }

    /// Let the level in flight finish and begin no further levels.
    pub fn stop(&self) {
        if self.inner.running.replace(false) {
            debug!("animation manager stopping");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    pub fn budget(&self) -> &LevelBudget {
        &self.inner.budget
    }

    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.inner.entities
    }

    /// Levels that started at least one animation, across all cycles.
    pub fn levels_executed(&self) -> u64 {
        self.inner.levels_executed.get()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.inner.cycles_completed.get()
    }
}

/// Runs one level. Returns whether the level had to wait for its animations.
async fn run_level(inner: &ManagerInner, level: i32) -> bool {
    let duration = inner.budget.duration_for(level);
    let runs: Vec<_> = inner
        .entities
        .iter()
        .filter(|e| e.level == level)
        .filter_map(|e| e.start_animation(duration).map(|handle| (e.id, handle)))
        .collect();
    if runs.is_empty() {
        return false;
    }

    trace!(
        "level {level}: {} animation(s) over {duration:.1}ms",
        runs.len()
    );
    inner.levels_executed.set(inner.levels_executed.get() + 1);

    let (ids, handles): (Vec<_>, Vec<_>) = runs.into_iter().unzip();
    let mut join = pin!(join_all(handles));
    let mut suspended = false;
    let outcomes = poll_fn(|cx| {
        let poll = join.as_mut().poll(cx);
        suspended |= poll.is_pending();
        poll
    })
    .await;
    for (id, outcome) in ids.into_iter().zip(outcomes) {
        match outcome {
            AnimationOutcome::Completed => {}
            AnimationOutcome::Cancelled => trace!("level {level}: {id:?} cancelled"),
            AnimationOutcome::Failed(reason) => {
                warn!("level {level}: animation for {id:?} failed: {reason}")
            }
        }
    }
    suspended
}
