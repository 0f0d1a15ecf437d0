//! Frame scheduling.
//!
//! `FrameScheduler` is the only timing primitive the animation code uses.
//! `FrameClock` implements it for hosts that pump display frames themselves:
//! call `tick(dt_ms)` once per frame and every timer that has come due is
//! woken on that frame, much like `setTimeout(requestAnimationFrame, delay)`.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use futures::future::LocalBoxFuture;

pub trait FrameScheduler {
    /// Resolve on the first display frame at least `delay_ms` from now.
    fn frame_after(&self, delay_ms: f64) -> LocalBoxFuture<'static, ()>;

    /// Resolve once `ms` have elapsed.
    fn sleep(&self, ms: f64) -> LocalBoxFuture<'static, ()>;
}

/// Host-driven clock. Cloning shares the same timeline.
#[derive(Clone, Debug, Default)]
pub struct FrameClock {
    state: Rc<RefCell<ClockState>>,
}

#[derive(Debug, Default)]
struct ClockState {
    now_ms: f64,
    frames: u64,
    timers: Vec<Weak<TimerSlot>>,
}

#[derive(Debug)]
struct TimerSlot {
    due_ms: f64,
    fired: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> f64 {
        self.state.borrow().now_ms
    }

    pub fn frames(&self) -> u64 {
        self.state.borrow().frames
    }

    /// Timers still waiting (dropped timers are not counted).
    pub fn pending_timers(&self) -> usize {
        self.state
            .borrow()
            .timers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Advance one display frame by `dt_ms` and wake every timer now due.
    /// Returns the number of timers fired.
    pub fn tick(&self, dt_ms: f64) -> usize {
        let due: Vec<Rc<TimerSlot>> = {
            let mut st = self.state.borrow_mut();
            if dt_ms.is_finite() && dt_ms > 0.0 {
                st.now_ms += dt_ms;
            }
            st.frames += 1;
            let now = st.now_ms;
            let mut due = Vec::new();
            st.timers.retain(|weak| match weak.upgrade() {
                None => false,
                Some(slot) if slot.due_ms <= now => {
                    due.push(slot);
                    false
                }
                Some(_) => true,
            });
            due
        };

        for slot in &due {
            slot.fired.set(true);
            if let Some(waker) = slot.waker.borrow_mut().take() {
                waker.wake();
            }
        }
        due.len()
    }

    fn timer(&self, delay_ms: f64) -> Timer {
        let delay = if delay_ms.is_finite() {
            delay_ms.max(0.0)
        } else {
            0.0
        };
        let mut st = self.state.borrow_mut();
        let slot = Rc::new(TimerSlot {
            due_ms: st.now_ms + delay,
            fired: Cell::new(false),
            waker: RefCell::new(None),
        });
        st.timers.push(Rc::downgrade(&slot));
        Timer { slot }
    }
}

impl FrameScheduler for FrameClock {
    fn frame_after(&self, delay_ms: f64) -> LocalBoxFuture<'static, ()> {
        Box::pin(self.timer(delay_ms))
    }

    fn sleep(&self, ms: f64) -> LocalBoxFuture<'static, ()> {
        Box::pin(self.timer(ms))
    }
}

#[must_use = "futures do nothing unless polled"]
struct Timer {
    slot: Rc<TimerSlot>,
}

impl Future for Timer {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.slot.fired.get() {
            return Poll::Ready(());
        }
        *self.slot.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}
