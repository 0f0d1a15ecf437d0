//! Entity descriptors and the animation handle they hand out.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::ids::EntityId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Polyline,
    Pushpin,
}

/// How one animation run settled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnimationOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

impl AnimationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, AnimationOutcome::Completed)
    }
}

/// A running animation: await it for the outcome, or cancel it through its token.
#[must_use = "animations do nothing unless awaited"]
pub struct AnimationHandle {
    token: CancelToken,
    run: LocalBoxFuture<'static, AnimationOutcome>,
}

impl AnimationHandle {
    pub fn new<F>(token: CancelToken, run: F) -> Self
    where
        F: Future<Output = AnimationOutcome> + 'static,
    {
        Self {
            token,
            run: run.boxed_local(),
        }
    }

    /// A handle that is already settled.
    pub fn ready(outcome: AnimationOutcome) -> Self {
        Self::new(CancelToken::new(), futures::future::ready(outcome))
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Future for AnimationHandle {
    type Output = AnimationOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<AnimationOutcome> {
        self.run.as_mut().poll(cx)
    }
}

impl fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Something that can move along a path within a time budget.
pub trait PathAnimation {
    fn start_animation(&self, duration_ms: f64) -> AnimationHandle;
}

/// One entity as seen by the animation manager.
#[derive(Clone)]
pub struct EntityDescriptor {
    pub id: EntityId,
    pub kind: EntityKind,
    pub level: i32,
    /// Path length in projected coordinate units.
    pub length: f64,
    pub animation: Option<Rc<dyn PathAnimation>>,
}

impl EntityDescriptor {
    /// Static entity; attach an animation with [`with_animation`](Self::with_animation).
    pub fn new(id: EntityId, kind: EntityKind, level: i32, length: f64) -> Self {
        Self {
            id,
            kind,
            level,
            length,
            animation: None,
        }
    }

    pub fn with_animation(mut self, animation: Rc<dyn PathAnimation>) -> Self {
        self.animation = Some(animation);
        self
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }

    pub fn start_animation(&self, duration_ms: f64) -> Option<AnimationHandle> {
        self.animation
            .as_ref()
            .map(|anim| anim.start_animation(duration_ms))
    }
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("level", &self.level)
            .field("length", &self.length)
            .field("animated", &self.is_animated())
            .finish()
    }
}
