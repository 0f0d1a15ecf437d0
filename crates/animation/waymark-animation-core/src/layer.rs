//! Layer binding: keeps a rendering surface and an animation loop in sync with
//! the polylines mounted on one layer.
//!
//! Any change to the animated entity set rebuilds the manager: the old one is
//! stopped, a new one is built from a fresh snapshot, and its loop is spawned
//! behind the previous loop so two cycles never overlap.

use std::rc::Rc;

use futures::channel::oneshot;
use futures::task::{LocalSpawn, LocalSpawnExt};
use hashbrown::HashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use waymark_geometry::{generate_path_points_with, LatLng};

use crate::aggregator::EntityAggregator;
use crate::clock::FrameScheduler;
use crate::config::LayerConfig;
use crate::entity::{EntityDescriptor, EntityKind};
use crate::error::LayerError;
use crate::ids::{EntityId, IdAllocator, LayerId, MarkerId};
use crate::manager::MarkerPathAnimationManager;
use crate::marker::MovingMarker;
use crate::ready::MapReady;
use crate::surface::{LineOptions, MarkerOptions, RenderSurface};

/// Declarative description of a polyline to mount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolylineSpec {
    pub path: Vec<LatLng>,
    /// Animation round this line's marker runs in.
    pub level: i32,
    pub curved: bool,
    pub sample_count: Option<usize>,
    pub with_moving_marker: bool,
    pub marker: MarkerOptions,
    pub line: LineOptions,
}

impl Default for PolylineSpec {
    fn default() -> Self {
        Self {
            path: Vec::new(),
            level: 0,
            curved: true,
            sample_count: None,
            with_moving_marker: false,
            marker: MarkerOptions::default(),
            line: LineOptions::default(),
        }
    }
}

impl PolylineSpec {
    pub fn new(path: Vec<LatLng>) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    pub fn at_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn straight(mut self) -> Self {
        self.curved = false;
        self
    }

    pub fn with_moving_marker(mut self) -> Self {
        self.with_moving_marker = true;
        self
    }
}

#[derive(Debug)]
struct MountedPolyline {
    marker: Option<Rc<MovingMarker>>,
}

pub struct Layer<S: LocalSpawn> {
    id: LayerId,
    config: LayerConfig,
    surface: Rc<dyn RenderSurface>,
    scheduler: Rc<dyn FrameScheduler>,
    spawner: S,
    ready: MapReady,
    ids: IdAllocator,
    entities: EntityAggregator,
    mounted: HashMap<EntityId, MountedPolyline>,
    manager: Option<MarkerPathAnimationManager>,
    active: bool,
    /// Resolves when the most recently spawned loop has exited.
    last_loop: Option<oneshot::Receiver<()>>,
}

impl<S: LocalSpawn> Layer<S> {
    pub fn new(
        id: LayerId,
        config: LayerConfig,
        surface: Rc<dyn RenderSurface>,
        scheduler: Rc<dyn FrameScheduler>,
        spawner: S,
        ready: MapReady,
    ) -> Result<Self, LayerError> {
        config.validate()?;
        Ok(Self {
            id,
            config,
            surface,
            scheduler,
            spawner,
            ready,
            ids: IdAllocator::new(),
            entities: EntityAggregator::new(),
            mounted: HashMap::new(),
            manager: None,
            active: false,
            last_loop: None,
        })
    }

    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn entities(&self) -> &EntityAggregator {
        &self.entities
    }

    /// The manager driving the current loop; `None` while the layer is inactive.
    pub fn manager(&self) -> Option<&MarkerPathAnimationManager> {
        self.manager.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    pub fn marker_for(&self, entity: EntityId) -> Option<MarkerId> {
        self.mounted
            .get(&entity)
            .and_then(|m| m.marker.as_ref())
            .map(|marker| marker.marker_id())
    }

    /// Sample the path, draw it, and register its moving marker (if any) with
    /// the animation cycle.
    pub fn mount_polyline(&mut self, spec: PolylineSpec) -> Result<EntityId, LayerError> {
        let sampled = generate_path_points_with(
            &self.config.sampling,
            &spec.path,
            spec.curved,
            spec.sample_count,
        )?;
        let id = self.ids.alloc_entity();
        self.surface
            .add_polyline(&self.id, id, &sampled.path, &spec.line)?;

        let marker = if spec.with_moving_marker {
            let marker = Rc::new(MovingMarker::new(
                self.id.clone(),
                self.ids.alloc_marker(),
                sampled.path,
                spec.marker,
                Rc::clone(&self.surface),
                Rc::clone(&self.scheduler),
                &self.config.animation,
            ));
            self.entities.add(
                EntityDescriptor::new(id, EntityKind::Polyline, spec.level, sampled.length)
                    .with_animation(marker.clone()),
            );
            Some(marker)
        } else {
            None
        };

        debug!(
            "{}: mounted {id:?} at level {} ({:.3} long, animated: {})",
            self.id,
            spec.level,
            sampled.length,
            marker.is_some()
        );
        let animated = marker.is_some();
        self.mounted.insert(id, MountedPolyline { marker });
        if animated {
            if let Err(err) = self.rebuild() {
                self.discard(id);
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Remove a mounted polyline. A marker in flight is cancelled and detached.
    pub fn unmount(&mut self, id: EntityId) -> Result<(), LayerError> {
        let mounted = self
            .mounted
            .remove(&id)
            .ok_or(LayerError::UnknownEntity(id))?;
        if let Some(marker) = &mounted.marker {
            marker.cancel();
        }
        let removed = self.surface.remove_polyline(&self.id, id);
        if self.entities.remove(id).is_some() {
            self.rebuild()?;
        }
        removed?;
        debug!("{}: unmounted {id:?}", self.id);
        Ok(())
    }

    /// Undo a mount whose manager could not be rebuilt.
    fn discard(&mut self, id: EntityId) {
        if let Some(marker) = self.mounted.remove(&id).and_then(|m| m.marker) {
            marker.cancel();
        }
        self.entities.remove(id);
        if let Err(err) = self.surface.remove_polyline(&self.id, id) {
            warn!("{}: removing {id:?} after a failed mount failed: {err}", self.id);
        }
    }

    /// Start cycling once the map is ready.
    pub fn activate(&mut self) -> Result<(), LayerError> {
        if self.active {
            return Ok(());
        }
        self.active = true;
        let rebuilt = self.rebuild();
        if rebuilt.is_err() {
            self.active = false;
        }
        rebuilt
    }

    /// Stop cycling; the level in flight finishes on its own.
    pub fn deactivate(&mut self) {
        self.active = false;
        if let Some(manager) = self.manager.take() {
            manager.stop();
        }
    }

    fn rebuild(&mut self) -> Result<(), LayerError> {
        if let Some(old) = self.manager.take() {
            old.stop();
        }
        if !self.active {
            return Ok(());
        }

        let manager = MarkerPathAnimationManager::with_scheduler(
            self.entities.snapshot(),
            self.config.animation_duration_ms,
            &self.config.animation,
            Rc::clone(&self.scheduler),
        );
        // Started here so a stop() issued before the loop is first polled still lands.
        let cycle = manager.start();

        let previous = self.last_loop.take();
        let (done_tx, done_rx) = oneshot::channel();
        self.last_loop = Some(done_rx);
        let ready = self.ready.clone();
        let layer = self.id.clone();

        self.spawner
            .spawn_local(async move {
                if let Some(previous) = previous {
                    // Err only means the previous loop was dropped; either way it is over.
                    let _ = previous.await;
                }
                match ready.await {
                    Ok(()) => cycle.await,
                    Err(err) => warn!("{layer}: {err}; animation loop not started"),
                }
                let _ = done_tx.send(());
            })
            .map_err(|err| {
                manager.stop();
                LayerError::Spawn(err.to_string())
            })?;
        self.manager = Some(manager);
        Ok(())
    }
}

impl<S: LocalSpawn> Drop for Layer<S> {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.take() {
            manager.stop();
        }
        for (id, mounted) in self.mounted.drain() {
            if let Some(marker) = &mounted.marker {
                marker.cancel();
            }
            if let Err(err) = self.surface.remove_polyline(&self.id, id) {
                warn!("{}: removing {id:?} on drop failed: {err}", self.id);
            }
        }
    }
}

impl<S: LocalSpawn> std::fmt::Debug for Layer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.id)
            .field("mounted", &self.mounted.len())
            .field("animated", &self.entities.len())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
