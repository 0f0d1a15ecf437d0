//! Rendering surface contract and an in-memory implementation.
//!
//! The surface is whatever actually draws the map (an SDK binding, a canvas,
//! a test double). All calls take `&self`; the animation runs share one
//! surface through `Rc` and implementations use interior mutability.

use std::cell::RefCell;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use waymark_geometry::LatLng;

use crate::error::SurfaceError;
use crate::ids::{EntityId, LayerId, MarkerId};

/// Display options for a moving marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerOptions {
    /// Stacking order; markers sit above their line by default.
    pub z_index: i32,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl Default for MarkerOptions {
    fn default() -> Self {
        Self {
            z_index: 1,
            title: None,
            icon: None,
            color: None,
        }
    }
}

/// Display options for a polyline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineOptions {
    pub stroke_color: Option<String>,
    pub stroke_thickness: Option<f64>,
    pub visible: bool,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            stroke_color: None,
            stroke_thickness: None,
            visible: true,
        }
    }
}

pub trait RenderSurface {
    fn add_polyline(
        &self,
        layer: &LayerId,
        id: EntityId,
        points: &[LatLng],
        options: &LineOptions,
    ) -> Result<(), SurfaceError>;

    fn remove_polyline(&self, layer: &LayerId, id: EntityId) -> Result<(), SurfaceError>;

    /// Place a marker; it starts hidden.
    fn add_marker(
        &self,
        layer: &LayerId,
        id: MarkerId,
        at: LatLng,
        options: &MarkerOptions,
    ) -> Result<(), SurfaceError>;

    fn set_marker_location(
        &self,
        layer: &LayerId,
        id: MarkerId,
        at: LatLng,
    ) -> Result<(), SurfaceError>;

    fn set_marker_visible(
        &self,
        layer: &LayerId,
        id: MarkerId,
        visible: bool,
    ) -> Result<(), SurfaceError>;

    fn remove_marker(&self, layer: &LayerId, id: MarkerId) -> Result<(), SurfaceError>;
}

/// Live state of a marker on a [`MemorySurface`].
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerState {
    pub location: LatLng,
    pub visible: bool,
    pub options: MarkerOptions,
}

/// One successful call recorded by a [`MemorySurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceOp {
    PolylineAdded { layer: LayerId, id: EntityId, points: usize },
    PolylineRemoved { layer: LayerId, id: EntityId },
    MarkerAdded { layer: LayerId, id: MarkerId, at: LatLng },
    MarkerMoved { layer: LayerId, id: MarkerId, to: LatLng },
    MarkerShown { layer: LayerId, id: MarkerId },
    MarkerHidden { layer: LayerId, id: MarkerId },
    MarkerRemoved { layer: LayerId, id: MarkerId },
}

/// Headless surface: keeps live primitives in maps and logs every call.
#[derive(Debug, Default)]
pub struct MemorySurface {
    state: RefCell<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    polylines: HashMap<(LayerId, EntityId), Vec<LatLng>>,
    markers: HashMap<(LayerId, MarkerId), MarkerState>,
    ops: Vec<SurfaceOp>,
    /// Reject marker moves once this many have succeeded.
    move_budget: Option<usize>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `set_marker_location` fail after `n` more successful moves.
    pub fn fail_marker_moves_after(&self, n: usize) {
        self.state.borrow_mut().move_budget = Some(n);
    }

    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.state.borrow().ops.clone()
    }

    pub fn count_ops(&self, pred: impl Fn(&SurfaceOp) -> bool) -> usize {
        self.state.borrow().ops.iter().filter(|op| pred(op)).count()
    }

    pub fn marker(&self, layer: &LayerId, id: MarkerId) -> Option<MarkerState> {
        self.state
            .borrow()
            .markers
            .get(&(layer.clone(), id))
            .cloned()
    }

    pub fn polyline(&self, layer: &LayerId, id: EntityId) -> Option<Vec<LatLng>> {
        self.state
            .borrow()
            .polylines
            .get(&(layer.clone(), id))
            .cloned()
    }

    pub fn marker_count(&self) -> usize {
        self.state.borrow().markers.len()
    }

    pub fn polyline_count(&self) -> usize {
        self.state.borrow().polylines.len()
    }

    fn unknown_marker(layer: &LayerId, id: MarkerId) -> SurfaceError {
        SurfaceError::UnknownMarker {
            layer: layer.to_string(),
            marker: id,
        }
    }
}

impl RenderSurface for MemorySurface {
    fn add_polyline(
        &self,
        layer: &LayerId,
        id: EntityId,
        points: &[LatLng],
        _options: &LineOptions,
    ) -> Result<(), SurfaceError> {
        let mut st = self.state.borrow_mut();
        let key = (layer.clone(), id);
        if st.polylines.contains_key(&key) {
            return Err(SurfaceError::Duplicate {
                layer: layer.to_string(),
                what: format!("polyline {id:?}"),
            });
        }
        st.polylines.insert(key, points.to_vec());
        st.ops.push(SurfaceOp::PolylineAdded {
            layer: layer.clone(),
            id,
            points: points.len(),
        });
        Ok(())
    }

    fn remove_polyline(&self, layer: &LayerId, id: EntityId) -> Result<(), SurfaceError> {
        let mut st = self.state.borrow_mut();
        if st.polylines.remove(&(layer.clone(), id)).is_none() {
            return Err(SurfaceError::UnknownPolyline {
                layer: layer.to_string(),
                entity: id,
            });
        }
        st.ops.push(SurfaceOp::PolylineRemoved {
            layer: layer.clone(),
            id,
        });
        Ok(())
    }

    fn add_marker(
        &self,
        layer: &LayerId,
        id: MarkerId,
        at: LatLng,
        options: &MarkerOptions,
    ) -> Result<(), SurfaceError> {
        let mut st = self.state.borrow_mut();
        let key = (layer.clone(), id);
        if st.markers.contains_key(&key) {
            return Err(SurfaceError::Duplicate {
                layer: layer.to_string(),
                what: format!("marker {id:?}"),
            });
        }
        st.markers.insert(
            key,
            MarkerState {
                location: at,
                visible: false,
                options: options.clone(),
            },
        );
        st.ops.push(SurfaceOp::MarkerAdded {
            layer: layer.clone(),
            id,
            at,
        });
        Ok(())
    }

    fn set_marker_location(
        &self,
        layer: &LayerId,
        id: MarkerId,
        at: LatLng,
    ) -> Result<(), SurfaceError> {
        let mut st = self.state.borrow_mut();
        if let Some(budget) = st.move_budget.as_mut() {
            if *budget == 0 {
                return Err(SurfaceError::Rejected {
                    reason: "marker move refused".into(),
                });
            }
            *budget -= 1;
        }
        let marker = st
            .markers
            .get_mut(&(layer.clone(), id))
            .ok_or_else(|| Self::unknown_marker(layer, id))?;
        marker.location = at;
        st.ops.push(SurfaceOp::MarkerMoved {
            layer: layer.clone(),
            id,
            to: at,
        });
        Ok(())
    }

    fn set_marker_visible(
        &self,
        layer: &LayerId,
        id: MarkerId,
        visible: bool,
    ) -> Result<(), SurfaceError> {
        let mut st = self.state.borrow_mut();
        let marker = st
            .markers
            .get_mut(&(layer.clone(), id))
            .ok_or_else(|| Self::unknown_marker(layer, id))?;
        marker.visible = visible;
        let op = if visible {
            SurfaceOp::MarkerShown {
                layer: layer.clone(),
                id,
            }
        } else {
            SurfaceOp::MarkerHidden {
                layer: layer.clone(),
                id,
            }
        };
        st.ops.push(op);
        Ok(())
    }

    fn remove_marker(&self, layer: &LayerId, id: MarkerId) -> Result<(), SurfaceError> {
        let mut st = self.state.borrow_mut();
        if st.markers.remove(&(layer.clone(), id)).is_none() {
            return Err(Self::unknown_marker(layer, id));
        }
        st.ops.push(SurfaceOp::MarkerRemoved {
            layer: layer.clone(),
            id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_lifecycle_is_logged() {
        let surface = MemorySurface::new();
        let layer = LayerId::from("routes");
        let id = MarkerId(3);
        let a = LatLng::new(1.0, 2.0);

        surface
            .add_marker(&layer, id, a, &MarkerOptions::default())
            .unwrap();
        assert!(!surface.marker(&layer, id).unwrap().visible);
        surface.set_marker_visible(&layer, id, true).unwrap();
        surface
            .set_marker_location(&layer, id, LatLng::new(3.0, 4.0))
            .unwrap();
        surface.remove_marker(&layer, id).unwrap();

        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.ops().len(), 4);
        assert!(matches!(
            surface.remove_marker(&layer, id),
            Err(SurfaceError::UnknownMarker { .. })
        ));
    }

    #[test]
    fn duplicate_polyline_is_rejected() {
        let surface = MemorySurface::new();
        let layer = LayerId::from("routes");
        let pts = [LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)];
        surface
            .add_polyline(&layer, EntityId(0), &pts, &LineOptions::default())
            .unwrap();
        assert!(surface
            .add_polyline(&layer, EntityId(0), &pts, &LineOptions::default())
            .is_err());
        // Same id on another layer is a different primitive.
        surface
            .add_polyline(&LayerId::from("other"), EntityId(0), &pts, &LineOptions::default())
            .unwrap();
        assert_eq!(surface.polyline_count(), 2);
    }

    #[test]
    fn move_budget_rejects_after_limit() {
        let surface = MemorySurface::new();
        let layer = LayerId::from("routes");
        let id = MarkerId(0);
        surface
            .add_marker(&layer, id, LatLng::new(0.0, 0.0), &MarkerOptions::default())
            .unwrap();
        surface.fail_marker_moves_after(1);
        assert!(surface
            .set_marker_location(&layer, id, LatLng::new(1.0, 1.0))
            .is_ok());
        assert!(surface
            .set_marker_location(&layer, id, LatLng::new(2.0, 2.0))
            .is_err());
    }
}
