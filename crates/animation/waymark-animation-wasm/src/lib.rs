use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use js_sys::{Array, Function, Object, Reflect};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use waymark_animation::{
    map_ready, AnimationConfig, EntityId, FrameClock, LatLng, Layer, LayerConfig, LayerId,
    LevelBudget, LineOptions, MapReady, MarkerId, MarkerOptions, PolylineSpec, ReadySignal,
    RenderSurface, SurfaceError,
};
use waymark_geometry::{generate_path_points_with, SampledPath, SamplingConfig};

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsError> {
    value
        .serialize(&swb::Serializer::json_compatible())
        .map_err(|e| JsError::new(&format!("serialize error: {e}")))
}

fn from_js_or_default<T>(value: JsValue, what: &str) -> Result<T, JsError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if jsvalue_is_undefined_or_null(&value) {
        Ok(T::default())
    } else {
        swb::from_value(value).map_err(|e| JsError::new(&format!("{what} error: {e}")))
    }
}

/// `{ level, length }` as accepted by `levelBudget`.
#[derive(Debug, Deserialize)]
struct LevelLength {
    #[serde(default)]
    level: i32,
    length: f64,
}

/// Budget as handed back to JS: levels are keyed by their decimal string.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BudgetView<'a> {
    level_min: i32,
    level_max: i32,
    time_per_level: &'a std::collections::BTreeMap<i32, f64>,
}

impl<'a> From<&'a LevelBudget> for BudgetView<'a> {
    fn from(b: &'a LevelBudget) -> Self {
        Self {
            level_min: b.level_min,
            level_max: b.level_max,
            time_per_level: &b.time_per_level,
        }
    }
}

/// Sampling and pacing settings shared by the free functions below.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct PathsConfig {
    sampling: SamplingConfig,
    animation: AnimationConfig,
}

#[wasm_bindgen]
pub struct WaymarkPaths {
    cfg: PathsConfig,
}

#[wasm_bindgen]
impl WaymarkPaths {
    /// Pass `{ sampling: {...}, animation: {...} }` or undefined/null for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WaymarkPaths, JsError> {
        console_error_panic_hook::set_once();
        let cfg: PathsConfig = from_js_or_default(config, "config")?;
        cfg.sampling
            .validate()
            .map_err(|e| JsError::new(&e.to_string()))?;
        cfg.animation
            .validate()
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(WaymarkPaths { cfg })
    }

    /// Sample a path through `waypoints` (`[{ latitude, longitude }, ..]`).
    /// Returns `{ path, length }`.
    #[wasm_bindgen(js_name = generatePathPoints)]
    pub fn generate_path_points(
        &self,
        waypoints: JsValue,
        curved: bool,
        count: Option<u32>,
    ) -> Result<JsValue, JsError> {
        let waypoints: Vec<LatLng> = swb::from_value(waypoints)
            .map_err(|e| JsError::new(&format!("waypoints error: {e}")))?;
        let sampled: SampledPath = generate_path_points_with(
            &self.cfg.sampling,
            &waypoints,
            curved,
            count.map(|c| c as usize),
        )
        .map_err(|e| JsError::new(&e.to_string()))?;
        to_js(&sampled)
    }

    /// Per-level durations for `[{ level, length }, ..]` over `totalDurationMs`.
    #[wasm_bindgen(js_name = levelBudget)]
    pub fn level_budget(
        &self,
        entities: JsValue,
        total_duration_ms: f64,
    ) -> Result<JsValue, JsError> {
        let entities: Vec<LevelLength> = swb::from_value(entities)
            .map_err(|e| JsError::new(&format!("entities error: {e}")))?;
        let budget = LevelBudget::from_lengths(
            entities.iter().map(|e| (e.level, e.length)),
            total_duration_ms,
            &self.cfg.animation,
        );
        to_js(&BudgetView::from(&budget))
    }
}

/// `generatePathPoints(waypoints, curved, count?)` with default sampling settings.
#[wasm_bindgen(js_name = generatePathPoints)]
pub fn generate_path_points(
    waypoints: JsValue,
    curved: bool,
    count: Option<u32>,
) -> Result<JsValue, JsError> {
    WaymarkPaths {
        cfg: PathsConfig::default(),
    }
    .generate_path_points(waypoints, curved, count)
}

/// `levelBudget(entities, totalDurationMs)` with the default dominant-path constants.
#[wasm_bindgen(js_name = levelBudget)]
pub fn level_budget(entities: JsValue, total_duration_ms: f64) -> Result<JsValue, JsError> {
    WaymarkPaths {
        cfg: PathsConfig::default(),
    }
    .level_budget(entities, total_duration_ms)
}

/// Rendering surface backed by a JS object exposing `addPolyline`,
/// `removePolyline`, `addMarker`, `setMarkerLocation`, `setMarkerVisible` and
/// `removeMarker`. A thrown exception becomes `SurfaceError::Rejected`.
struct JsSurface {
    target: Object,
}

impl JsSurface {
    const METHODS: [&'static str; 6] = [
        "addPolyline",
        "removePolyline",
        "addMarker",
        "setMarkerLocation",
        "setMarkerVisible",
        "removeMarker",
    ];

    fn new(target: JsValue) -> Result<Self, JsError> {
        let target: Object = target
            .dyn_into()
            .map_err(|_| JsError::new("surface must be an object"))?;
        for name in Self::METHODS {
            let f = Reflect::get(&target, &JsValue::from_str(name))
                .map_err(|_| JsError::new(&format!("surface.{name} is not readable")))?;
            if !f.is_function() {
                return Err(JsError::new(&format!("surface.{name} must be a function")));
            }
        }
        Ok(Self { target })
    }

    fn call(&self, name: &str, args: &[JsValue]) -> Result<(), SurfaceError> {
        let f: Function = Reflect::get(&self.target, &JsValue::from_str(name))
            .ok()
            .and_then(|f| f.dyn_into().ok())
            .ok_or_else(|| SurfaceError::Rejected {
                reason: format!("surface.{name} is missing"),
            })?;
        let argv: Array = args.iter().collect();
        f.apply(&self.target, &argv)
            .map(|_| ())
            .map_err(|err| SurfaceError::Rejected {
                reason: err
                    .as_string()
                    .unwrap_or_else(|| format!("surface.{name} threw")),
            })
    }

    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, SurfaceError> {
        value
            .serialize(&swb::Serializer::json_compatible())
            .map_err(|e| SurfaceError::Rejected {
                reason: e.to_string(),
            })
    }
}

impl RenderSurface for JsSurface {
    fn add_polyline(
        &self,
        layer: &LayerId,
        id: EntityId,
        points: &[LatLng],
        options: &LineOptions,
    ) -> Result<(), SurfaceError> {
        self.call(
            "addPolyline",
            &[
                JsValue::from_str(&layer.0),
                JsValue::from(id.0),
                Self::encode(points)?,
                Self::encode(options)?,
            ],
        )
    }

    fn remove_polyline(&self, layer: &LayerId, id: EntityId) -> Result<(), SurfaceError> {
        self.call(
            "removePolyline",
            &[JsValue::from_str(&layer.0), JsValue::from(id.0)],
        )
    }

    fn add_marker(
        &self,
        layer: &LayerId,
        id: MarkerId,
        at: LatLng,
        options: &MarkerOptions,
    ) -> Result<(), SurfaceError> {
        self.call(
            "addMarker",
            &[
                JsValue::from_str(&layer.0),
                JsValue::from(id.0),
                Self::encode(&at)?,
                Self::encode(options)?,
            ],
        )
    }

    fn set_marker_location(
        &self,
        layer: &LayerId,
        id: MarkerId,
        at: LatLng,
    ) -> Result<(), SurfaceError> {
        self.call(
            "setMarkerLocation",
            &[
                JsValue::from_str(&layer.0),
                JsValue::from(id.0),
                Self::encode(&at)?,
            ],
        )
    }

    fn set_marker_visible(
        &self,
        layer: &LayerId,
        id: MarkerId,
        visible: bool,
    ) -> Result<(), SurfaceError> {
        self.call(
            "setMarkerVisible",
            &[
                JsValue::from_str(&layer.0),
                JsValue::from(id.0),
                JsValue::from_bool(visible),
            ],
        )
    }

    fn remove_marker(&self, layer: &LayerId, id: MarkerId) -> Result<(), SurfaceError> {
        self.call(
            "removeMarker",
            &[JsValue::from_str(&layer.0), JsValue::from(id.0)],
        )
    }
}

/// A map layer driven from JS: call `tick(dtMs)` from `requestAnimationFrame`.
#[wasm_bindgen]
pub struct WaymarkLayer {
    pool: LocalPool,
    clock: FrameClock,
    layer: Layer<LocalSpawner>,
    ready: Option<ReadySignal>,
}

#[wasm_bindgen]
impl WaymarkLayer {
    /// `config` matches `LayerConfig` (`{ animation_duration_ms, animation, sampling }`);
    /// `surface` is the JS object the layer draws through.
    #[wasm_bindgen(constructor)]
    pub fn new(id: String, config: JsValue, surface: JsValue) -> Result<WaymarkLayer, JsError> {
        console_error_panic_hook::set_once();
        let config: LayerConfig = from_js_or_default(config, "layer config")?;
        let surface = JsSurface::new(surface)?;
        let pool = LocalPool::new();
        let clock = FrameClock::new();
        let (signal, ready): (ReadySignal, MapReady) = map_ready();
        let layer = Layer::new(
            LayerId(id),
            config,
            Rc::new(surface),
            Rc::new(clock.clone()),
            pool.spawner(),
            ready,
        )
        .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(WaymarkLayer {
            pool,
            clock,
            layer,
            ready: Some(signal),
        })
    }

    /// Mount a polyline (`PolylineSpec` JSON). Returns its entity id.
    #[wasm_bindgen(js_name = mountPolyline)]
    pub fn mount_polyline(&mut self, spec: JsValue) -> Result<u32, JsError> {
        let spec: PolylineSpec = swb::from_value(spec)
            .map_err(|e| JsError::new(&format!("polyline spec error: {e}")))?;
        let id = self
            .layer
            .mount_polyline(spec)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.pool.run_until_stalled();
        Ok(id.0)
    }

    pub fn unmount(&mut self, id: u32) -> Result<(), JsError> {
        self.layer
            .unmount(EntityId(id))
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.pool.run_until_stalled();
        Ok(())
    }

    pub fn activate(&mut self) -> Result<(), JsError> {
        self.layer
            .activate()
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.pool.run_until_stalled();
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.layer.deactivate();
        self.pool.run_until_stalled();
    }

    /// Signal that the map can take primitives. Only the first call has an effect.
    #[wasm_bindgen(js_name = markReady)]
    pub fn mark_ready(&mut self) {
        if let Some(signal) = self.ready.take() {
            signal.fire();
        }
        self.pool.run_until_stalled();
    }

    /// Advance one display frame. Returns the number of timers that fired.
    pub fn tick(&mut self, dt_ms: f64) -> u32 {
        let fired = self.clock.tick(dt_ms);
        self.pool.run_until_stalled();
        fired as u32
    }

    /// Current budget as `{ levelMin, levelMax, timePerLevel }`, or null while inactive.
    pub fn budget(&self) -> Result<JsValue, JsError> {
        match self.layer.manager() {
            Some(manager) => to_js(&BudgetView::from(manager.budget())),
            None => Ok(JsValue::NULL),
        }
    }
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
