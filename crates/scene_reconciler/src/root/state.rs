//! Per-root state read by update-loop collaborators and event handlers

use super::camera::Camera;
use crate::config::RootConfig;
use crate::foundation::math::{utils, Vec2, Vec3};

/// Viewport size in logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Viewport {
    /// Width / height, 1.0 for a degenerate viewport
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Adaptive performance budget.
///
/// [`regress`](Self::regress) drops the budget to `min` and marks the root as
/// degraded; the budget recovers once `debounce_frames` frames pass without
/// another regression.
#[derive(Debug, Clone, PartialEq)]
pub struct Performance {
    /// Current budget in (0, 1]
    pub current: f32,
    /// Budget while degraded
    pub min: f32,
    /// Full budget
    pub max: f32,
    /// Frames a regression lasts
    pub debounce_frames: u32,
    remaining: u32,
}

impl Performance {
    /// Budget starting at `max` = 1.0
    pub fn new(min: f32, debounce_frames: u32) -> Self {
        Self {
            current: 1.0,
            min,
            max: 1.0,
            debounce_frames,
            remaining: 0,
        }
    }

    /// Signal that the frame rate dropped
    pub fn regress(&mut self) {
        if self.remaining == 0 {
            log::debug!("Performance regressed to {}", self.min);
        }
        self.current = self.min;
        self.remaining = self.debounce_frames.max(1);
    }

    /// Whether the budget is currently lowered
    pub fn is_degraded(&self) -> bool {
        self.remaining > 0
    }

    pub(crate) fn tick(&mut self) {
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.current = self.max;
            log::debug!("Performance restored to {}", self.max);
        }
    }
}

/// Last known pointer position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    /// Pixels from the top-left corner
    pub pixels: Vec2,
    /// Normalized device coordinates, +Y up
    pub ndc: Vec2,
}

impl PointerState {
    /// Convert pixel coordinates to NDC for a viewport
    ///
    /// NDC range: [-1, 1] where:
    /// - X: -1 = left, +1 = right
    /// - Y: -1 = bottom, +1 = top
    #[allow(clippy::cast_precision_loss)]
    pub fn screen_to_ndc(pixels: Vec2, viewport: Viewport) -> Vec2 {
        let width = viewport.width.max(1) as f32;
        let height = viewport.height.max(1) as f32;
        Vec2::new(pixels.x / width * 2.0 - 1.0, 1.0 - pixels.y / height * 2.0)
    }
}

/// State of one mounted root
#[derive(Debug, Clone)]
pub struct RootState {
    camera: Camera,
    viewport: Viewport,
    dpr: f32,
    dpr_range: [f32; 2],
    performance: Performance,
    pointer: PointerState,
    frame: u64,
}

impl RootState {
    /// Build from configuration
    pub fn from_config(config: &RootConfig) -> Self {
        let viewport = Viewport {
            width: config.viewport.width,
            height: config.viewport.height,
        };
        let [px, py, pz] = config.camera.position;
        let [tx, ty, tz] = config.camera.target;
        let mut camera = Camera::perspective(
            Vec3::new(px, py, pz),
            config.camera.fov,
            viewport.aspect(),
            config.camera.near,
            config.camera.far,
        );
        camera.look_at(Vec3::new(tx, ty, tz), camera.up);

        let mut state = Self {
            camera,
            viewport,
            dpr: 1.0,
            dpr_range: config.dpr_range,
            performance: Performance::new(
                config.performance.min,
                config.performance.debounce_frames,
            ),
            pointer: PointerState::default(),
            frame: 0,
        };
        state.set_dpr(config.dpr);
        state
    }

    /// Camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Device pixel ratio after clamping
    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    /// Performance budget
    pub fn performance(&self) -> &Performance {
        &self.performance
    }

    /// Lower the performance budget for a while
    pub fn regress(&mut self) {
        self.performance.regress();
    }

    /// Pointer
    pub fn pointer(&self) -> PointerState {
        self.pointer
    }

    /// Frames rendered so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Resize the viewport; the camera aspect follows
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.viewport = Viewport { width, height };
        self.camera.set_aspect_ratio(self.viewport.aspect());
    }

    /// Set the device pixel ratio, clamped to the configured range
    pub fn set_dpr(&mut self, dpr: f32) {
        let [low, high] = self.dpr_range;
        self.dpr = utils::clamp(dpr, low, high);
    }

    /// Record a pointer position in pixels
    pub fn set_pointer(&mut self, pixels: Vec2) {
        self.pointer = PointerState {
            pixels,
            ndc: PointerState::screen_to_ndc(pixels, self.viewport),
        };
    }

    pub(crate) fn advance_frame(&mut self) {
        self.frame += 1;
        self.performance.tick();
    }
}

impl Default for RootState {
    fn default() -> Self {
        Self::from_config(&RootConfig::default())
    }
}
