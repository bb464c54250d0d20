//! Viewport transform and pan/zoom controller
//!
//! The transform composes as `screen = world * scale + offset`. Zooming is
//! anchor-preserving: the world point under the cursor stays under the same
//! screen point across the scale change.

use crate::geom;
use geo::{Coord, Rect};

/// Current pan/zoom state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    /// Zoom scale, always > 0
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// Zoom limits for the controller
#[derive(Debug, Clone)]
pub struct ViewportConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 32.0,
        }
    }
}

/// Owns the live transform and converts pointer deltas into updates
#[derive(Debug, Clone, Default)]
pub struct ViewportController {
    transform: ViewportTransform,
    config: ViewportConfig,
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            transform: ViewportTransform::default(),
            config,
        }
    }

    /// Current transform
    #[inline]
    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }

    /// Zoom by `factor` keeping the world point under `(screen_x, screen_y)`
    /// fixed on screen
    ///
    /// Returns `false` without changing anything if the resulting scale would
    /// leave the configured zoom range.
    pub fn zoom_at(&mut self, screen_x: f64, screen_y: f64, factor: f64) -> bool {
        let new_scale = self.transform.scale * factor;
        if new_scale < self.config.min_zoom || new_scale > self.config.max_zoom {
            return false;
        }

        // offset' = screen - (screen - offset) * factor keeps the anchor fixed
        self.transform.offset_x = screen_x - (screen_x - self.transform.offset_x) * factor;
        self.transform.offset_y = screen_y - (screen_y - self.transform.offset_y) * factor;
        self.transform.scale = new_scale;
        true
    }

    /// Translate the view; panning is unbounded, clamping to data bounds is a
    /// policy layered by the caller
    pub fn pan_by(&mut self, delta_x: f64, delta_y: f64) {
        self.transform.offset_x += delta_x;
        self.transform.offset_y += delta_y;
    }

    /// Restore scale 1 and zero offset
    pub fn reset(&mut self) {
        self.transform = ViewportTransform::default();
    }

    /// Screen → world
    #[inline]
    pub fn to_world(&self, screen: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (screen.x - self.transform.offset_x) / self.transform.scale,
            y: (screen.y - self.transform.offset_y) / self.transform.scale,
        }
    }

    /// World → screen
    #[inline]
    pub fn to_screen(&self, world: Coord<f64>) -> Coord<f64> {
        Coord {
            x: world.x * self.transform.scale + self.transform.offset_x,
            y: world.y * self.transform.scale + self.transform.offset_y,
        }
    }

    /// World-space rectangle visible in a `screen_w` x `screen_h` viewport
    ///
    /// This is the query region handed to the spatial index.
    pub fn visible_world_rect(&self, screen_w: f64, screen_h: f64) -> Rect<f64> {
        let a = self.to_world(Coord { x: 0.0, y: 0.0 });
        let b = self.to_world(Coord {
            x: screen_w,
            y: screen_h,
        });
        geom::bounds_of([a, b]).unwrap_or_else(|| Rect::new(a, a))
    }
}
