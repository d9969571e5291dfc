//! Zoom multiplier for the page viewer
//!
//! The multiplier is applied on top of the fit-to-width scale. Zooming in is
//! unbounded; zooming out stops once the multiplier reaches the floor.

/// Zoom state for the open document
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    /// Current multiplier (1.0 = fit width)
    multiplier: f32,
    /// Amount added or removed per step
    step: f32,
    /// Zoom-out is rejected once the multiplier is at or below this value
    min_scale: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STEP, Self::DEFAULT_MIN_SCALE)
    }
}

impl Zoom {
    pub const DEFAULT_STEP: f32 = 0.2;
    pub const DEFAULT_MIN_SCALE: f32 = 0.4;

    #[must_use]
    pub fn new(step: f32, min_scale: f32) -> Self {
        Self {
            multiplier: 1.0,
            step: sanitize(step, Self::DEFAULT_STEP),
            min_scale: sanitize(min_scale, Self::DEFAULT_MIN_SCALE),
        }
    }

    #[must_use]
    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Back to 1.0, keeping step and floor
    pub fn reset(&mut self) {
        self.multiplier = 1.0;
    }

    /// Zoom in by one step. Always succeeds.
    pub fn step_in(&mut self) -> bool {
        self.multiplier = round_hundredths(self.multiplier + self.step);
        true
    }

    /// Zoom out by one step. Returns false (and leaves the multiplier alone)
    /// once the multiplier is at or below the floor.
    pub fn step_out(&mut self) -> bool {
        if self.multiplier <= self.min_scale {
            return false;
        }
        self.multiplier = round_hundredths(self.multiplier - self.step);
        true
    }

    /// Zoom level as displayed to the user
    #[must_use]
    pub fn percentage(&self) -> u32 {
        (self.multiplier * 100.0).round().max(0.0) as u32
    }
}

fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn round_hundredths(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
