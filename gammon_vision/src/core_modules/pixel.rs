// THEORY:
// The `Pixel` module is the most fundamental unit of the board detector. It is a
// "dumb" data container for a single RGBA sample plus the single-pixel heuristics
// the detector needs to tell board felt from game pieces: brightness and a coarse
// colour bucket. Nothing in here looks at neighbours; grouping happens in the
// chunk and blob layers.
//
// Colour buckets:
// - `Dark`:  low luminance. Dark checkers and the pips on a white die.
// - `Light`: high luminance. Light checkers, the white die, the doubling cube and
//            the pips on a red die.
// - `Red`:   a strongly red-dominant sample. The red die body.
// - `Background`: anything else (felt, triangles, board frame).

pub type Channel = u8;
pub type Luminance = f64;

/// The colour bucket a pixel (or a chunk's average pixel) falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorClass {
    #[default]
    Background,
    Dark,
    Light,
    Red,
}

/// Thresholds used by [`Pixel::classify`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColorThresholds {
    /// Luminance strictly below this value is `Dark`.
    pub dark_luminance: Luminance,
    /// Luminance strictly above this value is `Light`.
    pub light_luminance: Luminance,
    /// Minimum red channel for a `Red` sample.
    pub red_minimum: Channel,
    /// Red must exceed both green and blue by this factor.
    pub red_dominance: f64,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            dark_luminance: 70.0,
            light_luminance: 185.0,
            red_minimum: 120,
            red_dominance: 1.5,
        }
    }
}

/// A "dumb" data container representing a single RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    /// The red channel value (0-255).
    pub red: Channel,
    /// The green channel value (0-255).
    pub green: Channel,
    /// The blue channel value (0-255).
    pub blue: Channel,
    /// The alpha (transparency) channel value (0-255).
    pub alpha: Channel,
}

impl Pixel {
    pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
        Pixel {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Luminance estimate (Rec. 601 luma).
    pub fn luminance(&self) -> Luminance {
        0.299 * self.red as f64 + 0.587 * self.green as f64 + 0.114 * self.blue as f64
    }

    /// Red dominates both other channels by the configured factor.
    pub fn is_red(&self, thresholds: &ColorThresholds) -> bool {
        let red = self.red as f64;
        self.red >= thresholds.red_minimum
            && red > self.green as f64 * thresholds.red_dominance
            && red > self.blue as f64 * thresholds.red_dominance
    }

    /// Buckets the pixel. Red is checked first so a bright red sample is never `Light`.
    pub fn classify(&self, thresholds: &ColorThresholds) -> ColorClass {
        if self.is_red(thresholds) {
            return ColorClass::Red;
        }
        let luminance = self.luminance();
        if luminance < thresholds.dark_luminance {
            ColorClass::Dark
        } else if luminance > thresholds.light_luminance {
            ColorClass::Light
        } else {
            ColorClass::Background
        }
    }
}

impl From<image::Rgba<u8>> for Pixel {
    fn from(rgba: image::Rgba<u8>) -> Self {
        let [red, green, blue, alpha] = rgba.0;
        Pixel::new(red, green, blue, alpha)
    }
}
