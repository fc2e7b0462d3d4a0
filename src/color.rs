use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours along a cool-to-warm hue ramp.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            // 240° (blue) for the first bucket down to 0° (red) for the last.
            let frac = if n == 1 { 0.0 } else { i as f32 / (n - 1) as f32 };
            let hue = 240.0 * (1.0 - frac);
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: node degree → Color32
// ---------------------------------------------------------------------------

/// Maps node degrees to colours through equal-width degree buckets.
#[derive(Debug, Clone)]
pub struct DegreeColorMap {
    min: usize,
    max: usize,
    palette: Vec<Color32>,
}

impl DegreeColorMap {
    /// Build a map spanning the observed degree range with at most
    /// `max_buckets` colours.
    pub fn new(degrees: &[usize], max_buckets: usize) -> Self {
        let min = degrees.iter().copied().min().unwrap_or(0);
        let max = degrees.iter().copied().max().unwrap_or(0);
        let buckets = (max - min + 1).min(max_buckets.max(1));
        DegreeColorMap {
            min,
            max,
            palette: generate_palette(buckets),
        }
    }

    fn bucket(&self, degree: usize) -> usize {
        let n = self.palette.len();
        if n <= 1 || self.max == self.min {
            return 0;
        }
        let clamped = degree.clamp(self.min, self.max);
        (clamped - self.min) * n / (self.max - self.min + 1)
    }

    /// Look up the colour for a given degree.
    pub fn color_for(&self, degree: usize) -> Color32 {
        self.palette
            .get(self.bucket(degree))
            .copied()
            .unwrap_or(Color32::GRAY)
    }

    /// Return the legend entries (degree range label → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        let n = self.palette.len();
        let span = self.max - self.min + 1;
        (0..n)
            .map(|b| {
                let lo = self.min + (b * span).div_ceil(n);
                let hi = self.min + ((b + 1) * span).div_ceil(n) - 1;
                let label = if lo == hi { format!("{lo}") } else { format!("{lo}–{hi}") };
                (label, self.palette[b])
            })
            .collect()
    }
}
