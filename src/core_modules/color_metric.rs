// THEORY:
// The `color_metric` module provides every "how different are these colours?"
// calculation in the engine. All functions are pure: no caching, no state, no failure
// modes. Caching lives one level up in the `SimilarityCache`.
//
// Key architectural principles:
// 1.  **Similarity for the Hot Path**: `similarity` maps the Euclidean RGB distance to
//     a score in [0, 1] by normalising against the largest possible distance
//     (black to white, sqrt(3 * 255^2)). All three region finders that use a
//     threshold compare against this score.
// 2.  **Distance for Analysis**: `distance` is the unbounded sibling, optionally
//     weighted by Rec. 601 luma coefficients to approximate human sensitivity. It
//     auto-detects 0..255 versus 0..1 inputs. It is used by the quality metrics and
//     the mean-shift finder, never by the threshold finders.
// 3.  **Neighbourhood Heuristics**: `variance_in_region` and `edge_strength` summarise
//     a group of pixels. The adaptive finder uses variance to tighten its threshold
//     on textured areas; the quality report uses both to judge how much detail a
//     reconstruction kept.

pub mod color_metric {
    use crate::core_modules::color::color::{Color, RGB_CHANNELS};
    use crate::core_modules::image_grid::Image;

    pub type Similarity = f64;
    pub type Distance = f64;

    /// 3 * 255^2, the squared distance between black and white.
    pub const MAX_SQUARED_DISTANCE: f64 = 195_075.0;

    /// Rec. 601 luma weights for R, G and B.
    pub const PERCEPTUAL_WEIGHTS: [f64; RGB_CHANNELS] = [0.299, 0.587, 0.114];

    /// Half-width of the Sobel kernel used by `edge_strength`.
    const SOBEL_RADIUS: usize = 1;
    const SOBEL_X: [[f64; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
    const SOBEL_Y: [[f64; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

    /// Similarity of two colours in [0, 1]; 1.0 for identical colours,
    /// 0.0 for black against white.
    pub fn similarity(first: Color, second: Color) -> Similarity {
        let squared_distance: f64 = first
            .computed()
            .iter()
            .zip(second.computed().iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();

        1.0 - (squared_distance / MAX_SQUARED_DISTANCE).sqrt()
    }

    /// Euclidean distance between two colours given as channel triples.
    ///
    /// If any channel of either input exceeds 1.0 both inputs are treated as
    /// 0..255 and rescaled to 0..1 first. With `perceptual` set, squared channel
    /// differences are weighted by `PERCEPTUAL_WEIGHTS` before summing.
    pub fn distance(
        first: [f64; RGB_CHANNELS],
        second: [f64; RGB_CHANNELS],
        perceptual: bool,
    ) -> Distance {
        let needs_scaling = first.iter().chain(second.iter()).any(|&c| c > 1.0);
        let scale = if needs_scaling { 1.0 / 255.0 } else { 1.0 };

        let mut sum = 0.0;
        for channel in 0..RGB_CHANNELS {
            let diff = (first[channel] - second[channel]) * scale;
            let weight = if perceptual { PERCEPTUAL_WEIGHTS[channel] } else { 1.0 };
            sum += weight * diff * diff;
        }
        sum.sqrt()
    }

    /// Convenience wrapper over `distance` for two `Color`s.
    pub fn color_distance(first: Color, second: Color, perceptual: bool) -> Distance {
        distance(first.computed(), second.computed(), perceptual)
    }

    /// Mean per-channel population variance of `colors`, normalised by 255^2.
    /// Returns 0.0 for an empty slice. The result is at most 0.25.
    pub fn variance_in_region(colors: &[Color]) -> f64 {
        if colors.is_empty() {
            return 0.0;
        }
        let count = colors.len() as f64;

        let mut sums = [0.0f64; RGB_CHANNELS];
        for color in colors {
            for (sum, value) in sums.iter_mut().zip(color.computed()) {
                *sum += value;
            }
        }
        let means = sums.map(|sum| sum / count);

        let mut squared = [0.0f64; RGB_CHANNELS];
        for color in colors {
            for (channel, value) in color.computed().into_iter().enumerate() {
                let diff = value - means[channel];
                squared[channel] += diff * diff;
            }
        }

        let total_variance: f64 = squared.iter().map(|s| s / count).sum();
        total_variance / (RGB_CHANNELS as f64 * 255.0 * 255.0)
    }

    /// Sobel gradient magnitude at (x, y), summed over R, G and B and scaled
    /// to [0, 1]. Pixels whose 3x3 window leaves the image return 0.0.
    pub fn edge_strength(image: &Image, x: usize, y: usize) -> f64 {
        if x < SOBEL_RADIUS
            || y < SOBEL_RADIUS
            || x + SOBEL_RADIUS >= image.width()
            || y + SOBEL_RADIUS >= image.height()
        {
            return 0.0;
        }

        let mut gradient_x = 0.0;
        let mut gradient_y = 0.0;
        for channel in 0..RGB_CHANNELS {
            let mut channel_x = 0.0;
            let mut channel_y = 0.0;
            for ky in 0..3 {
                for kx in 0..3 {
                    let color = image.color(x + kx - SOBEL_RADIUS, y + ky - SOBEL_RADIUS);
                    let value = color.computed()[channel];
                    channel_x += value * SOBEL_X[ky][kx];
                    channel_y += value * SOBEL_Y[ky][kx];
                }
            }
            gradient_x += channel_x.abs();
            gradient_y += channel_y.abs();
        }

        let gradient = (gradient_x * gradient_x + gradient_y * gradient_y).sqrt();
        // Kernel area * 255 * 4, the bound used for a 3x3 window.
        let max_gradient = 9.0 * 255.0 * 4.0;
        (gradient / max_gradient).min(1.0)
    }
}
