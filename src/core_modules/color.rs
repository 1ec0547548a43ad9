// THEORY:
// The `color` module is the most fundamental unit of the compressor. A `Color` is a
// "dumb" data container for the three 8-bit channels of a single pixel, read once from
// the source image and never mutated afterwards.
//
// Key architectural principles:
// 1.  **RGB Only**: Alpha is read from 4-channel sources and immediately discarded.
//     Every similarity and averaging calculation in the engine works on R, G and B,
//     so carrying alpha around would only invite accidental use.
// 2.  **Value Semantics**: `Color` is `Copy`, `Eq`, `Ord` and `Hash`. It can be used
//     directly as a cache key and compared cheaply in the hot traversal loops.
// 3.  **Multiple Channel Forms**: Like the raw/normalized split on a camera pixel, a
//     `Color` can hand out its channels as bytes, as 0..255 floats, or as 0..1
//     normalized floats. The mean-shift finder works in the normalized form.

pub mod color {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type ComputedChannel = f64;
    pub type NormalizedChannel = f64;

    /// Number of channels that take part in colour math.
    pub const RGB_CHANNELS: usize = 3;

    /// A single RGB colour, ordered red, green, blue.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Color {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Color {
        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Self { red, green, blue }
        }

        /// Channels as raw bytes.
        pub fn channels(&self) -> [Channel; RGB_CHANNELS] {
            [self.red, self.green, self.blue]
        }

        /// Channels as 0.0..=255.0 floats.
        pub fn computed(&self) -> [ComputedChannel; RGB_CHANNELS] {
            [
                self.red as ComputedChannel,
                self.green as ComputedChannel,
                self.blue as ComputedChannel,
            ]
        }

        /// Channels scaled to 0.0..=1.0.
        pub fn normalized(&self) -> [NormalizedChannel; RGB_CHANNELS] {
            [
                self.red as NormalizedChannel / 255.0,
                self.green as NormalizedChannel / 255.0,
                self.blue as NormalizedChannel / 255.0,
            ]
        }
    }

    /// Builds a colour from the first three bytes of an RGB or RGBA pixel.
    /// Callers are expected to hand over at least three bytes; shorter slices
    /// zero-fill the missing channels rather than panic.
    impl From<&[Byte]> for Color {
        fn from(bytes: &[Byte]) -> Self {
            let channel = |i: usize| bytes.get(i).copied().unwrap_or_default();
            Color::new(channel(0), channel(1), channel(2))
        }
    }

    impl From<[Byte; 3]> for Color {
        fn from(bytes: [Byte; 3]) -> Self {
            Color::new(bytes[0], bytes[1], bytes[2])
        }
    }

    impl From<(Byte, Byte, Byte)> for Color {
        fn from((red, green, blue): (Byte, Byte, Byte)) -> Self {
            Color::new(red, green, blue)
        }
    }

    impl From<Color> for image::Rgb<u8> {
        fn from(color: Color) -> Self {
            image::Rgb(color.channels())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::color::*;

    #[test]
    fn rgba_bytes_drop_alpha() {
        let bytes = [10u8, 20, 30, 255];
        let color = Color::from(&bytes[..]);
        assert_eq!(color, Color::new(10, 20, 30));
    }

    #[test]
    fn normalized_channels_are_unit_range() {
        let color = Color::new(0, 51, 255);
        let [r, g, b] = color.normalized();
        assert_eq!(r, 0.0);
        assert!((g - 0.2).abs() < 1e-12);
        assert_eq!(b, 1.0);
    }

    #[test]
    fn ordering_is_lexicographic_by_channel() {
        assert!(Color::new(1, 0, 0) > Color::new(0, 255, 255));
        assert!(Color::new(1, 2, 3) < Color::new(1, 2, 4));
    }
}
