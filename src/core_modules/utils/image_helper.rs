pub mod image_helper {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use log::info;

    use crate::core_modules::image_grid::Image;
    use crate::core_modules::region_finder::FinderKind;
    use crate::error::{Error, InputError};

    /// Decodes any format the `image` crate understands into an RGB grid.
    pub fn load(path: &Path) -> Result<Image, InputError> {
        let decoded = image::open(path).map_err(|source| InputError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let image = Image::from_dynamic(&decoded)?;
        info!("Loaded image: {}, size: {}x{}", path.display(), image.width(), image.height());
        Ok(image)
    }

    /// Writes `image` as 8-bit RGB; the format follows the extension of `path`.
    pub fn save(image: &Image, path: &Path) -> Result<(), Error> {
        image.to_rgb_image().save(path).map_err(|source| Error::Save {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Compressed image saved to {}", path.display());
        Ok(())
    }

    /// `photo.png` compressed with adaptive becomes `photo_compressed_adaptive.png`.
    pub fn default_output_path(input: &Path, finder: FinderKind) -> PathBuf {
        let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let mut name = format!("{stem}_compressed_{}", finder.name());
        if let Some(extension) = input.extension() {
            name.push('.');
            name.push_str(&extension.to_string_lossy());
        }
        input.with_file_name(name)
    }

    /// `out/photo.png` has its report at `out/photo_info.txt`.
    pub fn metadata_path(output: &Path) -> PathBuf {
        let stem = output.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        output.with_file_name(format!("{stem}_info.txt"))
    }

    /// The facts recorded next to a saved image.
    #[derive(Debug, Clone)]
    pub struct MetadataReport {
        pub finder: FinderKind,
        pub similarity_threshold: f64,
        pub adaptive_mode: bool,
        pub width: usize,
        pub height: usize,
        pub regions: usize,
        pub elapsed: Duration,
        pub processing_rate: f64,
    }

    impl MetadataReport {
        pub fn render(&self, timestamp: u64, output_size: u64) -> String {
            let pixels = self.width * self.height;
            let ratio = pixels as f64 / self.regions.max(1) as f64;
            let mut text = String::new();
            text.push_str("Image Compression Report\n");
            text.push_str("======================\n\n");
            text.push_str(&format!("Timestamp: {timestamp}\n"));
            text.push_str(&format!("Algorithm: {}\n", self.finder));
            text.push_str(&format!("Similarity threshold: {}\n", self.similarity_threshold));
            text.push_str(&format!("Adaptive mode: {}\n\n", self.adaptive_mode));
            text.push_str(&format!(
                "Original dimensions: {}x{} = {} pixels\n",
                self.width, self.height, pixels
            ));
            text.push_str(&format!("Regions identified: {}\n", self.regions));
            text.push_str(&format!("Compression ratio: {ratio:.2}:1\n\n"));
            text.push_str(&format!("Processing time: {:.2} seconds\n", self.elapsed.as_secs_f64()));
            text.push_str(&format!("Processing rate: {:.0} pixels/second\n\n", self.processing_rate));
            text.push_str(&format!("Output file size: {:.2} KB\n", output_size as f64 / 1024.0));
            text
        }
    }

    /// Writes the report for the image saved at `output` and returns its path.
    pub fn write_metadata(output: &Path, report: &MetadataReport) -> Result<PathBuf, Error> {
        let path = metadata_path(output);
        let as_report_error = |source| Error::Report {
            path: path.clone(),
            source,
        };

        let output_size = fs::metadata(output).map_err(as_report_error)?.len();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_secs())
            .unwrap_or(0);
        fs::write(&path, report.render(timestamp, output_size)).map_err(as_report_error)?;

        info!("Compression metadata saved to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {

    use super::image_helper::*;
    use crate::core_modules::color::color::Color;
    use crate::core_modules::image_grid::Image;
    use crate::core_modules::region_finder::FinderKind;
    use crate::error::InputError;
    use std::path::Path;
    use std::time::Duration;

    fn gradient(width: usize, height: usize) -> Image {
        let mut pixels = Vec::with_capacity(width * height);
        let mut intensity = 0u8;
        for _ in 0..width * height {
            pixels.push(Color::new(intensity, intensity, 255 - intensity));
            intensity = intensity.wrapping_add(1);
        }
        Image::new(width, height, pixels).expect("valid grid")
    }

    #[test]
    fn save_and_reload_png() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("gradient.png");
        let image = gradient(40, 30);

        save(&image, &path).expect("Error Saving File.");
        let reloaded = load(&path).expect("Error Loading File.");
        assert_eq!(reloaded, image);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = load(&dir.path().join("absent.png"));
        assert!(matches!(result, Err(InputError::Load { .. })));
    }

    #[test]
    fn output_names_follow_the_input() {
        assert_eq!(
            default_output_path(Path::new("shots/photo.png"), FinderKind::Adaptive),
            Path::new("shots/photo_compressed_adaptive.png")
        );
        assert_eq!(
            default_output_path(Path::new("raw"), FinderKind::MeanShift),
            Path::new("raw_compressed_mean-shift")
        );
        assert_eq!(
            metadata_path(Path::new("out/photo_compressed_flood-fill.png")),
            Path::new("out/photo_compressed_flood-fill_info.txt")
        );
    }

    #[test]
    fn metadata_report_is_written_next_to_the_image() {
        let dir = tempfile::tempdir().expect("temp dir");
        let output = dir.path().join("small.png");
        save(&gradient(4, 4), &output).expect("Error Saving File.");

        let report = MetadataReport {
            finder: FinderKind::FloodFill,
            similarity_threshold: 0.9,
            adaptive_mode: false,
            width: 4,
            height: 4,
            regions: 2,
            elapsed: Duration::from_millis(1_500),
            processing_rate: 10.0,
        };
        let path = write_metadata(&output, &report).expect("report written");
        assert_eq!(path, dir.path().join("small_info.txt"));

        let text = std::fs::read_to_string(&path).expect("report readable");
        assert!(text.contains("Algorithm: flood-fill"));
        assert!(text.contains("Original dimensions: 4x4 = 16 pixels"));
        assert!(text.contains("Compression ratio: 8.00:1"));
        assert!(text.contains("Processing time: 1.50 seconds"));
    }
}
