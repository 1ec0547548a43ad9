use std::collections::HashSet;

use region_compress::core_modules::color::color::Color;
use region_compress::core_modules::image_grid::{ClaimedMask, Image, Point};
use region_compress::core_modules::progress::NoProgress;
use region_compress::core_modules::reconstruction::reconstruct;
use region_compress::core_modules::region_finder::RegionFinder;
use region_compress::core_modules::segmenter::Segmenter;
use region_compress::core_modules::utils::image_helper::image_helper;
use region_compress::pipeline::CompressedImage;
use region_compress::{CompressorConfig, Error, FinderError, FinderKind, ImageCompressor};

fn compress(image: &Image, finder: FinderKind, threshold: f64, max_region_size: Option<usize>) -> CompressedImage {
    let config = CompressorConfig {
        similarity_threshold: threshold,
        max_region_size,
        finder,
        ..CompressorConfig::default()
    };
    ImageCompressor::new(config)
        .expect("valid config")
        .compress(image, &mut NoProgress, None)
        .expect("compresses")
        .compressed
}

fn gradient(width: usize, height: usize) -> Image {
    let pixels = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| Color::new((x * 255 / width) as u8, (y * 255 / height) as u8, 128))
        })
        .collect();
    Image::new(width, height, pixels).expect("valid grid")
}

/// Gray 100 with roughly one pixel in four lifted to gray 120.
fn speckled(width: usize, height: usize) -> Image {
    let mut state: u32 = 12_345;
    let pixels = (0..width * height)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let level = if (state >> 16) % 4 == 0 { 120 } else { 100 };
            Color::new(level, level, level)
        })
        .collect();
    Image::new(width, height, pixels).expect("valid grid")
}

/// 4x4 blocks of well separated colours; no two touching blocks share a colour,
/// diagonals included.
fn blocks(blocks_per_side: usize) -> Image {
    const PALETTE: [Color; 9] = [
        Color::new(0, 0, 0),
        Color::new(200, 0, 0),
        Color::new(0, 200, 0),
        Color::new(0, 0, 200),
        Color::new(200, 200, 0),
        Color::new(0, 200, 200),
        Color::new(200, 0, 200),
        Color::new(200, 200, 200),
        Color::new(100, 100, 100),
    ];
    let side = blocks_per_side * 4;
    let pixels = (0..side)
        .flat_map(|y| (0..side).map(move |x| PALETTE[(x / 4 + 3 * (y / 4)) % PALETTE.len()]))
        .collect();
    Image::new(side, side, pixels).expect("valid grid")
}

/// Eight horizontal stripes, two rows each, 12 gray levels apart.
fn stripes() -> Image {
    let pixels = (0..16)
        .flat_map(|y| (0..16).map(move |_| ((y / 2) * 12) as u8))
        .map(|level| Color::new(level, level, level))
        .collect();
    Image::new(16, 16, pixels).expect("valid grid")
}

fn assert_partition(image: &Image, compressed: &CompressedImage, cap: usize) {
    let mut seen = HashSet::new();
    for region in &compressed.regions {
        assert!(region.len() <= cap, "region of {} exceeds cap {}", region.len(), cap);
        for point in &region.pixels {
            assert!(image.contains(*point));
            assert!(seen.insert(*point), "{point:?} appears twice");
        }
    }
    assert_eq!(seen.len(), image.pixel_count());
}

#[test]
fn every_pixel_lands_in_exactly_one_region() {
    for image in [gradient(20, 12), speckled(16, 16), blocks(3)] {
        for finder in FinderKind::ALL {
            let compressed = compress(&image, finder, 0.9, None);
            assert_partition(&image, &compressed, image.pixel_count());

            let capped = compress(&image, finder, 0.5, Some(7));
            assert_partition(&image, &capped, 7);
        }
    }
}

#[test]
fn runs_are_deterministic() {
    let image = speckled(24, 18);
    for finder in FinderKind::ALL {
        let first = compress(&image, finder, 0.9, None);
        let second = compress(&image, finder, 0.9, None);
        assert_eq!(first, second, "{finder}");
    }
}

#[test]
fn separated_blocks_become_one_region_each() {
    let image = blocks(4);
    for finder in FinderKind::ALL {
        let compressed = compress(&image, finder, 0.9, None);
        assert_eq!(compressed.region_count(), 16, "{finder}");
        for region in &compressed.regions {
            assert_eq!(region.len(), 16);
            assert_eq!(region.color, image.color_at(region.seed()));
        }
    }
}

#[test]
fn resegmenting_a_reconstruction_never_adds_regions() {
    let cases = [(blocks(4), FinderKind::Adaptive), (blocks(4), FinderKind::MeanShift), (gradient(16, 16), FinderKind::FloodFill)];
    for (image, finder) in cases {
        let first = compress(&image, finder, 0.9, None);
        let flat = reconstruct(&first).expect("full coverage");
        let second = compress(&flat, finder, 0.9, None);
        assert!(
            second.region_count() <= first.region_count(),
            "{finder}: {} > {}",
            second.region_count(),
            first.region_count()
        );
    }
}

#[test]
fn stricter_thresholds_never_reduce_region_count() {
    let image = stripes();
    for finder in [FinderKind::FloodFill, FinderKind::Adaptive] {
        let counts: Vec<usize> = [0.5, 0.8, 0.9, 0.95, 0.99]
            .into_iter()
            .map(|threshold| compress(&image, finder, threshold, None).region_count())
            .collect();
        assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]), "{finder}: {counts:?}");
        assert_eq!(counts.first(), Some(&1), "{finder}");
        assert_eq!(counts.last(), Some(&8), "{finder}");
    }
}

#[test]
fn adaptive_keeps_noisy_areas_in_smaller_regions() {
    let image = speckled(32, 32);
    let flood = compress(&image, FinderKind::FloodFill, 0.9, None);
    let adaptive = compress(&image, FinderKind::Adaptive, 0.9, None);
    assert!(
        adaptive.average_region_size() < flood.average_region_size(),
        "adaptive {} vs flood fill {}",
        adaptive.average_region_size(),
        flood.average_region_size()
    );
}

#[test]
fn uniform_and_two_tone_scenarios() {
    let uniform = Image::new(4, 4, vec![Color::new(10, 20, 30); 16]).expect("valid grid");
    let black = Color::new(0, 0, 0);
    let white = Color::new(255, 255, 255);
    let two_tone = Image::new(2, 2, vec![black, white, black, white]).expect("valid grid");

    for finder in FinderKind::ALL {
        let compressed = compress(&uniform, finder, 0.9, None);
        assert_eq!(compressed.region_count(), 1);
        assert_eq!(compressed.regions[0].len(), 16);
        assert_eq!(compressed.regions[0].color, Color::new(10, 20, 30));

        let compressed = compress(&two_tone, finder, 0.99, None);
        assert_eq!(compressed.region_count(), 2);
        let colors: Vec<Color> = compressed.regions.iter().map(|r| r.color).collect();
        assert_eq!(colors, vec![black, white]);
    }
}

/// Fails on one seed and otherwise returns single pixels.
struct FailsOnce {
    bad_seed: Point,
}

impl RegionFinder for FailsOnce {
    fn find_region(&mut self, seed: Point, _claimed: &ClaimedMask) -> Result<Vec<Point>, FinderError> {
        if seed == self.bad_seed {
            Err(FinderError::SeedOutOfBounds {
                seed,
                width: 0,
                height: 0,
            })
        } else {
            Ok(vec![seed])
        }
    }

    fn kind(&self) -> FinderKind {
        FinderKind::FloodFill
    }

    fn max_region_size(&self) -> usize {
        1
    }
}

#[test]
fn a_failing_seed_is_isolated_and_blocks_reconstruction() {
    let image = gradient(3, 3);
    let mut finder = FailsOnce {
        bad_seed: Point::new(1, 1),
    };
    let outcome = Segmenter::new(&image)
        .segment(&mut finder, None, |_, _| {})
        .expect("segmentation runs");

    assert_eq!(outcome.compressed.region_count(), 8);
    assert_eq!(outcome.anomalies.len(), 1);
    assert_eq!(outcome.anomalies[0].seed, Point::new(1, 1));
    assert!(matches!(
        reconstruct(&outcome.compressed),
        Err(Error::IncompleteCoverage { unclaimed: 1, total: 9 })
    ));
}

#[test]
fn file_round_trip_writes_image_and_report() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("blocks.png");
    image_helper::save(&blocks(2), &input).expect("Error Saving File.");

    let compressor = ImageCompressor::new(CompressorConfig::default()).expect("valid config");
    let (source, result) = compressor
        .compress_file(&input, &mut NoProgress, None)
        .expect("compresses");
    assert_eq!(result.compressed.region_count(), 4);
    assert_eq!(result.stats.region_sizes().iter().sum::<usize>(), source.pixel_count());

    let output = image_helper::default_output_path(&input, FinderKind::Adaptive);
    compressor.save(&result, &output).expect("saves");

    let reloaded = image_helper::load(&output).expect("reloads");
    assert_eq!(reloaded, result.reconstructed);
    assert_eq!(reloaded, source);
    let report = std::fs::read_to_string(dir.path().join("blocks_compressed_adaptive_info.txt"))
        .expect("metadata written");
    assert!(report.contains("Regions identified: 4"));
}
