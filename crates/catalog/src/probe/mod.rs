//! Media dimension probing.
//!
//! Probing only reads headers: image dimensions come from the decoder's
//! header parsing and video dimensions from the container's track headers.
//! A probe that can't tell returns `None`; the resolution is then unknown.

mod video;

use crate::record::{AssetType, Resolution};
use image::ImageReader;
use std::path::Path;

pub use video::track_dimensions;

/// Works out the pixel dimensions of an ingested file.
pub trait MediaProbe: Send + Sync {
    fn resolution(&self, path: &Path, asset_type: AssetType) -> Option<Resolution>;
}

/// Header-only probing for common image formats and ISO base media videos.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProbe;

/// Video containers whose track headers can be read.
const ISO_BMFF_EXTENSIONS: [&str; 3] = ["mp4", "m4v", "mov"];

impl MediaProbe for DefaultProbe {
    fn resolution(&self, path: &Path, asset_type: AssetType) -> Option<Resolution> {
        let probed = match asset_type {
            AssetType::StaticImage | AssetType::AnimatedImage => image_dimensions(path),
            AssetType::Video if has_extension(path, &ISO_BMFF_EXTENSIONS) => {
                track_dimensions(path).map_err(|err| err.to_string())
            },
            AssetType::Video | AssetType::EnginePackage => return None,
        };
        match probed {
            Ok(dimensions) => dimensions.map(Resolution::from),
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "couldn't probe dimensions");
                None
            },
        }
    }
}

fn image_dimensions(path: &Path) -> Result<Option<(u32, u32)>, String> {
    // Guess from content too: `.apng` files and misnamed images are common.
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|err| err.to_string())?;
    reader.into_dimensions().map(Some).map_err(|err| err.to_string())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|candidate| ext.eq_ignore_ascii_case(candidate)))
}

/// A probe that never knows the resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

impl MediaProbe for NoProbe {
    fn resolution(&self, _path: &Path, _asset_type: AssetType) -> Option<Resolution> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn png_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        RgbImage::from_pixel(7, 3, Rgb([0, 128, 255])).save(&path).unwrap();
        assert_eq!(DefaultProbe.resolution(&path, AssetType::StaticImage), Some(Resolution::new(7, 3)));
    }

    #[test]
    fn misnamed_image_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("small.png");
        RgbImage::new(5, 4).save(&png).unwrap();
        let apng = dir.path().join("small.apng");
        std::fs::rename(&png, &apng).unwrap();
        assert_eq!(DefaultProbe.resolution(&apng, AssetType::AnimatedImage), Some(Resolution::new(5, 4)));
    }

    #[test]
    fn unreadable_image_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        assert_eq!(DefaultProbe.resolution(&path, AssetType::StaticImage), None);
        assert_eq!(DefaultProbe.resolution(&dir.path().join("missing.png"), AssetType::StaticImage), None);
    }

    #[test]
    fn unsupported_video_containers_are_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        std::fs::write(&path, b"\x1a\x45\xdf\xa3").unwrap();
        assert_eq!(DefaultProbe.resolution(&path, AssetType::Video), None);
        assert_eq!(DefaultProbe.resolution(dir.path(), AssetType::EnginePackage), None);
    }
}
