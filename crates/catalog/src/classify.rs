use crate::record::AssetType;
use std::path::Path;
use wallhub_package::is_package_directory;

/// Extensions (lowercase) cataloged as [`AssetType::Video`].
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "m4v"];
/// Extensions (lowercase) cataloged as [`AssetType::AnimatedImage`].
pub const ANIMATED_EXTENSIONS: [&str; 2] = ["gif", "apng"];

/// Decide what kind of asset `path` is.
///
/// A directory holding a manifest and a container is an engine package.
/// Everything else is decided by extension alone, defaulting to a static
/// image; file contents are never inspected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use wallhub_catalog::{AssetType, classify};
///
/// assert_eq!(classify(Path::new("/photos/Beach.JPG")), AssetType::StaticImage);
/// assert_eq!(classify(Path::new("/clips/rain.MP4")), AssetType::Video);
/// assert_eq!(classify(Path::new("/gifs/cat.gif")), AssetType::AnimatedImage);
/// ```
pub fn classify(path: &Path) -> AssetType {
    if path.is_dir() && is_package_directory(path) {
        return AssetType::EnginePackage;
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        AssetType::Video
    } else if ANIMATED_EXTENSIONS.contains(&extension.as_str()) {
        AssetType::AnimatedImage
    } else {
        AssetType::StaticImage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    #[rstest]
    #[case("wallpaper.png", AssetType::StaticImage)]
    #[case("wallpaper.JPEG", AssetType::StaticImage)]
    #[case("wallpaper.heic", AssetType::StaticImage)]
    #[case("wallpaper", AssetType::StaticImage)]
    #[case("wallpaper.tar.gz", AssetType::StaticImage)]
    #[case("loop.gif", AssetType::AnimatedImage)]
    #[case("loop.APNG", AssetType::AnimatedImage)]
    #[case("clip.mp4", AssetType::Video)]
    #[case("clip.MoV", AssetType::Video)]
    #[case("clip.avi", AssetType::Video)]
    #[case("clip.mkv", AssetType::Video)]
    #[case("clip.m4v", AssetType::Video)]
    #[case("clip.webm", AssetType::StaticImage)]
    fn by_extension(#[case] name: &str, #[case] expected: AssetType) {
        // The file doesn't need to exist.
        assert_eq!(classify(Path::new("/nowhere").join(name).as_path()), expected);
    }

    #[test]
    fn package_directory_regardless_of_contents() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("Ocean.mp4");
        fs::create_dir(&package).unwrap();
        assert_eq!(classify(&package), AssetType::Video);

        fs::write(package.join("project.json"), b"\x00garbage").unwrap();
        fs::write(package.join("scene.pkg"), b"").unwrap();
        assert_eq!(classify(&package), AssetType::EnginePackage);
        // Pure: asking again gives the same answer.
        assert_eq!(classify(&package), AssetType::EnginePackage);
    }

    #[test]
    fn plain_directory_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(classify(dir.path()), AssetType::StaticImage);
    }
}
