//! Frame sources for the binary: still images, image sequences, solid colors

use crate::core::types::Pixel;
use crate::error::{Error, Result};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// File extensions played from a frame directory
const FRAME_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Decode an image file into RGB888 (alpha is dropped)
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let image = image::open(path)?;
    log::debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image.into_rgb8())
}

/// Image files in `dir`, sorted by name
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_frame = path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if is_frame {
            frames.push(path);
        }
    }
    frames.sort();

    if frames.is_empty() {
        return Err(Error::InvalidParameter(format!(
            "no image files in {}",
            dir.display()
        )));
    }
    log::info!("Found {} frames in {}", frames.len(), dir.display());
    Ok(frames)
}

/// Lazily decoded frames, optionally repeating forever
pub fn frame_sequence(
    paths: &[PathBuf],
    repeat: bool,
) -> Box<dyn Iterator<Item = Result<RgbImage>> + '_> {
    let load = |path: &PathBuf| load_image(path);
    if repeat {
        Box::new(paths.iter().cycle().map(load))
    } else {
        Box::new(paths.iter().map(load))
    }
}

/// Parse `R,G,B` with each channel in `0..=255`
pub fn parse_color(s: &str) -> std::result::Result<Pixel, String> {
    let channels = s
        .split(',')
        .map(|c| c.trim().parse::<u8>())
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|e| format!("invalid color {:?}: {}", s, e))?;

    match channels.as_slice() {
        &[r, g, b] => Ok(Rgb([r, g, b])),
        _ => Err(format!("expected R,G,B, got {:?}", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("255,0,0").unwrap(), Rgb([255, 0, 0]));
        assert_eq!(parse_color(" 1, 2 ,3 ").unwrap(), Rgb([1, 2, 3]));
        assert!(parse_color("256,0,0").is_err());
        assert!(parse_color("1,2").is_err());
        assert!(parse_color("red").is_err());
    }

    #[test]
    fn test_list_frames_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.PNG", "c.jpg"] {
            RgbImage::new(2, 2).save(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "skip").unwrap();
        fs::create_dir(dir.path().join("sub.png")).unwrap();

        let frames = list_frames(dir.path()).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.png", "c.jpg"]);
    }

    #[test]
    fn test_list_frames_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            list_frames(dir.path()),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_frame_sequence_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(3, 1, Rgb([9, 8, 7])).save(&path).unwrap();
        let paths = vec![path];

        assert_eq!(frame_sequence(&paths, false).count(), 1);

        let looped: Vec<_> = frame_sequence(&paths, true).take(5).collect();
        assert_eq!(looped.len(), 5);
        let last = looped.into_iter().last().unwrap().unwrap();
        assert_eq!(*last.get_pixel(2, 0), Rgb([9, 8, 7]));
    }

    #[test]
    fn test_load_missing_image() {
        assert!(load_image(Path::new("/nonexistent/frame.png")).is_err());
    }
}
