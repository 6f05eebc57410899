// blazing-webp/src/processors/metadata.rs
use crate::core::{ConvertError, Result};
use exif::{Exif, In, Reader, Tag};
use image::DynamicImage;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Reads the EXIF data of a source so it can be baked into the pixels.
///
/// WebP output is written without metadata, so an orientation flag that is
/// not applied before encoding would be lost.
pub struct MetadataProcessor;

impl MetadataProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn read_metadata(&self, path: &Path) -> Result<Option<Exif>> {
        let file = File::open(path)?;
        let mut bufreader = BufReader::new(&file);

        match Reader::new().read_from_container(&mut bufreader) {
            Ok(exif) => {
                log::debug!("Found EXIF data in {}", path.display());
                Ok(Some(exif))
            }
            Err(exif::Error::NotFound(_)) => {
                log::debug!("No EXIF data found in {}", path.display());
                Ok(None)
            }
            Err(e) => Err(ConvertError::CodecFailure(format!("EXIF read error: {}", e))),
        }
    }

    /// EXIF orientation (1-8) of the file, if it declares one.
    pub fn orientation(&self, path: &Path) -> Option<u32> {
        let exif = match self.read_metadata(path) {
            Ok(Some(exif)) => exif,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Ignoring unreadable EXIF in {}: {}", path.display(), e);
                return None;
            }
        };

        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|value| (1..=8).contains(value))
    }

    pub fn apply_orientation(&self, image: DynamicImage, orientation: u32) -> DynamicImage {
        match orientation {
            2 => image.fliph(),
            3 => image.rotate180(),
            4 => image.flipv(),
            5 => image.rotate90().fliph(),
            6 => image.rotate90(),
            7 => image.rotate270().fliph(),
            8 => image.rotate270(),
            _ => image,
        }
    }

    /// Rotate/flip `image` upright according to the EXIF data in `path`.
    pub fn auto_orient(&self, image: DynamicImage, path: &Path) -> DynamicImage {
        match self.orientation(path) {
            Some(orientation) if orientation != 1 => {
                log::debug!("Applying EXIF orientation {} to {}", orientation, path.display());
                self.apply_orientation(image, orientation)
            }
            _ => image,
        }
    }
}

impl Default for MetadataProcessor {
    fn default() -> Self {
        Self::new()
    }
}
