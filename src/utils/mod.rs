// blazing-webp/src/utils/mod.rs
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Input extensions the decoder is built with, lowercase.
pub const SUPPORTED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base = 1024_f64;
    let bytes_f64 = bytes as f64;
    let exponent = ((bytes_f64.log10() / base.log10()).floor() as i32).clamp(0, UNITS.len() as i32 - 1);
    let size = bytes_f64 / base.powi(exponent);

    format!("{:.2} {}", size, UNITS[exponent as usize])
}

pub fn is_supported_extension(extension: &str) -> bool {
    let extension = extension.to_lowercase();
    SUPPORTED_EXTENSIONS.contains(&extension.as_str())
}

pub fn is_supported_format(path: &Path) -> bool {
    get_file_extension(path)
        .map(|ext| is_supported_extension(&ext))
        .unwrap_or(false)
}

pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Expand `inputs` into a list of files, in order.
///
/// Files are passed through as given, so unsupported ones still reach the
/// submission check. Directories contribute their supported images, sorted,
/// descending into subdirectories only when `recursive` is set.
pub fn collect_image_paths(inputs: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }

        let walker = if recursive {
            WalkDir::new(input)
        } else {
            WalkDir::new(input).max_depth(1)
        };

        let found = walker
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_supported_format(entry.path()))
            .map(|entry| entry.into_path());

        paths.extend(found);
    }

    paths
}

pub fn image_format_to_string(format: image::ImageFormat) -> String {
    match format {
        image::ImageFormat::Jpeg => "JPEG",
        image::ImageFormat::Png => "PNG",
        image::ImageFormat::Gif => "GIF",
        image::ImageFormat::WebP => "WebP",
        image::ImageFormat::Tiff => "TIFF",
        image::ImageFormat::Bmp => "BMP",
        _ => "Unknown",
    }
    .to_string()
}
