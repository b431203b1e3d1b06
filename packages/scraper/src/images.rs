//! Product image persistence.
//!
//! Downloaded bytes are decoded before anything is written, so a truncated
//! download or an HTML error page served with a 200 never lands on disk as a
//! broken image. Files are named after the product, with every
//! non-alphanumeric character replaced by `_`.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use url::Url;

use crate::ScrapeError;

/// Extension used when the source address does not carry a known one.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Maximum length of a generated file stem, in characters.
pub const MAX_STEM_LEN: usize = 50;

/// Character substituted for anything that is not ASCII alphanumeric.
pub const FILLER: char = '_';

const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Builds a file stem from a product name. Returns `None` when the name has
/// no alphanumeric characters at all.
#[must_use]
pub fn image_file_stem(name: &str) -> Option<String> {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { FILLER })
        .take(MAX_STEM_LEN)
        .collect();
    stem.chars()
        .any(|c| c.is_ascii_alphanumeric())
        .then_some(stem)
}

/// Infers the file extension from the last path segment of `url`, falling
/// back to [`DEFAULT_EXTENSION`].
#[must_use]
pub fn image_extension(url: &Url) -> &'static str {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|segment| segment.rsplit_once('.'))
        .and_then(|(_, ext)| {
            KNOWN_EXTENSIONS
                .iter()
                .find(|known| known.eq_ignore_ascii_case(ext))
                .copied()
        })
        .unwrap_or(DEFAULT_EXTENSION)
}

/// Converts decoded pixels to a layout every supported encoder accepts.
fn normalize_pixels(image: DynamicImage, format: ImageFormat) -> DynamicImage {
    if format == ImageFormat::Jpeg || !image.color().has_alpha() {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        DynamicImage::ImageRgba8(image.to_rgba8())
    }
}

/// Directory that receives product images for one run.
///
/// Stems already used in this run get a numeric suffix, so two products with
/// the same name never overwrite each other.
#[derive(Debug)]
pub struct ImageStore {
    dir: PathBuf,
    used: RefCell<BTreeSet<String>>,
}

impl ImageStore {
    /// Creates a store writing into `dir`. The directory is created on the
    /// first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            used: RefCell::new(BTreeSet::new()),
        }
    }

    /// The output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserves a file name for `stem.ext` that has not been used in this
    /// run.
    fn reserve(&self, stem: &str, ext: &str) -> PathBuf {
        let mut used = self.used.borrow_mut();
        let mut file_name = format!("{stem}.{ext}");
        let mut counter = 2;
        while used.contains(&file_name) {
            file_name = format!("{stem}{FILLER}{counter}.{ext}");
            counter += 1;
        }
        used.insert(file_name.clone());
        self.dir.join(file_name)
    }

    /// Decodes `bytes` and writes the image as `stem.ext`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Image`] if the bytes are not a decodable image
    /// or cannot be encoded, and [`ScrapeError::Io`] if the directory cannot
    /// be created.
    pub fn save(&self, bytes: &[u8], stem: &str, ext: &str) -> Result<PathBuf, ScrapeError> {
        let decoded = image::load_from_memory(bytes)?;
        let format = ImageFormat::from_extension(ext).unwrap_or(ImageFormat::Jpeg);

        std::fs::create_dir_all(&self.dir)?;
        let path = self.reserve(stem, ext);
        normalize_pixels(decoded, format).save_with_format(&path, format)?;

        log::debug!("Saved image {}", path.display());
        Ok(path)
    }
}
