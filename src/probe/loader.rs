//! Image loading for probe checks
//!
//! This module fetches the bytes behind a locator (file, http(s) or data:
//! URL) and decodes them with the `image` crate. A locator is loadable when
//! its bytes decode as an image; nothing is kept after the check.

use std::future::Future;
use std::path::{Path, PathBuf};

use base64::Engine;
use thiserror::Error;
use tokio::task;

use super::locator::Locator;

/// Why an image failed to load
///
/// These never escape the probe; they are logged and folded into
/// `ProbeOutcome::Invalid`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bad base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("not a decodable image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("decode task failed: {0}")]
    Join(#[from] task::JoinError),
}

/// The platform's image-loading facility
///
/// `ImageProbe` wraps an implementation with its timeout; implementations
/// only have to settle eventually with success or failure.
pub trait ImageLoader {
    fn load(&self, locator: &Locator<'_>) -> impl Future<Output = Result<(), LoadError>>;
}

/// Loads images from disk, over http(s) or from inline data: URLs and
/// checks that they decode
#[derive(Debug, Clone)]
pub struct DecodingLoader {
    /// Directory relative file paths are resolved against
    image_root: PathBuf,
    client: reqwest::Client,
}

impl DecodingLoader {
    pub fn new(image_root: impl Into<PathBuf>) -> Self {
        Self {
            image_root: image_root.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn image_root(&self) -> &Path {
        &self.image_root
    }

    async fn fetch(&self, locator: &Locator<'_>) -> Result<Vec<u8>, LoadError> {
        match locator {
            Locator::File { path, .. } => {
                let full = self.image_root.join(path);
                tokio::fs::read(&full)
                    .await
                    .map_err(|source| LoadError::Read { path: full, source })
            }
            Locator::Remote(url) => {
                let response = self.client.get(*url).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            Locator::Data {
                base64: true,
                payload,
                ..
            } => Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?),
            Locator::Data { payload, .. } => {
                Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
            }
        }
    }
}

impl Default for DecodingLoader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ImageLoader for DecodingLoader {
    async fn load(&self, locator: &Locator<'_>) -> Result<(), LoadError> {
        let bytes = self.fetch(locator).await?;

        // Decoding is CPU-bound, keep it off the async workers
        task::spawn_blocking(move || decode_blocking(&bytes)).await?
    }
}

/// Blocking check that the bytes are a complete, decodable image
fn decode_blocking(bytes: &[u8]) -> Result<(), LoadError> {
    image::load_from_memory(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn write_png(dir: &Path, name: &str) {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(2, 2, Rgb([200, 10, 10]));
        img.save(dir.join(name)).unwrap();
    }

    #[tokio::test]
    async fn test_loads_relative_png() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("images")).unwrap();
        write_png(&dir.path().join("images"), "bolt.png");

        let loader = DecodingLoader::new(dir.path());
        let locator = Locator::parse("images/bolt.png").unwrap();
        assert!(loader.load(&locator).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DecodingLoader::new(dir.path());
        let locator = Locator::parse("nope.png").unwrap();
        assert!(matches!(
            loader.load(&locator).await,
            Err(LoadError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fake.png"), b"definitely not a png").unwrap();

        let loader = DecodingLoader::new(dir.path());
        let locator = Locator::parse("fake.png").unwrap();
        assert!(matches!(
            loader.load(&locator).await,
            Err(LoadError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_base64_data_url() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "dot.png");
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(std::fs::read(dir.path().join("dot.png")).unwrap());
        let raw = format!("data:image/png;base64,{encoded}");

        let loader = DecodingLoader::default();
        assert!(loader.load(&Locator::parse(&raw).unwrap()).await.is_ok());

        let broken = Locator::parse("data:image/png;base64,@@@").unwrap();
        assert!(matches!(
            loader.load(&broken).await,
            Err(LoadError::Base64(_))
        ));
    }

    #[tokio::test]
    async fn test_percent_encoded_data_url() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "dot.png");
        let bytes = std::fs::read(dir.path().join("dot.png")).unwrap();
        let encoded: String = bytes.iter().map(|b| format!("%{b:02X}")).collect();
        let raw = format!("data:image/png,{encoded}");

        let loader = DecodingLoader::default();
        let locator = Locator::parse(&raw).unwrap();
        assert_eq!(loader.fetch(&locator).await.unwrap(), bytes);
        assert!(loader.load(&locator).await.is_ok());
    }
}
