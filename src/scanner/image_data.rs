//! 読み込み済み画像
//!
//! 解析前にファイル全体をメモリへ読み込み、一度だけデコードする。
//! Geminiには元のバイト列とMIMEタイプを、検出器にはデコード済み画像を渡す。

use crate::error::{EndoLensError, Result};
use base64::Engine;
use endo_lens_common::Size;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub image: DynamicImage,
}

impl LoadedImage {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EndoLensError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_bytes(file_name, bytes)
    }

    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let format = image::guess_format(&bytes)
            .map_err(|e| EndoLensError::ImageLoad(format!("{}: {}", file_name, e)))?;
        let image = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| EndoLensError::ImageLoad(format!("{}: {}", file_name, e)))?;

        Ok(Self {
            file_name,
            mime_type: format.to_mime_type().to_string(),
            bytes,
            image,
        })
    }

    /// デコード済み画像からPNGとして構築
    pub fn from_image(file_name: impl Into<String>, image: DynamicImage) -> Result<Self> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| EndoLensError::ImageLoad(e.to_string()))?;
        Ok(Self {
            file_name: file_name.into(),
            mime_type: "image/png".to_string(),
            bytes,
            image,
        })
    }

    pub fn size(&self) -> Size {
        let (width, height) = self.image.dimensions();
        Size::new(width as f64, height as f64)
    }

    /// JPEGへ再エンコードしたData URL（リモート検出器へ送る形式）
    pub fn to_jpeg_data_url(&self) -> Result<String> {
        let rgb = DynamicImage::ImageRgb8(self.image.to_rgb8());
        let mut jpeg = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .map_err(|e| EndoLensError::ImageLoad(e.to_string()))?;
        Ok(encode_data_url("image/jpeg", &jpeg))
    }
}

/// "data:image/jpeg;base64,..." 形式のData URLを作成
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn sample() -> LoadedImage {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(8, 4));
        LoadedImage::from_image("sample.png", image).unwrap()
    }

    #[test]
    fn test_from_bytes_detects_mime() {
        let png = sample();
        let reloaded = LoadedImage::from_bytes("copy.png", png.bytes.clone()).unwrap();
        assert_eq!(reloaded.mime_type, "image/png");
        assert_eq!(reloaded.size(), Size::new(8.0, 4.0));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = LoadedImage::from_bytes("broken.jpg", b"not an image".to_vec());
        assert!(matches!(result, Err(EndoLensError::ImageLoad(_))));
    }

    #[test]
    fn test_jpeg_data_url_from_rgba() {
        let url = sample().to_jpeg_data_url().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(url.len() > "data:image/jpeg;base64,".len());
    }

    #[test]
    fn test_encode_data_url() {
        assert_eq!(encode_data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_load_missing_file() {
        let result = LoadedImage::load(Path::new("/nonexistent/xray.png"));
        assert!(matches!(result, Err(EndoLensError::FileNotFound(_))));
    }
}
