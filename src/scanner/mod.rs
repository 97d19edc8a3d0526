mod image_data;

pub use image_data::LoadedImage;

use crate::error::{EndoLensError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

fn image_info(path: &Path) -> ImageInfo {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    ImageInfo {
        path: path.to_path_buf(),
        file_name,
    }
}

/// 画像ファイル1枚、またはフォルダ直下の画像一覧
pub fn scan_path(path: &Path) -> Result<Vec<ImageInfo>> {
    if path.is_file() {
        return Ok(vec![image_info(path)]);
    }
    scan_folder(path)
}

pub fn scan_folder(folder: &Path) -> Result<Vec<ImageInfo>> {
    if !folder.exists() {
        return Err(EndoLensError::FolderNotFound(folder.display().to_string()));
    }

    let mut images: Vec<ImageInfo> = WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| is_image_extension(&ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .map(|e| image_info(e.path()))
        .collect();

    // ファイル名でソート
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(images)
}
