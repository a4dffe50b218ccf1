//! 导出服务 - 业务能力层
//!
//! 把累积的图片序列化为 ZIP / CSV（Canva 批量导入格式）/ URL 列表，
//! 以及写入本地目录。

use crate::error::{AppError, AppResult, ExportError};
use crate::models::ImageArtifact;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ZIP_FILE_NAME: &str = "images.zip";
pub const CSV_FILE_NAME: &str = "canva_bulk_import.csv";
pub const URL_LIST_FILE_NAME: &str = "image_urls.txt";

/// 打包为 ZIP：文件名 → 图片内容
///
/// PNG 已经是压缩格式，直接存储。
pub fn to_zip(artifacts: &[ImageArtifact]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut buffer);
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for artifact in artifacts {
            writer.start_file(artifact.filename.as_str(), options)?;
            writer.write_all(&artifact.bytes)?;
        }
        writer.finish()?;
    }
    Ok(buffer.into_inner())
}

/// 两列表格：`Image,Caption`
pub fn to_csv(artifacts: &[ImageArtifact]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Image", "Caption"])?;
    for artifact in artifacts {
        writer.write_record([artifact.filename.as_str(), artifact.caption.as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// 换行分隔的来源 URL 列表
pub fn to_url_list(artifacts: &[ImageArtifact]) -> String {
    artifacts
        .iter()
        .map(|a| a.url.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 写入 `<dir>/generation_<时间戳>/`，返回实际目录
///
/// 目录中包含所有图片、ZIP、CSV、URL 列表。每次调用都得到一个新目录。
pub fn save_to_dir(dir: &Path, artifacts: &[ImageArtifact]) -> AppResult<PathBuf> {
    let target = create_unique_dir(dir)?;

    for artifact in artifacts {
        write_file(&target.join(&artifact.filename), &artifact.bytes)?;
    }
    write_file(&target.join(ZIP_FILE_NAME), &to_zip(artifacts)?)?;
    write_file(&target.join(CSV_FILE_NAME), to_csv(artifacts)?.as_bytes())?;
    write_file(
        &target.join(URL_LIST_FILE_NAME),
        to_url_list(artifacts).as_bytes(),
    )?;

    info!("💾 已导出 {} 张图片到 {}", artifacts.len(), target.display());

    Ok(target)
}

/// 创建 `<dir>/generation_<时间戳>`；同名目录已存在时依次尝试 `_2`、`_3`…
fn create_unique_dir(dir: &Path) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::file_write_failed(dir.display().to_string(), e))?;

    let base = format!(
        "generation_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let mut attempt = 1usize;
    loop {
        let name = if attempt == 1 {
            base.clone()
        } else {
            format!("{}_{}", base, attempt)
        };
        let target = dir.join(name);
        match std::fs::create_dir(&target) {
            Ok(()) => return Ok(target),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => {
                return Err(AppError::file_write_failed(target.display().to_string(), e))
            }
        }
    }
}

fn write_file(path: &Path, contents: &[u8]) -> AppResult<()> {
    std::fs::write(path, contents)
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}
