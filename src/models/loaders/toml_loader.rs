use crate::error::{AppError, AppResult, FileError};
use crate::models::project::ScriptProject;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载项目
pub async fn load_toml_to_project(toml_file_path: &Path) -> AppResult<ScriptProject> {
    let path_str = toml_file_path.display().to_string();
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_str, e))?;

    let project: ScriptProject = toml::from_str(&content).map_err(|e| FileError::TomlParseFailed {
        path: path_str.clone(),
        source: e,
    })?;

    if let Err(reason) = project.source() {
        return Err(FileError::InvalidProject {
            path: path_str,
            reason,
        }
        .into());
    }

    Ok(project.with_file_path(toml_file_path.to_string_lossy().to_string()))
}

/// 从纯文本文件加载脚本，文件名（不含扩展名）作为项目名
///
/// 文本中单独一行 `====` 分出两条以上内容时，处理阶段按提示词列表逐条使用，
/// 否则按空行分段的脚本处理。
pub async fn load_txt_to_project(txt_file_path: &Path) -> AppResult<ScriptProject> {
    let content = fs::read_to_string(txt_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(txt_file_path.display().to_string(), e))?;

    let name = txt_file_path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    Ok(ScriptProject::from_script(name, content)
        .with_file_path(txt_file_path.to_string_lossy().to_string()))
}

/// 从文件夹中加载所有项目（.toml / .txt），按文件名排序
///
/// 单个文件加载失败只记录警告并跳过。
pub async fn load_all_projects(folder_path: &str) -> AppResult<Vec<ScriptProject>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?
    {
        paths.push(entry.path());
    }
    paths.sort();

    let mut projects = Vec::new();
    for path in paths {
        let loaded = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => load_toml_to_project(&path).await,
            Some("txt") => load_txt_to_project(&path).await,
            _ => continue,
        };

        match loaded {
            Ok(project) => {
                tracing::info!(
                    "成功加载项目: {} ({})",
                    project.name,
                    path.file_name().unwrap_or_default().to_string_lossy()
                );
                projects.push(project);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(projects)
}
