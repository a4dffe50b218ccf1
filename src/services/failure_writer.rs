//! 失败记录服务 - 业务能力层
//!
//! 只负责"写 failed_prompts.txt"能力，不关心流程

use crate::error::{AppError, AppResult};
use crate::models::FailedPrompt;
use crate::utils::logging::truncate_text;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const FAILED_PROMPTS_FILE_NAME: &str = "failed_prompts.txt";

/// 失败记录服务
///
/// 职责：
/// - 把一次会话中失败的提示词及原因写入文本文件
/// - 不关心失败是在哪个阶段产生的
pub struct FailureWriter {
    file_path: PathBuf,
}

impl FailureWriter {
    /// 写入 `<dir>/failed_prompts.txt`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            file_path: dir.join(FAILED_PROMPTS_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// 写入失败记录，覆盖文件中已有的内容
    ///
    /// 没有失败时不创建文件。
    pub fn write_all(&self, failures: &[FailedPrompt]) -> AppResult<()> {
        if failures.is_empty() {
            return Ok(());
        }

        debug!(
            "写入 {} 条失败记录到 {}",
            failures.len(),
            self.file_path.display()
        );

        let path_str = self.file_path.display().to_string();
        let mut file = File::create(&self.file_path)
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;

        for failed in failures {
            let line = format!(
                "提示词 #{} | {} | {}\n",
                failed.prompt.position + 1,
                failed.failure,
                truncate_text(&failed.prompt.text.replace('\n', " "), 120)
            );
            file.write_all(line.as_bytes())
                .map_err(|e| AppError::file_write_failed(&path_str, e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobFailure, Prompt, PromptOrigin};

    #[test]
    fn test_write_all_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FailureWriter::in_dir(dir.path());

        assert!(writer.write_all(&[]).is_ok());
        assert!(!writer.path().exists());

        let failed = FailedPrompt {
            prompt: Prompt {
                position: 4,
                text: "first line\nsecond line".to_string(),
                origin: PromptOrigin::Outro,
            },
            failure: JobFailure::Submission {
                reason: "401".to_string(),
            },
        };
        writer.write_all(&[failed.clone(), failed.clone()]).unwrap();
        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with("提示词 #5 | 提交失败: 401 | first line second line"));

        writer.write_all(&[failed]).unwrap();
        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
