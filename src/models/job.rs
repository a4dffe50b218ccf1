use crate::error::JobStateError;
use crate::models::prompt::Prompt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 远端生成任务的状态
///
/// 只有 `Pending` 是非终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Complete,
    TimedOut,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Pending => "⏳",
            Self::Complete => "✅",
            Self::TimedOut => "⌛",
            Self::Failed => "❌",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Complete => "COMPLETE",
            Self::TimedOut => "TIMED_OUT",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// 提交成功后得到的任务句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub generation_id: String,
}

/// 一次远端图片生成请求
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub prompt: Prompt,
    /// 提交失败时没有任务 ID
    pub generation_id: Option<String>,
    status: JobStatus,
    urls: Vec<String>,
}

impl GenerationJob {
    /// 提交成功，进入 `Pending`
    pub fn pending(prompt: Prompt, handle: &JobHandle) -> Self {
        Self {
            prompt,
            generation_id: Some(handle.generation_id.clone()),
            status: JobStatus::Pending,
            urls: Vec::new(),
        }
    }

    /// 提交失败，直接处于 `Failed`
    pub fn rejected(prompt: Prompt) -> Self {
        Self {
            prompt,
            generation_id: None,
            status: JobStatus::Failed,
            urls: Vec::new(),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn complete(&mut self, urls: Vec<String>) -> Result<(), JobStateError> {
        self.transition(JobStatus::Complete)?;
        self.urls = urls;
        Ok(())
    }

    pub fn time_out(&mut self) -> Result<(), JobStateError> {
        self.transition(JobStatus::TimedOut)
    }

    pub fn fail(&mut self) -> Result<(), JobStateError> {
        self.transition(JobStatus::Failed)
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), JobStateError> {
        if self.status.is_terminal() {
            return Err(JobStateError {
                job: self
                    .generation_id
                    .clone()
                    .unwrap_or_else(|| format!("#{}", self.prompt.position)),
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}

/// 单条提示词的失败原因
///
/// 所有失败都在本地吸收：记入失败列表，流水线继续处理下一条。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobFailure {
    /// 提交失败（网络 / 鉴权 / 参数 / 响应格式）
    Submission { reason: String },
    /// 超时前未完成
    Timeout { generation_id: String, waited_secs: u64 },
    /// 远端报告任务失败
    Remote { generation_id: String },
    /// 任务完成但没有返回任何图片
    Empty { generation_id: String },
    /// 结果图片下载失败
    Fetch { url: String, reason: String },
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submission { reason } => write!(f, "提交失败: {}", reason),
            Self::Timeout {
                generation_id,
                waited_secs,
            } => write!(f, "任务 {} 等待 {} 秒后超时", generation_id, waited_secs),
            Self::Remote { generation_id } => write!(f, "任务 {} 远端生成失败", generation_id),
            Self::Empty { generation_id } => write!(f, "任务 {} 完成但没有返回图片", generation_id),
            Self::Fetch { url, reason } => write!(f, "下载 {} 失败: {}", url, reason),
        }
    }
}

/// 失败记录：哪条提示词、因为什么
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPrompt {
    pub prompt: Prompt,
    pub failure: JobFailure,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::prompt::PromptOrigin;

    fn prompt() -> Prompt {
        Prompt {
            position: 3,
            text: "a castle at dawn".to_string(),
            origin: PromptOrigin::Intro,
        }
    }

    fn handle() -> JobHandle {
        JobHandle {
            generation_id: "gen-1".to_string(),
        }
    }

    #[test]
    fn test_pending_transitions_once() {
        let mut job = GenerationJob::pending(prompt(), &handle());
        assert_eq!(job.status(), JobStatus::Pending);

        job.complete(vec!["https://cdn/a.png".to_string()]).unwrap();
        assert_eq!(job.status(), JobStatus::Complete);
        assert_eq!(job.urls(), ["https://cdn/a.png".to_string()]);

        let err = job.time_out().unwrap_err();
        assert_eq!(err.from, "COMPLETE");
        assert_eq!(err.to, "TIMED_OUT");
        assert_eq!(job.status(), JobStatus::Complete);
    }

    #[test]
    fn test_rejected_job_is_terminal() {
        let mut job = GenerationJob::rejected(prompt());
        assert_eq!(job.status(), JobStatus::Failed);
        let err = job.complete(Vec::new()).unwrap_err();
        assert_eq!(err.job, "#3");
        assert!(job.urls().is_empty());
    }

    #[test]
    fn test_timeout_is_terminal() {
        let mut job = GenerationJob::pending(prompt(), &handle());
        job.time_out().unwrap();
        assert!(job.fail().is_err());
        assert_eq!(job.status(), JobStatus::TimedOut);
    }
}
