//! 提示词处理流程 - 流程层
//!
//! 核心职责：定义"一条提示词"的完整处理流程
//!
//! 流程顺序：
//! 1. 提交 → 失败则记录并结束
//! 2. 轮询 → 超时 / 远端失败则记录并结束
//! 3. 下载结果图片（单张失败不影响其它图片）

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{FetchedImage, GenerationJob, JobFailure, JobStatus, Prompt};
use crate::services::{ArtifactCollector, JobPoller, PollOutcome};
use crate::utils::logging::truncate_text;

/// 单条提示词的处理结果
#[derive(Debug, Clone)]
pub struct PromptOutcome {
    pub prompt: Prompt,
    pub status: JobStatus,
    /// 按任务返回的 URL 顺序
    pub images: Vec<FetchedImage>,
    pub failures: Vec<JobFailure>,
}

impl PromptOutcome {
    /// 至少得到一张图片
    pub fn is_success(&self) -> bool {
        !self.images.is_empty()
    }

    /// 任务没有跑完（例如任务崩溃）时的兜底结果
    pub fn aborted(prompt: Prompt, reason: impl Into<String>) -> Self {
        Self {
            prompt,
            status: JobStatus::Failed,
            images: Vec::new(),
            failures: vec![JobFailure::Submission {
                reason: reason.into(),
            }],
        }
    }
}

/// 一批提示词的结果，顺序与批内提示词顺序一致
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub batch_index: usize,
    pub outcomes: Vec<PromptOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn images(&self) -> usize {
        self.outcomes.iter().map(|o| o.images.len()).sum()
    }
}

/// 提示词处理流程
///
/// - 编排提交、轮询、下载三个能力
/// - 所有失败都在这里转换成 `JobFailure`，不向上抛出
/// - 不持有任何累积状态
#[derive(Debug, Clone)]
pub struct PromptFlow {
    poller: JobPoller,
    collector: ArtifactCollector,
    verbose_logging: bool,
}

impl PromptFlow {
    pub fn new(poller: JobPoller, collector: ArtifactCollector, config: &Config) -> Self {
        Self {
            poller,
            collector,
            verbose_logging: config.verbose_logging,
        }
    }

    pub async fn run(&self, prompt: Prompt, batch_index: usize) -> Result<PromptOutcome> {
        let number = prompt.position + 1;

        if self.verbose_logging {
            info!(
                "[批次 {}] 📤 提交提示词 #{}: {}",
                batch_index + 1,
                number,
                truncate_text(&prompt.text, 80)
            );
        }

        // ========== 1. 提交 ==========
        let handle = match self.poller.submit(&prompt).await {
            Ok(handle) => handle,
            Err(failure) => {
                warn!("[批次 {}] ⚠️ 提示词 #{} {}", batch_index + 1, number, failure);
                let job = GenerationJob::rejected(prompt);
                return Ok(PromptOutcome {
                    status: job.status(),
                    prompt: job.prompt,
                    images: Vec::new(),
                    failures: vec![failure],
                });
            }
        };
        let mut job = GenerationJob::pending(prompt, &handle);

        // ========== 2. 轮询 ==========
        let failure = match self.poller.poll(&handle).await {
            PollOutcome::Complete(urls) => {
                job.complete(urls)?;
                None
            }
            PollOutcome::TimedOut => {
                job.time_out()?;
                Some(JobFailure::Timeout {
                    generation_id: handle.generation_id.clone(),
                    waited_secs: self.poller.timeout().as_secs(),
                })
            }
            PollOutcome::Failed => {
                job.fail()?;
                Some(JobFailure::Remote {
                    generation_id: handle.generation_id.clone(),
                })
            }
        };

        if let Some(failure) = failure {
            warn!("[批次 {}] ⚠️ 提示词 #{} {}", batch_index + 1, number, failure);
            return Ok(PromptOutcome {
                status: job.status(),
                prompt: job.prompt,
                images: Vec::new(),
                failures: vec![failure],
            });
        }

        if job.urls().is_empty() {
            let failure = JobFailure::Empty {
                generation_id: handle.generation_id.clone(),
            };
            warn!("[批次 {}] ⚠️ 提示词 #{} {}", batch_index + 1, number, failure);
            return Ok(PromptOutcome {
                status: job.status(),
                prompt: job.prompt,
                images: Vec::new(),
                failures: vec![failure],
            });
        }

        // ========== 3. 下载 ==========
        let report = self.collector.collect(&job).await;
        let (images, failures) = report.into_parts();

        info!(
            "[批次 {}] {} 提示词 #{} 得到 {}/{} 张图片",
            batch_index + 1,
            job.status().icon(),
            number,
            images.len(),
            job.urls().len()
        );

        Ok(PromptOutcome {
            status: job.status(),
            prompt: job.prompt,
            images,
            failures,
        })
    }
}
