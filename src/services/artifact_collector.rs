//! 结果收集服务 - 业务能力层
//!
//! 下载已完成任务的所有结果图片，并为图片生成文件名和说明文字。

use crate::clients::LeonardoClient;
use crate::models::{
    FetchedImage, GenerationJob, ImageArtifact, JobFailure, JobStatus, Prompt, PromptOrigin,
};
use crate::utils::logging::truncate_text;
use std::collections::HashMap;
use tracing::{debug, warn};

/// 单个任务的下载结果，顺序与任务返回的 URL 顺序一致
#[derive(Debug, Default)]
pub struct CollectReport {
    pub results: Vec<Result<FetchedImage, JobFailure>>,
}

impl CollectReport {
    /// 至少一张图片下载成功
    pub fn is_success(&self) -> bool {
        self.results.iter().any(Result::is_ok)
    }

    pub fn fetched(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn into_parts(self) -> (Vec<FetchedImage>, Vec<JobFailure>) {
        let mut images = Vec::new();
        let mut failures = Vec::new();
        for result in self.results {
            match result {
                Ok(image) => images.push(image),
                Err(failure) => failures.push(failure),
            }
        }
        (images, failures)
    }
}

/// 结果收集服务
#[derive(Debug, Clone)]
pub struct ArtifactCollector {
    client: LeonardoClient,
}

impl ArtifactCollector {
    pub fn new(client: LeonardoClient) -> Self {
        Self { client }
    }

    /// 下载任务的所有结果图片
    ///
    /// 非 `Complete` 的任务返回空报告。单张图片失败不影响其它图片。
    pub async fn collect(&self, job: &GenerationJob) -> CollectReport {
        if job.status() != JobStatus::Complete {
            return CollectReport::default();
        }

        let mut report = CollectReport::default();
        for url in job.urls() {
            let result = match self.client.download(url).await {
                Ok(bytes) => {
                    debug!("下载完成: {} ({} 字节)", url, bytes.len());
                    Ok(FetchedImage {
                        url: url.clone(),
                        bytes,
                    })
                }
                Err(e) => {
                    warn!("下载图片失败 {}: {}", url, e);
                    Err(JobFailure::Fetch {
                        url: url.clone(),
                        reason: e.to_string(),
                    })
                }
            };
            report.results.push(result);
        }
        report
    }
}

/// 标注分区
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LabelZone {
    Intro,
    Section(usize),
    Outro,
    Listed,
}

/// 按提示词来源为图片生成文件名和说明文字
///
/// 每个分区独立计数：`intro_1.png`、`section_2_image_3.png`、`outro_1.png`、`image_4.png`。
#[derive(Debug, Clone, Default)]
pub struct Labeler {
    counters: HashMap<LabelZone, usize>,
}

impl Labeler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为一张已下载的图片生成标注
    pub fn label(&mut self, prompt: &Prompt, image: FetchedImage) -> ImageArtifact {
        let zone = match &prompt.origin {
            PromptOrigin::Intro => LabelZone::Intro,
            PromptOrigin::Section { number, .. } => LabelZone::Section(*number),
            PromptOrigin::Outro => LabelZone::Outro,
            PromptOrigin::Listed { .. } => LabelZone::Listed,
        };
        let counter = self.counters.entry(zone).or_insert(0);
        *counter += 1;
        let k = *counter;

        let (filename, caption) = match &prompt.origin {
            PromptOrigin::Intro => (format!("intro_{}.png", k), "Intro Section".to_string()),
            PromptOrigin::Section { number, title } => (
                format!("section_{}_image_{}.png", number, k),
                title.clone(),
            ),
            PromptOrigin::Outro => (format!("outro_{}.png", k), "Outro Section".to_string()),
            PromptOrigin::Listed { .. } => {
                (format!("image_{}.png", k), truncate_text(&prompt.text, 60))
            }
        };

        ImageArtifact {
            filename,
            caption,
            url: image.url,
            prompt_position: prompt.position,
            bytes: image.bytes,
        }
    }
}
