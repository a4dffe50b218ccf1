//! 流水线运行上下文
//!
//! 一次会话（一个项目）内累积的全部状态：批次进度、已标注的图片、失败列表。
//! 通过参数显式传递，`reset()` 返回一个全新的上下文。

use crate::models::{Batch, FailedPrompt, ImageArtifact, PromptPlan};
use crate::services::Labeler;
use crate::workflow::prompt_flow::{BatchReport, PromptOutcome};

/// 流水线运行上下文
#[derive(Debug, Clone)]
pub struct RunContext {
    plan: PromptPlan,
    next_batch: usize,
    labeler: Labeler,
    artifacts: Vec<ImageArtifact>,
    failures: Vec<FailedPrompt>,
    succeeded_prompts: usize,
    failed_prompts: usize,
}

impl RunContext {
    pub fn new(plan: PromptPlan) -> Self {
        Self {
            plan,
            next_batch: 0,
            labeler: Labeler::new(),
            artifacts: Vec::new(),
            failures: Vec::new(),
            succeeded_prompts: 0,
            failed_prompts: 0,
        }
    }

    pub fn plan(&self) -> &PromptPlan {
        &self.plan
    }

    /// 取出下一批（克隆），并推进批次进度
    pub fn take_next_batch(&mut self) -> Option<Batch> {
        let batch = self.plan.batches.get(self.next_batch).cloned()?;
        self.next_batch += 1;
        Some(batch)
    }

    /// 已取出的批次数
    pub fn batches_started(&self) -> usize {
        self.next_batch
    }

    pub fn is_finished(&self) -> bool {
        self.next_batch >= self.plan.total_batches()
    }

    /// 按顺序记录一批的结果
    pub fn apply_batch(&mut self, report: BatchReport) {
        for outcome in report.outcomes {
            self.record(outcome);
        }
    }

    /// 记录单条提示词的结果：图片标注后入库，失败进入失败列表
    pub fn record(&mut self, outcome: PromptOutcome) {
        if outcome.is_success() {
            self.succeeded_prompts += 1;
        } else {
            self.failed_prompts += 1;
        }

        for image in outcome.images {
            let artifact = self.labeler.label(&outcome.prompt, image);
            self.artifacts.push(artifact);
        }
        for failure in outcome.failures {
            self.failures.push(FailedPrompt {
                prompt: outcome.prompt.clone(),
                failure,
            });
        }
    }

    pub fn artifacts(&self) -> &[ImageArtifact] {
        &self.artifacts
    }

    pub fn failures(&self) -> &[FailedPrompt] {
        &self.failures
    }

    pub fn urls(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.url.as_str()).collect()
    }

    /// 至少产出一张图片的提示词数
    pub fn succeeded_prompts(&self) -> usize {
        self.succeeded_prompts
    }

    /// 没有产出任何图片的提示词数
    pub fn failed_prompts(&self) -> usize {
        self.failed_prompts
    }

    /// 清空本地累积状态，保留提示词计划
    ///
    /// 不会取消任何已提交的远端任务。
    pub fn reset(self) -> Self {
        Self::new(self.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchedImage, JobFailure, JobStatus, PromptWeights};
    use crate::services::prompt_batcher::prepare_script;

    fn outcome(ctx: &RunContext, position: usize, images: usize) -> PromptOutcome {
        let prompt = ctx
            .plan()
            .batches
            .iter()
            .flat_map(|b| b.prompts.iter())
            .find(|p| p.position == position)
            .cloned()
            .unwrap();
        let images: Vec<FetchedImage> = (0..images)
            .map(|i| FetchedImage {
                url: format!("https://cdn/{position}/{i}.png"),
                bytes: vec![position as u8],
            })
            .collect();
        let (status, failures) = if images.is_empty() {
            (
                JobStatus::TimedOut,
                vec![JobFailure::Timeout {
                    generation_id: format!("gen-{position}"),
                    waited_secs: 60,
                }],
            )
        } else {
            (JobStatus::Complete, Vec::new())
        };
        PromptOutcome {
            prompt,
            status,
            images,
            failures,
        }
    }

    #[test]
    fn test_take_next_batch_advances() {
        let mut ctx = RunContext::new(prepare_script("A\n\nB\n\nC\n\nD", PromptWeights::default(), 10));
        assert_eq!(ctx.take_next_batch().unwrap().len(), 10);
        assert!(!ctx.is_finished());
        assert_eq!(ctx.take_next_batch().unwrap().len(), 4);
        assert!(ctx.is_finished());
        assert!(ctx.take_next_batch().is_none());
        assert_eq!(ctx.batches_started(), 2);
    }

    #[test]
    fn test_record_labels_in_prompt_order() {
        let mut ctx = RunContext::new(prepare_script("A\n\nB\n\nC", PromptWeights::default(), 10));
        let outcomes = vec![
            outcome(&ctx, 0, 2),
            outcome(&ctx, 1, 0),
            outcome(&ctx, 2, 1),
        ];
        ctx.apply_batch(BatchReport {
            batch_index: 0,
            outcomes,
        });

        let names: Vec<&str> = ctx.artifacts().iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["intro_1.png", "intro_2.png", "section_1_image_1.png"]);
        assert_eq!(ctx.succeeded_prompts(), 2);
        assert_eq!(ctx.failed_prompts(), 1);
        assert_eq!(ctx.failures()[0].prompt.position, 1);
        assert_eq!(ctx.urls()[2], "https://cdn/2/0.png");
    }

    #[test]
    fn test_reset_returns_fresh_context() {
        let mut ctx = RunContext::new(prepare_script("A\n\nB", PromptWeights::default(), 3));
        let first = outcome(&ctx, 0, 1);
        ctx.take_next_batch();
        ctx.record(first);
        assert_eq!(ctx.artifacts().len(), 1);

        let mut fresh = ctx.reset();
        assert!(fresh.artifacts().is_empty());
        assert!(fresh.failures().is_empty());
        assert_eq!(fresh.batches_started(), 0);
        assert_eq!(fresh.plan().total_prompts(), 4);

        // 重置后标注计数从头开始
        let again = outcome(&fresh, 0, 1);
        fresh.record(again);
        assert_eq!(fresh.artifacts()[0].filename, "intro_1.png");
    }
}
