//! 单个项目处理器 - 编排层
//!
//! ## 职责
//!
//! 一个项目就是一次完整的生成会话：
//!
//! 1. **确定提示词**：脚本 / 提示词列表 / 主题（先生成脚本）
//! 2. **分批调度**：批次依次执行，批内用 Semaphore 限制并发任务数
//! 3. **顺序稳定**：按提交顺序等待任务，结果顺序与提示词顺序一致
//! 4. **导出**：图片、ZIP、CSV、URL 列表，以及失败记录
//!
//! 收到取消信号时，正在运行的批次被放弃，已累积的结果照常导出。

use crate::config::Config;
use crate::models::{Batch, ProjectSource, PromptPlan, ScriptProject};
use crate::services::prompt_batcher::{prepare_prompt_list, prepare_script, prepare_text};
use crate::services::{exporter, FailureWriter, ScriptWriter};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{BatchReport, PromptFlow, PromptOutcome, RunContext};
use anyhow::{anyhow, Result};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

/// 单个项目的处理统计
#[derive(Debug, Clone, Default)]
pub struct ProjectStats {
    pub name: String,
    pub prompts: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub images: usize,
    /// 实际导出目录；没有任何结果时为 `None`
    pub export_dir: Option<PathBuf>,
    pub cancelled: bool,
}

/// 处理单个项目
pub async fn process_project(
    project: &ScriptProject,
    project_index: usize,
    flow: Arc<PromptFlow>,
    script_writer: &ScriptWriter,
    config: &Config,
    shutdown: watch::Receiver<bool>,
) -> Result<ProjectStats> {
    info!("[项目 {}] 开始处理: {}", project_index, project.name);

    let plan = build_plan(project, script_writer, config).await?;
    let mut stats = ProjectStats {
        name: project.name.clone(),
        prompts: plan.total_prompts(),
        ..Default::default()
    };

    if plan.is_empty() {
        warn!("[项目 {}] ⚠️ 没有可用的提示词，跳过", project_index);
        return Ok(stats);
    }

    info!(
        "[项目 {}] 共 {} 条提示词，分 {} 批",
        project_index,
        plan.total_prompts(),
        plan.total_batches()
    );

    let total_prompts = plan.total_prompts();
    let total_batches = plan.total_batches();
    let mut ctx = RunContext::new(plan);

    while let Some(batch) = ctx.take_next_batch() {
        let batch_num = batch.index + 1;
        let first = batch.prompts.first().map(|p| p.position + 1).unwrap_or(0);
        let last = batch.prompts.last().map(|p| p.position + 1).unwrap_or(0);
        log_batch_start(batch_num, total_batches, first, last, total_prompts);

        let batch_len = batch.len();
        match run_batch(batch, flow.clone(), config.max_concurrent_jobs, shutdown.clone()).await {
            Some(report) => {
                log_batch_complete(batch_num, report.succeeded(), batch_len, report.images());
                ctx.apply_batch(report);
            }
            None => {
                warn!(
                    "[项目 {}] ⛔ 已取消，第 {} 批的结果被放弃",
                    project_index, batch_num
                );
                stats.cancelled = true;
                break;
            }
        }
    }

    stats.succeeded = ctx.succeeded_prompts();
    stats.failed = ctx.failed_prompts();
    stats.images = ctx.artifacts().len();

    if !ctx.artifacts().is_empty() || !ctx.failures().is_empty() {
        let project_dir = Path::new(&config.output_folder).join(project_dir_name(&project.name));
        let target = exporter::save_to_dir(&project_dir, ctx.artifacts())?;
        FailureWriter::in_dir(&target).write_all(ctx.failures())?;
        stats.export_dir = Some(target);
    }

    info!(
        "[项目 {}] 提示词统计: 成功 {}, 失败 {}, 图片 {}",
        project_index, stats.succeeded, stats.failed, stats.images
    );
    info!("\n[项目 {}] ✅ 项目处理完成\n", project_index);

    Ok(stats)
}

/// 确定项目的提示词计划
async fn build_plan(
    project: &ScriptProject,
    script_writer: &ScriptWriter,
    config: &Config,
) -> Result<PromptPlan> {
    let source = project
        .source()
        .map_err(|reason| anyhow!("项目 {} 无效: {}", project.name, reason))?;

    let plan = match source {
        ProjectSource::Script(text) => prepare_text(&text, config.weights, config.batch_size),
        ProjectSource::Prompts(prompts) => prepare_prompt_list(&prompts, config.batch_size),
        ProjectSource::Topic {
            topic,
            duration_minutes,
            style,
        } => {
            let script = script_writer
                .write_script(&topic, duration_minutes, &style)
                .await?;
            prepare_script(&script, config.weights, config.batch_size)
        }
    };
    Ok(plan)
}

/// 执行一批提示词
///
/// 最多 `max_concurrent` 个任务同时运行。收到取消信号时中止所有任务并返回 `None`。
pub async fn run_batch(
    batch: Batch,
    flow: Arc<PromptFlow>,
    max_concurrent: usize,
    shutdown: watch::Receiver<bool>,
) -> Option<BatchReport> {
    if *shutdown.borrow() {
        return None;
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let batch_index = batch.index;

    let mut prompts = Vec::with_capacity(batch.len());
    let mut handles = Vec::with_capacity(batch.len());
    for prompt in batch.prompts {
        let semaphore = semaphore.clone();
        let flow = flow.clone();
        let task_prompt = prompt.clone();

        let handle = tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return Err(anyhow::Error::from(e)),
            };
            flow.run(task_prompt, batch_index).await
        });
        prompts.push(prompt);
        handles.push(handle);
    }

    let abort_handles: Vec<AbortHandle> = handles.iter().map(|h| h.abort_handle()).collect();

    let results = tokio::select! {
        biased;
        _ = wait_for_shutdown(shutdown) => {
            for handle in &abort_handles {
                handle.abort();
            }
            return None;
        }
        results = join_all(handles) => results,
    };

    let outcomes = prompts
        .into_iter()
        .zip(results)
        .map(|(prompt, joined)| match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("提示词 #{} 处理过程中发生错误: {}", prompt.position + 1, e);
                PromptOutcome::aborted(prompt, e.to_string())
            }
            Err(e) => {
                error!("提示词 #{} 任务执行失败: {}", prompt.position + 1, e);
                PromptOutcome::aborted(prompt, e.to_string())
            }
        })
        .collect();

    Some(BatchReport {
        batch_index,
        outcomes,
    })
}

/// 等到取消信号变为 `true`；发送端关闭后永远不返回
pub async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// 项目名 → 输出子目录名
fn project_dir_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "project".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{LeonardoClient, LlmClient};
    use crate::services::{ArtifactCollector, JobPoller};
    use std::time::Duration;

    fn offline_flow(config: &Config) -> Arc<PromptFlow> {
        let client = LeonardoClient::new(config).unwrap();
        Arc::new(PromptFlow::new(
            JobPoller::new(
                client.clone(),
                Duration::from_millis(100),
                Duration::from_millis(10),
            ),
            ArtifactCollector::new(client),
            config,
        ))
    }

    #[test]
    fn test_project_dir_name() {
        assert_eq!(project_dir_name("ancient rome/part 1"), "ancient_rome_part_1");
        assert_eq!(project_dir_name("  "), "project");
        assert_eq!(project_dir_name("罗马-史"), "罗马-史");
    }

    #[tokio::test]
    async fn test_cancelled_before_start_exports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            leonardo_api_key: "k".to_string(),
            leonardo_api_base_url: "http://127.0.0.1:9".to_string(),
            output_folder: dir.path().display().to_string(),
            ..Config::default()
        };
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let project = ScriptProject::from_script("demo", "A\n\nB\n\nC");
        let writer = ScriptWriter::new(LlmClient::new(&config));
        let stats = process_project(&project, 1, offline_flow(&config), &writer, &config, rx)
            .await
            .unwrap();

        assert!(stats.cancelled);
        assert_eq!(stats.prompts, 9);
        assert_eq!(stats.images, 0);
        assert!(stats.export_dir.is_none());
    }

    #[tokio::test]
    async fn test_invalid_project_is_error() {
        let config = Config::default();
        let (_tx, rx) = watch::channel(false);
        let project = ScriptProject {
            name: "empty".to_string(),
            ..Default::default()
        };
        let writer = ScriptWriter::new(LlmClient::new(&config));
        let result =
            process_project(&project, 1, offline_flow(&config), &writer, &config, rx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_api_records_every_prompt_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            leonardo_api_key: "k".to_string(),
            leonardo_api_base_url: "http://127.0.0.1:9".to_string(),
            output_folder: dir.path().display().to_string(),
            max_concurrent_jobs: 3,
            ..Config::default()
        };
        let (_tx, rx) = watch::channel(false);
        let project = ScriptProject::from_script("offline", "Only one section");
        let writer = ScriptWriter::new(LlmClient::new(&config));

        let stats = process_project(&project, 1, offline_flow(&config), &writer, &config, rx)
            .await
            .unwrap();

        assert_eq!(stats.prompts, 4);
        assert_eq!(stats.failed, 4);
        assert_eq!(stats.succeeded, 0);
        let target = stats.export_dir.unwrap();
        let failures = std::fs::read_to_string(target.join("failed_prompts.txt")).unwrap();
        assert_eq!(failures.lines().count(), 4);
        assert!(failures.lines().next().unwrap().starts_with("提示词 #1 | 提交失败"));
    }

    #[tokio::test]
    async fn test_projects_with_same_name_export_separately() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            leonardo_api_key: "k".to_string(),
            leonardo_api_base_url: "http://127.0.0.1:9".to_string(),
            output_folder: dir.path().display().to_string(),
            ..Config::default()
        };
        let (_tx, rx) = watch::channel(false);
        let writer = ScriptWriter::new(LlmClient::new(&config));
        let flow = offline_flow(&config);

        let first = ScriptProject::from_script("rome", "Only one section");
        let second = ScriptProject {
            name: "rome".to_string(),
            prompts: Some(vec!["a forum".to_string()]),
            ..Default::default()
        };

        let a = process_project(&first, 1, flow.clone(), &writer, &config, rx.clone())
            .await
            .unwrap();
        let b = process_project(&second, 2, flow, &writer, &config, rx)
            .await
            .unwrap();

        let a_dir = a.export_dir.unwrap();
        let b_dir = b.export_dir.unwrap();
        assert_ne!(a_dir, b_dir);

        let a_failures = std::fs::read_to_string(a_dir.join("failed_prompts.txt")).unwrap();
        let b_failures = std::fs::read_to_string(b_dir.join("failed_prompts.txt")).unwrap();
        assert_eq!(a_failures.lines().count(), 4);
        assert_eq!(b_failures.lines().count(), 1);
        assert!(b_failures.contains("a forum"));
    }
}
