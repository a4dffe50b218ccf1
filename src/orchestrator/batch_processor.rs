//! 批量项目处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量项目的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、写日志表头、创建客户端
//! 2. **批量加载**：扫描并加载所有待处理的项目（`Vec<ScriptProject>`）
//! 3. **依次处理**：项目逐个处理，委托 project_processor
//! 4. **取消**：Ctrl-C 后放弃当前批次，导出已有结果并停止
//! 5. **全局统计**：汇总所有项目的处理结果

use crate::clients::{LeonardoClient, LlmClient};
use crate::config::Config;
use crate::models::{load_all_projects, ScriptProject};
use crate::orchestrator::project_processor::{self, ProjectStats};
use crate::services::{ArtifactCollector, JobPoller, ScriptWriter};
use crate::utils::logging::{
    append_log_line, init_log_file, log_projects_loaded, log_startup, print_final_stats,
};
use crate::workflow::PromptFlow;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<PromptFlow>,
    script_writer: ScriptWriter,
    shutdown: watch::Receiver<bool>,
}

/// 一次运行的汇总
#[derive(Debug, Default)]
pub struct RunSummary {
    pub projects: Vec<ProjectStats>,
    /// 处理出错的项目数（配置无效、脚本生成失败、导出失败）
    pub errored: usize,
}

impl RunSummary {
    pub fn succeeded_prompts(&self) -> usize {
        self.projects.iter().map(|p| p.succeeded).sum()
    }

    pub fn failed_prompts(&self) -> usize {
        self.projects.iter().map(|p| p.failed).sum()
    }

    pub fn images(&self) -> usize {
        self.projects.iter().map(|p| p.images).sum()
    }

    pub fn cancelled(&self) -> bool {
        self.projects.iter().any(|p| p.cancelled)
    }
}

impl App {
    /// 初始化应用，并监听 Ctrl-C
    pub async fn initialize(config: Config) -> Result<Self> {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⛔ 收到 Ctrl-C，完成导出后退出...");
                let _ = tx.send(true);
            }
        });
        Self::with_shutdown(config, rx)
    }

    /// 使用外部提供的取消信号初始化应用
    pub fn with_shutdown(config: Config, shutdown: watch::Receiver<bool>) -> Result<Self> {
        config.validate()?;

        init_log_file(&config.output_log_file)
            .with_context(|| format!("无法创建日志文件: {}", config.output_log_file))?;
        log_startup(config.batch_size, config.max_concurrent_jobs);

        let client = LeonardoClient::new(&config)?;
        let flow = PromptFlow::new(
            JobPoller::from_config(client.clone(), &config),
            ArtifactCollector::new(client),
            &config,
        );
        let script_writer = ScriptWriter::new(LlmClient::new(&config));

        Ok(Self {
            config,
            flow: Arc::new(flow),
            script_writer,
            shutdown,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunSummary> {
        let projects = self.load_projects().await?;

        if projects.is_empty() {
            warn!("⚠️ 没有找到待处理的项目文件，程序结束");
            return Ok(RunSummary::default());
        }

        log_projects_loaded(projects.len());

        let summary = self.process_all_projects(projects).await;

        print_final_stats(
            summary.projects.len(),
            summary.succeeded_prompts(),
            summary.failed_prompts(),
            summary.images(),
            &self.config.output_log_file,
        );

        Ok(summary)
    }

    async fn load_projects(&self) -> Result<Vec<ScriptProject>> {
        info!("\n📁 正在扫描待处理的项目...");
        load_all_projects(&self.config.input_folder)
            .await
            .with_context(|| format!("无法加载项目: {}", self.config.input_folder))
    }

    /// 依次处理所有项目
    async fn process_all_projects(&self, projects: Vec<ScriptProject>) -> RunSummary {
        let mut summary = RunSummary::default();

        for (idx, project) in projects.iter().enumerate() {
            let project_index = idx + 1;

            let result = project_processor::process_project(
                project,
                project_index,
                self.flow.clone(),
                &self.script_writer,
                &self.config,
                self.shutdown.clone(),
            )
            .await;

            match result {
                Ok(stats) => {
                    self.record_in_log(&stats);
                    let cancelled = stats.cancelled;
                    summary.projects.push(stats);
                    if cancelled {
                        break;
                    }
                }
                Err(e) => {
                    error!("[项目 {}] ❌ 处理过程中发生错误: {}", project_index, e);
                    summary.errored += 1;
                }
            }

            if *self.shutdown.borrow() {
                break;
            }
        }

        summary
    }

    fn record_in_log(&self, stats: &ProjectStats) {
        let export = stats
            .export_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let line = format!(
            "项目 {}: 提示词 {}, 成功 {}, 失败 {}, 图片 {}, 导出 {}{}",
            stats.name,
            stats.prompts,
            stats.succeeded,
            stats.failed,
            stats.images,
            export,
            if stats.cancelled { " (已取消)" } else { "" }
        );
        if let Err(e) = append_log_line(&self.config.output_log_file, &line) {
            warn!("写入运行日志失败: {}", e);
        }
    }
}
