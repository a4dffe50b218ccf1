//! # Leonardo Batch
//!
//! 把视频脚本批量转换为配图的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 只负责 HTTP 调用，不关心流程
//! - `LeonardoClient` - 提交生成任务、查询任务状态、下载图片
//! - `LlmClient` - 根据主题生成脚本
//!
//! ### ② 业务能力层（Services）
//! - `prompt_batcher` - 脚本 → 加权提示词 → 批次（纯函数）
//! - `JobPoller` - 提交并在超时内轮询单个任务
//! - `ArtifactCollector` / `Labeler` - 下载结果图片并命名
//! - `exporter` / `FailureWriter` - ZIP、CSV、URL 列表、失败记录
//!
//! ### ③ 流程层（Workflow）
//! - `PromptFlow` - 一条提示词的流程（提交 → 轮询 → 下载）
//! - `RunContext` - 一次会话内累积的结果
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 加载项目，管理取消信号
//! - `orchestrator/project_processor` - 分批执行单个项目并导出

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ImageArtifact, Prompt, PromptPlan, ScriptProject};
pub use orchestrator::{process_project, App, ProjectStats, RunSummary};
pub use workflow::{PromptFlow, RunContext};
