//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量项目处理器
//! - 管理应用生命周期（初始化、运行）
//! - 加载项目（Vec<ScriptProject>），逐个处理
//! - 监听取消信号，输出全局统计
//!
//! ### `project_processor` - 单个项目处理器
//! - 确定提示词计划，分批执行
//! - 批内并发（Semaphore），按提交顺序收集结果
//! - 导出图片和失败记录
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<ScriptProject>)
//!     ↓
//! project_processor (处理 Vec<Batch>)
//!     ↓
//! workflow::PromptFlow (处理单条 Prompt)
//!     ↓
//! services (能力层：batcher / poller / collector / exporter)
//!     ↓
//! clients (Leonardo / LLM)
//! ```

pub mod batch_processor;
pub mod project_processor;

pub use batch_processor::{App, RunSummary};
pub use project_processor::{process_project, run_batch, ProjectStats};
