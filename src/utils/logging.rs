//! 日志工具模块
//!
//! 订阅器初始化、运行日志文件，以及各阶段的格式化输出。

use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 安装全局 tracing 订阅器
///
/// 优先使用 `RUST_LOG`；未设置时为 `info`，开启详细日志时为 `debug`。
/// 重复调用是安全的（后续调用不生效）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化运行日志文件（覆盖旧内容，写入表头）
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let header = format!(
        "{}\n图片批量生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, header)?;
    Ok(())
}

/// 向运行日志文件追加一行
pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

pub fn log_startup(batch_size: usize, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量图片生成模式");
    info!("📦 每批提示词数: {}", batch_size);
    info!("📊 批内最大并发任务数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

pub fn log_projects_loaded(total: usize) {
    info!("✓ 找到 {} 个待处理的项目", total);
    info!("💡 项目依次处理，每批完成后再开始下一批\n");
}

/// 记录批次开始信息
///
/// `first` / `last` 为提示词编号（从 1 开始）。
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    first: usize,
    last: usize,
    total_prompts: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("🖼️ 本批提示词: {}-{} / 共 {} 条", first, last, total_prompts);
    info!("{}", "=".repeat(60));
}

pub fn log_batch_complete(batch_num: usize, succeeded: usize, total: usize, images: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 成功 {}/{}，得到 {} 张图片",
        batch_num, succeeded, total, images
    );
    info!("{}", "─".repeat(60));
}

/// 打印所有项目的汇总
pub fn print_final_stats(
    projects: usize,
    succeeded_prompts: usize,
    failed_prompts: usize,
    images: usize,
    log_file_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📁 项目: {}", projects);
    info!("✅ 成功提示词: {}", succeeded_prompts);
    info!("❌ 失败提示词: {}", failed_prompts);
    info!("🖼️ 图片: {}", images);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本，超过 `max_len` 个字符时追加 `...`
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
