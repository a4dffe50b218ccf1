//! 任务轮询服务 - 业务能力层
//!
//! 只负责"提交一条提示词"和"等待一个任务结束"两个能力。
//!
//! - 固定间隔轮询，无退避
//! - 整个等待过程受 `timeout` 限制，超时后不向远端发送任何取消请求
//! - 丢弃返回的 future 即可取消等待

use crate::clients::LeonardoClient;
use crate::config::Config;
use crate::models::leonardo::RemoteStatus;
use crate::models::{JobFailure, JobHandle, Prompt};
use crate::services::prompt_batcher::sanitize_prompt;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// 一次等待的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// 完成，附带结果 URL（可能为空）
    Complete(Vec<String>),
    /// 超时前未完成
    TimedOut,
    /// 远端报告失败
    Failed,
}

/// 任务轮询服务
#[derive(Debug, Clone)]
pub struct JobPoller {
    client: LeonardoClient,
    timeout: Duration,
    interval: Duration,
}

impl JobPoller {
    pub fn new(client: LeonardoClient, timeout: Duration, interval: Duration) -> Self {
        Self {
            client,
            timeout,
            interval,
        }
    }

    pub fn from_config(client: LeonardoClient, config: &Config) -> Self {
        Self::new(client, config.poll_timeout(), config.poll_interval())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 提交一条提示词
    ///
    /// 网络错误、非 2xx 响应、响应缺少任务 ID 都视为提交失败，不重试。
    pub async fn submit(&self, prompt: &Prompt) -> Result<JobHandle, JobFailure> {
        let text = sanitize_prompt(&prompt.text);
        self.client
            .create_generation(&text)
            .await
            .map_err(|e| JobFailure::Submission {
                reason: e.to_string(),
            })
    }

    /// 等待任务结束
    ///
    /// 每次检查都是一次网络请求；单次查询出错只记录警告，继续等待直到超时。
    pub async fn poll(&self, handle: &JobHandle) -> PollOutcome {
        let generation_id = handle.generation_id.as_str();

        let wait = async {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut checks = 0usize;

            loop {
                ticker.tick().await;
                checks += 1;

                match self.client.get_generation(generation_id).await {
                    Ok(status) => match status.status {
                        RemoteStatus::Complete => {
                            debug!("任务 {} 完成 (第 {} 次检查)", generation_id, checks);
                            let urls = status
                                .generated_images
                                .into_iter()
                                .map(|image| image.url)
                                .collect();
                            return PollOutcome::Complete(urls);
                        }
                        RemoteStatus::Failed => {
                            warn!("任务 {} 远端生成失败", generation_id);
                            return PollOutcome::Failed;
                        }
                        RemoteStatus::Pending | RemoteStatus::Unknown => {
                            debug!("任务 {} 仍在生成 (第 {} 次检查)", generation_id, checks);
                        }
                    },
                    Err(e) => {
                        warn!("查询任务 {} 状态失败: {}", generation_id, e);
                    }
                }
            }
        };

        match tokio::time::timeout(self.timeout, wait).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "任务 {} 在 {:?} 内未完成，放弃等待",
                    generation_id, self.timeout
                );
                PollOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PromptOrigin;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn poller(base_url: &str, timeout_ms: u64, interval_ms: u64) -> JobPoller {
        let client = LeonardoClient::new(&Config {
            leonardo_api_key: "test-key".to_string(),
            leonardo_api_base_url: base_url.to_string(),
            ..Config::default()
        })
        .unwrap();
        JobPoller::new(
            client,
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
        )
    }

    fn handle(id: &str) -> JobHandle {
        JobHandle {
            generation_id: id.to_string(),
        }
    }

    fn status_body(status: &str, urls: &[&str]) -> serde_json::Value {
        json!({
            "generations_by_pk": {
                "status": status,
                "generated_images": urls.iter().map(|u| json!({ "url": u })).collect::<Vec<_>>()
            }
        })
    }

    #[tokio::test]
    async fn test_poll_returns_complete_after_pending() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/generations/gen-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("PENDING", &[])))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/generations/gen-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(status_body("COMPLETE", &["https://cdn/a.png"])),
            )
            .mount(&server)
            .await;

        let outcome = poller(&server.uri(), 2_000, 20).poll(&handle("gen-1")).await;
        assert_eq!(
            outcome,
            PollOutcome::Complete(vec!["https://cdn/a.png".to_string()])
        );
    }

    #[tokio::test]
    async fn test_poll_times_out_when_never_complete() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/generations/gen-slow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("PENDING", &[])))
            .mount(&server)
            .await;

        let outcome = poller(&server.uri(), 200, 30).poll(&handle("gen-slow")).await;
        assert_eq!(outcome, PollOutcome::TimedOut);

        // 超时后不会发送 DELETE 等取消请求
        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
    }

    #[tokio::test]
    async fn test_poll_keeps_waiting_through_status_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/generations/gen-2"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/generations/gen-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("COMPLETE", &[])))
            .mount(&server)
            .await;

        let outcome = poller(&server.uri(), 2_000, 20).poll(&handle("gen-2")).await;
        assert_eq!(outcome, PollOutcome::Complete(Vec::new()));
    }

    #[tokio::test]
    async fn test_poll_reports_remote_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/generations/gen-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body("FAILED", &[])))
            .mount(&server)
            .await;

        let outcome = poller(&server.uri(), 2_000, 20).poll(&handle("gen-3")).await;
        assert_eq!(outcome, PollOutcome::Failed);
    }

    #[tokio::test]
    async fn test_submit_failure_on_network_error() {
        // 没有服务监听的端口
        let outcome = poller("http://127.0.0.1:9", 200, 20)
            .submit(&Prompt {
                position: 0,
                text: "a quiet lake".to_string(),
                origin: PromptOrigin::Listed { number: 1 },
            })
            .await;
        assert!(matches!(outcome, Err(JobFailure::Submission { .. })));
    }
}
