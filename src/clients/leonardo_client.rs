/// Leonardo API 客户端
///
/// 封装生成提交、状态查询和结果下载三个 HTTP 调用，不关心批次和流程。
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::leonardo::{GenerationRequest, GenerationStatus, StatusResponse, SubmitResponse};
use crate::models::JobHandle;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// 生成参数（每次提交都相同）
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model_id: String,
    pub style_uuid: String,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    pub ultra: bool,
    pub enhance_prompt: bool,
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model_id: config.model_id.clone(),
            style_uuid: config.style_uuid.clone(),
            width: config.image_width,
            height: config.image_height,
            num_images: config.num_images,
            ultra: config.ultra,
            enhance_prompt: config.enhance_prompt,
        }
    }
}

/// Leonardo 客户端
#[derive(Debug, Clone)]
pub struct LeonardoClient {
    http: Client,
    base_url: String,
    api_key: String,
    settings: GenerationSettings,
}

impl LeonardoClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        Self::with_settings(
            &config.leonardo_api_base_url,
            &config.leonardo_api_key,
            GenerationSettings::from_config(config),
        )
    }

    /// 使用自定义地址和参数创建客户端
    pub fn with_settings(
        base_url: &str,
        api_key: &str,
        settings: GenerationSettings,
    ) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .pool_idle_timeout(Some(Duration::from_secs(5)))
            .build()
            .map_err(|e| AppError::api_request_failed("client", e))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            settings,
        })
    }

    /// 提交一次生成请求
    ///
    /// # 返回
    /// 成功时返回远端分配的任务 ID
    pub async fn create_generation(&self, prompt: &str) -> AppResult<JobHandle> {
        let endpoint = format!("{}/generations", self.base_url);
        let payload = GenerationRequest {
            width: self.settings.width,
            height: self.settings.height,
            model_id: &self.settings.model_id,
            num_images: self.settings.num_images,
            prompt,
            ultra: self.settings.ultra,
            style_uuid: &self.settings.style_uuid,
            enhance_prompt: self.settings.enhance_prompt,
        };

        debug!("提交生成请求: {}", endpoint);

        let response = self
            .http
            .post(&endpoint)
            .header("accept", "application/json")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let body: SubmitResponse = read_json(&endpoint, response).await?;

        let generation_id = body
            .sd_generation_job
            .and_then(|job| job.generation_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::MissingField {
                endpoint: endpoint.clone(),
                field: "sdGenerationJob.generationId".to_string(),
            })?;

        debug!("生成任务已创建: {}", generation_id);

        Ok(JobHandle { generation_id })
    }

    /// 查询任务状态
    pub async fn get_generation(&self, generation_id: &str) -> AppResult<GenerationStatus> {
        let endpoint = format!("{}/generations/{}", self.base_url, generation_id);

        let response = self
            .http
            .get(&endpoint)
            .header("accept", "application/json")
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let body: StatusResponse = read_json(&endpoint, response).await?;

        body.generations_by_pk.ok_or_else(|| {
            ApiError::MissingField {
                endpoint,
                field: "generations_by_pk".to_string(),
            }
            .into()
        })
    }

    /// 下载结果图片
    pub async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(url, e))?;

        let response = ensure_success(url, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::api_request_failed(url, e))?;

        Ok(bytes.to_vec())
    }
}

async fn ensure_success(endpoint: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::BadResponse {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    }
    .into())
}

async fn read_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> AppResult<T> {
    let response = ensure_success(endpoint, response).await?;
    let text = response
        .text()
        .await
        .map_err(|e| AppError::api_request_failed(endpoint, e))?;

    serde_json::from_str(&text).map_err(|e| {
        ApiError::JsonParseFailed {
            endpoint: endpoint.to_string(),
            source: e,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::leonardo::RemoteStatus;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> LeonardoClient {
        LeonardoClient::new(&Config {
            leonardo_api_key: "test-key".to_string(),
            leonardo_api_base_url: base_url.to_string(),
            ..Config::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_generation_returns_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generations"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "prompt": "a red fox",
                "num_images": 2,
                "modelId": "6b645e3a-d64f-4341-a6d8-7a3690fbf042"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sdGenerationJob": { "generationId": "gen-42" }
            })))
            .mount(&server)
            .await;

        let handle = test_client(&server.uri())
            .create_generation("a red fox")
            .await
            .unwrap();
        assert_eq!(handle.generation_id, "gen-42");
    }

    #[tokio::test]
    async fn test_create_generation_missing_job_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generations"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "error": "quota exceeded" })),
            )
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .create_generation("a red fox")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::MissingField { .. })));
    }

    #[tokio::test]
    async fn test_create_generation_non_success_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generations"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .create_generation("a red fox")
            .await
            .unwrap_err();
        match err {
            AppError::Api(ApiError::BadResponse { status, body, .. }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid token");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_get_generation_parses_images() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/generations/gen-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "generations_by_pk": {
                    "status": "COMPLETE",
                    "generated_images": [{ "url": "https://cdn/1.png" }, { "url": "https://cdn/2.png" }]
                }
            })))
            .mount(&server)
            .await;

        let status = test_client(&server.uri())
            .get_generation("gen-42")
            .await
            .unwrap();
        assert_eq!(status.status, RemoteStatus::Complete);
        assert_eq!(status.generated_images.len(), 2);
    }

    #[tokio::test]
    async fn test_download_returns_bytes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/img/1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let bytes = test_client(&server.uri())
            .download(&format!("{}/img/1.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
