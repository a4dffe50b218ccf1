//! Leonardo 生成接口的请求 / 响应结构

use serde::{Deserialize, Serialize};

/// `POST /generations` 请求体
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest<'a> {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "modelId")]
    pub model_id: &'a str,
    pub num_images: u32,
    pub prompt: &'a str,
    pub ultra: bool,
    #[serde(rename = "styleUUID")]
    pub style_uuid: &'a str,
    #[serde(rename = "enhancePrompt")]
    pub enhance_prompt: bool,
}

/// `POST /generations` 响应体
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(rename = "sdGenerationJob")]
    pub sd_generation_job: Option<SdGenerationJob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SdGenerationJob {
    #[serde(rename = "generationId")]
    pub generation_id: Option<String>,
}

/// `GET /generations/{id}` 响应体
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub generations_by_pk: Option<GenerationStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationStatus {
    pub status: RemoteStatus,
    #[serde(default)]
    pub generated_images: Vec<GeneratedImage>,
}

/// 远端状态；未识别的值按进行中处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    Pending,
    Complete,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
}
