//! 脚本生成服务 - 业务能力层
//!
//! 项目只给出主题时，调用 LLM 生成分段脚本，之后与手写脚本走同一条流水线。

use crate::clients::LlmClient;
use crate::error::AppResult;
use tracing::info;

const SYSTEM_MESSAGE: &str = "You are a professional scriptwriter for YouTube videos.";

/// 脚本生成服务
pub struct ScriptWriter {
    client: LlmClient,
}

impl ScriptWriter {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    /// 根据主题、时长和风格生成脚本
    pub async fn write_script(
        &self,
        topic: &str,
        duration_minutes: u32,
        style: &str,
    ) -> AppResult<String> {
        info!(
            "📝 正在生成脚本: {} ({} 分钟, 模型: {})",
            topic,
            duration_minutes,
            self.client.model_name()
        );

        let user_message = build_script_request(topic, duration_minutes, style);
        let script = self
            .client
            .chat(&user_message, Some(SYSTEM_MESSAGE), 1500)
            .await?;

        info!("✓ 脚本生成完成，共 {} 字符", script.chars().count());

        Ok(script)
    }
}

/// 构建脚本请求
///
/// 段落之间必须用空行分隔，分批时按空行拆段。
fn build_script_request(topic: &str, duration_minutes: u32, style: &str) -> String {
    format!(
        "Create a {duration}-minute script using this exact topic title: '{topic}'.\n\
         Use a normal speaking pace. Break it into sections with clear headings, \
         and separate every section with one blank line.\n\
         Style: {style}\n\
         The first line must be exactly: '{topic}'",
        duration = duration_minutes,
        topic = topic,
        style = style,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::{AppError, LlmError};

    #[test]
    fn test_request_mentions_inputs() {
        let request = build_script_request("Ancient Rome", 7, "Casual");
        assert!(request.contains("7-minute"));
        assert!(request.contains("'Ancient Rome'"));
        assert!(request.contains("Style: Casual"));
        assert!(request.contains("blank line"));
    }

    #[tokio::test]
    async fn test_write_script_requires_llm_key() {
        let writer = ScriptWriter::new(LlmClient::new(&Config::default()));
        let err = writer.write_script("Rome", 5, "Casual").await.unwrap_err();
        assert!(matches!(err, AppError::Llm(LlmError::MissingApiKey)));
    }
}
