use serde::{Deserialize, Serialize};

/// 一个待处理的项目（一次会话）
///
/// TOML 中 `script` / `prompts` / `topic` 三选一。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptProject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

/// 项目提示词的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSource {
    /// 按段落加权展开的脚本
    Script(String),
    /// 逐条使用的提示词列表
    Prompts(Vec<String>),
    /// 先用 LLM 根据主题生成脚本
    Topic {
        topic: String,
        duration_minutes: u32,
        style: String,
    },
}

impl ScriptProject {
    /// 由纯文本脚本构建项目
    pub fn from_script(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Some(script.into()),
            ..Default::default()
        }
    }

    pub fn with_file_path(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }

    /// 解析提示词来源；三者不是恰好一个时返回说明原因
    pub fn source(&self) -> Result<ProjectSource, String> {
        let given = [
            self.script.is_some(),
            self.prompts.is_some(),
            self.topic.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if given != 1 {
            return Err(format!(
                "script / prompts / topic 必须且只能设置一个 (当前设置了 {} 个)",
                given
            ));
        }

        if let Some(script) = &self.script {
            return Ok(ProjectSource::Script(script.clone()));
        }
        if let Some(prompts) = &self.prompts {
            return Ok(ProjectSource::Prompts(prompts.clone()));
        }
        let topic = self.topic.clone().unwrap_or_default();
        Ok(ProjectSource::Topic {
            topic,
            duration_minutes: self.duration_minutes.unwrap_or(5),
            style: self.style.clone().unwrap_or_else(|| "Educational".to_string()),
        })
    }
}
