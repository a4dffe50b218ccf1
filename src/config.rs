use crate::error::{AppError, AppResult, ConfigError};
use crate::models::PromptWeights;
use std::str::FromStr;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- Leonardo API 配置 ---
    pub leonardo_api_key: String,
    pub leonardo_api_base_url: String,
    pub model_id: String,
    pub style_uuid: String,
    pub image_width: u32,
    pub image_height: u32,
    /// 每个任务生成的图片数量
    pub num_images: u32,
    pub ultra: bool,
    pub enhance_prompt: bool,
    // --- 批处理配置 ---
    /// 每批提示词数量
    pub batch_size: usize,
    /// intro / 中间段落 / outro 的复制次数
    pub weights: PromptWeights,
    /// 同一批内同时运行的任务数（1 = 严格顺序）
    pub max_concurrent_jobs: usize,
    pub poll_timeout_secs: u64,
    pub poll_interval_secs: u64,
    // --- 输入输出 ---
    /// 项目文件（.toml / .txt）存放目录
    pub input_folder: String,
    pub output_folder: String,
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置（按主题生成脚本时使用） ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            leonardo_api_key: String::new(),
            leonardo_api_base_url: "https://cloud.leonardo.ai/api/rest/v1".to_string(),
            model_id: "6b645e3a-d64f-4341-a6d8-7a3690fbf042".to_string(),
            style_uuid: "111dc692-d470-4eec-b791-3475abac4c46".to_string(),
            image_width: 1472,
            image_height: 832,
            num_images: 2,
            ultra: false,
            enhance_prompt: false,
            batch_size: 10,
            weights: PromptWeights::default(),
            max_concurrent_jobs: 1,
            poll_timeout_secs: 60,
            poll_interval_secs: 2,
            input_folder: "scripts".to_string(),
            output_folder: "output".to_string(),
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置，未设置的项使用默认值
    ///
    /// 已设置但无法解析的值会返回 `ConfigError::EnvVarParseFailed`。
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 使用自定义的变量查找函数加载配置
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let string = |name: &str, fallback: String| lookup(name).unwrap_or(fallback);

        Ok(Self {
            leonardo_api_key: string("LEONARDO_API_KEY", default.leonardo_api_key),
            leonardo_api_base_url: string("LEONARDO_API_BASE_URL", default.leonardo_api_base_url),
            model_id: string("LEONARDO_MODEL_ID", default.model_id),
            style_uuid: string("LEONARDO_STYLE_UUID", default.style_uuid),
            image_width: parse_var(&lookup, "IMAGE_WIDTH", default.image_width)?,
            image_height: parse_var(&lookup, "IMAGE_HEIGHT", default.image_height)?,
            num_images: parse_var(&lookup, "NUM_IMAGES", default.num_images)?,
            ultra: parse_var(&lookup, "ULTRA", default.ultra)?,
            enhance_prompt: parse_var(&lookup, "ENHANCE_PROMPT", default.enhance_prompt)?,
            batch_size: parse_var(&lookup, "BATCH_SIZE", default.batch_size)?,
            weights: PromptWeights {
                intro: parse_var(&lookup, "INTRO_WEIGHT", default.weights.intro)?,
                section: parse_var(&lookup, "SECTION_WEIGHT", default.weights.section)?,
                outro: parse_var(&lookup, "OUTRO_WEIGHT", default.weights.outro)?,
            },
            max_concurrent_jobs: parse_var(
                &lookup,
                "MAX_CONCURRENT_JOBS",
                default.max_concurrent_jobs,
            )?,
            poll_timeout_secs: parse_var(&lookup, "POLL_TIMEOUT_SECS", default.poll_timeout_secs)?,
            poll_interval_secs: parse_var(
                &lookup,
                "POLL_INTERVAL_SECS",
                default.poll_interval_secs,
            )?,
            input_folder: string("INPUT_FOLDER", default.input_folder),
            output_folder: string("OUTPUT_FOLDER", default.output_folder),
            output_log_file: string("OUTPUT_LOG_FILE", default.output_log_file),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING", default.verbose_logging)?,
            llm_api_key: string("LLM_API_KEY", default.llm_api_key),
            llm_api_base_url: string("LLM_API_BASE_URL", default.llm_api_base_url),
            llm_model_name: string("LLM_MODEL_NAME", default.llm_model_name),
        })
    }

    /// 检查配置是否可用于运行
    pub fn validate(&self) -> AppResult<()> {
        if self.leonardo_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "LEONARDO_API_KEY".to_string(),
            }
            .into());
        }
        if self.batch_size == 0 {
            return Err(AppError::invalid_config("BATCH_SIZE", "必须大于 0"));
        }
        if self.max_concurrent_jobs == 0 {
            return Err(AppError::invalid_config("MAX_CONCURRENT_JOBS", "必须大于 0"));
        }
        if self.num_images == 0 {
            return Err(AppError::invalid_config("NUM_IMAGES", "必须大于 0"));
        }
        if self.poll_interval_secs == 0 {
            return Err(AppError::invalid_config("POLL_INTERVAL_SECS", "必须大于 0"));
        }
        if self.poll_interval_secs > self.poll_timeout_secs {
            return Err(AppError::invalid_config(
                "POLL_INTERVAL_SECS",
                format!("不能大于 POLL_TIMEOUT_SECS ({})", self.poll_timeout_secs),
            ));
        }
        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, fallback: T) -> AppResult<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(fallback),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(_) => Err(ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }
            .into()),
        },
    }
}
