use serde::{Deserialize, Serialize};

/// 提示词的来源位置
///
/// 标注文件名和说明文字时按来源分区，保证标签与产生它的脚本段落一致。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptOrigin {
    /// 脚本第一段
    Intro,
    /// 中间段落，`number` 从 1 开始
    Section { number: usize, title: String },
    /// 脚本最后一段
    Outro,
    /// 直接给出的提示词列表中的第 `number` 条（从 1 开始）
    Listed { number: usize },
}

/// 单条图片生成提示词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// 在展开后序列中的位置（从 0 开始）
    pub position: usize,
    pub text: String,
    pub origin: PromptOrigin,
}

/// 脚本中的一个段落
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub text: String,
}

impl Section {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// 段落标题：第一行
    pub fn title(&self) -> &str {
        self.text.lines().next().unwrap_or_default().trim()
    }
}

/// intro / 中间段落 / outro 的复制次数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptWeights {
    pub intro: usize,
    pub section: usize,
    pub outro: usize,
}

impl Default for PromptWeights {
    fn default() -> Self {
        Self {
            intro: 2,
            section: 5,
            outro: 2,
        }
    }
}

/// 一批提示词（顺序处理，最后一批可能不满）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 批次编号（从 0 开始）
    pub index: usize,
    pub prompts: Vec<Prompt>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

/// 一个项目展开后的完整提示词计划
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptPlan {
    pub batches: Vec<Batch>,
}

impl PromptPlan {
    pub fn total_prompts(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    pub fn total_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
