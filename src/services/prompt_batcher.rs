//! 提示词分批服务 - 业务能力层
//!
//! 把脚本拆成段落，按 intro / 段落 / outro 权重展开成提示词序列，
//! 再按固定大小切成批次。全部是纯函数。

use crate::models::{Batch, Prompt, PromptOrigin, PromptPlan, PromptWeights, Section};
use regex::Regex;
use std::sync::OnceLock;

/// 提示词列表模式下的分隔行
pub const PROMPT_LIST_SEPARATOR: &str = "====";

/// 提交前替换掉的词
///
/// 按子串匹配，较长的词排在前面（`slavery` 先于 `slave`）。
const BLOCKED_WORDS: &[&str] = &["slavery", "enslaved", "bondage", "slave"];

/// 按空行拆分段落；空白段落被丢弃
pub fn split_sections(script: &str) -> Vec<Section> {
    script
        .replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(Section::new)
        .collect()
}

/// 按权重展开段落
///
/// 第一段复制 `intro` 次，中间每段 `section` 次，最后一段 `outro` 次。
/// 只有一段时它同时是 intro 和 outro。
pub fn expand_prompts(sections: &[Section], weights: PromptWeights) -> Vec<Prompt> {
    let Some((first, rest)) = sections.split_first() else {
        return Vec::new();
    };
    let (last, interior) = match rest.split_last() {
        Some((last, interior)) => (last, interior),
        None => (first, rest),
    };

    let mut expanded: Vec<(String, PromptOrigin)> = Vec::new();
    push_copies(&mut expanded, first, PromptOrigin::Intro, weights.intro);
    for (idx, section) in interior.iter().enumerate() {
        let origin = PromptOrigin::Section {
            number: idx + 1,
            title: section.title().to_string(),
        };
        push_copies(&mut expanded, section, origin, weights.section);
    }
    push_copies(&mut expanded, last, PromptOrigin::Outro, weights.outro);

    expanded
        .into_iter()
        .enumerate()
        .map(|(position, (text, origin))| Prompt {
            position,
            text,
            origin,
        })
        .collect()
}

fn push_copies(
    out: &mut Vec<(String, PromptOrigin)>,
    section: &Section,
    origin: PromptOrigin,
    copies: usize,
) {
    for _ in 0..copies {
        out.push((section.text.clone(), origin.clone()));
    }
}

/// 解析以 `====` 分隔的提示词列表，每条只使用一次
pub fn parse_prompt_list(text: &str) -> Vec<String> {
    text.split(PROMPT_LIST_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// 文本中出现单独的 `====` 行，且它至少分出两条非空提示词时，按提示词列表处理
///
/// 恰好四个 `=` 的 Markdown setext 标题下划线也满足这个条件；
/// 脚本中的标题请用 `#` 或其它长度的下划线。
pub fn is_prompt_list(text: &str) -> bool {
    text.lines().any(|line| line.trim() == PROMPT_LIST_SEPARATOR)
        && parse_prompt_list(text).len() >= 2
}

/// 把提示词列表转换成序列
pub fn listed_prompts<S: AsRef<str>>(prompts: &[S]) -> Vec<Prompt> {
    prompts
        .iter()
        .map(|p| p.as_ref().trim())
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(position, text)| Prompt {
            position,
            text: text.to_string(),
            origin: PromptOrigin::Listed {
                number: position + 1,
            },
        })
        .collect()
}

/// 按固定大小切分，保持顺序；最后一批可能不满
///
/// `size` 为 0 时视为 1。
pub fn into_batches(prompts: Vec<Prompt>, size: usize) -> Vec<Batch> {
    let size = size.max(1);
    let mut batches: Vec<Batch> = Vec::with_capacity(prompts.len().div_ceil(size));
    for prompt in prompts {
        match batches.last_mut() {
            Some(batch) if batch.len() < size => batch.prompts.push(prompt),
            _ => batches.push(Batch {
                index: batches.len(),
                prompts: vec![prompt],
            }),
        }
    }
    batches
}

/// 脚本 → 段落 → 加权展开 → 分批
pub fn prepare_script(script: &str, weights: PromptWeights, batch_size: usize) -> PromptPlan {
    let sections = split_sections(script);
    PromptPlan {
        batches: into_batches(expand_prompts(&sections, weights), batch_size),
    }
}

/// 纯文本 → 分批：含分隔行时逐条使用，否则按脚本加权展开
pub fn prepare_text(text: &str, weights: PromptWeights, batch_size: usize) -> PromptPlan {
    if is_prompt_list(text) {
        prepare_prompt_list(&parse_prompt_list(text), batch_size)
    } else {
        prepare_script(text, weights, batch_size)
    }
}

/// 提示词列表 → 分批
pub fn prepare_prompt_list<S: AsRef<str>>(prompts: &[S], batch_size: usize) -> PromptPlan {
    PromptPlan {
        batches: into_batches(listed_prompts(prompts), batch_size),
    }
}

/// 把屏蔽词（含其变形，如 `slaves`）替换为 `person`，不区分大小写
pub fn sanitize_prompt(prompt: &str) -> String {
    static BLOCKED: OnceLock<Option<Regex>> = OnceLock::new();
    let blocked = BLOCKED.get_or_init(|| {
        Regex::new(&format!(r"(?i)(?:{})", BLOCKED_WORDS.join("|"))).ok()
    });
    match blocked {
        Some(re) => re.replace_all(prompt, "person").into_owned(),
        None => prompt.to_string(),
    }
}
