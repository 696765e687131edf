use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::category::CATEGORIES;
use super::error::TranslateError;
use super::parse::parse_translation;
use super::traits::{Translation, Translator};
use crate::llm::{CompletionRequest, LlmClient};

/// Translator backed by an [`LlmClient`].
pub struct LlmTranslator {
    llm: Arc<dyn LlmClient>,
}

impl LlmTranslator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn build_prompt(title: &str, context: &str) -> String {
        let categories = CATEGORIES
            .iter()
            .map(|(name, id)| format!("{}({})", name, id))
            .collect::<Vec<_>>()
            .join("、");
        let context = context.trim();
        let context = if context.is_empty() {
            String::new()
        } else {
            format!("{}\n", context)
        };
        format!(
            "{context}你是一名擅长中日双语的ACGN相关情报编辑，任务是将日语/英文ACGN情报标题翻译成中文，并给出 10 个中文标签。\n\
             要求：\n\
             1) 动画作品名称使用公认中文译名，如不确定名称请参考上方背景资料。\n\
             2) 标题可创意改写，突出情报重点，并使标题具有吸引力。如果情况合适，你可以在标题前加一个【】，并在其中用不多于6个字来简短概括情报类型和内容\n\
             3) 从以下分区中选择最合适的一个：{categories}\n\
             4) 严格只输出下列三行（不要额外说明或代码块）：\n\
             \x20  翻译：<翻译后的中文标题>\n\
             \x20  标签：<标签1>, <标签2>, ..., <标签10>\n\
             \x20  分区：<分区名>\n\
             \n\
             标题：{title}"
        )
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    fn name(&self) -> &str {
        self.llm.provider()
    }

    async fn translate(&self, title: &str, context: &str) -> Result<Translation, TranslateError> {
        let prompt = Self::build_prompt(title, context);
        let response = self.llm.complete(CompletionRequest::new(prompt)).await?;
        debug!(raw = %response.text, "Translation answer");
        parse_translation(&response.text).inspect_err(|e| {
            warn!(error = %e, "Translation answer rejected");
        })
    }
}
