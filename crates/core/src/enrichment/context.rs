use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::bangumi::BangumiClient;
use super::title::extract_work_name;
use super::traits::Enricher;
use super::types::{parse_entities, Entities};
use crate::llm::{CompletionRequest, LlmClient};

fn extraction_prompt(title: &str) -> String {
    format!(
        "请从以下视频标题中提取“作品名称关键词”和“角色名称”。只要关键词，能看出作品是什么就行，不要完整全称。\n\
         例如标题中出现 “HUNDRED LINE -最終防衛学園-”，只需提取“最終防衛学園”。\n\
         \n\
         严格按如下格式输出（不要多余说明或代码块）：\n\
         - 若两类都存在：\n  作品：<作品关键词>\n  角色：<角色1>, <角色2>\n\
         - 若只有作品：\n  作品：<作品关键词>\n\
         - 若只有角色：\n  角色：<角色1>, <角色2>\n\
         - 若都没有：\n  无可提取实体\n\
         \n\
         标题：{}",
        title
    )
}

/// LLM entity extraction plus Bangumi lookups.
///
/// Without an LLM, or when it fails, the work name falls back to
/// [`extract_work_name`]. Without a Bangumi client the background is empty.
pub struct ContextEnricher {
    llm: Option<Arc<dyn LlmClient>>,
    bangumi: Option<BangumiClient>,
}

impl ContextEnricher {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, bangumi: Option<BangumiClient>) -> Self {
        Self { llm, bangumi }
    }

    fn heuristic(title: &str) -> Entities {
        let work = extract_work_name(title);
        if work.is_empty() {
            Entities::default()
        } else {
            Entities::work(work)
        }
    }
}

#[async_trait]
impl Enricher for ContextEnricher {
    fn name(&self) -> &str {
        "bangumi"
    }

    async fn entities(&self, title: &str) -> Entities {
        let Some(llm) = &self.llm else {
            return Self::heuristic(title);
        };
        match llm.complete(CompletionRequest::new(extraction_prompt(title))).await {
            Ok(response) => {
                let entities = parse_entities(&response.text);
                debug!(?entities, "Entities extracted");
                entities
            }
            Err(e) => {
                warn!(error = %e, "Entity extraction failed, using title heuristic");
                Self::heuristic(title)
            }
        }
    }

    async fn background(&self, entities: &Entities) -> String {
        let Some(bangumi) = &self.bangumi else {
            return String::new();
        };

        let mut blocks = Vec::new();
        if let Some(work) = &entities.work {
            match bangumi.subject_context(work).await {
                Ok(block) => blocks.push(block),
                Err(e) => warn!(work = %work, error = %e, "Bangumi subject lookup failed"),
            }
        }
        for name in &entities.characters {
            match bangumi.search_character(name).await {
                Ok(character) => blocks.push(character.to_context()),
                Err(e) => debug!(character = %name, error = %e, "Bangumi character lookup failed"),
            }
        }

        if !blocks.is_empty() {
            info!(blocks = blocks.len(), "Background context assembled");
        }
        blocks.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::BangumiConfig;
    use crate::testing::MockLlmClient;

    #[tokio::test]
    async fn test_llm_entities() {
        let llm = Arc::new(MockLlmClient::answering("mock", "作品：薬屋\n角色：猫猫"));
        let enricher = ContextEnricher::new(Some(llm.clone()), None);
        let entities = enricher.entities("【薬屋のひとりごと】第2期PV").await;
        assert_eq!(entities.work.as_deref(), Some("薬屋"));
        assert_eq!(entities.characters, vec!["猫猫"]);
        assert!(llm.calls().await[0].contains("标题：【薬屋のひとりごと】第2期PV"));
    }

    #[tokio::test]
    async fn test_llm_failure_uses_heuristic() {
        let llm = Arc::new(MockLlmClient::failing("mock"));
        let enricher = ContextEnricher::new(Some(llm), None);
        let entities = enricher.entities("《ダンジョン飯》新PV").await;
        assert_eq!(entities, Entities::work("ダンジョン飯"));
    }

    #[tokio::test]
    async fn test_no_bangumi_means_empty_context() {
        let enricher = ContextEnricher::new(None, None);
        assert_eq!(enricher.context("《ダンジョン飯》新PV").await, "");
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_empty() {
        let bangumi = BangumiClient::new(
            BangumiConfig::default()
                .with_base_url("http://127.0.0.1:9")
                .with_timeout_secs(2),
        )
        .unwrap();
        let enricher = ContextEnricher::new(None, Some(bangumi));
        let entities = Entities {
            work: Some("X".to_string()),
            characters: vec!["Y".to_string()],
        };
        assert_eq!(enricher.background(&entities).await, "");
    }
}
