//! Bangumi (bgm.tv) API client.
//!
//! Anonymous access works; a token raises the rate limit and unlocks
//! NSFW subjects.

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::config::BangumiConfig;
use super::error::EnrichmentError;
use crate::metrics;

/// Subject detail (`GET /v0/subjects/{id}`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BangumiSubject {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub subject_type: Option<u8>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_cn: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub tags: Vec<BangumiTag>,
    #[serde(default)]
    pub infobox: Vec<InfoboxItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BangumiTag {
    pub name: String,
}

/// Character search hit (`POST /v0/search/characters`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BangumiCharacter {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub infobox: Vec<InfoboxItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InfoboxItem {
    pub key: String,
    pub value: InfoboxValue,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InfoboxValue {
    Text(String),
    List(Vec<InfoboxEntry>),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InfoboxEntry {
    Pair {
        #[serde(default)]
        k: Option<String>,
        v: String,
    },
    Text(String),
}

impl InfoboxValue {
    /// Flatten to one line: list entries become `v（k）` joined with `、`.
    pub fn render(&self) -> String {
        match self {
            InfoboxValue::Text(s) => s.trim().to_string(),
            InfoboxValue::List(entries) => entries
                .iter()
                .filter_map(|entry| match entry {
                    InfoboxEntry::Pair { k, v } if !v.is_empty() => Some(match k {
                        Some(k) if !k.is_empty() => format!("{}（{}）", v, k),
                        _ => v.clone(),
                    }),
                    InfoboxEntry::Text(s) if !s.is_empty() => Some(s.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("、"),
            InfoboxValue::Other(_) => String::new(),
        }
    }
}

fn infobox_lookup(infobox: &[InfoboxItem], keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        infobox
            .iter()
            .find(|item| item.key == *key)
            .map(|item| item.value.render())
            .filter(|v| !v.is_empty())
    })
}

fn category_name(subject_type: Option<u8>) -> String {
    match subject_type {
        Some(1) => "书籍".to_string(),
        Some(2) => "动画".to_string(),
        Some(3) => "音乐".to_string(),
        Some(4) => "游戏".to_string(),
        Some(6) => "三次元".to_string(),
        Some(other) => format!("未知类型({})", other),
        None => "未知类型".to_string(),
    }
}

impl BangumiSubject {
    pub fn official_title(&self) -> &str {
        if self.name_cn.is_empty() {
            &self.name
        } else {
            &self.name_cn
        }
    }

    pub fn year(&self) -> Option<&str> {
        self.date
            .as_deref()
            .and_then(|d| d.split('-').next())
            .filter(|y| !y.is_empty())
    }

    /// Render the `【背景资料】` block.
    pub fn to_context(&self, max_tags: usize) -> String {
        let mut lines = vec!["【背景资料】".to_string()];
        let official = self.official_title();
        if !official.is_empty() {
            lines.push(format!("作品标准译名：{}", official));
        }
        if !self.name.is_empty() && !self.name_cn.is_empty() && self.name != self.name_cn {
            lines.push(format!("作品原名：{}", self.name));
        }
        lines.push(format!("类别：{}", category_name(self.subject_type)));
        if let Some(year) = self.year() {
            lines.push(format!("年份：{}", year));
        }
        if let Some(director) = infobox_lookup(&self.infobox, &["导演", "监督"]) {
            lines.push(format!("导演：{}", director));
        }
        if let Some(original) = infobox_lookup(&self.infobox, &["原作"]) {
            lines.push(format!("原作：{}", original));
        }
        if let Some(cast) = infobox_lookup(&self.infobox, &["主角声优", "声优"]) {
            lines.push(format!("主要声优：{}", cast));
        }
        let tags: Vec<&str> = self
            .tags
            .iter()
            .take(max_tags)
            .map(|t| t.name.as_str())
            .collect();
        if !tags.is_empty() {
            lines.push(format!("标签：{}", tags.join(", ")));
        }
        lines.join("\n")
    }
}

impl BangumiCharacter {
    /// Render the `【角色资料】` block.
    pub fn to_context(&self) -> String {
        let mut lines = vec!["【角色资料】".to_string(), format!("角色名：{}", self.name)];
        if let Some(cn) = infobox_lookup(&self.infobox, &["简体中文名", "中文名"]) {
            if cn != self.name {
                lines.push(format!("中文名：{}", cn));
            }
        }
        let summary: String = self.summary.trim().chars().take(120).collect();
        if !summary.is_empty() {
            lines.push(format!("简介：{}", summary));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SubjectHit {
    id: u64,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    keyword: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'a str>,
}

pub struct BangumiClient {
    client: Client,
    config: BangumiConfig,
}

impl BangumiClient {
    pub fn new(config: BangumiConfig) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BangumiConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match self.config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, EnrichmentError> {
        let start = Instant::now();
        let result: Result<T, EnrichmentError> = async {
            let response = self.authorize(request).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(EnrichmentError::Status {
                    status: status.as_u16(),
                });
            }
            response
                .json::<T>()
                .await
                .map_err(|e| EnrichmentError::Parse(e.to_string()))
        }
        .await;
        metrics::record_external(
            "bangumi",
            operation,
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
        result
    }

    /// Best-matching subject id for a keyword.
    pub async fn search_subject(&self, keyword: &str) -> Result<u64, EnrichmentError> {
        debug!(keyword, "Bangumi subject search");
        let url = format!("{}/v0/search/subjects", self.config.base_url);
        let request = self
            .client
            .post(&url)
            .query(&[("limit", "1")])
            .json(&SearchRequest {
                keyword,
                sort: Some("match"),
            });
        let response: SearchResponse<SubjectHit> = self.send("search_subjects", request).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|hit| hit.id)
            .ok_or_else(|| EnrichmentError::NotFound(keyword.to_string()))
    }

    pub async fn subject(&self, id: u64) -> Result<BangumiSubject, EnrichmentError> {
        debug!(id, "Bangumi subject detail");
        let url = format!("{}/v0/subjects/{}", self.config.base_url, id);
        self.send("get_subject", self.client.get(&url)).await
    }

    /// Search then fetch detail, rendered as a background block.
    pub async fn subject_context(&self, keyword: &str) -> Result<String, EnrichmentError> {
        let id = self.search_subject(keyword).await?;
        let subject = self.subject(id).await?;
        Ok(subject.to_context(self.config.max_tags))
    }

    pub async fn search_character(&self, name: &str) -> Result<BangumiCharacter, EnrichmentError> {
        debug!(name, "Bangumi character search");
        let url = format!("{}/v0/search/characters", self.config.base_url);
        let request = self
            .client
            .post(&url)
            .query(&[("limit", "1")])
            .json(&SearchRequest {
                keyword: name,
                sort: None,
            });
        let response: SearchResponse<BangumiCharacter> =
            self.send("search_characters", request).await?;
        response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EnrichmentError::NotFound(name.to_string()))
    }
}
