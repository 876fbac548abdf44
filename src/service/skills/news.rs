use anyhow::Result;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;

use crate::shared::error::SkillError;
use crate::shared::ports::skills::{NewsArticle, NewsPort, SkillFuture};

const COUNTRY_CODES: &[(&str, &str)] = &[
    ("日本", "jp"),
    ("アメリカ", "us"),
    ("中国", "cn"),
    ("韓国", "kr"),
];

#[derive(Deserialize)]
struct HeadlinesResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Deserialize)]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
}

/// NewsAPI top headlines.
#[derive(Clone)]
pub struct NewsApi {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl NewsApi {
    pub fn new(client: Client, api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key,
        }
    }

    async fn headlines(&self, api_key: &str, country: &str, category: &str) -> Result<Vec<NewsArticle>> {
        let resp = self
            .client
            .get(&self.api_base)
            .query(&[
                ("country", country),
                ("category", category),
                ("pageSize", "10"),
                ("apiKey", api_key),
            ])
            .header("User-Agent", "aituber-backend/0.1")
            .send()
            .await?;
        let body: HeadlinesResponse = resp.json().await?;
        if body.status != "ok" {
            anyhow::bail!(
                "news api status {}: {}",
                body.status,
                body.message.unwrap_or_default()
            );
        }
        Ok(body
            .articles
            .into_iter()
            .filter_map(|raw| {
                Some(NewsArticle {
                    title: raw.title?,
                    description: raw.description.unwrap_or_default(),
                    content: raw.content.unwrap_or_default(),
                })
            })
            .collect())
    }
}

/// Display name or ISO code -> NewsAPI country code; Japan when unknown.
pub fn country_code(name: &str) -> &str {
    let name = name.trim();
    if let Some((_, code)) = COUNTRY_CODES.iter().find(|(n, _)| *n == name) {
        return *code;
    }
    if name.len() == 2 && name.chars().all(|c| c.is_ascii_alphabetic()) {
        return name;
    }
    "jp"
}

impl NewsPort for NewsApi {
    fn pick_headline(&self, country: String, category: String) -> SkillFuture<NewsArticle> {
        let this = self.clone();
        Box::pin(async move {
            let api_key = this
                .api_key
                .clone()
                .ok_or(SkillError::NotConfigured("NEWS_API_KEY"))?;
            let code = country_code(&country).to_ascii_lowercase();
            let category = if category.trim().is_empty() {
                "general".to_string()
            } else {
                category.trim().to_string()
            };
            let articles = this
                .headlines(&api_key, &code, &category)
                .await
                .map_err(|e| SkillError::QueryFailed(e.to_string()))?;
            articles
                .choose(&mut rand::thread_rng())
                .cloned()
                .ok_or(SkillError::NoResult)
        })
    }
}
