use anyhow::Result;
use reqwest::Client;
use serde_json::Value;

use crate::shared::error::SkillError;
use crate::shared::ports::skills::{EncyclopediaPage, EncyclopediaPort, SkillFuture};

/// Wikipedia through the MediaWiki action API.
#[derive(Clone)]
pub struct MediaWiki {
    client: Client,
    api_url: String,
    sentences: u32,
}

impl MediaWiki {
    pub fn new(client: Client, lang: &str, sentences: u32) -> Self {
        Self {
            client,
            api_url: format!("https://{}.wikipedia.org/w/api.php", lang),
            sentences: sentences.max(1),
        }
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<Value> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .header("User-Agent", "aituber-backend/0.1")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("mediawiki {}", status);
        }
        Ok(resp.json().await?)
    }

    /// Best matching title; the search ranks exact titles first.
    async fn best_title(&self, query: &str) -> Result<Option<String>> {
        let found = self
            .get(&[("list", "search"), ("srsearch", query), ("srlimit", "1")])
            .await?;
        Ok(search_title(&found))
    }

    async fn page(&self, title: &str) -> Result<Option<EncyclopediaPage>> {
        let sentences = self.sentences.to_string();
        let found = self
            .get(&[
                ("prop", "extracts|info"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exsentences", sentences.as_str()),
                ("inprop", "url"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;
        Ok(page_from(&found))
    }
}

fn search_title(body: &Value) -> Option<String> {
    body["query"]["search"]
        .as_array()?
        .first()?
        .get("title")?
        .as_str()
        .map(str::to_string)
}

fn page_from(body: &Value) -> Option<EncyclopediaPage> {
    let page = body["query"]["pages"].as_array()?.first()?;
    if page.get("missing").is_some() {
        return None;
    }
    let title = page["title"].as_str()?.to_string();
    let url = page["fullurl"].as_str().unwrap_or_default().to_string();
    let summary = page["extract"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    Some(EncyclopediaPage {
        title,
        url,
        summary,
    })
}

impl EncyclopediaPort for MediaWiki {
    fn lookup(&self, query: String) -> SkillFuture<EncyclopediaPage> {
        let this = self.clone();
        Box::pin(async move {
            let title = this
                .best_title(&query)
                .await
                .map_err(|e| SkillError::QueryFailed(e.to_string()))?
                .ok_or(SkillError::NoResult)?;
            let page = this
                .page(&title)
                .await
                .map_err(|e| SkillError::QueryFailed(e.to_string()))?;
            page.ok_or(SkillError::NoResult)
        })
    }
}
