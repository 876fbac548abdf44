use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;
use reqwest::Client;

use crate::shared::error::SkillError;
use crate::shared::ports::skills::{Paper, PaperSearchPort, SkillFuture};

/// arXiv export API, newest submissions first.
#[derive(Clone)]
pub struct ArxivSearch {
    client: Client,
    api_base: String,
    max_results: u32,
}

impl ArxivSearch {
    pub fn new(client: Client, api_base: impl Into<String>, max_results: u32) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            max_results: max_results.max(1),
        }
    }

    async fn fetch_feed(&self, keyword: &str) -> Result<String> {
        let query = format!("all:{}", keyword);
        let max = self.max_results.to_string();
        let resp = self
            .client
            .get(&self.api_base)
            .query(&[
                ("search_query", query.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("arxiv {}", status);
        }
        Ok(resp.text().await?)
    }
}

struct AtomPatterns {
    entry: Regex,
    title: Regex,
    summary: Regex,
    published: Regex,
    id: Regex,
    author: Regex,
}

fn atom_patterns() -> Option<&'static AtomPatterns> {
    static PATTERNS: OnceLock<Option<AtomPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(AtomPatterns {
                entry: Regex::new(r"(?s)<entry>(.*?)</entry>").ok()?,
                title: Regex::new(r"(?s)<title[^>]*>(.*?)</title>").ok()?,
                summary: Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").ok()?,
                published: Regex::new(r"<published>([^<]*)</published>").ok()?,
                id: Regex::new(r"<id>([^<]*)</id>").ok()?,
                author: Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").ok()?,
            })
        })
        .as_ref()
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
}

fn clean_text(raw: &str) -> String {
    let unescaped = raw
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Entries of an arXiv Atom feed. Entries without an id or title are skipped.
pub fn parse_feed(xml: &str) -> Vec<Paper> {
    let Some(p) = atom_patterns() else {
        return Vec::new();
    };
    p.entry
        .captures_iter(xml)
        .filter_map(|caps| {
            let entry = caps.get(1)?.as_str();
            let url = capture(&p.id, entry)?;
            let title = capture(&p.title, entry)?;
            let arxiv_id = url.rsplit('/').next().unwrap_or_default().to_string();
            let published = capture(&p.published, entry).unwrap_or_default();
            Some(Paper {
                title,
                abstract_text: capture(&p.summary, entry).unwrap_or_default(),
                authors: p
                    .author
                    .captures_iter(entry)
                    .filter_map(|c| c.get(1).map(|m| clean_text(m.as_str())))
                    .collect(),
                published: published.chars().take(10).collect(),
                pdf_url: format!("https://arxiv.org/pdf/{}.pdf", arxiv_id),
                arxiv_id,
                url,
            })
        })
        .collect()
}

/// Extractive summary: the first five sentences of the abstract.
pub fn simple_summary(abstract_text: &str) -> String {
    let sentences: Vec<&str> = abstract_text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(5)
        .collect();
    format!("[自動要約] {}...", sentences.join(". "))
}

impl PaperSearchPort for ArxivSearch {
    fn search(&self, keyword: String) -> SkillFuture<Vec<Paper>> {
        let this = self.clone();
        Box::pin(async move {
            let xml = this
                .fetch_feed(&keyword)
                .await
                .map_err(|e| SkillError::QueryFailed(e.to_string()))?;
            let papers = parse_feed(&xml);
            if papers.is_empty() {
                return Err(SkillError::NoResult);
            }
            Ok(papers)
        })
    }
}
