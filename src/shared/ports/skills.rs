use std::future::Future;
use std::pin::Pin;

use crate::shared::error::SkillError;

pub type SkillFuture<T> = Pin<Box<dyn Future<Output = Result<T, SkillError>> + Send>>;

#[derive(Debug, Clone, PartialEq)]
pub struct NewsArticle {
    pub title: String,
    pub description: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncyclopediaPage {
    pub title: String,
    pub url: String,
    /// `None` when the page exists but no summary could be fetched.
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paper {
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub published: String,
    pub arxiv_id: String,
    pub url: String,
    pub pdf_url: String,
}

pub trait WeatherPort: Send + Sync {
    /// Forecast report for a city and a day label (今日 / 明日 / 明後日).
    fn forecast(&self, city: String, day_label: String) -> SkillFuture<String>;
}

pub trait NewsPort: Send + Sync {
    /// One article from the top headlines of `country` (display name) and `category`.
    fn pick_headline(&self, country: String, category: String) -> SkillFuture<NewsArticle>;
}

pub trait MusicPort: Send + Sync {
    /// Returns the display name of the track that started playing.
    fn play_track(&self, query: String) -> SkillFuture<String>;
    fn pause(&self) -> SkillFuture<()>;
    fn next_track(&self) -> SkillFuture<()>;
}

pub trait EncyclopediaPort: Send + Sync {
    fn lookup(&self, query: String) -> SkillFuture<EncyclopediaPage>;
}

pub trait PaperSearchPort: Send + Sync {
    /// Newest papers first.
    fn search(&self, keyword: String) -> SkillFuture<Vec<Paper>>;
}

pub trait SkillServices: WeatherPort + NewsPort + MusicPort + EncyclopediaPort + PaperSearchPort {}

impl<T> SkillServices for T where
    T: WeatherPort + NewsPort + MusicPort + EncyclopediaPort + PaperSearchPort
{
}
