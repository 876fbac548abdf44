//! Skill dispatch: the intent classifier picks a task, the matching adapter
//! runs, and the outcome becomes a hint for the next dialogue prompt.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use rand::seq::SliceRandom;

use crate::service::ai::http_client;
use crate::shared::config::{self, SkillsConfig};
use crate::shared::entities::SkillResult;
use crate::shared::error::SkillError;
use crate::shared::ports::ai::IntentPort;
use crate::shared::ports::skills::{
    EncyclopediaPage, EncyclopediaPort, MusicPort, NewsArticle, NewsPort, Paper,
    PaperSearchPort, SkillFuture, SkillServices, WeatherPort,
};
use crate::shared::ports::turn::{TurnRequest, TurnTx};
use crate::shared::utils::preview;

pub mod catalogue;
pub mod music;
pub mod news;
pub mod paper;
pub mod parse;
pub mod weather;
pub mod wiki;

pub use catalogue::{build_prompt, default_catalogue, load_catalogue, TaskDefinition};
pub use parse::{parse_classification, TaskClassification, TaskFields, TaskKind};

pub struct SkillDispatcher {
    intent: Arc<dyn IntentPort>,
    skills: Arc<dyn SkillServices>,
    timers: Option<TurnTx>,
}

impl SkillDispatcher {
    pub fn new(intent: Arc<dyn IntentPort>, skills: Arc<dyn SkillServices>) -> Self {
        Self {
            intent,
            skills,
            timers: None,
        }
    }

    /// Timer completions are delivered as `TurnRequest::TimerFinished` on `tx`.
    pub fn with_timer_queue(mut self, tx: TurnTx) -> Self {
        self.timers = Some(tx);
        self
    }

    /// Classifies `text` and runs the matched task. Never fails; every error
    /// ends up as an unmatched result.
    pub async fn dispatch(&self, text: &str) -> SkillResult {
        let raw = match self.intent.classify_intent(text.to_string()).await {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("[skill] intent classification failed: {}", err);
                return SkillResult::unmatched();
            }
        };
        match parse_classification(&raw) {
            TaskClassification::Matched { task, fields } => {
                log::info!("[skill] matched {}", task.as_str());
                self.run_task(task, &fields).await
            }
            TaskClassification::NoMatch => SkillResult::unmatched(),
            TaskClassification::ParseError(reason) => {
                log::warn!(
                    "[skill] unparsable classifier output ({}): {}",
                    reason,
                    preview(&raw, 120)
                );
                SkillResult::unmatched()
            }
        }
    }

    async fn run_task(&self, task: TaskKind, fields: &TaskFields) -> SkillResult {
        match task {
            TaskKind::CheckTime => SkillResult::matched(format!(
                "現在時刻は{}です。",
                Local::now().format("%H:%M:%S")
            )),
            TaskKind::CheckDate => SkillResult::matched(format!(
                "今日の日付は{}です。",
                Local::now().format("%Y-%m-%d")
            )),
            TaskKind::SetTimer => self.set_timer(fields),
            TaskKind::CheckWeather => self.weather(fields).await,
            TaskKind::GetNews => self.news(fields).await,
            TaskKind::PlayMusic => {
                let Some(track) = fields.get_or_nth(&["track", "曲名"], 0) else {
                    return SkillResult::unmatched();
                };
                match self.skills.play_track(track.clone()).await {
                    Ok(playing) => log::info!("[skill] playing {}", playing),
                    Err(err) => log::warn!("[skill] play {} failed: {}", track, err),
                }
                SkillResult::matched(format!("{}という曲を再生することをお知らせしてください。", track))
            }
            TaskKind::PauseMusic => {
                if let Err(err) = self.skills.pause().await {
                    log::warn!("[skill] pause failed: {}", err);
                }
                SkillResult::matched("再生中の音楽を停止したことをお知らせしてください。")
            }
            TaskKind::NextTrack => {
                if let Err(err) = self.skills.next_track().await {
                    log::warn!("[skill] next track failed: {}", err);
                }
                SkillResult::matched("次の曲を再生することをお知らせしてください。")
            }
            TaskKind::WikipediaSearch => self.encyclopedia(fields).await,
            TaskKind::PaperSearch => self.papers(fields).await,
        }
    }

    fn set_timer(&self, fields: &TaskFields) -> SkillResult {
        let raw = fields.get_or_nth(&["time", "時間"], 0).unwrap_or_default();
        let Some(minutes) = parse_minutes(&raw) else {
            log::warn!("[skill] invalid timer length {:?}", raw);
            return SkillResult::failed("タイマーの時間を読み取れませんでした。");
        };
        let Some(tx) = self.timers.clone() else {
            log::warn!("[skill] no timer queue attached");
            return SkillResult::failed("タイマーを設定できませんでした。");
        };
        let delay = Duration::from_secs_f64(minutes * 60.0);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            log::info!("[skill] {}分のタイマーが終了しました", format_minutes(minutes));
            if tx.send(TurnRequest::TimerFinished { minutes }).await.is_err() {
                log::warn!("[skill] timer fired after the session ended");
            }
        });
        log::info!("[skill] timer armed for {} min", format_minutes(minutes));
        SkillResult::matched(format!(
            "あなたは今から{}分のタイマーをセットします。こちらが指示するまでタイマーは終了させないでください。",
            format_minutes(minutes)
        ))
    }

    async fn weather(&self, fields: &TaskFields) -> SkillResult {
        let city = fields
            .get_or_nth(&["対象地域", "location", "place"], 1)
            .unwrap_or_else(|| "東京".to_string());
        let day = weather::normalize_day_label(
            fields.get_or_nth(&["対象日", "date", "day"], 0).as_deref(),
        );
        match self.skills.forecast(city.clone(), day.clone()).await {
            Ok(report) => SkillResult::matched(report),
            Err(SkillError::LocationNotFound(_)) => {
                SkillResult::matched(format!("{}の天気情報は得られませんでした。", city))
            }
            Err(SkillError::NoResult) => {
                SkillResult::matched(format!("{}の天気情報は得られませんでした。", day))
            }
            Err(err) => {
                log::warn!("[skill] weather failed: {}", err);
                SkillResult::matched("天気情報の取得中にエラーが発生しました。")
            }
        }
    }

    async fn news(&self, fields: &TaskFields) -> SkillResult {
        let country = fields.get_or_nth(&["country", "国"], 0).unwrap_or_else(|| "日本".to_string());
        let category = fields.get_or_nth(&["category", "カテゴリ"], 1).unwrap_or_default();
        match self.skills.pick_headline(country, category).await {
            Ok(article) => SkillResult::matched(news_hint(&article)),
            Err(err) => {
                log::warn!("[skill] news failed: {}", err);
                SkillResult::matched("要望のニュースは見つかりませんでした。")
            }
        }
    }

    async fn encyclopedia(&self, fields: &TaskFields) -> SkillResult {
        let Some(query) = fields.first() else {
            return SkillResult::unmatched();
        };
        match self.skills.lookup(query.clone()).await {
            Ok(EncyclopediaPage {
                summary: Some(summary),
                url,
                ..
            }) => {
                log::info!("[skill] wikipedia {}", url);
                SkillResult::matched(summary)
            }
            Ok(page) => {
                log::info!("[skill] wikipedia {} (no summary)", page.url);
                SkillResult::matched(format!("{}のwikipediaページを開きました。", query))
            }
            Err(err) => {
                log::warn!("[skill] wikipedia failed: {}", err);
                SkillResult::matched(format!("{}の検索に失敗しました。", query))
            }
        }
    }

    async fn papers(&self, fields: &TaskFields) -> SkillResult {
        let Some(keyword) = fields.first() else {
            return SkillResult::unmatched();
        };
        let papers = match self.skills.search(keyword).await {
            Ok(papers) => papers,
            Err(err) => {
                log::warn!("[skill] paper search failed: {}", err);
                return SkillResult::matched("論文検索でエラーが発生しました。");
            }
        };
        let Some(paper) = papers.choose(&mut rand::thread_rng()) else {
            return SkillResult::matched("論文検索でエラーが発生しました。");
        };
        log::info!("[skill] paper {} ({})", paper.title, paper.pdf_url);
        SkillResult::matched(paper_hint(paper))
    }
}

const MAX_TIMER_MINUTES: f64 = 7.0 * 24.0 * 60.0;

/// Positive minute count from classifier text such as `"3"`, `"1.5"`, `"5分"`.
/// Anything above a week is rejected.
pub fn parse_minutes(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_end_matches('分').trim();
    let minutes: f64 = trimmed.parse().ok()?;
    (minutes.is_finite() && minutes > 0.0 && minutes <= MAX_TIMER_MINUTES).then_some(minutes)
}

pub fn format_minutes(minutes: f64) -> String {
    if minutes.fract() == 0.0 {
        format!("{}", minutes as u64)
    } else {
        format!("{}", minutes)
    }
}

fn news_hint(article: &NewsArticle) -> String {
    format!(
        "以下のニュースを取得しました。これを少し詳しく紹介してください：\nタイトル: {}\n概要: {}\n本文:\n{}\n",
        article.title, article.description, article.content
    )
}

fn paper_hint(paper: &Paper) -> String {
    format!(
        "以下はあなたが論文検索で得た要約文です。\n{}\nあなたはこの論文について解説します。\n",
        paper::simple_summary(&paper.abstract_text)
    )
}

/// HTTP-backed implementations of every skill port.
#[derive(Clone)]
pub struct HttpSkills {
    weather: weather::TsukumijimaWeather,
    news: news::NewsApi,
    music: music::SpotifyPlayer,
    wiki: wiki::MediaWiki,
    papers: paper::ArxivSearch,
}

impl HttpSkills {
    pub fn from_config() -> Result<Self> {
        Self::new(config::skills_config(), config::timeouts().skill_http)
    }

    pub fn new(cfg: &SkillsConfig, timeout: Duration) -> Result<Self> {
        let client = http_client(timeout)?;
        let credentials = music::SpotifyCredentials::from_parts(
            cfg.spotify_client_id.clone(),
            cfg.spotify_client_secret.clone(),
            cfg.spotify_refresh_token.clone(),
        );
        Ok(Self {
            weather: weather::TsukumijimaWeather::new(client.clone(), cfg.weather_api_base.clone()),
            news: news::NewsApi::new(client.clone(), cfg.news_api_base.clone(), cfg.news_api_key.clone()),
            music: music::SpotifyPlayer::new(client.clone(), credentials),
            wiki: wiki::MediaWiki::new(client.clone(), &cfg.wikipedia_lang, cfg.wikipedia_sentences),
            papers: paper::ArxivSearch::new(client, cfg.arxiv_api_base.clone(), cfg.arxiv_max_results),
        })
    }
}

impl WeatherPort for HttpSkills {
    fn forecast(&self, city: String, day_label: String) -> SkillFuture<String> {
        self.weather.forecast(city, day_label)
    }
}

impl NewsPort for HttpSkills {
    fn pick_headline(&self, country: String, category: String) -> SkillFuture<NewsArticle> {
        self.news.pick_headline(country, category)
    }
}

impl MusicPort for HttpSkills {
    fn play_track(&self, query: String) -> SkillFuture<String> {
        self.music.play_track(query)
    }

    fn pause(&self) -> SkillFuture<()> {
        self.music.pause()
    }

    fn next_track(&self) -> SkillFuture<()> {
        self.music.next_track()
    }
}

impl EncyclopediaPort for HttpSkills {
    fn lookup(&self, query: String) -> SkillFuture<EncyclopediaPage> {
        self.wiki.lookup(query)
    }
}

impl PaperSearchPort for HttpSkills {
    fn search(&self, keyword: String) -> SkillFuture<Vec<Paper>> {
        self.papers.search(keyword)
    }
}
