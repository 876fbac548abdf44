use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::shared::error::SkillError;
use crate::shared::ports::skills::{SkillFuture, WeatherPort};

const CITY_IDS: &[(&str, &str)] = &[
    ("札幌", "016010"),
    ("仙台", "040010"),
    ("東京", "130010"),
    ("横浜", "140010"),
    ("名古屋", "230010"),
    ("大阪", "270000"),
    ("広島", "340010"),
    ("福岡", "400010"),
    ("那覇", "471010"),
];

const CACHE_TTL: Duration = Duration::from_secs(600);

/// Japan Meteorological Agency forecasts via weather.tsukumijima.net.
#[derive(Clone)]
pub struct TsukumijimaWeather {
    client: Client,
    api_base: String,
    cache: Arc<Mutex<HashMap<String, (Instant, Value)>>>,
}

impl TsukumijimaWeather {
    pub fn new(client: Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn fetch(&self, city_id: &str) -> Result<Value> {
        {
            let cache = self.cache.lock().await;
            if let Some((fetched_at, data)) = cache.get(city_id) {
                if fetched_at.elapsed() < CACHE_TTL {
                    return Ok(data.clone());
                }
            }
        }
        let resp = self
            .client
            .get(&self.api_base)
            .query(&[("city", city_id)])
            .header("User-Agent", "aituber-backend/0.1")
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            anyhow::bail!("weather api error {}: {}", status, body);
        }
        let data: Value = serde_json::from_str(&body)?;
        self.cache
            .lock()
            .await
            .insert(city_id.to_string(), (Instant::now(), data.clone()));
        Ok(data)
    }
}

/// `"東京都"` / `"札幌市"` -> city id.
pub fn city_id(name: &str) -> Option<&'static str> {
    let name = name.trim();
    let stem = ["市", "都", "府", "県"]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name);
    CITY_IDS
        .iter()
        .find(|(city, _)| *city == name || *city == stem)
        .map(|(_, id)| *id)
}

/// Accepts the API's labels and a few English spellings.
pub fn normalize_day_label(raw: Option<&str>) -> String {
    match raw.map(str::trim).unwrap_or("") {
        "" | "today" | "きょう" => "今日".to_string(),
        "tomorrow" | "あした" | "あす" => "明日".to_string(),
        "day after tomorrow" | "あさって" => "明後日".to_string(),
        other => other.to_string(),
    }
}

fn celsius(forecast: &Value, key: &str) -> Option<String> {
    forecast["temperature"][key]["celsius"]
        .as_str()
        .map(str::to_string)
}

/// Report text for `day_label`, or `None` when the API has no such day.
pub fn render_forecast(data: &Value, city: &str, day_label: &str) -> Option<String> {
    let forecast = data["forecasts"]
        .as_array()?
        .iter()
        .find(|f| f["dateLabel"].as_str() == Some(day_label))?;

    let date = forecast["date"].as_str().unwrap_or("不明");
    let telop = forecast["telop"].as_str().unwrap_or("不明");
    let min = celsius(forecast, "min");
    let max = celsius(forecast, "max");

    let mut text = format!("【{}】\n", data["title"].as_str().unwrap_or("天気予報"));
    if let Some(published) = data["publicTimeFormatted"].as_str() {
        text.push_str(&format!("発表日時: {}\n", published));
    }
    text.push_str(&format!("\n■ {}（{}）の天気 in {}:\n", day_label, date, city));
    text.push_str(&format!("天気: {}\n", telop));
    text.push_str(&format!("最低気温: {}℃\n", min.as_deref().unwrap_or("N/A")));
    text.push_str(&format!("最高気温: {}℃\n", max.as_deref().unwrap_or("N/A")));

    if let Some(chances) = forecast["chanceOfRain"].as_object() {
        text.push_str("\n降水確率:\n");
        for (range, percent) in chances {
            text.push_str(&format!("  {}: {}\n", range, percent.as_str().unwrap_or("--")));
        }
    }

    text.push_str(&format!(
        "\n服装アドバイス: {}\n",
        weather_advice(telop, min.as_deref(), max.as_deref())
    ));

    if let Some(headline) = data["description"]["headlineText"].as_str() {
        text.push_str(&format!("\n■ 天気概況:\n【{}】\n", headline));
    }
    if let Some(body) = data["description"]["bodyText"].as_str() {
        text.push_str(body);
    }
    Some(text)
}

pub fn weather_advice(telop: &str, min: Option<&str>, max: Option<&str>) -> String {
    let mut advice = if telop.contains('雨') {
        "傘を忘れずに。濡れても大丈夫な靴を選びましょう。"
    } else if telop.contains('雪') {
        "滑りやすいので足元注意、防寒対策も万全に。"
    } else if telop.contains('晴') {
        "日差しが強いかも。日焼け止めや帽子を活用して。"
    } else if telop.contains('曇') {
        "念のため折りたたみ傘があると安心です。"
    } else {
        "天候が変わりやすい可能性があります。注意して過ごしましょう。"
    }
    .to_string();

    let max = max.and_then(|v| v.parse::<f64>().ok());
    let min = min.and_then(|v| v.parse::<f64>().ok());
    match (max, min) {
        (Some(max), _) if max >= 30.0 => advice.push_str(" 熱中症に注意！通気性の良い服を着ましょう。"),
        (Some(max), _) if max >= 25.0 => advice.push_str(" 少し暑く感じるかもしれません。半袖でOKです。"),
        (Some(max), _) if max < 15.0 => advice.push_str(" 少し肌寒いです。上着を忘れずに。"),
        (None, Some(min)) if min < 5.0 => advice.push_str(" 朝晩は特に冷え込みます。防寒対策を。"),
        _ => {}
    }
    advice
}

impl WeatherPort for TsukumijimaWeather {
    fn forecast(&self, city: String, day_label: String) -> SkillFuture<String> {
        let this = self.clone();
        Box::pin(async move {
            let id = city_id(&city).ok_or_else(|| SkillError::LocationNotFound(city.clone()))?;
            let data = this
                .fetch(id)
                .await
                .map_err(|e| SkillError::QueryFailed(e.to_string()))?;
            render_forecast(&data, &city, &day_label).ok_or(SkillError::NoResult)
        })
    }
}
