//! REST client for the study-log and user-storage endpoints.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::backend::{GoalSettingsBackend, SessionBackend};
use super::model::{Difficulty, NewSession, SessionId, StudySession, Subject};
use crate::error::BackendError;

const SETTINGS_KEY: &str = "timer_settings";
const GOAL_FIELD: &str = "dailyGoal";
const POMO_COUNT_KEY: &str = "timer_pomo_count";

/// Study-log record as the server stores it.
#[derive(Debug, Deserialize)]
struct StudyLogDto {
    id: SessionId,
    date: NaiveDate,
    /// Plain integer column on the server; older rows may hold negatives.
    #[serde(default)]
    minutes: i64,
    #[serde(default)]
    duration_seconds: Option<u64>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<StudyLogDto> for StudySession {
    fn from(dto: StudyLogDto) -> Self {
        StudySession {
            id: dto.id,
            subject: Subject::from_server(dto.subject.as_deref()),
            topic: dto.topic.unwrap_or_default(),
            duration_secs: dto.duration_seconds.unwrap_or_else(|| minutes_to_secs(dto.minutes)),
            difficulty: dto
                .difficulty
                .and_then(|d| d.parse().ok())
                .unwrap_or_default(),
            date: dto.date,
            created_at: dto.created_at,
        }
    }
}

fn minutes_to_secs(minutes: i64) -> u64 {
    u64::try_from(minutes).unwrap_or(0).saturating_mul(60)
}

#[derive(Debug, Serialize)]
struct CreateStudyLog<'a> {
    date: NaiveDate,
    /// Whole minutes, rounded up; the field the server aggregates on.
    minutes: u64,
    duration_seconds: u64,
    subject: &'a str,
    topic: &'a str,
    difficulty: Difficulty,
}

impl<'a> From<&'a NewSession> for CreateStudyLog<'a> {
    fn from(session: &'a NewSession) -> Self {
        CreateStudyLog {
            date: session.date,
            minutes: session.duration_secs.div_ceil(60),
            duration_seconds: session.duration_secs,
            subject: session.subject.label(),
            topic: &session.topic,
            difficulty: session.difficulty,
        }
    }
}

/// Bearer-token client for the study API.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    /// `base_url` is the API root, e.g. `http://127.0.0.1:8000/api`.
    pub fn new(base_url: Url, token: Option<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
            token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let resp = self.authorized(request).send().await?;
        check_status(resp).await
    }

    async fn user_storage(&self) -> Result<Value, BackendError> {
        let url = self.endpoint("user-storage/")?;
        let resp = self.send(self.client.get(url)).await?;
        Ok(resp.json().await?)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn check_status(resp: Response) -> Result<Response, BackendError> {
    match resp.status() {
        s if s.is_success() => Ok(resp),
        StatusCode::UNAUTHORIZED => Err(BackendError::Unauthorized),
        StatusCode::NOT_FOUND => Err(BackendError::NotFound),
        s => {
            let body = resp.text().await.unwrap_or_default();
            Err(BackendError::Status {
                status: s.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl SessionBackend for HttpBackend {
    async fn create(&self, session: &NewSession) -> Result<StudySession, BackendError> {
        let url = self.endpoint("study-logs/")?;
        let body = CreateStudyLog::from(session);
        let resp = self.send(self.client.post(url).json(&body)).await?;
        let dto: StudyLogDto = resp.json().await?;
        let echoed_seconds = dto.duration_seconds.is_some();
        let mut stored = StudySession::from(dto);
        // Older servers only keep whole minutes and drop difficulty.
        if !echoed_seconds {
            stored.duration_secs = session.duration_secs;
        }
        if stored.topic.is_empty() {
            stored.topic = session.topic.clone();
        }
        stored.difficulty = session.difficulty;
        Ok(stored)
    }

    async fn delete(&self, id: SessionId) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("study-logs/{id}/"))?;
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StudySession>, BackendError> {
        let url = self.endpoint("study-logs/")?;
        let resp = self.send(self.client.get(url)).await?;
        let dtos: Vec<StudyLogDto> = resp.json().await?;
        Ok(dtos.into_iter().map(StudySession::from).collect())
    }
}

#[async_trait]
impl GoalSettingsBackend for HttpBackend {
    async fn load_daily_goal(&self) -> Result<Option<u64>, BackendError> {
        let storage = self.user_storage().await?;
        Ok(storage
            .get(SETTINGS_KEY)
            .and_then(|s| s.get(GOAL_FIELD))
            .and_then(Value::as_f64)
            .filter(|secs| *secs > 0.0)
            .map(|secs| secs.round() as u64))
    }

    async fn save_daily_goal(&self, target_secs: u64) -> Result<(), BackendError> {
        // PATCH replaces the whole settings object, so merge first.
        let storage = self.user_storage().await?;
        let mut settings = storage
            .get(SETTINGS_KEY)
            .filter(|v| v.is_object())
            .cloned()
            .unwrap_or_else(|| json!({}));
        settings[GOAL_FIELD] = json!(target_secs);

        let url = self.endpoint("user-storage/")?;
        self.send(self.client.patch(url).json(&json!({ SETTINGS_KEY: settings })))
            .await?;
        Ok(())
    }

    async fn load_pomodoro_count(&self) -> Result<Option<u32>, BackendError> {
        let storage = self.user_storage().await?;
        Ok(storage
            .get(POMO_COUNT_KEY)
            .and_then(|c| c.get("count"))
            .and_then(Value::as_u64)
            .map(|count| u32::try_from(count).unwrap_or(u32::MAX)))
    }

    async fn save_pomodoro_count(&self, count: u32) -> Result<(), BackendError> {
        let url = self.endpoint("user-storage/")?;
        self.send(self.client.patch(url).json(&json!({ POMO_COUNT_KEY: { "count": count } })))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_added_once() {
        let url = with_trailing_slash(Url::parse("http://localhost:8000/api").unwrap());
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
        let url = with_trailing_slash(url);
        assert_eq!(url.join("study-logs/").unwrap().as_str(), "http://localhost:8000/api/study-logs/");
    }

    #[test]
    fn payload_rounds_minutes_up() {
        let session = NewSession {
            subject: Subject::Physics,
            topic: "Optics".into(),
            duration_secs: 61,
            difficulty: Difficulty::Hard,
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        };
        let body = serde_json::to_value(CreateStudyLog::from(&session)).unwrap();
        assert_eq!(body["minutes"], 2);
        assert_eq!(body["duration_seconds"], 61);
        assert_eq!(body["subject"], "Physics");
        assert_eq!(body["date"], "2026-01-05");
        assert_eq!(body["difficulty"], "Hard");
    }

    #[test]
    fn dto_without_seconds_uses_minutes() {
        let dto: StudyLogDto = serde_json::from_value(json!({
            "id": 7,
            "date": "2026-01-05",
            "minutes": 25,
            "subject": "Chemistry",
            "topic": null
        }))
        .unwrap();
        let session = StudySession::from(dto);
        assert_eq!(session.duration_secs, 1500);
        assert_eq!(session.subject, Subject::Chemistry);
        assert_eq!(session.difficulty, Difficulty::Medium);
        assert_eq!(session.topic, "");
    }

    #[test]
    fn dto_with_negative_minutes_counts_as_zero() {
        let dto: StudyLogDto = serde_json::from_value(json!({
            "id": 8,
            "date": "2026-01-05",
            "minutes": -5,
            "subject": "Physics"
        }))
        .unwrap();
        assert_eq!(StudySession::from(dto).duration_secs, 0);
    }

    #[test]
    fn dto_with_huge_minutes_saturates() {
        let dto: StudyLogDto = serde_json::from_value(json!({
            "id": 9,
            "date": "2026-01-05",
            "minutes": i64::MAX,
            "subject": "Biology"
        }))
        .unwrap();
        assert_eq!(StudySession::from(dto).duration_secs, u64::MAX);
    }
}
