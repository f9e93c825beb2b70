use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Server-assigned session identifier.
pub type SessionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subject {
    Physics,
    Chemistry,
    Biology,
    /// Catch-all used for unlabelled study and unknown server values.
    General,
}

impl Subject {
    pub const ALL: [Subject; 4] = [
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
        Subject::General,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Biology => "Biology",
            Subject::General => "General Study",
        }
    }

    /// Lenient mapping for values coming back from the server.
    pub fn from_server(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(Subject::General)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "physics" | "phy" => Ok(Subject::Physics),
            "chemistry" | "chem" => Ok(Subject::Chemistry),
            "biology" | "bio" => Ok(Subject::Biology),
            "general" | "general study" => Ok(Subject::General),
            "" => Err("subject is empty".to_string()),
            other => Err(format!("unknown subject: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        })
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A completed, stored study session. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: SessionId,
    pub subject: Subject,
    pub topic: String,
    pub duration_secs: u64,
    pub difficulty: Difficulty,
    /// Local calendar date the session was logged on.
    pub date: NaiveDate,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A session waiting to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySessionDraft {
    pub subject: Option<Subject>,
    pub topic: String,
    pub duration_secs: u64,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub date: NaiveDate,
}

/// A draft that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSession {
    pub subject: Subject,
    pub topic: String,
    pub duration_secs: u64,
    pub difficulty: Difficulty,
    pub date: NaiveDate,
}

impl StudySessionDraft {
    /// Check the draft and produce the payload sent to the backend.
    ///
    /// The topic is trimmed; a blank topic counts as missing.
    pub fn validate(&self) -> Result<NewSession, ValidationError> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::MissingTopic);
        }
        let subject = self.subject.ok_or(ValidationError::MissingSubject)?;
        if self.duration_secs == 0 {
            return Err(ValidationError::ZeroDuration);
        }
        Ok(NewSession {
            subject,
            topic: topic.to_string(),
            duration_secs: self.duration_secs,
            difficulty: self.difficulty,
            date: self.date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(subject: Option<Subject>, topic: &str, secs: u64) -> StudySessionDraft {
        StudySessionDraft {
            subject,
            topic: topic.to_string(),
            duration_secs: secs,
            difficulty: Difficulty::Medium,
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        }
    }

    #[test]
    fn subject_parses_case_insensitively() {
        assert_eq!("PHYSICS".parse::<Subject>().unwrap(), Subject::Physics);
        assert_eq!(" bio ".parse::<Subject>().unwrap(), Subject::Biology);
        assert_eq!("General Study".parse::<Subject>().unwrap(), Subject::General);
        assert!("".parse::<Subject>().is_err());
        assert!("history".parse::<Subject>().is_err());
    }

    #[test]
    fn unknown_server_subject_falls_back_to_general() {
        assert_eq!(Subject::from_server(Some("Maths")), Subject::General);
        assert_eq!(Subject::from_server(None), Subject::General);
        assert_eq!(Subject::from_server(Some("Chemistry")), Subject::Chemistry);
    }

    #[test]
    fn validate_trims_topic() {
        let ok = draft(Some(Subject::Physics), "  Kinematics ", 1500)
            .validate()
            .unwrap();
        assert_eq!(ok.topic, "Kinematics");
    }

    #[test]
    fn validate_rejects_blank_topic_before_subject() {
        assert_eq!(
            draft(None, "   ", 60).validate(),
            Err(ValidationError::MissingTopic)
        );
        assert_eq!(
            draft(None, "Optics", 60).validate(),
            Err(ValidationError::MissingSubject)
        );
        assert_eq!(
            draft(Some(Subject::Biology), "Genetics", 0).validate(),
            Err(ValidationError::ZeroDuration)
        );
    }
}
