//! The context key: the {intent, topic, tone} triple used as a hard filter
//! on semantic matches.

use crate::error::MurmurError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Whether the text asks something or states something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Contains a question marker or interrogative word.
    Question,
    /// Anything else.
    Statement,
}

/// Subject area, decided by the first matching keyword group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Crypto,
    StarWars,
    Anime,
    Music,
    Movie,
    Celebrity,
    Tech,
    Alien,
    PopCulture,
    /// Catch-all.
    Other,
}

/// Emotional register, decided by the first matching keyword group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Playful,
    Empathetic,
    Serious,
    /// Catch-all.
    Neutral,
}

/// Filter key for semantic memory. Two records only ever match
/// semantically when all three fields are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextKey {
    pub intent: Intent,
    pub topic: Topic,
    pub tone: Tone,
}

impl ContextKey {
    pub fn new(intent: Intent, topic: Topic, tone: Tone) -> Self {
        Self {
            intent,
            topic,
            tone,
        }
    }
}

impl std::fmt::Display for ContextKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.intent.as_str(),
            self.topic.as_str(),
            self.tone.as_str()
        )
    }
}

impl Intent {
    /// Stable storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Question => "question",
            Intent::Statement => "statement",
        }
    }
}

impl Topic {
    /// Stable storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Crypto => "crypto",
            Topic::StarWars => "star_wars",
            Topic::Anime => "anime",
            Topic::Music => "music",
            Topic::Movie => "movie",
            Topic::Celebrity => "celebrity",
            Topic::Tech => "tech",
            Topic::Alien => "alien",
            Topic::PopCulture => "pop_culture",
            Topic::Other => "other",
        }
    }
}

impl Tone {
    /// Stable storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Playful => "playful",
            Tone::Empathetic => "empathetic",
            Tone::Serious => "serious",
            Tone::Neutral => "neutral",
        }
    }
}

impl FromStr for Intent {
    type Err = MurmurError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "question" => Ok(Intent::Question),
            "statement" => Ok(Intent::Statement),
            other => Err(MurmurError::Serialization(format!(
                "unknown intent '{other}'"
            ))),
        }
    }
}

impl FromStr for Topic {
    type Err = MurmurError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crypto" => Ok(Topic::Crypto),
            "star_wars" => Ok(Topic::StarWars),
            "anime" => Ok(Topic::Anime),
            "music" => Ok(Topic::Music),
            "movie" => Ok(Topic::Movie),
            "celebrity" => Ok(Topic::Celebrity),
            "tech" => Ok(Topic::Tech),
            "alien" => Ok(Topic::Alien),
            "pop_culture" => Ok(Topic::PopCulture),
            "other" => Ok(Topic::Other),
            other => Err(MurmurError::Serialization(format!(
                "unknown topic '{other}'"
            ))),
        }
    }
}

impl FromStr for Tone {
    type Err = MurmurError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "playful" => Ok(Tone::Playful),
            "empathetic" => Ok(Tone::Empathetic),
            "serious" => Ok(Tone::Serious),
            "neutral" => Ok(Tone::Neutral),
            other => Err(MurmurError::Serialization(format!("unknown tone '{other}'"))),
        }
    }
}
