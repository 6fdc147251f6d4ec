//! Deterministic context classification and text normalization.
//!
//! Classification is rule-based: each dimension walks a fixed, ordered list
//! of keyword groups and the first group with a hit wins. There is no
//! scoring. Lookup and admission both call [`classify`] on the normalized
//! text, so they always agree on the context key.

use murmur_types::context::{ContextKey, Intent, Tone, Topic};

/// Trim and lower-case. Idempotent.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Words that make a text a question wherever they appear.
const INTERROGATIVES: &[&str] = &[
    "what", "why", "how", "when", "where", "who", "whom", "whose", "which",
];

/// Auxiliaries that make a text a question when they lead it ("is it big").
const LEADING_AUXILIARIES: &[&str] = &[
    "is", "are", "am", "was", "were", "do", "does", "did", "can", "could", "will", "would",
    "should", "shall",
];

/// Topic groups in priority order. First match wins.
const TOPIC_RULES: &[(Topic, &[&str])] = &[
    (
        Topic::Crypto,
        &[
            "crypto", "bitcoin", "btc", "ethereum", "eth", "solana", "sol", "blockchain",
            "token", "tokens", "nft", "nfts", "defi", "wallet", "memecoin", "altcoin", "hodl",
            "airdrop", "web3", "doge",
        ],
    ),
    (
        Topic::StarWars,
        &[
            "star wars", "jedi", "sith", "mandalorian", "mando", "beskar", "yoda", "grogu",
            "vader", "skywalker", "lightsaber", "death star", "wookiee", "tatooine",
            "the force", "stormtrooper", "boba fett",
        ],
    ),
    (
        Topic::Anime,
        &[
            "anime", "manga", "naruto", "one piece", "goku", "dragon ball", "ghibli", "otaku",
            "attack on titan", "waifu", "shonen", "isekai",
        ],
    ),
    (
        Topic::Music,
        &[
            "music", "song", "songs", "album", "rapper", "band", "concert", "playlist",
            "lyrics", "guitar", "spotify", "beat", "single",
        ],
    ),
    (
        Topic::Movie,
        &[
            "movie", "movies", "film", "films", "cinema", "director", "oscar", "oscars",
            "trailer", "box office", "sequel", "netflix", "hollywood",
        ],
    ),
    (
        Topic::Celebrity,
        &[
            "celebrity", "celeb", "famous", "kardashian", "taylor swift", "red carpet",
            "paparazzi", "influencer", "gossip",
        ],
    ),
    (
        Topic::Tech,
        &[
            "tech", "ai", "software", "code", "coding", "programming", "computer", "gpu",
            "chip", "startup", "app", "robot", "server", "nvidia", "llm", "rust",
        ],
    ),
    (
        Topic::Alien,
        &[
            "alien", "aliens", "ufo", "ufos", "extraterrestrial", "area 51", "martian",
            "abduction", "uap",
        ],
    ),
    (
        Topic::PopCulture,
        &[
            "meme", "memes", "viral", "trend", "trending", "tiktok", "pop culture", "fandom",
            "marvel", "superhero", "video game", "gaming",
        ],
    ),
];

/// Tone groups in priority order. First match wins.
const TONE_RULES: &[(Tone, &[&str])] = &[
    (
        Tone::Empathetic,
        &[
            "sorry", "sad", "lost", "miss you", "hurt", "grief", "condolences", "struggling",
            "depressed", "lonely", "rip", "heartbroken", "tough day", ":(", "💔",
        ],
    ),
    (
        Tone::Playful,
        &[
            "lol", "lmao", "haha", "hehe", "funny", "joke", "wen", "vibes", "gm", "😂", "🚀",
            "🤣", ";)",
        ],
    ),
    (
        Tone::Serious,
        &[
            "serious", "seriously", "important", "urgent", "warning", "scam", "security",
            "hack", "hacked", "danger", "legal", "risk", "honestly",
        ],
    ),
];

/// Classify text into its context key. Pure and total.
pub fn classify(text: &str) -> ContextKey {
    let normalized = normalize(text);
    let tokens = tokenize(&normalized);
    ContextKey {
        intent: classify_intent(&normalized, &tokens),
        topic: first_match(TOPIC_RULES, &normalized, &tokens).unwrap_or(Topic::Other),
        tone: first_match(TONE_RULES, &normalized, &tokens).unwrap_or(Tone::Neutral),
    }
}

fn classify_intent(normalized: &str, tokens: &[&str]) -> Intent {
    if normalized.contains('?') {
        return Intent::Question;
    }
    if tokens.iter().any(|t| INTERROGATIVES.contains(t)) {
        return Intent::Question;
    }
    match tokens.first() {
        Some(first) if LEADING_AUXILIARIES.contains(first) => Intent::Question,
        _ => Intent::Statement,
    }
}

fn first_match<T: Copy>(rules: &[(T, &[&str])], normalized: &str, tokens: &[&str]) -> Option<T> {
    rules
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| keyword_hit(kw, normalized, tokens)))
        .map(|(value, _)| *value)
}

/// Word keywords match whole tokens (or a contiguous token run for phrases);
/// symbol keywords such as emoji match as substrings.
fn keyword_hit(keyword: &str, normalized: &str, tokens: &[&str]) -> bool {
    let is_word = keyword
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ');
    if !is_word {
        return normalized.contains(keyword);
    }
    let phrase: Vec<&str> = keyword.split(' ').collect();
    if phrase.len() == 1 {
        return tokens.contains(&keyword);
    }
    tokens.windows(phrase.len()).any(|w| w == phrase.as_slice())
}

fn tokenize(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}
