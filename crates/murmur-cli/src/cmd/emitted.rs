//! emitted check | record | list | pick.

use super::{to_json, Session};
use murmur_types::error::MurmurResult;
use serde_json::json;

pub async fn check(session: &Session, text: &str) -> MurmurResult<serde_json::Value> {
    let emitted = session.substrate.dedup_guard().has_been_emitted(text).await?;
    Ok(json!({ "emitted": emitted }))
}

pub async fn record(session: &Session, text: &str) -> MurmurResult<serde_json::Value> {
    let outcome = session.substrate.dedup_guard().record_emission(text).await?;
    Ok(json!({ "outcome": to_json(&outcome)? }))
}

pub fn list(session: &Session, limit: usize) -> MurmurResult<serde_json::Value> {
    to_json(&session.substrate.emitted().recent(limit)?)
}

pub async fn pick(session: &Session, candidates: &[String]) -> MurmurResult<serde_json::Value> {
    let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
    let chosen = session.substrate.dedup_guard().first_unemitted(&refs).await?;
    Ok(json!({ "candidate": chosen }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::test_session;

    #[tokio::test]
    async fn test_record_then_check() {
        let session = test_session("mando_bot");
        assert_eq!(check(&session, "This is the way.").await.unwrap()["emitted"], false);

        let first = record(&session, "This is the way.").await.unwrap();
        assert_eq!(first["outcome"], "recorded");
        let second = record(&session, "  this is the WAY.  ").await.unwrap();
        assert_eq!(second["outcome"], "already_recorded");

        assert_eq!(check(&session, "THIS IS THE WAY.").await.unwrap()["emitted"], true);
        let listed = list(&session, 10).unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pick_skips_posted() {
        let session = test_session("mando_bot");
        record(&session, "gm").await.unwrap();
        let candidates = vec!["GM".to_string(), "gn".to_string()];
        let out = pick(&session, &candidates).await.unwrap();
        assert_eq!(out["candidate"], "gn");
    }
}
