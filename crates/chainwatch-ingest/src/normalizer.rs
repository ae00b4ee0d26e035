use crate::connector::RawItem;
use chainwatch_common::types::NormalizedEvent;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use md5::{Digest, Md5};

/// Dedup fingerprint: MD5 of the lowercase-trimmed headline. This is a
/// collision key, not a security boundary; it doubles as the article
/// primary key.
pub fn fingerprint(headline: &str) -> String {
    let normalized = headline.trim().to_lowercase();
    let digest = Md5::digest(normalized.as_bytes());
    format!("{digest:x}")
}

/// Normalize a raw connector item to the canonical event schema. A missing
/// body falls back to the description, then to the empty string.
pub fn normalize(raw: &RawItem) -> NormalizedEvent {
    let body = raw
        .content
        .clone()
        .or_else(|| raw.description.clone())
        .unwrap_or_default();

    NormalizedEvent {
        event_id: fingerprint(&raw.title),
        timestamp: parse_timestamp(raw.published_at.as_deref()),
        source: raw.source.clone(),
        headline: raw.title.clone(),
        body,
        url: raw.url.clone(),
    }
}

/// A normalized event must carry a source, a URL, and a headline long
/// enough to fingerprint meaningfully.
pub fn validate(event: &NormalizedEvent) -> bool {
    if event.source.is_empty() || event.url.is_empty() {
        tracing::warn!(event_id = %event.event_id, "Event missing source or url");
        return false;
    }
    if event.headline.trim().len() < 10 {
        tracing::warn!(headline = %event.headline, "Headline too short");
        return false;
    }
    true
}

fn parse_timestamp(ts: Option<&str>) -> DateTime<Utc> {
    let Some(ts) = ts else {
        return Utc::now();
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(ts) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S") {
        return parsed.and_utc();
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(ts, "%Y-%m-%d") {
        return parsed.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    }

    tracing::warn!(ts, "Could not parse timestamp, using current time");
    Utc::now()
}
