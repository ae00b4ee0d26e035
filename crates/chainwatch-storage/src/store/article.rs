use anyhow::Result;
use chainwatch_common::types::NormalizedEvent;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::entities::article::{self, Entity};
use crate::store::RiskStore;

/// A normalized external article, keyed by its dedup fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRow {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub headline: String,
    pub body: String,
    pub url: String,
    pub relevance_score: Option<f64>,
    pub processed: bool,
    pub process_note: Option<String>,
    pub risk_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: article::Model) -> ArticleRow {
    ArticleRow {
        event_id: m.event_id,
        timestamp: m.timestamp.with_timezone(&Utc),
        source: m.source,
        headline: m.headline,
        body: m.body,
        url: m.url,
        relevance_score: m.relevance_score,
        processed: m.processed,
        process_note: m.process_note,
        risk_event_id: m.risk_event_id,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl RiskStore {
    /// Insert a normalized event as an article. Returns `false` when an
    /// article with the same fingerprint already exists (re-delivery after
    /// dedup TTL expiry); the unique index on `event_id` is the backstop
    /// for concurrent writers.
    pub async fn insert_article(&self, event: &NormalizedEvent) -> Result<bool> {
        if self.get_article(&event.event_id).await?.is_some() {
            return Ok(false);
        }
        let now = Utc::now().fixed_offset();
        let am = article::ActiveModel {
            event_id: Set(event.event_id.clone()),
            timestamp: Set(event.timestamp.fixed_offset()),
            source: Set(event.source.clone()),
            headline: Set(event.headline.clone()),
            body: Set(event.body.clone()),
            url: Set(event.url.clone()),
            relevance_score: Set(None),
            processed: Set(false),
            process_note: Set(None),
            risk_event_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        am.insert(self.db()).await?;
        Ok(true)
    }

    pub async fn get_article(&self, event_id: &str) -> Result<Option<ArticleRow>> {
        let model = Entity::find_by_id(event_id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    /// Mark an article processed, recording why ("irrelevant",
    /// "not_a_risk", an error reason) and, when extraction succeeded, the
    /// produced risk event id and relevance score.
    pub async fn mark_article_processed(
        &self,
        event_id: &str,
        note: Option<&str>,
        risk_event_id: Option<&str>,
        relevance_score: Option<f64>,
    ) -> Result<bool> {
        let Some(model) = Entity::find_by_id(event_id).one(self.db()).await? else {
            return Ok(false);
        };
        let mut am: article::ActiveModel = model.into();
        am.processed = Set(true);
        am.process_note = Set(note.map(str::to_string));
        if risk_event_id.is_some() {
            am.risk_event_id = Set(risk_event_id.map(str::to_string));
        }
        if relevance_score.is_some() {
            am.relevance_score = Set(relevance_score);
        }
        am.updated_at = Set(Utc::now().fixed_offset());
        am.update(self.db()).await?;
        Ok(true)
    }
}
