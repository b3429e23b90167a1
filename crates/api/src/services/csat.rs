//! Customer satisfaction surveys

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use time::{Date, OffsetDateTime, Time};

use trichat_shared::{
    ConversationId, CsatResponse, CustomerId, ShopId, TrichatError, TrichatResult,
};

use super::analytics::DateRange;
use crate::store::{ConversationStore, CsatStore};

pub const MAX_COMMENT_LENGTH: usize = 1000;

/// Ratings at or above this count as satisfied
const SATISFIED_RATING: i16 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingBucket {
    pub rating: i16,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsatTrendPoint {
    pub day: Date,
    pub responses: i64,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsatSummary {
    pub from: Date,
    pub to: Date,
    pub total_responses: i64,
    /// `None` when nobody answered in the range
    pub average_rating: Option<f64>,
    /// Percentage of ratings >= 4
    pub satisfaction_rate: f64,
    /// Always five buckets, ratings 1 through 5
    pub distribution: Vec<RatingBucket>,
    /// Days with at least one response
    pub trend: Vec<CsatTrendPoint>,
}

#[derive(Clone)]
pub struct CsatService {
    csat: Arc<dyn CsatStore>,
    conversations: Arc<dyn ConversationStore>,
}

impl CsatService {
    pub fn new(csat: Arc<dyn CsatStore>, conversations: Arc<dyn ConversationStore>) -> Self {
        Self {
            csat,
            conversations,
        }
    }

    pub async fn submit_response(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        customer_id: Option<&CustomerId>,
        rating: i16,
        comment: Option<&str>,
    ) -> TrichatResult<CsatResponse> {
        if !(1..=5).contains(&rating) {
            return Err(TrichatError::validation("Rating must be between 1 and 5"));
        }
        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        if comment.is_some_and(|c| c.chars().count() > MAX_COMMENT_LENGTH) {
            return Err(TrichatError::validation(format!(
                "Comment exceeds {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        if self
            .conversations
            .get_conversation(shop_id, conversation_id)
            .await?
            .is_none()
        {
            return Err(TrichatError::not_found(format!(
                "conversation {}",
                conversation_id
            )));
        }

        let response = self
            .csat
            .insert_csat_response(shop_id, conversation_id, customer_id, rating, comment)
            .await?;

        tracing::info!(
            shop_id = %shop_id,
            conversation_id = %conversation_id,
            rating = rating,
            "CSAT response recorded"
        );
        Ok(response)
    }

    pub async fn summary(&self, shop_id: &ShopId, range: DateRange) -> TrichatResult<CsatSummary> {
        let (from, to) = range.resolve(OffsetDateTime::now_utc().date())?;
        let end = to
            .next_day()
            .ok_or_else(|| TrichatError::validation("`to` is out of range"))?;

        let responses = self
            .csat
            .list_csat_responses(
                shop_id,
                from.with_time(Time::MIDNIGHT).assume_utc(),
                end.with_time(Time::MIDNIGHT).assume_utc(),
            )
            .await?;

        Ok(summarize(from, to, &responses))
    }
}

fn summarize(from: Date, to: Date, responses: &[CsatResponse]) -> CsatSummary {
    let total = responses.len() as i64;
    let sum: i64 = responses.iter().map(|r| i64::from(r.rating)).sum();
    let satisfied = responses
        .iter()
        .filter(|r| r.rating >= SATISFIED_RATING)
        .count() as i64;

    let distribution = (1..=5)
        .map(|rating| RatingBucket {
            rating,
            count: responses.iter().filter(|r| r.rating == rating).count() as i64,
        })
        .collect();

    let mut per_day: BTreeMap<Date, (i64, i64)> = BTreeMap::new();
    for r in responses {
        let entry = per_day.entry(r.created_at.date()).or_default();
        entry.0 += 1;
        entry.1 += i64::from(r.rating);
    }
    let trend = per_day
        .into_iter()
        .map(|(day, (count, sum))| CsatTrendPoint {
            day,
            responses: count,
            average_rating: round2(sum as f64 / count as f64),
        })
        .collect();

    CsatSummary {
        from,
        to,
        total_responses: total,
        average_rating: (total > 0).then(|| round2(sum as f64 / total as f64)),
        satisfaction_rate: if total > 0 {
            round2(satisfied as f64 * 100.0 / total as f64)
        } else {
            0.0
        },
        distribution,
        trend,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use trichat_shared::Conversation;

    async fn setup() -> (Arc<MemoryStore>, CsatService, Conversation) {
        let store = Arc::new(MemoryStore::new());
        let conversation = Conversation::new("c1".into(), "shop1".into(), "cust1".into());
        store.create_conversation(&conversation).await.unwrap();
        (store.clone(), CsatService::new(store.clone(), store), conversation)
    }

    #[tokio::test]
    async fn test_rating_out_of_range() {
        let (_store, service, conv) = setup().await;
        for rating in [0, 6] {
            let result = service
                .submit_response(&conv.shop_id, &conv.id, None, rating, None)
                .await;
            assert!(matches!(result, Err(TrichatError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_unknown_conversation() {
        let (_store, service, conv) = setup().await;
        let result = service
            .submit_response(&conv.shop_id, &"nope".into(), None, 5, None)
            .await;
        assert!(matches!(result, Err(TrichatError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_summary_aggregates() {
        let (_store, service, conv) = setup().await;
        for rating in [5, 4, 2, 5] {
            service
                .submit_response(&conv.shop_id, &conv.id, Some(&conv.customer_id), rating, Some("ok"))
                .await
                .unwrap();
        }

        let summary = service
            .summary(&conv.shop_id, DateRange::default())
            .await
            .unwrap();
        assert_eq!(summary.total_responses, 4);
        assert_eq!(summary.average_rating, Some(4.0));
        assert_eq!(summary.satisfaction_rate, 75.0);
        assert_eq!(summary.distribution.len(), 5);
        assert_eq!(summary.distribution[4], RatingBucket { rating: 5, count: 2 });
        assert_eq!(summary.trend.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_summary_differs_from_failure() {
        let (store, service, conv) = setup().await;

        let empty = service
            .summary(&conv.shop_id, DateRange::default())
            .await
            .unwrap();
        assert_eq!(empty.total_responses, 0);
        assert_eq!(empty.average_rating, None);
        assert_eq!(empty.satisfaction_rate, 0.0);

        store.set_unavailable(true);
        assert!(service
            .summary(&conv.shop_id, DateRange::default())
            .await
            .is_err());
    }
}
