//! Chat analytics

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use time::{Date, Duration, OffsetDateTime};

use trichat_shared::{
    ConversationStats, DailyMessageCount, SenderRole, ShopId, TrichatError, TrichatResult,
};

use crate::store::{AnalyticsStore, ConversationStore};

pub const DEFAULT_RANGE_DAYS: i64 = 30;
pub const MAX_RANGE_DAYS: i64 = 366;

/// Inclusive day range from query parameters; both ends optional
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DateRange {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl DateRange {
    /// Fill in defaults relative to `today` and validate
    pub fn resolve(&self, today: Date) -> TrichatResult<(Date, Date)> {
        let to = self.to.unwrap_or(today);
        let from = match self.from {
            Some(from) => from,
            None => to
                .checked_sub(Duration::days(DEFAULT_RANGE_DAYS - 1))
                .ok_or_else(|| TrichatError::validation("`to` is out of range"))?,
        };

        if from > to {
            return Err(TrichatError::validation("`from` must not be after `to`"));
        }
        if (to - from).whole_days() >= MAX_RANGE_DAYS {
            return Err(TrichatError::validation(format!(
                "Date range cannot exceed {} days",
                MAX_RANGE_DAYS
            )));
        }
        Ok((from, to))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub from: Date,
    pub to: Date,
    pub total_messages: i64,
    pub customer_messages: i64,
    pub agent_messages: i64,
    pub conversations: ConversationStats,
    /// One entry per day in the range, zero-filled
    pub daily: Vec<DailyMessageCount>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    analytics: Arc<dyn AnalyticsStore>,
    conversations: Arc<dyn ConversationStore>,
}

impl AnalyticsService {
    pub fn new(
        analytics: Arc<dyn AnalyticsStore>,
        conversations: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            analytics,
            conversations,
        }
    }

    /// Count one message against the day it was sent
    pub async fn record_message(
        &self,
        shop_id: &ShopId,
        sender: SenderRole,
        at: OffsetDateTime,
    ) -> TrichatResult<()> {
        self.analytics
            .increment_message_count(shop_id, at.date(), sender)
            .await
    }

    pub async fn summary(&self, shop_id: &ShopId, range: DateRange) -> TrichatResult<AnalyticsSummary> {
        let (from, to) = range.resolve(OffsetDateTime::now_utc().date())?;

        let counts = self
            .analytics
            .daily_message_counts(shop_id, from, to)
            .await?;
        let conversations = self.conversations.conversation_stats(shop_id).await?;

        let daily = zero_fill(from, to, counts);
        let (total, customer, agent) = daily.iter().fold((0, 0, 0), |(t, c, a), d| {
            (t + d.total, c + d.customer, a + d.agent)
        });

        Ok(AnalyticsSummary {
            from,
            to,
            total_messages: total,
            customer_messages: customer,
            agent_messages: agent,
            conversations,
            daily,
        })
    }
}

fn zero_fill(from: Date, to: Date, counts: Vec<DailyMessageCount>) -> Vec<DailyMessageCount> {
    let mut by_day: HashMap<Date, DailyMessageCount> =
        counts.into_iter().map(|c| (c.day, c)).collect();

    let mut out = Vec::new();
    let mut day = Some(from);
    while let Some(d) = day.filter(|d| *d <= to) {
        out.push(by_day.remove(&d).unwrap_or(DailyMessageCount {
            day: d,
            total: 0,
            customer: 0,
            agent: 0,
        }));
        day = d.next_day();
    }
    out
}
