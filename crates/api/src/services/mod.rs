//! Domain services
//!
//! Stateless facades over the store ports. Built once in `AppState` and
//! shared by the HTTP handlers and the chat relay.

pub mod analytics;
pub mod bulk;
pub mod chat;
pub mod csat;
pub mod notifications;
pub mod settings;
pub mod widget;

pub use analytics::{AnalyticsService, AnalyticsSummary, DateRange};
pub use bulk::BulkService;
pub use chat::ChatService;
pub use csat::{CsatService, CsatSummary};
pub use notifications::{LogNotifier, Notifier, WebhookNotifier};
pub use settings::{SettingsPatch, SettingsService};
pub use widget::{generate_snippet, CustomerSession, WidgetService};
