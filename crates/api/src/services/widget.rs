//! Storefront widget: embed code, installation state, customer sessions

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use trichat_shared::{
    ChatSettings, ConversationId, CustomerId, Participant, ShopId, TrichatError, TrichatResult,
    WidgetInstallation,
};

use super::{ChatService, SettingsService};
use crate::auth::JwtManager;
use crate::store::SettingsStore;

/// Everything the widget needs to open a chat
#[derive(Debug, Clone, Serialize)]
pub struct CustomerSession {
    pub token: String,
    pub expires_in: i64,
    pub customer_id: CustomerId,
    pub conversation_id: ConversationId,
    pub settings: ChatSettings,
}

#[derive(Clone)]
pub struct WidgetService {
    store: Arc<dyn SettingsStore>,
    settings: SettingsService,
    chat: ChatService,
    jwt_manager: Arc<JwtManager>,
    script_url: String,
    api_url: String,
}

impl WidgetService {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        chat: ChatService,
        jwt_manager: Arc<JwtManager>,
        script_url: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            settings: SettingsService::new(Arc::clone(&store)),
            store,
            chat,
            jwt_manager,
            script_url: script_url.into(),
            api_url: api_url.into(),
        }
    }

    /// Embed code for the shop's current settings
    pub async fn snippet(&self, shop_id: &ShopId) -> TrichatResult<String> {
        let settings = self.settings.get_settings(shop_id).await?;
        Ok(generate_snippet(shop_id, &settings, &self.script_url, &self.api_url))
    }

    /// Installation state; a shop that never installed reports `installed: false`
    pub async fn status(&self, shop_id: &ShopId) -> TrichatResult<WidgetInstallation> {
        Ok(self
            .store
            .get_installation(shop_id)
            .await?
            .unwrap_or_else(|| WidgetInstallation {
                shop_id: shop_id.clone(),
                installed: false,
                script_src: self.script_url.clone(),
                installed_at: None,
                uninstalled_at: None,
            }))
    }

    /// Mark the widget installed. Repeating keeps the original install time.
    pub async fn install(&self, shop_id: &ShopId) -> TrichatResult<WidgetInstallation> {
        let existing = self.store.get_installation(shop_id).await?;
        let installed_at = match existing {
            Some(WidgetInstallation {
                installed: true,
                installed_at: Some(at),
                ..
            }) => at,
            _ => OffsetDateTime::now_utc(),
        };

        let installation = WidgetInstallation {
            shop_id: shop_id.clone(),
            installed: true,
            script_src: self.script_url.clone(),
            installed_at: Some(installed_at),
            uninstalled_at: None,
        };
        self.store.upsert_installation(&installation).await?;

        tracing::info!(shop_id = %shop_id, script_src = %installation.script_src, "Widget installed");
        Ok(installation)
    }

    pub async fn uninstall(&self, shop_id: &ShopId) -> TrichatResult<WidgetInstallation> {
        let mut installation = self
            .store
            .get_installation(shop_id)
            .await?
            .ok_or_else(|| TrichatError::not_found(format!("widget installation for {}", shop_id)))?;

        if installation.installed {
            installation.installed = false;
            installation.uninstalled_at = Some(OffsetDateTime::now_utc());
            self.store.upsert_installation(&installation).await?;
            tracing::info!(shop_id = %shop_id, "Widget uninstalled");
        }
        Ok(installation)
    }

    /// Issue a short-lived customer token for an installed widget.
    ///
    /// Resumes `conversation_id` when it belongs to the customer, otherwise
    /// opens a new conversation.
    pub async fn issue_customer_session(
        &self,
        shop_id: &ShopId,
        customer_id: Option<CustomerId>,
        conversation_id: Option<ConversationId>,
    ) -> TrichatResult<CustomerSession> {
        if shop_id.as_str().trim().is_empty() {
            return Err(TrichatError::validation("shop_id is required"));
        }
        if !self.status(shop_id).await?.installed {
            return Err(TrichatError::not_found(format!(
                "chat widget is not installed for {}",
                shop_id
            )));
        }

        let customer_id = customer_id
            .filter(|c| !c.as_str().trim().is_empty())
            .unwrap_or_else(|| CustomerId::new(format!("visitor-{}", Uuid::new_v4())));

        let conversation = match conversation_id {
            Some(id) => {
                self.chat
                    .get_conversation_for(shop_id, &id, &Participant::Customer(customer_id.clone()))
                    .await?
            }
            None => {
                self.chat
                    .create_conversation(shop_id, customer_id.clone())
                    .await?
            }
        };

        let token = self
            .jwt_manager
            .generate_customer_token(&customer_id, shop_id)
            .map_err(|e| TrichatError::Internal(e.to_string()))?;

        Ok(CustomerSession {
            token,
            expires_in: self.jwt_manager.customer_session_seconds(),
            customer_id,
            conversation_id: conversation.id,
            settings: self.settings.get_settings(shop_id).await?,
        })
    }
}

/// HTML embed code for a shop.
///
/// The config object is JSON with `</` escaped, so no setting value can
/// close the surrounding script element.
pub fn generate_snippet(
    shop_id: &ShopId,
    settings: &ChatSettings,
    script_url: &str,
    api_url: &str,
) -> String {
    let config = json!({
        "shopId": shop_id,
        "apiUrl": api_url,
        "welcomeMessage": settings.welcome_message,
        "offlineMessage": settings.offline_message,
        "primaryColor": settings.primary_color,
        "position": settings.position,
        "launcherText": settings.launcher_text,
        "csatEnabled": settings.csat_enabled,
    });
    let config = config.to_string().replace("</", "<\\/");

    format!(
        "<!-- Trichat chat widget -->\n\
         <script>window.TrichatConfig = {};</script>\n\
         <script src=\"{}\" async defer></script>\n",
        config,
        escape_attr(script_url)
    )
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> WidgetService {
        let store = Arc::new(MemoryStore::new());
        let chat = ChatService::new(store.clone());
        let jwt = Arc::new(JwtManager::new("test-secret-key-at-least-32-chars!", 1, 30));
        WidgetService::new(
            store,
            chat,
            jwt,
            "https://cdn.trichat.test/widget.js",
            "https://api.trichat.test",
        )
    }

    #[test]
    fn test_snippet_escapes_script_close() {
        let settings = ChatSettings {
            welcome_message: "hi </script><script>alert(1)</script>".to_string(),
            ..Default::default()
        };
        let snippet = generate_snippet(
            &"shop1".into(),
            &settings,
            "https://cdn.example/w.js?a=1&b=\"x\"",
            "https://api.example",
        );

        assert!(!snippet.contains("</script><script>alert"));
        assert!(snippet.contains("<\\/script>"));
        assert!(snippet.contains("src=\"https://cdn.example/w.js?a=1&amp;b=&quot;x&quot;\""));
        assert!(snippet.contains("\"shopId\":\"shop1\""));
        assert_eq!(snippet.matches("</script>").count(), 2);
    }

    #[tokio::test]
    async fn test_install_is_idempotent() {
        let service = service();
        let shop: ShopId = "shop1".into();

        let first = service.install(&shop).await.unwrap();
        let second = service.install(&shop).await.unwrap();
        assert!(second.installed);
        assert_eq!(first.installed_at, second.installed_at);

        let removed = service.uninstall(&shop).await.unwrap();
        assert!(!removed.installed);
        assert!(removed.uninstalled_at.is_some());
        assert!(!service.status(&shop).await.unwrap().installed);
    }

    #[tokio::test]
    async fn test_session_requires_installed_widget() {
        let service = service();
        let result = service
            .issue_customer_session(&"shop1".into(), None, None)
            .await;
        assert!(matches!(result, Err(TrichatError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_session_resumes_own_conversation_only() {
        let service = service();
        let shop: ShopId = "shop1".into();
        service.install(&shop).await.unwrap();

        let first = service
            .issue_customer_session(&shop, Some("cust1".into()), None)
            .await
            .unwrap();
        assert!(!first.token.is_empty());

        let resumed = service
            .issue_customer_session(&shop, Some("cust1".into()), Some(first.conversation_id.clone()))
            .await
            .unwrap();
        assert_eq!(resumed.conversation_id, first.conversation_id);

        let stolen = service
            .issue_customer_session(&shop, Some("cust2".into()), Some(first.conversation_id))
            .await;
        assert!(matches!(stolen, Err(TrichatError::Unauthorized(_))));
    }
}
