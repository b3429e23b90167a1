//! Customization studio settings

use serde::Deserialize;
use std::sync::Arc;

use trichat_shared::{ChatSettings, LauncherPosition, ShopId, TrichatError, TrichatResult};

use crate::store::SettingsStore;

pub const MAX_MESSAGE_TEXT: usize = 500;
pub const MAX_LAUNCHER_TEXT: usize = 40;

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub welcome_message: Option<String>,
    pub offline_message: Option<String>,
    pub primary_color: Option<String>,
    pub position: Option<LauncherPosition>,
    pub launcher_text: Option<String>,
    pub csat_enabled: Option<bool>,
    pub auto_reply_enabled: Option<bool>,
}

impl SettingsPatch {
    fn apply(self, settings: &mut ChatSettings) {
        if let Some(v) = self.welcome_message {
            settings.welcome_message = v.trim().to_string();
        }
        if let Some(v) = self.offline_message {
            settings.offline_message = v.trim().to_string();
        }
        if let Some(v) = self.primary_color {
            settings.primary_color = v.trim().to_ascii_lowercase();
        }
        if let Some(v) = self.position {
            settings.position = v;
        }
        if let Some(v) = self.launcher_text {
            settings.launcher_text = v.trim().to_string();
        }
        if let Some(v) = self.csat_enabled {
            settings.csat_enabled = v;
        }
        if let Some(v) = self.auto_reply_enabled {
            settings.auto_reply_enabled = v;
        }
    }
}

#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Stored settings, or the defaults for a shop that never saved any
    pub async fn get_settings(&self, shop_id: &ShopId) -> TrichatResult<ChatSettings> {
        Ok(self.store.get_settings(shop_id).await?.unwrap_or_default())
    }

    pub async fn update_settings(
        &self,
        shop_id: &ShopId,
        patch: SettingsPatch,
    ) -> TrichatResult<ChatSettings> {
        let mut settings = self.get_settings(shop_id).await?;
        patch.apply(&mut settings);
        validate(&settings)?;

        self.store.upsert_settings(shop_id, &settings).await?;
        tracing::info!(shop_id = %shop_id, "Chat settings updated");
        Ok(settings)
    }
}

fn validate(settings: &ChatSettings) -> TrichatResult<()> {
    if !is_hex_color(&settings.primary_color) {
        return Err(TrichatError::validation(
            "primary_color must be a hex colour like #4f46e5",
        ));
    }
    for (field, value) in [
        ("welcome_message", &settings.welcome_message),
        ("offline_message", &settings.offline_message),
    ] {
        if value.chars().count() > MAX_MESSAGE_TEXT {
            return Err(TrichatError::validation(format!(
                "{} exceeds {} characters",
                field, MAX_MESSAGE_TEXT
            )));
        }
    }
    let launcher = settings.launcher_text.chars().count();
    if launcher == 0 || launcher > MAX_LAUNCHER_TEXT {
        return Err(TrichatError::validation(format!(
            "launcher_text must be 1 to {} characters",
            MAX_LAUNCHER_TEXT
        )));
    }
    Ok(())
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}
