use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A user or store identifier.
///
/// Browsers post these either as JSON strings or as JSON numbers and the
/// snapshot file keeps whatever representation was received, so both forms
/// round-trip untouched. Comparisons always go through the string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Text(String),
    Number(serde_json::Number),
}

impl Identifier {
    /// True for an empty string; numbers are never blank.
    pub fn is_blank(&self) -> bool {
        matches!(self, Identifier::Text(s) if s.is_empty())
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Text(s) => write!(f, "{}", s),
            Identifier::Number(n) => match n.as_f64() {
                // `1.0` renders as `1`, matching integer ids sent by other clients
                Some(v) if n.is_f64() && v.is_finite() && v.fract() == 0.0 => {
                    write!(f, "{:.0}", v)
                }
                _ => write!(f, "{}", n),
            },
        }
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

impl From<u64> for Identifier {
    fn from(value: u64) -> Self {
        Identifier::Number(value.into())
    }
}

/// Build the composite key `userId-storeId-fingerprint` for one subscriber slot.
pub fn composite_key(user_id: &str, store_id: &str, fingerprint: &str) -> String {
    format!("{}-{}-{}", user_id, store_id, fingerprint)
}

/// One registered browser/device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberRecord {
    pub user_id: Identifier,
    pub store_id: Identifier,
    pub fingerprint: String,
    /// Opaque blob the push transport needs to address this device.
    pub push_subscription: String,
}

impl SubscriberRecord {
    /// Composite key derived from the normalized identifiers.
    pub fn key(&self) -> String {
        composite_key(
            &self.user_id.to_string(),
            &self.store_id.to_string(),
            &self.fingerprint,
        )
    }
}

/// Body of `POST /subscribe`.
///
/// Every field is optional at the wire level so that missing fields surface as
/// a validation error rather than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub user_id: Option<Identifier>,
    pub store_id: Option<Identifier>,
    pub fingerprint: Option<String>,
    /// Either the subscription serialized as a string, or the raw JSON object.
    pub push_subscription: Option<serde_json::Value>,
}

impl SubscribeRequest {
    /// Validate the request and turn it into a storable record.
    pub fn into_record(self) -> Result<SubscriberRecord, AppError> {
        let user_id = required_identifier(self.user_id, "userId")?;
        let store_id = required_identifier(self.store_id, "storeId")?;
        let fingerprint = required_text(self.fingerprint, "fingerprint")?;

        let push_subscription = match self.push_subscription {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            Some(serde_json::Value::Object(map)) if !map.is_empty() => {
                serde_json::Value::Object(map).to_string()
            }
            Some(serde_json::Value::Null) | None => {
                return Err(AppError::Validation("pushSubscription is required".to_string()));
            }
            Some(_) => {
                return Err(AppError::Validation(
                    "pushSubscription must be a JSON object or a non-empty string".to_string(),
                ));
            }
        };

        Ok(SubscriberRecord {
            user_id,
            store_id,
            fingerprint,
            push_subscription,
        })
    }
}

/// Body of `POST /unsubscribe`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeRequest {
    pub user_id: Option<Identifier>,
    pub store_id: Option<Identifier>,
    pub fingerprint: Option<String>,
}

impl UnsubscribeRequest {
    /// Validate the request and return normalized `(user_id, store_id, fingerprint)`.
    pub fn into_parts(self) -> Result<(String, String, String), AppError> {
        let user_id = required_identifier(self.user_id, "userId")?;
        let store_id = required_identifier(self.store_id, "storeId")?;
        let fingerprint = required_text(self.fingerprint, "fingerprint")?;
        Ok((user_id.to_string(), store_id.to_string(), fingerprint))
    }
}

fn required_identifier(value: Option<Identifier>, field: &str) -> Result<Identifier, AppError> {
    match value {
        Some(id) if !id.is_blank() => Ok(id),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

/// Form body of `POST /notify`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub store_id: Option<String>,
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    /// Any non-empty value (an HTML checkbox posts `"on"`) enables action buttons.
    pub actions: Option<String>,
}

impl NotifyRequest {
    pub fn wants_actions(&self) -> bool {
        self.actions.as_deref().is_some_and(|a| !a.is_empty())
    }

    /// Targeting filter for this request.
    pub fn filter(&self) -> NotifyFilter {
        NotifyFilter::new(self.user_id.as_deref(), self.store_id.as_deref())
    }
}

/// Which subscribers a notification targets. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyFilter {
    pub user_id: Option<String>,
    pub store_id: Option<String>,
}

impl NotifyFilter {
    pub fn new(user_id: Option<&str>, store_id: Option<&str>) -> Self {
        let present = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            user_id: present(user_id),
            store_id: present(store_id),
        }
    }
}

/// Target URLs for the two notification actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionUrls {
    pub primary: String,
    pub secondary: String,
}

impl ActionUrls {
    pub const DEFAULT_PRIMARY: &str = "https://app.lojaintegrada.com.br/painel";
    pub const DEFAULT_SECONDARY: &str = "https://google.com";
}

impl Default for ActionUrls {
    fn default() -> Self {
        Self {
            primary: Self::DEFAULT_PRIMARY.to_string(),
            secondary: Self::DEFAULT_SECONDARY.to_string(),
        }
    }
}

/// A button rendered by the service worker under the notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
}

impl NotificationAction {
    fn button(action: &str, title: &str) -> Self {
        Self {
            action: action.to_string(),
            kind: "button".to_string(),
            title: title.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    pub actions_urls: ActionUrls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub data: NotificationData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<NotificationAction>>,
}

/// Body pushed to every matched browser, built once per notify call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub notification: Notification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
}

impl NotificationPayload {
    pub fn new(request: &NotifyRequest, urls: &ActionUrls, timestamp: i64) -> Self {
        let actions = request.wants_actions().then(|| {
            vec![
                NotificationAction::button("primary", "Baixar"),
                NotificationAction::button("secondary", "Ignorar"),
            ]
        });

        Self {
            notification: Notification {
                title: request.title.clone(),
                body: request.message.clone(),
                data: NotificationData {
                    user_id: request.user_id.clone(),
                    store_id: request.store_id.clone(),
                    actions_urls: urls.clone(),
                },
                actions,
            },
            user_id: request.user_id.clone(),
            store_id: request.store_id.clone(),
            timestamp,
        }
    }
}
