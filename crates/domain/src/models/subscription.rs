use serde::{Deserialize, Serialize};

use crate::{ScoutError, ScoutResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMethod {
    Email,
    Sms,
    Push,
}

impl NotificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationMethod::Email => "email",
            NotificationMethod::Sms => "sms",
            NotificationMethod::Push => "push",
        }
    }

    pub fn parse(value: &str) -> ScoutResult<Self> {
        match value {
            "email" => Ok(NotificationMethod::Email),
            "sms" => Ok(NotificationMethod::Sms),
            "push" => Ok(NotificationMethod::Push),
            other => Err(ScoutError::validation_error(format!(
                "unknown notification method: {other}"
            ))),
        }
    }
}

/// An alert rule a user has registered against a product. Created and
/// managed by the CRUD layer; the pipeline only reads active rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub condition_type: String,
    pub threshold: f64,
    pub notification_method: NotificationMethod,
    pub active: bool,
}
