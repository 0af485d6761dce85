//! Enrolled-device management, routed through the dispatcher.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::dispatch::Dispatcher;
use crate::error::AuthError;

/// An enrolled authenticator device, as recorded by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Lists and revokes enrolled devices. The backend owns the records; this
/// only reads and deletes them.
pub struct DeviceManager {
    dispatcher: Dispatcher,
}

impl DeviceManager {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn list(&self) -> Result<Vec<Device>, AuthError> {
        self.dispatcher.get("/devices/").await
    }

    pub async fn delete(&self, device_id: i64) -> Result<(), AuthError> {
        self.dispatcher
            .delete(&format!("/devices/{device_id}/"))
            .await
    }
}
