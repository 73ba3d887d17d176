//! Admin API configuration.

use serde::{Deserialize, Serialize};

/// Settings for the bearer-token protected admin API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Token expected in `Authorization: Bearer <token>`.
    #[serde(default)]
    pub api_token: String,
}
