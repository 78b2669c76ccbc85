//! Organization configuration.

use crate::utils::get_env_with_prefix;
use serde::{Deserialize, Serialize};

/// Configuration for organization creation.
///
/// # Example
///
/// ```rust
/// use stockroom::organizations::OrganizationConfig;
///
/// let config = OrganizationConfig::new().trial_days(30);
/// assert_eq!(config.trial_seconds(), 30 * 86_400);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OrganizationConfig {
    /// Length of the trial attached to every new organization, in days.
    #[serde(default = "default_trial_days")]
    pub trial_days: u32,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            trial_days: default_trial_days(),
        }
    }
}

impl OrganizationConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trial length in days.
    #[must_use]
    pub fn trial_days(mut self, days: u32) -> Self {
        self.trial_days = days;
        self
    }

    /// Trial length in seconds.
    #[must_use]
    pub fn trial_seconds(&self) -> u64 {
        u64::from(self.trial_days) * 86_400
    }

    /// Load from `STOCKROOM_TRIAL_DAYS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(days) = get_env_with_prefix("TRIAL_DAYS") {
            if let Ok(days) = days.parse() {
                config.trial_days = days;
            }
        }
        config
    }
}

/// Configuration for invitations.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InvitationConfig {
    /// How long an invitation stays acceptable, in hours.
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: u32,

    /// Sender address for invitation notifications.
    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Base URL used to build the acceptance link in notifications.
    #[serde(default = "default_accept_url_base")]
    pub accept_url_base: String,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            expiry_hours: default_expiry_hours(),
            from_address: default_from_address(),
            accept_url_base: default_accept_url_base(),
        }
    }
}

impl InvitationConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expiry window in hours.
    #[must_use]
    pub fn expiry_hours(mut self, hours: u32) -> Self {
        self.expiry_hours = hours;
        self
    }

    /// Set the notification sender address.
    #[must_use]
    pub fn from_address(mut self, address: impl Into<String>) -> Self {
        self.from_address = address.into();
        self
    }

    /// Set the base URL for acceptance links.
    #[must_use]
    pub fn accept_url_base(mut self, url: impl Into<String>) -> Self {
        self.accept_url_base = url.into();
        self
    }

    /// Expiry window in seconds.
    #[must_use]
    pub fn expiry_seconds(&self) -> u64 {
        u64::from(self.expiry_hours) * 3600
    }

    /// Acceptance link for an invitation.
    #[must_use]
    pub fn accept_url(&self, invitation_id: &str) -> String {
        format!(
            "{}/invitations/{}/accept",
            self.accept_url_base.trim_end_matches('/'),
            invitation_id
        )
    }

    /// Load from `STOCKROOM_INVITATION_*` variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(hours) = get_env_with_prefix("INVITATION_EXPIRY_HOURS") {
            if let Ok(hours) = hours.parse() {
                config.expiry_hours = hours;
            }
        }
        if let Some(from) = get_env_with_prefix("INVITATION_FROM_ADDRESS") {
            config.from_address = from;
        }
        if let Some(base) = get_env_with_prefix("INVITATION_ACCEPT_URL_BASE") {
            config.accept_url_base = base;
        }
        config
    }
}

fn default_trial_days() -> u32 {
    14
}

fn default_expiry_hours() -> u32 {
    7 * 24
}

fn default_from_address() -> String {
    "noreply@stockroom.local".to_string()
}

fn default_accept_url_base() -> String {
    "http://localhost:8000".to_string()
}
