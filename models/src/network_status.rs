use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};

/// Process-wide health of the HTTP path, as seen by the degraded mode tracker.
///
/// Starts as [`NetworkStatus::Online`]. `Degraded` means a run of consecutive
/// request failures crossed the configured threshold; `Offline` is only
/// entered from an explicit connectivity signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    #[default]
    Online,
    Degraded,
    Offline,
}

impl NetworkStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, NetworkStatus::Online)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, NetworkStatus::Degraded)
    }
}

impl Display for NetworkStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let label = match self {
            NetworkStatus::Online => "online",
            NetworkStatus::Degraded => "degraded",
            NetworkStatus::Offline => "offline",
        };
        formatter.write_str(label)
    }
}
