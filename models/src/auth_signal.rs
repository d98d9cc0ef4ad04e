use serde::{Deserialize, Serialize};

/// Authentication change broadcast by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthSignal {
    Login,
    Logout,
}
