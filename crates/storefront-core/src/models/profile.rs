use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::LoginResponse;

/// Snapshot of the authenticated user, copied from the login response.
///
/// A profile is never partially updated: a new login replaces it whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Profile {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

impl From<&LoginResponse> for Profile {
    fn from(resp: &LoginResponse) -> Self {
        Self {
            id: resp.id,
            username: resp.username.clone(),
            email: resp.email.clone(),
            phone: resp.phone.clone(),
            balance: resp.balance,
            roles: resp.roles.clone(),
        }
    }
}
