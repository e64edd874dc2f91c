use anyhow::{Context, Result};
use keyring::Entry;

use super::persistence::{SessionPersistence, STORAGE_KEY};
use super::SessionData;

const SERVICE_NAME: &str = "storefront";

/// Stores the session record as the secret of an OS keychain entry.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, STORAGE_KEY).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionPersistence for KeyringStore {
    fn load(&self) -> Result<Option<SessionData>> {
        let raw = match self.entry()?.get_password() {
            Ok(raw) => raw,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(e).context("Failed to read session from keychain"),
        };
        let record = serde_json::from_str(&raw).context("Failed to parse stored session")?;
        Ok(Some(record))
    }

    fn save(&self, record: &SessionData) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        self.entry()?
            .set_password(&raw)
            .context("Failed to store session in keychain")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Profile;

    #[test]
    fn test_record_survives_a_fresh_handle() {
        let service = format!("storefront-test-{}", std::process::id());
        let record = SessionData {
            token: "abc".to_string(),
            user: Some(Profile {
                id: 1,
                username: "alice".to_string(),
                email: None,
                phone: None,
                balance: 0.0,
                roles: Default::default(),
            }),
            logged_in_at: None,
        };

        let store = KeyringStore::with_service(&service);
        if let Err(e) = store.save(&record) {
            // CI machines often have no secret service to talk to
            eprintln!("skipping keyring test: {:#}", e);
            return;
        }

        let reopened = KeyringStore::with_service(&service);
        let loaded = reopened.load();
        if let Ok(entry) = reopened.entry() {
            let _ = entry.delete_credential();
        }
        assert_eq!(loaded.unwrap(), Some(record));
    }

    #[test]
    fn test_missing_entry_loads_none() {
        let store = KeyringStore::with_service(format!("storefront-empty-{}", std::process::id()));
        match store.load() {
            Ok(loaded) => assert_eq!(loaded, None),
            Err(e) => eprintln!("skipping keyring test: {:#}", e),
        }
    }
}
