use ::keyring::Entry;
use tracing::warn;

use super::{KeyValueBackend, StoreError};

/// Keyring service prefix; the API origin is appended so that sessions for
/// different backends never overwrite each other.
const SERVICE_PREFIX: &str = "skillsync";

/// OS credential store backend (Keychain, Secret Service, Credential
/// Manager). Each session key is its own keyring entry.
#[derive(Debug, Clone)]
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new(origin: &str) -> Self {
        Self {
            service: format!("{}:{}", SERVICE_PREFIX, origin),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

/// Single-key operations that `set_many` and `remove_many` are built on.
/// The keyring has no multi-key transactions, so atomicity is emulated by
/// restoring earlier values when any step fails.
trait Slots {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key; a key that does not exist is not an error
    fn erase(&self, key: &str) -> Result<(), StoreError>;
}

impl Slots for KeyringBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(::keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(self.entry(key)?.set_password(value)?)
    }

    fn erase(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(::keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write every entry or, on the first failure of any read or write, put
/// back what was there before and return that failure.
fn set_all<S: Slots + ?Sized>(slots: &S, entries: &[(&str, &str)]) -> Result<(), StoreError> {
    let mut touched: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());
    match write_each(slots, entries, &mut touched) {
        Ok(()) => Ok(()),
        Err(e) => {
            restore(slots, touched);
            Err(e)
        }
    }
}

fn write_each<'a, S: Slots + ?Sized>(
    slots: &S,
    entries: &[(&'a str, &str)],
    touched: &mut Vec<(&'a str, Option<String>)>,
) -> Result<(), StoreError> {
    for (key, value) in entries {
        let previous = slots.read(key)?;
        // Recorded before the write so a half-applied write is undone too
        touched.push((*key, previous));
        slots.write(key, value)?;
    }
    Ok(())
}

fn restore<S: Slots + ?Sized>(slots: &S, touched: Vec<(&str, Option<String>)>) {
    for (key, previous) in touched.into_iter().rev() {
        let restored = match previous {
            Some(value) => slots.write(key, value.as_str()),
            None => slots.erase(key),
        };
        if let Err(e) = restored {
            warn!(error = %e, key, "Failed to roll back keyring entry");
        }
    }
}

/// Erase every key even if one fails so nothing is left behind
fn erase_all<S: Slots + ?Sized>(slots: &S, keys: &[&str]) -> Result<(), StoreError> {
    let mut first_error = None;
    for key in keys {
        if let Err(e) = slots.erase(key) {
            warn!(error = %e, key, "Failed to delete keyring entry");
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

impl KeyValueBackend for KeyringBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(key)
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        set_all(self, entries)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        erase_all(self, keys)
    }

    fn name(&self) -> &str {
        "keyring"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Slot store that fails exactly one read or write, counted from zero
    struct FlakySlots {
        values: Mutex<HashMap<String, String>>,
        calls: Mutex<usize>,
        fail_at: usize,
    }

    impl FlakySlots {
        fn new(initial: &[(&str, &str)], fail_at: usize) -> Self {
            let values = initial
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Self {
                values: Mutex::new(values),
                calls: Mutex::new(0),
                fail_at,
            }
        }

        fn tick(&self) -> Result<(), StoreError> {
            let mut calls = self.calls.lock().unwrap();
            let current = *calls;
            *calls += 1;
            if current == self.fail_at {
                Err(StoreError::Io(std::io::Error::other("keyring unavailable")))
            } else {
                Ok(())
            }
        }

        fn value(&self, key: &str) -> Option<String> {
            self.values.lock().unwrap().get(key).cloned()
        }
    }

    impl Slots for FlakySlots {
        fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.tick()?;
            Ok(self.value(key))
        }

        fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.tick()?;
            self.values.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn erase(&self, key: &str) -> Result<(), StoreError> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    const SESSION: [(&str, &str); 3] = [
        ("access_token", "new-access"),
        ("refresh_token", "new-refresh"),
        ("current_user", "{\"id\":2}"),
    ];

    const PREVIOUS: [(&str, &str); 3] = [
        ("access_token", "old-access"),
        ("refresh_token", "old-refresh"),
        ("current_user", "{\"id\":1}"),
    ];

    fn assert_previous_session(slots: &FlakySlots) {
        for (key, value) in PREVIOUS {
            assert_eq!(slots.value(key).as_deref(), Some(value), "{} was not restored", key);
        }
    }

    #[test]
    fn test_set_all_writes_every_entry() {
        let slots = FlakySlots::new(&PREVIOUS, usize::MAX);
        set_all(&slots, &SESSION).unwrap();
        for (key, value) in SESSION {
            assert_eq!(slots.value(key).as_deref(), Some(value));
        }
    }

    #[test]
    fn test_failed_read_midway_restores_earlier_writes() {
        // read access, write access, then the read of refresh_token fails
        let slots = FlakySlots::new(&PREVIOUS, 2);
        assert!(set_all(&slots, &SESSION).is_err());
        assert_previous_session(&slots);
    }

    #[test]
    fn test_failed_write_restores_earlier_writes() {
        // The write of current_user fails after both tokens were replaced
        let slots = FlakySlots::new(&PREVIOUS, 5);
        assert!(set_all(&slots, &SESSION).is_err());
        assert_previous_session(&slots);
    }

    #[test]
    fn test_rollback_erases_keys_that_did_not_exist() {
        let slots = FlakySlots::new(&[], 3);
        assert!(set_all(&slots, &SESSION).is_err());
        for (key, _) in SESSION {
            assert_eq!(slots.value(key), None);
        }
    }

    #[test]
    fn test_erase_all_ignores_missing_keys() {
        let slots = FlakySlots::new(&[("access_token", "a")], usize::MAX);
        erase_all(&slots, &["access_token", "refresh_token", "current_user"]).unwrap();
        assert_eq!(slots.value("access_token"), None);
    }

    #[test]
    fn test_service_is_scoped_by_origin() {
        let a = KeyringBackend::new("https://api.skillsync.dev");
        let b = KeyringBackend::new("http://127.0.0.1:8000");
        assert_eq!(a.service(), "skillsync:https://api.skillsync.dev");
        assert_ne!(a.service(), b.service());
    }
}
