use async_trait::async_trait;
use chrono::Utc;
use fjall::Keyspace;
use rand::RngExt;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::watch;
use tokio::task;

use super::{DocumentStore, sort_collection};
use crate::models::{LocationUpdate, NewLocation, SavedLocation, UserId};
use crate::HydrocastError;

type Result<T, E = HydrocastError> = std::result::Result<T, E>;

fn collection_key(user: &UserId) -> Vec<u8> {
    format!("locations:{user}").into_bytes()
}

fn new_record_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(0..0x0100_0000);
    format!("{millis:013x}{suffix:06x}")
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>, fjall::Error> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

fn store_error(context: &str, e: impl std::fmt::Display) -> HydrocastError {
    HydrocastError::store(format!("{context}: {e}"))
}

/// [`DocumentStore`] on a local fjall keyspace.
///
/// Each user's collection is one postcard-encoded value under
/// `locations:{user_id}`. Mutations are serialized so read-modify-write
/// cycles within one process never lose updates.
pub struct FjallStore {
    store: Keyspace,
    write_lock: tokio::sync::Mutex<()>,
    watchers: Mutex<HashMap<UserId, watch::Sender<Vec<SavedLocation>>>>,
}

impl FjallStore {
    /// Open (or create) the store in directory `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path)
            .open()
            .map_err(|e| store_error("Failed to open store", e))?;
        let items = db
            .keyspace("locations", fjall::KeyspaceCreateOptions::default)
            .map_err(|e| store_error("Failed to open keyspace", e))?;
        Ok(Self {
            store: items,
            write_lock: tokio::sync::Mutex::new(()),
            watchers: Mutex::new(HashMap::new()),
        })
    }

    #[tracing::instrument(name = "load_collection", level = "debug", skip(self))]
    async fn load(&self, user: &UserId) -> Result<Vec<SavedLocation>> {
        let store = self.store.clone();
        let key = collection_key(user);

        let maybe_bytes = task::spawn_blocking(move || get_from_store(store, key))
            .await
            .map_err(|e| store_error("Store task failed", e))?
            .map_err(|e| store_error("Failed to read collection", e))?;

        match maybe_bytes {
            Some(bytes) => {
                let mut locations: Vec<SavedLocation> = postcard::from_bytes(&bytes)
                    .map_err(|e| store_error("Corrupt collection", e))?;
                sort_collection(&mut locations);
                Ok(locations)
            }
            None => {
                tracing::debug!("No collection stored yet");
                Ok(Vec::new())
            }
        }
    }

    #[tracing::instrument(name = "save_collection", level = "debug", skip(self, locations))]
    async fn save(&self, user: &UserId, mut locations: Vec<SavedLocation>) -> Result<()> {
        sort_collection(&mut locations);
        let store = self.store.clone();
        let key = collection_key(user);
        let bytes =
            postcard::to_stdvec(&locations).map_err(|e| store_error("Failed to encode", e))?;

        task::spawn_blocking(move || store.insert(key, bytes))
            .await
            .map_err(|e| store_error("Store task failed", e))?
            .map_err(|e| store_error("Failed to write collection", e))?;

        self.notify(user, locations);
        Ok(())
    }

    fn notify(&self, user: &UserId, locations: Vec<SavedLocation>) {
        let Ok(mut watchers) = self.watchers.lock() else {
            tracing::warn!("Subscriber registry poisoned, skipping notification");
            return;
        };
        let closed = watchers
            .get(user)
            .is_some_and(|sender| sender.send(locations).is_err());
        if closed {
            // Every receiver is gone.
            watchers.remove(user);
        }
    }
}

#[async_trait]
impl DocumentStore for FjallStore {
    async fn list(&self, user: &UserId) -> Result<Vec<SavedLocation>> {
        self.load(user).await
    }

    async fn create(&self, user: &UserId, location: NewLocation) -> Result<SavedLocation> {
        let name = location.name.trim();
        if name.is_empty() {
            return Err(HydrocastError::validation("Location name must not be empty"));
        }

        let _guard = self.write_lock.lock().await;
        let mut locations = self.load(user).await?;

        let now = Utc::now();
        let mut id = new_record_id();
        while locations.iter().any(|l| l.id == id) {
            id = new_record_id();
        }

        let record = SavedLocation {
            id,
            user_id: user.clone(),
            name: name.to_string(),
            coordinate: location.coordinate,
            snapshot: location.snapshot,
            created_at: now,
            updated_at: now,
        };
        locations.push(record.clone());
        self.save(user, locations).await?;

        tracing::info!("Saved location {} ({})", record.name, record.id);
        Ok(record)
    }

    async fn update(
        &self,
        user: &UserId,
        id: &str,
        update: LocationUpdate,
    ) -> Result<SavedLocation> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(HydrocastError::validation("Location name must not be empty"));
            }
        }

        let _guard = self.write_lock.lock().await;
        let mut locations = self.load(user).await?;

        let record = locations
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| HydrocastError::store(format!("No saved location with id {id}")))?;

        if let Some(name) = update.name {
            record.name = name.trim().to_string();
        }
        if let Some(snapshot) = update.snapshot {
            record.snapshot = snapshot;
        }
        record.updated_at = Utc::now();
        let updated = record.clone();

        self.save(user, locations).await?;
        Ok(updated)
    }

    async fn delete(&self, user: &UserId, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut locations = self.load(user).await?;

        let before = locations.len();
        locations.retain(|l| l.id != id);
        if locations.len() == before {
            return Err(HydrocastError::store(format!("No saved location with id {id}")));
        }

        self.save(user, locations).await?;
        tracing::info!("Deleted location {}", id);
        Ok(())
    }

    async fn subscribe(&self, user: &UserId) -> Result<watch::Receiver<Vec<SavedLocation>>> {
        let _guard = self.write_lock.lock().await;
        let current = self.load(user).await?;

        let mut watchers = self
            .watchers
            .lock()
            .map_err(|_| HydrocastError::store("Subscriber registry poisoned"))?;
        let receiver = match watchers.get(user) {
            Some(sender) => {
                sender.send_replace(current);
                sender.subscribe()
            }
            None => {
                let (sender, receiver) = watch::channel(current);
                watchers.insert(user.clone(), sender);
                receiver
            }
        };
        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, WeatherSnapshot};
    use std::time::Duration;
    use tempfile::TempDir;

    fn user(id: &str) -> UserId {
        UserId(id.to_string())
    }

    fn new_location(name: &str) -> NewLocation {
        NewLocation {
            name: name.to_string(),
            coordinate: Coordinate::new(46.06, 14.51),
            snapshot: WeatherSnapshot {
                temperature_c: 18.0,
                condition: "Sunny".to_string(),
                pressure_mb: 1015.0,
                wind_kph: 5.0,
                humidity: Some(50.0),
                captured_at: Utc::now(),
            },
        }
    }

    fn open() -> (TempDir, FjallStore) {
        let dir = TempDir::new().unwrap();
        let store = FjallStore::open(dir.path()).unwrap();
        (dir, store)
    }

    async fn tick() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (_dir, store) = open();
        let alice = user("alice");

        assert!(store.list(&alice).await.unwrap().is_empty());

        let created = store.create(&alice, new_location("  Bled ")).await.unwrap();
        assert_eq!(created.name, "Bled");
        assert_eq!(created.user_id, alice);
        assert_eq!(created.created_at, created.updated_at);

        let listed = store.list(&alice).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn test_collections_are_per_user() {
        let (_dir, store) = open();
        store.create(&user("alice"), new_location("Bled")).await.unwrap();

        assert!(store.list(&user("bob")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_most_recently_updated_first() {
        let (_dir, store) = open();
        let alice = user("alice");

        let first = store.create(&alice, new_location("First")).await.unwrap();
        tick().await;
        let second = store.create(&alice, new_location("Second")).await.unwrap();

        let names: Vec<String> = store.list(&alice).await.unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Second", "First"]);

        tick().await;
        let renamed = store
            .update(
                &alice,
                &first.id,
                LocationUpdate {
                    name: Some("First again".into()),
                    ..LocationUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(renamed.updated_at > second.updated_at);
        assert_eq!(renamed.created_at, first.created_at);

        let names: Vec<String> = store.list(&alice).await.unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["First again", "Second"]);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_record_fail() {
        let (_dir, store) = open();
        let alice = user("alice");

        let err = store
            .update(&alice, "nope", LocationUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HydrocastError::Store { .. }));

        let err = store.delete(&alice, "nope").await.unwrap_err();
        assert!(matches!(err, HydrocastError::Store { .. }));
    }

    #[tokio::test]
    async fn test_empty_names_are_rejected() {
        let (_dir, store) = open();
        let alice = user("alice");

        let err = store.create(&alice, new_location("   ")).await.unwrap_err();
        assert!(matches!(err, HydrocastError::Validation { .. }));

        let created = store.create(&alice, new_location("Bled")).await.unwrap();
        let err = store
            .update(
                &alice,
                &created.id,
                LocationUpdate {
                    name: Some(String::new()),
                    ..LocationUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HydrocastError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_subscription_sees_every_mutation() {
        let (_dir, store) = open();
        let alice = user("alice");

        let mut rx = store.subscribe(&alice).await.unwrap();
        assert!(rx.borrow_and_update().is_empty());

        let created = store.create(&alice, new_location("Bled")).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        tick().await;
        store.create(&alice, new_location("Piran")).await.unwrap();
        rx.changed().await.unwrap();
        let names: Vec<String> = rx.borrow_and_update().iter().map(|l| l.name.clone()).collect();
        assert_eq!(names, vec!["Piran", "Bled"]);

        store.delete(&alice, &created.id).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        // Other users' writes do not wake this subscriber.
        store.create(&user("bob"), new_location("Koper")).await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_record_ids() {
        let a = new_record_id();
        let b = new_record_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 19);
    }
}
