//! Per-user saved-location storage

use async_trait::async_trait;
use tokio::sync::watch;

use crate::Result;
use crate::models::{LocationUpdate, NewLocation, SavedLocation, UserId};

pub mod fjall_store;

pub use fjall_store::FjallStore;

/// A document store holding one collection of saved locations per user.
///
/// Every collection handed out, by `list` or through a subscription, is
/// ordered most recently updated first, with ties broken by id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, user: &UserId) -> Result<Vec<SavedLocation>>;

    async fn create(&self, user: &UserId, location: NewLocation) -> Result<SavedLocation>;

    /// Apply `update` to record `id`; fails when the record does not exist
    async fn update(&self, user: &UserId, id: &str, update: LocationUpdate)
    -> Result<SavedLocation>;

    /// Remove record `id`; fails when the record does not exist
    async fn delete(&self, user: &UserId, id: &str) -> Result<()>;

    /// Live view of the user's collection, refreshed after every mutation
    async fn subscribe(&self, user: &UserId) -> Result<watch::Receiver<Vec<SavedLocation>>>;
}

/// Sort a collection into store order
pub fn sort_collection(locations: &mut [SavedLocation]) {
    locations.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
