//! Room name to room id resolution.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::{ChatError, ChatResult};

type RoomMap = Arc<HashMap<String, String>>;

#[derive(Debug, Default)]
struct RoomState {
    rooms: RoomMap,
    /// Bumped on every local insert
    epoch: u64,
    /// Local inserts by name, with the epoch they happened at
    inserted: HashMap<String, (u64, String)>,
    /// Start epochs of listings still being fetched
    refreshing: Vec<u64>,
}

impl RoomState {
    /// Drop inserts every in-flight listing already reflects.
    fn prune(&mut self) {
        match self.refreshing.iter().min().copied() {
            Some(oldest) => self.inserted.retain(|_, (epoch, _)| *epoch > oldest),
            None => self.inserted.clear(),
        }
    }
}

/// Cache of room name to id mappings.
///
/// Readers take a snapshot of an immutable map; writers build a new map and
/// swap it in, so a lookup never sees a half-applied refresh. Shared across
/// clones of [`ChatClient`](crate::client::ChatClient).
///
/// A refresh replaces the whole map, except that rooms inserted while its
/// listing was in flight are carried over.
#[derive(Debug, Default)]
pub struct RoomResolver {
    state: RwLock<RoomState>,
}

/// Unregisters an in-flight refresh, including when the fetch is dropped.
struct RefreshGuard<'a> {
    resolver: &'a RoomResolver,
    started_at: u64,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.resolver.write();
        if let Some(pos) = state.refreshing.iter().position(|&e| e == self.started_at) {
            state.refreshing.swap_remove(pos);
        }
        state.prune();
    }
}

impl RoomResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for strings shaped like a canonical room id
    /// (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`).
    pub fn looks_like_room_id(room: &str) -> bool {
        let bytes = room.as_bytes();
        bytes.len() == 36
            && [8, 13, 18, 23].iter().all(|&i| bytes[i] == b'-')
            && bytes.iter().filter(|&&b| b == b'-').count() == 4
    }

    /// Resolve a room name or id to an id.
    ///
    /// Ids pass through untouched. Names are looked up in the cache; on a
    /// miss `fetch_listing` is called once for the full `(name, id)` listing,
    /// which replaces the cache before the lookup is retried.
    pub async fn resolve<F, Fut>(&self, room: &str, fetch_listing: F) -> ChatResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ChatResult<Vec<(String, String)>>>,
    {
        if Self::looks_like_room_id(room) {
            return Ok(room.to_string());
        }
        if let Some(id) = self.cached(room) {
            return Ok(id);
        }

        debug!("Room '{}' not cached, refreshing room listing", room);
        let guard = self.begin_refresh();
        let listing = fetch_listing().await?;
        self.apply_listing(listing, guard.started_at);
        drop(guard);

        self.cached(room)
            .ok_or_else(|| ChatError::not_found(format!("Room '{}' not found", room)))
    }

    pub fn cached(&self, name: &str) -> Option<String> {
        self.snapshot().get(name).cloned()
    }

    /// Replace the whole cache with `listing`.
    pub fn replace(&self, listing: impl IntoIterator<Item = (String, String)>) {
        let epoch = self.read_epoch();
        self.apply_listing(listing, epoch);
    }

    pub fn insert(&self, name: impl Into<String>, id: impl Into<String>) {
        let (name, id) = (name.into(), id.into());
        let mut state = self.write();
        state.epoch += 1;
        let epoch = state.epoch;
        if !state.refreshing.is_empty() {
            state.inserted.insert(name.clone(), (epoch, id.clone()));
        }
        let mut rooms = HashMap::clone(&state.rooms);
        rooms.insert(name, id);
        state.rooms = Arc::new(rooms);
    }

    /// Forget one name, e.g. after a rename.
    pub fn invalidate(&self, name: &str) {
        let mut state = self.write();
        state.inserted.remove(name);
        if state.rooms.contains_key(name) {
            let mut rooms = HashMap::clone(&state.rooms);
            rooms.remove(name);
            state.rooms = Arc::new(rooms);
        }
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.inserted.clear();
        state.rooms = Arc::default();
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn begin_refresh(&self) -> RefreshGuard<'_> {
        let mut state = self.write();
        let started_at = state.epoch;
        state.refreshing.push(started_at);
        RefreshGuard {
            resolver: self,
            started_at,
        }
    }

    /// Swap in `listing`, keeping rooms inserted after `started_at`.
    fn apply_listing(&self, listing: impl IntoIterator<Item = (String, String)>, started_at: u64) {
        let mut rooms: HashMap<_, _> = listing.into_iter().collect();
        let mut state = self.write();
        for (name, (epoch, id)) in &state.inserted {
            if *epoch > started_at {
                rooms.insert(name.clone(), id.clone());
            }
        }
        debug!("Room cache refreshed with {} rooms", rooms.len());
        state.rooms = Arc::new(rooms);
    }

    fn read_epoch(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .epoch
    }

    fn snapshot(&self) -> RoomMap {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rooms
            .clone()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RoomState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
