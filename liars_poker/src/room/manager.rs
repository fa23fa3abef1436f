//! Room manager: creates rooms on first join and drops them once empty.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{oneshot, RwLock};

use super::actor::{RoomActor, RoomConfig, RoomHandle};
use super::messages::RoomMessage;
use crate::registry::RegistryManager;

/// Room id used when a frame carries no `session_id`.
pub const DEFAULT_ROOM_ID: &str = "default";

/// Shared map of live rooms. Inter-room activity is fully parallel; the map
/// itself is only touched on join and teardown.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, RoomHandle>>,
    registry: Arc<RegistryManager>,
    config: RoomConfig,
}

impl RoomManager {
    pub fn new(registry: Arc<RegistryManager>, config: RoomConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            registry,
            config,
        }
    }

    /// Get the room's handle, spawning its actor on first use. A handle
    /// whose actor already stopped is replaced.
    pub async fn get_or_create(&self, room_id: &str) -> RoomHandle {
        let mut rooms = self.rooms.write().await;
        if let Some(handle) = rooms.get(room_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }
        let (actor, handle) = RoomActor::new(
            room_id.to_string(),
            self.config.clone(),
            self.registry.clone(),
        );
        tokio::spawn(actor.run());
        rooms.insert(room_id.to_string(), handle.clone());
        log::info!("room {room_id} created");
        handle
    }

    /// Look up a live room without creating one.
    pub async fn get(&self, room_id: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).filter(|h| !h.is_closed()).cloned()
    }

    /// Drop the map entry once its actor has stopped.
    pub async fn reap(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(handle) = rooms.get(room_id) {
            if handle.is_closed() {
                rooms.remove(room_id);
                log::info!("room {room_id} destroyed");
            }
        }
    }

    pub async fn active_room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.values().filter(|h| !h.is_closed()).count()
    }

    /// Drain every room for server shutdown. Each room finishes the
    /// commands already in its inbox, then pushes a final `error` frame and
    /// a close to its connections and stops. Returns once every room has
    /// confirmed the drain.
    pub async fn shutdown_all(&self) {
        let handles: Vec<RoomHandle> = {
            let mut rooms = self.rooms.write().await;
            rooms.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            let (tx, rx) = oneshot::channel();
            if handle.send(RoomMessage::Shutdown { response: tx }).await.is_ok() {
                let _ = rx.await;
            }
            log::info!("room {} drained", handle.room_id());
        }
    }
}
