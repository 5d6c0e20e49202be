//! Connection pool — tracks all active connections indexed by user ID.

use std::sync::Arc;

use dashmap::DashMap;

use notifyhub_core::types::{ConnectionId, UserId};

use super::handle::ConnectionHandle;

/// Thread-safe pool of all active connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// User ID → list of connection handles in admission order.
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → connection handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection, first removing the user's least recently active
    /// connections until fewer than `max_per_user` remain.
    ///
    /// The cap check and the insert happen under the user's entry lock, so
    /// concurrent registrations for one user cannot overshoot the cap.
    /// Returns the evicted handles.
    pub fn admit(
        &self,
        handle: Arc<ConnectionHandle>,
        max_per_user: usize,
    ) -> Vec<Arc<ConnectionHandle>> {
        let mut evicted = Vec::new();
        {
            let mut connections = self.by_user.entry(handle.user_id.clone()).or_default();
            while connections.len() >= max_per_user.max(1) {
                let oldest = connections
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, conn)| conn.last_activity_millis())
                    .map(|(index, _)| index);
                match oldest {
                    Some(index) => evicted.push(connections.remove(index)),
                    None => break,
                }
            }
            connections.push(handle.clone());
        }

        for conn in &evicted {
            self.by_id.remove(&conn.id);
        }
        self.by_id.insert(handle.id, handle);
        evicted
    }

    /// Removes a connection from the pool.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        if let Some(mut connections) = self.by_user.get_mut(&handle.user_id) {
            connections.retain(|c| c.id != *conn_id);
        }
        self.by_user
            .remove_if(&handle.user_id, |_, connections| connections.is_empty());
        Some(handle)
    }

    /// Gets all connections for a user.
    pub fn get_user_connections(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
