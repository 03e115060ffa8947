//! Client registration and change notification
//!
//! Observers register against a vector and receive a [`ClientId`] token.
//! The vector keeps its clients in a [`Chain`](crate::chain::Chain) so that
//! delivery walks them in registration order. Tokens are generation-tagged
//! handles: after the vector (or the registration) is gone, a stale token
//! reports an error instead of touching recycled state.
//!
//! # Scheduling
//!
//! Each vector carries a [`NotifyPolicy`]:
//!
//! - `Never` suppresses update notifications entirely.
//! - `Always` delivers synchronously on every mutation.
//! - `WhenIdle` (the default) coalesces any number of mutations into a
//!   single deferred notification, delivered when the host event loop calls
//!   [`VectorStore::flush_idle`].
//!
//! Destroy notifications ignore the policy: they always fire synchronously,
//! and a pending idle notification for the destroyed vector is cancelled.
//!
//! Callbacks receive `(NotifyKind, &Vector)` and read-only access to the
//! vector's data. The store is single-threaded and cooperative; a callback
//! cannot re-enter the store (it holds no reference to it).

use crate::store::registry::{VectorId, VectorStore};
use crate::store::vector::Vector;
use crate::store::errors::StoreError;

/// What a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    /// The vector's data or length changed
    Updated,
    /// The vector is being destroyed; this is the last delivery
    Destroyed,
}

/// When update notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyPolicy {
    Never,
    Always,
    #[default]
    WhenIdle,
}

/// Observer callback. Invoked once per notification with read access to the
/// vector's current state.
pub type NotifyCallback = Box<dyn FnMut(NotifyKind, &Vector)>;

/// Token identifying one client registration.
///
/// Outlives the vector it was registered against: after the vector is
/// destroyed the token is still valid for [`VectorStore::release_client`],
/// and everything else reports [`StoreError::NoLongerExists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

pub(crate) struct ClientSlot {
    pub(crate) generation: u32,
    pub(crate) entry: Option<ClientEntry>,
}

pub(crate) struct ClientEntry {
    /// Back-reference to the observed vector; nulled when it is destroyed
    pub(crate) vector: Option<VectorId>,
    /// This client's link in the vector's chain
    pub(crate) link: Option<crate::chain::Link>,
    pub(crate) callback: Option<NotifyCallback>,
}

impl VectorStore {
    /// Register a new client against a vector.
    pub fn register_client(&mut self, id: VectorId) -> Result<ClientId, StoreError> {
        self.live_entry(id)?;

        let index = match self.free_clients.pop() {
            Some(index) => index,
            None => {
                self.clients.push(ClientSlot {
                    generation: 0,
                    entry: None,
                });
                self.clients.len() - 1
            }
        };
        let cid = ClientId {
            index: index as u32,
            generation: self.clients[index].generation,
        };

        let link = self
            .entry_mut(id)
            .ok_or(StoreError::NoLongerExists)?
            .clients
            .append(cid);

        self.clients[index].entry = Some(ClientEntry {
            vector: Some(id),
            link: Some(link),
            callback: None,
        });
        Ok(cid)
    }

    /// Install (or replace) the callback for a client registration.
    pub fn set_client_callback<F>(&mut self, cid: ClientId, callback: F) -> Result<(), StoreError>
    where
        F: FnMut(NotifyKind, &Vector) + 'static,
    {
        let entry = self.client_entry_mut(cid)?;
        entry.callback = Some(Box::new(callback));
        Ok(())
    }

    /// Remove the callback, leaving the registration as a no-op observer.
    pub fn clear_client_callback(&mut self, cid: ClientId) -> Result<(), StoreError> {
        let entry = self.client_entry_mut(cid)?;
        entry.callback = None;
        Ok(())
    }

    /// Release a client registration.
    ///
    /// Valid even after the observed vector was destroyed (the token's
    /// back-reference is already null by then). A second release of the same
    /// token is [`StoreError::InvalidToken`].
    pub fn release_client(&mut self, cid: ClientId) -> Result<(), StoreError> {
        let slot = self
            .clients
            .get_mut(cid.index as usize)
            .filter(|slot| slot.generation == cid.generation)
            .ok_or(StoreError::InvalidToken)?;
        let entry = slot.entry.take().ok_or(StoreError::InvalidToken)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_clients.push(cid.index as usize);

        if let (Some(id), Some(link)) = (entry.vector, entry.link) {
            if let Some(vector_entry) = self.entry_mut(id) {
                vector_entry.clients.remove(link);
            }
        }
        Ok(())
    }

    /// Whether the observed vector has a coalesced notification waiting for
    /// the next [`flush_idle`](VectorStore::flush_idle).
    pub fn notify_pending(&self, cid: ClientId) -> Result<bool, StoreError> {
        let entry = self.client_entry(cid)?;
        Ok(match entry.vector {
            Some(id) => self.entry(id).is_some_and(|e| e.pending),
            None => false,
        })
    }

    /// Deliver any coalesced `WhenIdle` notifications. The host event loop
    /// calls this at its idle point.
    pub fn flush_idle(&mut self) {
        while let Some(id) = self.idle.pop_front() {
            let live = match self.entry_mut(id) {
                Some(entry) if entry.pending => {
                    entry.pending = false;
                    true
                }
                _ => false,
            };
            if live {
                self.deliver(id, NotifyKind::Updated);
            }
        }
    }

    /// Route an update notification according to the vector's policy.
    pub(crate) fn notify_updated(&mut self, id: VectorId) {
        let policy = match self.entry(id) {
            Some(entry) => entry.policy,
            None => return,
        };
        match policy {
            NotifyPolicy::Never => {}
            NotifyPolicy::Always => self.deliver(id, NotifyKind::Updated),
            NotifyPolicy::WhenIdle => {
                let entry = match self.entry_mut(id) {
                    Some(entry) => entry,
                    None => return,
                };
                if !entry.pending {
                    entry.pending = true;
                    self.idle.push_back(id);
                }
            }
        }
    }

    /// Invoke every client callback, in registration order.
    ///
    /// The callback is moved out of its slot for the duration of the call so
    /// the store can hand out a shared borrow of the vector alongside it.
    pub(crate) fn deliver(&mut self, id: VectorId, kind: NotifyKind) {
        let client_ids: Vec<ClientId> = match self.entry(id) {
            Some(entry) => entry.clients.iter().copied().collect(),
            None => return,
        };

        for cid in client_ids {
            let callback = self
                .client_entry_mut_opt(cid)
                .and_then(|entry| entry.callback.take());
            let mut callback = match callback {
                Some(callback) => callback,
                None => continue,
            };

            if let Some(entry) = self.entry(id) {
                callback(kind, &entry.vector);
            }

            if let Some(entry) = self.client_entry_mut_opt(cid) {
                entry.callback = Some(callback);
            }
        }
    }

    fn client_entry(&self, cid: ClientId) -> Result<&ClientEntry, StoreError> {
        self.clients
            .get(cid.index as usize)
            .filter(|slot| slot.generation == cid.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(StoreError::InvalidToken)
    }

    fn client_entry_mut(&mut self, cid: ClientId) -> Result<&mut ClientEntry, StoreError> {
        self.client_entry_mut_opt(cid).ok_or(StoreError::InvalidToken)
    }

    pub(crate) fn client_entry_mut_opt(&mut self, cid: ClientId) -> Option<&mut ClientEntry> {
        self.clients
            .get_mut(cid.index as usize)
            .filter(|slot| slot.generation == cid.generation)
            .and_then(|slot| slot.entry.as_mut())
    }
}
