//! The vector registry
//!
//! [`VectorStore`] owns every named vector, its client chain, and the queue
//! of pending idle notifications. It is an explicit context object: nothing
//! in this crate touches global state, so a host can run any number of
//! independent stores (one per interpreter, typically) side by side.
//!
//! Handles ([`VectorId`], [`ClientId`](crate::store::client::ClientId)) are
//! slab indices tagged with a generation. Destroying a vector bumps its
//! slot's generation, so every handle issued for it afterwards reports
//! "vector no longer exists" rather than aliasing a recycled slot.
//!
//! # Names and namespaces
//!
//! Vector names may be qualified with `::` (`ns::temps`). The store carries
//! a current namespace: unqualified creates land in it, and unqualified
//! lookups search it before falling back to the global scope. The reserved
//! name `#auto` generates a unique name at creation.

use crate::chain::Chain;
use crate::store::client::{ClientSlot, NotifyKind, NotifyPolicy};
use crate::store::errors::StoreError;
use crate::store::vector::Vector;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Handle to a vector owned by a [`VectorStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

pub(crate) struct VectorSlot {
    pub(crate) generation: u32,
    pub(crate) entry: Option<VectorEntry>,
}

pub(crate) struct VectorEntry {
    pub(crate) name: String,
    pub(crate) vector: Vector,
    pub(crate) clients: Chain<crate::store::client::ClientId>,
    pub(crate) policy: NotifyPolicy,
    /// True while a coalesced `WhenIdle` notification is queued
    pub(crate) pending: bool,
}

/// Registry owning all vectors, client registrations, and the idle
/// notification queue for one interpreter/session.
pub struct VectorStore {
    pub(crate) slots: Vec<VectorSlot>,
    pub(crate) free_slots: Vec<usize>,
    pub(crate) names: FxHashMap<String, VectorId>,
    pub(crate) clients: Vec<ClientSlot>,
    pub(crate) free_clients: Vec<usize>,
    pub(crate) idle: VecDeque<VectorId>,
    namespace: Option<String>,
    auto_counter: u64,
}

impl VectorStore {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            names: FxHashMap::default(),
            clients: Vec::new(),
            free_clients: Vec::new(),
            idle: VecDeque::new(),
            namespace: None,
            auto_counter: 0,
        }
    }

    /// Set the current namespace for unqualified names. `None` is global.
    pub fn set_namespace(&mut self, namespace: Option<&str>) {
        self.namespace = namespace.map(str::to_string);
    }

    pub fn current_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Create a new vector of `length` zeros under `name`.
    ///
    /// `#auto` generates a fresh name. Unqualified names land in the current
    /// namespace. An existing binding is a [`StoreError::NameConflict`].
    pub fn create(&mut self, name: &str, length: usize) -> Result<VectorId, StoreError> {
        let qualified = if name == "#auto" {
            loop {
                self.auto_counter += 1;
                let candidate = self.qualify(&format!("vector{}", self.auto_counter));
                if !self.names.contains_key(&candidate) {
                    break candidate;
                }
            }
        } else {
            let qualified = self.qualify(name);
            if self.names.contains_key(&qualified) {
                return Err(StoreError::NameConflict { name: qualified });
            }
            qualified
        };

        let vector = Vector::with_length(length)?;
        let index = match self.free_slots.pop() {
            Some(index) => index,
            None => {
                self.slots.push(VectorSlot {
                    generation: 0,
                    entry: None,
                });
                self.slots.len() - 1
            }
        };
        let id = VectorId {
            index: index as u32,
            generation: self.slots[index].generation,
        };
        self.slots[index].entry = Some(VectorEntry {
            name: qualified.clone(),
            vector,
            clients: Chain::new(),
            policy: NotifyPolicy::default(),
            pending: false,
        });
        self.names.insert(qualified, id);
        Ok(id)
    }

    /// Qualify `name` with the current namespace. Already-qualified names
    /// pass through; a leading `::` forces the global scope.
    fn qualify(&self, name: &str) -> String {
        if let Some(global) = name.strip_prefix("::") {
            return global.to_string();
        }
        if name.contains("::") {
            return name.to_string();
        }
        match &self.namespace {
            Some(namespace) => format!("{}::{}", namespace, name),
            None => name.to_string(),
        }
    }

    /// Resolve a name to a vector handle.
    ///
    /// Qualified names resolve exactly (a leading `::` forces the global
    /// scope). Unqualified names search the current namespace first, then
    /// the global scope.
    pub fn lookup(&self, name: &str) -> Result<VectorId, StoreError> {
        if let Some(global) = name.strip_prefix("::") {
            return self.names.get(global).copied().ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
            });
        }
        if name.contains("::") {
            return self.names.get(name).copied().ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
            });
        }
        if let Some(namespace) = &self.namespace {
            if let Some(&id) = self.names.get(&format!("{}::{}", namespace, name)) {
                return Ok(id);
            }
        }
        self.names.get(name).copied().ok_or_else(|| StoreError::NotFound {
            name: name.to_string(),
        })
    }

    /// The vector's fully qualified name.
    pub fn name(&self, id: VectorId) -> Result<&str, StoreError> {
        Ok(&self.live_entry(id)?.name)
    }

    /// Shared access to a vector's data.
    pub fn vector(&self, id: VectorId) -> Result<&Vector, StoreError> {
        Ok(&self.live_entry(id)?.vector)
    }

    /// Current extrema, recomputed lazily.
    pub fn range(&mut self, id: VectorId) -> Result<(f64, f64), StoreError> {
        let vector = &mut self.live_entry_mut(id)?.vector;
        Ok((vector.min(), vector.max()))
    }

    /// Change a vector's logical length and notify its clients.
    pub fn resize(&mut self, id: VectorId, length: usize) -> Result<(), StoreError> {
        self.live_entry_mut(id)?.vector.change_length(length)?;
        self.notify_updated(id);
        Ok(())
    }

    /// Replace a vector's storage, taking ownership of `values`.
    pub fn reset(&mut self, id: VectorId, values: Vec<f64>) -> Result<(), StoreError> {
        self.live_entry_mut(id)?.vector.reset(values);
        self.notify_updated(id);
        Ok(())
    }

    /// Replace a vector's storage with a defensive copy of `values`.
    pub fn reset_from_slice(&mut self, id: VectorId, values: &[f64]) -> Result<(), StoreError> {
        self.live_entry_mut(id)?.vector.reset_from_slice(values);
        self.notify_updated(id);
        Ok(())
    }

    /// Write one element (index `len()` appends) and notify.
    pub fn set(&mut self, id: VectorId, index: usize, value: f64) -> Result<(), StoreError> {
        self.live_entry_mut(id)?.vector.set(index, value)?;
        self.notify_updated(id);
        Ok(())
    }

    /// Append a list of textual numbers, rolling back on a bad element.
    pub fn append_list(&mut self, id: VectorId, list: &[&str]) -> Result<(), StoreError> {
        let result = self.live_entry_mut(id)?.vector.append_list(list);
        // The speculative growth mutated the vector even on failure
        self.notify_updated(id);
        result
    }

    pub fn set_offset(&mut self, id: VectorId, offset: i64) -> Result<(), StoreError> {
        self.live_entry_mut(id)?.vector.set_offset(offset);
        Ok(())
    }

    /// Copy `src`'s selected range into `dest`, resizing `dest` as needed.
    pub fn duplicate(&mut self, dest: VectorId, src: VectorId) -> Result<(), StoreError> {
        if dest == src {
            return Ok(());
        }
        let data: Vec<f64> = self.live_entry(src)?.vector.selected().to_vec();
        self.live_entry_mut(dest)?.vector.copy_from(&data)?;
        self.notify_updated(dest);
        Ok(())
    }

    pub fn set_policy(&mut self, id: VectorId, policy: NotifyPolicy) -> Result<(), StoreError> {
        self.live_entry_mut(id)?.policy = policy;
        Ok(())
    }

    /// Destroy a vector.
    ///
    /// Cancels any pending idle notification, fires a synchronous
    /// `Destroyed` notification to every client in registration order, nulls
    /// each surviving token's back-reference, then removes the name binding
    /// and retires the slot. Client tokens stay valid for
    /// [`release_client`](VectorStore::release_client).
    pub fn destroy(&mut self, id: VectorId) -> Result<(), StoreError> {
        let entry = self.live_entry_mut(id)?;
        let had_pending = entry.pending;
        entry.pending = false;
        if had_pending {
            self.idle.retain(|&queued| queued != id);
        }

        self.deliver(id, NotifyKind::Destroyed);

        let slot = &mut self.slots[id.index as usize];
        let entry = match slot.entry.take() {
            Some(entry) => entry,
            None => return Err(StoreError::NoLongerExists),
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index as usize);
        self.names.remove(&entry.name);

        for &cid in entry.clients.iter() {
            if let Some(client) = self.client_entry_mut_opt(cid) {
                client.vector = None;
                client.link = None;
            }
        }
        Ok(())
    }

    // ===== Internal slot access =====

    pub(crate) fn entry(&self, id: VectorId) -> Option<&VectorEntry> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    pub(crate) fn entry_mut(&mut self, id: VectorId) -> Option<&mut VectorEntry> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    pub(crate) fn live_entry(&self, id: VectorId) -> Result<&VectorEntry, StoreError> {
        self.entry(id).ok_or(StoreError::NoLongerExists)
    }

    pub(crate) fn live_entry_mut(&mut self, id: VectorId) -> Result<&mut VectorEntry, StoreError> {
        self.entry_mut(id).ok_or(StoreError::NoLongerExists)
    }
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}
