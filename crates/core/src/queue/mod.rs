//! Ordered cart queue for a single stack.
//!
//! Position 0 is the on-air/next slot. Played carts sink to the tail so the
//! next queued cart surfaces at the top, and a played cart that is dragged
//! back to the top is re-armed as queued in the same move.

use serde::{Deserialize, Serialize};

use crate::{CartId, CartItem, CartStatus};

/// Where a reordered cart should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReorderTarget {
    /// Immediately before the given cart. Falls back to the tail when the
    /// cart is not in this queue.
    Before(CartId),
    Tail,
}

impl From<Option<CartId>> for ReorderTarget {
    fn from(value: Option<CartId>) -> Self {
        value.map(Self::Before).unwrap_or(Self::Tail)
    }
}

/// Where an inserted cart ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub index: usize,
    /// The cart was `Played` and landed on top, so it was reset to `Queued`.
    pub requeued: bool,
}

/// Result of a successful activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    /// The cart that lost the on-air slot and sank to the tail.
    pub demoted: Option<CartId>,
}

#[derive(Debug, Clone, Default)]
pub struct CartQueue {
    items: Vec<CartItem>,
}

impl CartQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Read-only ordered view.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn ids(&self) -> Vec<CartId> {
        self.items.iter().map(CartItem::id).collect()
    }

    pub fn get(&self, id: CartId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn position(&self, id: CartId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn contains(&self, id: CartId) -> bool {
        self.position(id).is_some()
    }

    /// The cart at position 0, whatever its status. Hotkey play targets it.
    pub fn top(&self) -> Option<&CartItem> {
        self.items.first()
    }

    /// The cart currently holding the on-air slot (`Playing` or `Paused`).
    pub fn live(&self) -> Option<&CartItem> {
        self.items.iter().find(|item| item.status().is_live())
    }

    /// The live cart if there is one, otherwise the top of the queue.
    pub fn active(&self) -> Option<&CartItem> {
        self.live().or_else(|| self.top())
    }

    /// Appends a cart at the tail as `Queued`. A cart whose id is already in
    /// the queue is ignored.
    pub fn append(&mut self, mut item: CartItem) -> bool {
        if self.contains(item.id()) {
            return false;
        }
        item.set_status(CartStatus::Queued);
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, id: CartId) -> Option<CartItem> {
        let index = self.position(id)?;
        Some(self.items.remove(index))
    }

    /// Moves `id` before the target (or to the tail). Returns `None` when
    /// nothing moved.
    pub fn reorder(&mut self, id: CartId, target: ReorderTarget) -> Option<Placement> {
        if target == ReorderTarget::Before(id) {
            return None;
        }
        let index = self.position(id)?;
        let item = self.items.remove(index);
        Some(self.insert(item, target))
    }

    /// Inserts a cart that is not yet in this queue, applying the top-slot
    /// requeue rule.
    pub(crate) fn insert(&mut self, mut item: CartItem, target: ReorderTarget) -> Placement {
        let index = match target {
            ReorderTarget::Before(before) => self.position(before).unwrap_or(self.items.len()),
            ReorderTarget::Tail => self.items.len(),
        };

        let requeued = index == 0 && item.status() == CartStatus::Played;
        if requeued {
            item.set_status(CartStatus::Queued);
        }

        self.items.insert(index, item);
        Placement { index, requeued }
    }

    /// Marks `id` as `Playing`. Any other live cart in this queue is demoted
    /// to `Played` and sunk to the tail.
    ///
    /// Returns `None` without touching anything when `id` is not queued here.
    pub fn activate_top(&mut self, id: CartId) -> Option<Activation> {
        self.position(id)?;

        let demoted = self
            .items
            .iter()
            .find(|item| item.id() != id && item.status().is_live())
            .map(CartItem::id);
        if let Some(previous) = demoted {
            self.sink(previous);
        }

        if let Some(item) = self.items.iter_mut().find(|item| item.id() == id) {
            item.set_status(CartStatus::Playing);
        }
        Some(Activation { demoted })
    }

    /// Retires the live cart, if any, to the tail as `Played`.
    pub fn deactivate(&mut self) -> Option<CartId> {
        let id = self.live()?.id();
        self.sink(id);
        Some(id)
    }

    /// Retires `id` if it is the live cart. Stale ids are ignored.
    pub fn finish(&mut self, id: CartId) -> bool {
        match self.get(id) {
            Some(item) if item.status().is_live() => {
                self.sink(id);
                true
            }
            _ => false,
        }
    }

    /// Moves `id` to the top, resetting a `Played` cart to `Queued`.
    pub fn requeue_to_top(&mut self, id: CartId) -> Option<Placement> {
        let index = self.position(id)?;
        let mut item = self.items.remove(index);
        let requeued = item.status() == CartStatus::Played;
        if requeued {
            item.set_status(CartStatus::Queued);
        }
        self.items.insert(0, item);
        Some(Placement { index: 0, requeued })
    }

    /// `Playing` → `Paused`. Any other status is left alone.
    pub fn pause(&mut self, id: CartId) -> bool {
        self.swap_status(id, CartStatus::Playing, CartStatus::Paused)
    }

    /// `Paused` → `Playing`. Any other status is left alone.
    pub fn resume(&mut self, id: CartId) -> bool {
        self.swap_status(id, CartStatus::Paused, CartStatus::Playing)
    }

    pub fn rename(&mut self, id: CartId, title: &str, fallback_title: &str) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                item.rename(title, fallback_title);
                true
            }
            None => false,
        }
    }

    /// Back-fills the duration of `id` without touching position or status.
    pub fn set_duration(&mut self, id: CartId, seconds: f64) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                item.set_duration(seconds);
                true
            }
            None => false,
        }
    }

    fn swap_status(&mut self, id: CartId, from: CartStatus, to: CartStatus) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) if item.status() == from => {
                item.set_status(to);
                true
            }
            _ => false,
        }
    }

    fn sink(&mut self, id: CartId) {
        if let Some(index) = self.position(id) {
            let mut item = self.items.remove(index);
            item.set_status(CartStatus::Played);
            self.items.push(item);
        }
    }
}
