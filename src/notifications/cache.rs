// Local read model of one user's notifications
//
// Pure state: `apply` returns the effects to perform instead of performing
// them. `unread_count` always equals the number of cached unread entries.

use crate::records::{Notification, NotificationId};
use crate::toast::ToastKind;

/// Row-level change already decoded and filtered for the session user
#[derive(Debug, Clone, PartialEq)]
pub enum CacheChange {
    Inserted(Notification),
    Updated(Notification),
    Deleted(NotificationId),
}

/// Side effect requested by a cache transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEffect {
    Toast { message: String, kind: ToastKind },
}

#[derive(Debug, Clone)]
pub struct NotificationCache {
    // newest first
    items: Vec<Notification>,
    unread: usize,
    capacity: usize,
    toast_on_insert: bool,
}

impl NotificationCache {
    pub fn new(capacity: usize, toast_on_insert: bool) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            unread: 0,
            capacity,
            toast_on_insert,
        }
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.items.iter().find(|n| &n.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.unread
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.unread = 0;
    }

    /// Replace the whole cache with a freshly fetched, newest-first page
    pub fn replace_all(&mut self, mut rows: Vec<Notification>) {
        rows.truncate(self.capacity);
        self.items = rows;
        self.recount();
    }

    pub fn apply(&mut self, change: CacheChange) -> Vec<SyncEffect> {
        match change {
            CacheChange::Inserted(notification) => self.insert(notification),
            CacheChange::Updated(notification) => {
                if let Some(slot) = self.items.iter_mut().find(|n| n.id == notification.id) {
                    *slot = notification;
                }
                self.recount();
                Vec::new()
            }
            CacheChange::Deleted(id) => {
                self.items.retain(|n| n.id != id);
                self.recount();
                Vec::new()
            }
        }
    }

    /// Returns whether the entry went from unread to read
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        match self.items.iter_mut().find(|n| &n.id == id) {
            Some(n) if !n.is_read => {
                n.is_read = true;
                self.unread -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.items {
            n.is_read = true;
        }
        self.unread = 0;
    }

    pub fn remove(&mut self, id: &NotificationId) -> bool {
        let before = self.items.len();
        self.items.retain(|n| &n.id != id);
        let removed = before != self.items.len();
        if removed {
            self.recount();
        }
        removed
    }

    fn insert(&mut self, notification: Notification) -> Vec<SyncEffect> {
        // Redelivery of a row we already hold, e.g. after a refetch
        if let Some(slot) = self.items.iter_mut().find(|n| n.id == notification.id) {
            *slot = notification;
            self.recount();
            return Vec::new();
        }

        let effects = if self.toast_on_insert {
            vec![SyncEffect::Toast {
                message: toast_message(&notification),
                kind: notification.kind.into(),
            }]
        } else {
            Vec::new()
        };

        if !notification.is_read {
            self.unread += 1;
        }
        self.items.insert(0, notification);

        if self.items.len() > self.capacity {
            let evicted_unread = self
                .items
                .drain(self.capacity..)
                .filter(|n| !n.is_read)
                .count();
            self.unread -= evicted_unread;
        }
        effects
    }

    fn recount(&mut self) {
        self.unread = self.items.iter().filter(|n| !n.is_read).count();
    }
}

fn toast_message(notification: &Notification) -> String {
    if notification.message.is_empty() {
        notification.title.clone()
    } else {
        format!("{}: {}", notification.title, notification.message)
    }
}
