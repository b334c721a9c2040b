//! Toast-style notifications with timed dismissal
//!
//! A notification lives through `visible → closing → removed`. The handler
//! schedules the transitions as timer actions keyed by id; a timer that fires
//! for an id that is already closing or gone does nothing.

use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub text: String,
    pub level: NotificationLevel,
    /// Fading out; removed after the grace period
    pub closing: bool,
    /// Device presence notifications share one slot
    pub presence: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Notifications {
    items: Vec<Notification>,
    last_id: u64,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids are wall-clock milliseconds, bumped when two land in the same ms
    fn next_id(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    pub fn push(&mut self, text: impl Into<String>, level: NotificationLevel) -> u64 {
        let id = self.next_id();
        self.items.push(Notification {
            id,
            text: text.into(),
            level,
            closing: false,
            presence: false,
        });
        id
    }

    /// Replace the current presence notification, if any
    pub fn push_presence(&mut self, text: impl Into<String>, level: NotificationLevel) -> u64 {
        self.items.retain(|n| !n.presence);
        let id = self.push(text, level);
        if let Some(last) = self.items.last_mut() {
            last.presence = true;
        }
        id
    }

    /// Start closing. Returns false if the id is unknown or already closing.
    pub fn begin_close(&mut self, id: u64) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.closing => {
                n.closing = true;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn get(&self, id: u64) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn last(&self) -> Option<&Notification> {
        self.items.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Highest id handed out so far; used to detect new notifications
    pub fn last_id(&self) -> u64 {
        self.last_id
    }
}
