//! Remote MUDs and channels the gateway has told us about.
//!
//! Records are keyed by lower-cased name so lookups are case-insensitive,
//! while the record keeps the spelling the gateway used. A MUD is never
//! removed: going offline only flips its flag, so anything that still
//! refers to it by name keeps resolving.

use std::collections::{BTreeSet, HashMap};

use i3link_protocol::MudEntry;
use tracing::trace;

use crate::SessionError;

/// One known MUD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MudRecord {
    pub name: String,
    pub online: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default)]
pub struct MudDirectory {
    muds: HashMap<String, MudRecord>,
    channels: BTreeSet<String>,
}

fn key(name: &str) -> String {
    name.to_lowercase()
}

impl MudDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or refreshes a record from a mudlist entry. Metadata the
    /// entry lacks is kept from the previous record.
    pub fn upsert(&mut self, entry: MudEntry) {
        if entry.name.is_empty() {
            return;
        }
        let record = self
            .muds
            .entry(key(&entry.name))
            .or_insert_with(|| MudRecord {
                name: entry.name.clone(),
                online: entry.online,
                host: None,
                port: None,
            });
        record.name = entry.name;
        record.online = entry.online;
        if entry.host.is_some() {
            record.host = entry.host;
        }
        if entry.port.is_some() {
            record.port = entry.port;
        }
    }

    /// Applies a full mudlist. Returns `(total, online)` over the entries
    /// in this list.
    pub fn apply_mudlist(&mut self, entries: Vec<MudEntry>) -> (usize, usize) {
        let total = entries.len();
        let online = entries.iter().filter(|e| e.online).count();
        for entry in entries {
            self.upsert(entry);
        }
        trace!(total, online, known = self.muds.len(), "mudlist applied");
        (total, online)
    }

    /// Flips a MUD's online flag, creating the record if needed.
    pub fn set_online(&mut self, name: &str, online: bool) {
        if name.is_empty() {
            return;
        }
        self.muds
            .entry(key(name))
            .and_modify(|r| r.online = online)
            .or_insert_with(|| MudRecord {
                name: name.to_string(),
                online,
                host: None,
                port: None,
            });
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&MudRecord> {
        self.muds.get(&key(name))
    }

    /// The record for `name`, provided the MUD is known and online.
    ///
    /// # Errors
    /// [`SessionError::UnknownMud`] or [`SessionError::MudOffline`].
    pub fn ensure_online(&self, name: &str) -> Result<MudRecord, SessionError> {
        match self.get(name) {
            None => Err(SessionError::UnknownMud(name.to_string())),
            Some(r) if !r.online => Err(SessionError::MudOffline(r.name.clone())),
            Some(r) => Ok(r.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.muds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.muds.is_empty()
    }

    pub fn online_count(&self) -> usize {
        self.muds.values().filter(|r| r.online).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MudRecord> {
        self.muds.values()
    }

    // -- channels ------------------------------------------------------------

    /// Remembers channel names. Returns how many were new.
    pub fn add_channels<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(Into::into)
            .filter(|n: &String| !n.is_empty())
            .filter(|n| self.channels.insert(n.clone()))
            .count()
    }

    /// Known channels, sorted.
    pub fn channels(&self) -> Vec<String> {
        self.channels.iter().cloned().collect()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
