//! Action store: the in-memory action list and its persisted form
//!
//! The store owns a [`SettingsStore`] and keeps the decoded actions cached
//! next to it. Every mutating operation writes the persisted string and then
//! performs exactly one explicit flush (`SettingsStore::save`).
//!
//! # Staleness
//!
//! [`Store::load`] only decodes again when the store itself changed the
//! persisted string behind the cache, or when the number of tokens in the
//! persisted string differs from the number of cached slots. An outside edit
//! that keeps the token count (say, replacing one action with another) is
//! not noticed until the next write through the store.
//!
//! # Decode failures
//!
//! A token that cannot be decoded leaves an empty (`None`) slot in the cache
//! so slots stay aligned with tokens. Writes that re-encode the loaded list
//! keep such tokens as they were. A token whose payload is not even
//! validly framed means the persisted string is corrupt, and the whole
//! persisted list is cleared. The actions that did decode are still returned
//! for that one load, but they are gone from storage.

use std::mem;

use thiserror::Error;

use crate::access::{self, CapabilityFlags};
use crate::action::{Action, ActionId};
use crate::codec;
use crate::settings::{SettingsStore, INTERNAL_ACTIONS_KEY};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no stored action with id {id}")]
    NotFound { id: ActionId },
}

/// Owner of the persisted action list
#[derive(Debug)]
pub struct Store<S: SettingsStore> {
    settings: S,
    /// Decoded persisted actions, one slot per token
    cache: Vec<Option<Action>>,
    /// Persisted token behind each cache slot
    tokens: Vec<String>,
    /// Read-only actions merged in by `load_with_embedded`
    embedded: Vec<Option<Action>>,
    /// The list last published to the editing UI
    views: Vec<Action>,
    /// The persisted string changed without the cache being updated
    dirty: bool,
}

impl<S: SettingsStore> Store<S> {
    pub fn new(settings: S) -> Self {
        Self {
            settings,
            cache: Vec::new(),
            tokens: Vec::new(),
            embedded: Vec::new(),
            views: Vec::new(),
            dirty: true,
        }
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut S {
        &mut self.settings
    }

    /// Give back the settings store
    pub fn into_settings(self) -> S {
        self.settings
    }

    /// The persisted action string, empty if absent
    pub fn raw(&self) -> String {
        self.settings.get(INTERNAL_ACTIONS_KEY).unwrap_or_default()
    }

    /// Decode the persisted string into the cache and return it
    ///
    /// Slots for tokens that failed to decode are `None`.
    pub fn load(&mut self) -> &[Option<Action>] {
        let raw = self.raw();
        if raw.trim().is_empty() {
            self.cache.clear();
            self.tokens.clear();
            self.views.clear();
            self.dirty = false;
            return &self.cache;
        }

        let fragments = codec::fragment_count(&raw);
        if !self.dirty && self.cache.len() == fragments {
            tracing::trace!(fragments, "Action cache is current");
            return &self.cache;
        }

        let mut corrupt = false;
        self.cache = codec::decode_fragments(&raw)
            .into_iter()
            .enumerate()
            .map(|(index, result)| match result {
                Ok(action) => Some(action),
                Err(err) => {
                    corrupt |= err.is_framing();
                    tracing::warn!(index, error = %err, "Failed to decode stored action");
                    None
                }
            })
            .collect();
        self.tokens = codec::fragments(&raw).map(str::to_string).collect();
        self.views = self.cache.iter().flatten().cloned().collect();
        self.dirty = false;
        tracing::debug!(
            fragments,
            decoded = self.views.len(),
            "Loaded stored actions"
        );

        if corrupt {
            tracing::warn!("Stored actions are not validly framed, clearing stored actions");
            self.write(String::new());
            for (slot, token) in self.cache.iter().zip(self.tokens.iter_mut()) {
                if slot.is_none() {
                    token.clear();
                }
            }
            self.dirty = true;
        }

        &self.cache
    }

    /// [`Store::load`], followed by actions decoded from an embedded source
    ///
    /// The embedded actions are kept for dispatch until the next call but are
    /// never written back. A corrupt embedded string never clears storage.
    pub fn load_with_embedded(&mut self, embedded_raw: &str) -> Vec<Option<Action>> {
        self.load();
        self.embedded = codec::decode_list(embedded_raw);
        self.cache
            .iter()
            .chain(self.embedded.iter())
            .cloned()
            .collect()
    }

    /// Add an action, or update it if one with the same id is stored
    ///
    /// A new action is appended to the persisted string as one more token
    /// without re-encoding the rest. An existing one is taken out, the new
    /// version goes to the end of the list, and the list is written again.
    pub fn add(&mut self, action: Action) {
        self.load();
        if let Some(position) = self.position(action.id()) {
            tracing::debug!(action = %action.name(), id = %action.id(), "Updating action");
            self.cache.remove(position);
            self.tokens.remove(position);
            self.tokens.push(codec::encode_one(&action));
            self.cache.push(Some(action));
            self.persist_slots();
        } else {
            let token = codec::encode_one(&action);
            let raw = self.raw();
            let updated = if raw.trim().is_empty() {
                token
            } else {
                format!("{raw}{}{token}", codec::DELIMITER)
            };
            tracing::debug!(action = %action.name(), id = %action.id(), "Appending action");
            self.write(updated);
            self.dirty = true;
            self.views.push(action);
        }
    }

    /// Replace the stored list with `actions`, re-encoding all of them
    pub fn save(&mut self, actions: Vec<Action>) {
        self.tokens = actions.iter().map(codec::encode_one).collect();
        let raw = self.tokens.join(&codec::DELIMITER.to_string());
        self.write(raw);
        self.views = actions.clone();
        self.cache = actions.into_iter().map(Some).collect();
        self.dirty = false;
    }

    /// Re-encode the loaded actions, e.g. after counters changed
    ///
    /// Tokens that did not decode are written back untouched.
    pub fn save_loaded(&mut self) {
        self.persist_slots();
    }

    /// Remove a stored action by identity
    ///
    /// Embedded actions are not stored and cannot be removed.
    pub fn remove(&mut self, action: &Action) -> Result<(), StoreError> {
        self.load();
        let position = self
            .position(action.id())
            .ok_or(StoreError::NotFound { id: action.id() })?;

        self.cache.remove(position);
        self.tokens.remove(position);
        tracing::info!(remaining = self.cache.len(), action = %action, "Removing action");
        self.persist_slots();
        Ok(())
    }

    /// Remove every stored action
    pub fn clear(&mut self) {
        tracing::debug!("Clearing stored actions");
        self.write(String::new());
        self.cache.clear();
        self.tokens.clear();
        self.views.clear();
        self.dirty = false;
    }

    /// Loaded actions, persisted ones first, then embedded ones
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.cache.iter().chain(self.embedded.iter()).flatten()
    }

    pub fn actions_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.cache
            .iter_mut()
            .chain(self.embedded.iter_mut())
            .flatten()
    }

    /// Loaded actions visible under the given capability flags
    pub fn restricted_view(&self, flags: &CapabilityFlags) -> Vec<&Action> {
        let actions: Vec<&Action> = self.actions().collect();
        access::restricted_view(actions.iter().copied(), flags)
    }

    /// The list last published to the editing UI
    pub fn views(&self) -> &[Action] {
        &self.views
    }

    /// A loaded action by id
    pub fn find(&self, id: ActionId) -> Option<&Action> {
        self.actions().find(|a| a.id() == id)
    }

    /// Whether a persisted action with this id is loaded
    pub fn contains(&self, id: ActionId) -> bool {
        self.cache.iter().flatten().any(|a| a.id() == id)
    }

    fn position(&self, id: ActionId) -> Option<usize> {
        self.cache
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|a| a.id() == id))
    }

    /// Write the cache back, keeping the original token of undecoded slots
    fn persist_slots(&mut self) {
        let slots: Vec<(Option<Action>, String)> = mem::take(&mut self.cache)
            .into_iter()
            .zip(mem::take(&mut self.tokens))
            .filter_map(|(slot, token)| match slot {
                Some(action) => {
                    let token = codec::encode_one(&action);
                    Some((Some(action), token))
                }
                // token went with a cleared corrupt list
                None if token.is_empty() => None,
                None => Some((None, token)),
            })
            .collect();
        (self.cache, self.tokens) = slots.into_iter().unzip();
        let raw = self.tokens.join(&codec::DELIMITER.to_string());
        self.write(raw);
        self.views = self.cache.iter().flatten().cloned().collect();
        self.dirty = false;
    }

    fn write(&mut self, raw: String) {
        self.settings.set(INTERNAL_ACTIONS_KEY, raw);
        self.flush();
    }

    fn flush(&mut self) {
        if let Err(err) = self.settings.save() {
            tracing::warn!(error = %err, "Failed to save settings");
        }
    }
}
