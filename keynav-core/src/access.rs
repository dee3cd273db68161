//! Capability flags and the restricted view of actions
//!
//! The host supplies a fixed-order boolean vector. Three positions gate
//! whether actions of a kind may be viewed at all:
//!
//! | index | meaning               |
//! |-------|-----------------------|
//! | 1     | can view Default      |
//! | 3     | can view Cmd          |
//! | 5     | can view Web          |
//!
//! The other positions belong to the host and are carried through untouched.
//!
//! # Example
//!
//! ```
//! use keynav_core::{Action, ActionKind, CapabilityFlags};
//! use keynav_core::access::restricted_view;
//!
//! let actions = vec![
//!     Action::new(ActionKind::Default, "apps"),
//!     Action::new(ActionKind::Cmd, "script"),
//! ];
//!
//! let mut flags = CapabilityFlags::default();
//! flags.set_can_view(ActionKind::Cmd, false);
//!
//! let visible = restricted_view(&actions, &flags);
//! assert_eq!(visible.len(), 1);
//! assert_eq!(visible[0].kind(), ActionKind::Default);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionId, ActionKind};

/// Number of flags in a full capability vector
pub const FLAG_COUNT: usize = 6;

pub const VIEW_DEFAULT: usize = 1;
pub const VIEW_CMD: usize = 3;
pub const VIEW_WEB: usize = 5;

/// Externally supplied capability vector
///
/// A vector shorter than a view index treats that kind as viewable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityFlags {
    flags: Vec<bool>,
}

impl Default for CapabilityFlags {
    fn default() -> Self {
        Self {
            flags: vec![true; FLAG_COUNT],
        }
    }
}

impl From<Vec<bool>> for CapabilityFlags {
    fn from(flags: Vec<bool>) -> Self {
        Self { flags }
    }
}

impl CapabilityFlags {
    pub fn new(flags: Vec<bool>) -> Self {
        Self { flags }
    }

    /// Raw flag at a position, `None` past the end
    pub fn get(&self, index: usize) -> Option<bool> {
        self.flags.get(index).copied()
    }

    /// Set a raw flag, growing the vector with `true` if needed
    pub fn set(&mut self, index: usize, enabled: bool) {
        if index >= self.flags.len() {
            self.flags.resize(index + 1, true);
        }
        self.flags[index] = enabled;
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.flags
    }

    /// Position of the "can view" flag for a kind
    pub fn view_index(kind: ActionKind) -> usize {
        match kind {
            ActionKind::Default => VIEW_DEFAULT,
            ActionKind::Cmd => VIEW_CMD,
            ActionKind::Web => VIEW_WEB,
        }
    }

    pub fn can_view(&self, kind: ActionKind) -> bool {
        self.get(Self::view_index(kind)).unwrap_or(true)
    }

    pub fn set_can_view(&mut self, kind: ActionKind, enabled: bool) {
        self.set(Self::view_index(kind), enabled);
    }

    /// Kinds whose actions are hidden under these flags
    pub fn hidden_kinds(&self) -> impl Iterator<Item = ActionKind> + '_ {
        ActionKind::ALL
            .into_iter()
            .filter(move |kind| !self.can_view(*kind))
    }
}

/// Ids of every action hidden under the given flags
pub fn restricted<'a, I>(actions: I, flags: &CapabilityFlags) -> HashSet<ActionId>
where
    I: IntoIterator<Item = &'a Action>,
{
    let hidden: Vec<ActionKind> = flags.hidden_kinds().collect();
    actions
        .into_iter()
        .filter(|action| hidden.contains(&action.kind()))
        .map(Action::id)
        .collect()
}

/// The actions left visible under the given flags, in their original order
pub fn restricted_view<'a, I>(actions: I, flags: &CapabilityFlags) -> Vec<&'a Action>
where
    I: IntoIterator<Item = &'a Action>,
    I::IntoIter: Clone,
{
    let actions = actions.into_iter();
    let hidden = restricted(actions.clone(), flags);
    actions
        .filter(|action| !hidden.contains(&action.id()))
        .collect()
}
