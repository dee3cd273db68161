//! Key-bound actions: identity, bound keys, activation counters and payload

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of an action, generated once at creation
pub type ActionId = Uuid;

/// The closed set of action variants
///
/// The kind doubles as the persisted tag and as the capability tag the
/// editing UI uses to pick a control for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Launch one or more applications
    Default,
    /// Run a (possibly multi-line) shell script
    Cmd,
    /// Open one or more websites
    Web,
}

impl ActionKind {
    /// Every kind, in tag order
    pub const ALL: [ActionKind; 3] = [ActionKind::Default, ActionKind::Cmd, ActionKind::Web];

    /// Single-character tag written in front of every persisted token
    pub fn tag(self) -> char {
        match self {
            ActionKind::Default => '0',
            ActionKind::Cmd => '1',
            ActionKind::Web => '2',
        }
    }

    /// Parse a persisted tag
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            '0' => Some(ActionKind::Default),
            '1' => Some(ActionKind::Cmd),
            '2' => Some(ActionKind::Web),
            _ => None,
        }
    }

    /// Numeric form of the tag
    pub fn index(self) -> u8 {
        match self {
            ActionKind::Default => 0,
            ActionKind::Cmd => 1,
            ActionKind::Web => 2,
        }
    }

    /// Inverse of [`ActionKind::index`]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Human-readable name
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Default => "Default",
            ActionKind::Cmd => "CMD",
            ActionKind::Web => "Web",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Variant-specific data of an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Default {
        /// Filesystem paths or executable targets, launched in order
        applications: Vec<String>,
    },
    Cmd {
        /// Script text written to a temporary file on execution
        command: String,
        /// Run without a visible window
        is_hidden: bool,
    },
    Web {
        /// URLs or bare hosts; a missing scheme is fixed up on execution
        websites: Vec<String>,
    },
}

impl Payload {
    /// Empty payload for a kind
    pub fn empty(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Default => Payload::Default {
                applications: Vec::new(),
            },
            ActionKind::Cmd => Payload::Cmd {
                command: String::new(),
                is_hidden: true,
            },
            ActionKind::Web => Payload::Web {
                websites: Vec::new(),
            },
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Payload::Default { .. } => ActionKind::Default,
            Payload::Cmd { .. } => ActionKind::Cmd,
            Payload::Web { .. } => ActionKind::Web,
        }
    }

    /// Size figure shown in summaries: item count, or command length for Cmd
    pub fn size(&self) -> usize {
        match self {
            Payload::Default { applications } => applications.len(),
            Payload::Cmd { command, .. } => command.len(),
            Payload::Web { websites } => websites.len(),
        }
    }
}

/// A user-configured, key-triggered behavior
///
/// Equality and hashing look at [`Action::id`] only: two actions with the
/// same payload but different ids are different actions, and an edited copy
/// of an action is still the same action.
#[derive(Debug, Clone)]
pub struct Action {
    id: ActionId,
    name: String,
    keys: Vec<String>,
    activation_counts: Vec<u32>,
    is_locked: bool,
    payload: Payload,
}

impl Action {
    /// Create an action of the given kind with a fresh id and an empty payload
    pub fn new(kind: ActionKind, name: impl Into<String>) -> Self {
        Self::with_payload(name, Payload::empty(kind))
    }

    /// Create an action with a fresh id around an existing payload
    pub fn with_payload(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            keys: Vec::new(),
            activation_counts: Vec::new(),
            is_locked: false,
            payload,
        }
    }

    pub fn new_default(name: impl Into<String>, applications: Vec<String>) -> Self {
        Self::with_payload(name, Payload::Default { applications })
    }

    pub fn new_cmd(name: impl Into<String>, command: impl Into<String>, is_hidden: bool) -> Self {
        Self::with_payload(
            name,
            Payload::Cmd {
                command: command.into(),
                is_hidden,
            },
        )
    }

    pub fn new_web(name: impl Into<String>, websites: Vec<String>) -> Self {
        Self::with_payload(name, Payload::Web { websites })
    }

    /// Rebuild an action with a known identity
    ///
    /// Counters are padded so that every key has one.
    pub fn restore(
        id: ActionId,
        name: String,
        keys: Vec<String>,
        activation_counts: Vec<u32>,
        is_locked: bool,
        payload: Payload,
    ) -> Self {
        let mut action = Self {
            id,
            name,
            keys,
            activation_counts,
            is_locked,
            payload,
        };
        action.pad_activation_counts();
        action
    }

    /// Builder-style key binding, see [`Action::set_keys`]
    pub fn bound_to<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.set_keys(keys);
        self
    }

    /// Switch to another kind, keeping identity, name, keys, counters and lock
    ///
    /// The payload is reset to the new kind's empty payload. Converting to the
    /// current kind keeps the payload.
    pub fn convert(mut self, kind: ActionKind) -> Self {
        if self.kind() != kind {
            self.payload = Payload::empty(kind);
        }
        self
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    /// The control binding the editing UI uses for this action
    pub fn view_kind(&self) -> ActionKind {
        self.kind()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Advisory "not user-editable" flag; enforcement is up to the editor
    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.is_locked = locked;
    }

    /// Bound key names, in binding order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Replace the bound keys
    ///
    /// Keys are normalized to lowercase. Existing counters stay index-aligned
    /// and are never trimmed; new positions start at zero.
    pub fn set_keys<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.keys = keys
            .into_iter()
            .map(|k| crate::keys::normalize_key_name(k.as_ref()))
            .collect();
        self.pad_activation_counts();
    }

    /// Bind one more key with a zero counter
    ///
    /// Duplicates are accepted; only the first occurrence ever counts.
    pub fn add_key(&mut self, key: &str) {
        self.keys.push(crate::keys::normalize_key_name(key));
        self.pad_activation_counts();
    }

    /// Position of an already-normalized key name
    pub fn key_index(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn is_bound_to(&self, key: &str) -> bool {
        self.key_index(&crate::keys::normalize_key_name(key)).is_some()
    }

    /// Per-key activation counters, index-aligned with [`Action::keys`]
    pub fn activation_counts(&self) -> &[u32] {
        &self.activation_counts
    }

    /// Replace the counters; they are padded back up to the key count
    pub fn set_activation_counts(&mut self, counts: Vec<u32>) {
        self.activation_counts = counts;
        self.pad_activation_counts();
    }

    /// Counter for a key, or `None` if the key is not bound
    pub fn activation_count(&self, key: &str) -> Option<u32> {
        let index = self.key_index(&crate::keys::normalize_key_name(key))?;
        self.activation_counts.get(index).copied()
    }

    pub fn total_activations(&self) -> u64 {
        self.activation_counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// Count one activation of the key at `index`
    pub fn record_activation(&mut self, index: usize) {
        if index >= self.activation_counts.len() {
            self.activation_counts.resize(index + 1, 0);
        }
        self.activation_counts[index] = self.activation_counts[index].saturating_add(1);
    }

    /// Ensure `activation_counts.len() >= keys.len()`
    pub(crate) fn pad_activation_counts(&mut self) {
        if self.activation_counts.len() < self.keys.len() {
            self.activation_counts.resize(self.keys.len(), 0);
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    /// Replace the payload, possibly changing the kind
    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// Human-readable summary
    ///
    /// Cmd actions only report the length of their command text.
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Action {}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Keys[{}] Act#[{}] ",
            self.name,
            self.keys.len(),
            self.activation_counts.len()
        )?;
        match &self.payload {
            Payload::Default { applications } => write!(f, "Apps#[{}]", applications.len()),
            Payload::Cmd { command, .. } => write!(f, "CommandLen[{}]", command.len()),
            Payload::Web { websites } => write!(f, "Site#[{}]", websites.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_tag(kind.tag()), Some(kind));
            assert_eq!(ActionKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(ActionKind::from_tag('3'), None);
        assert_eq!(ActionKind::Cmd.label(), "CMD");
    }

    #[test]
    fn test_equality_is_identity_only() {
        let a = Action::new_web("sites", vec!["example.com".into()]);
        let same_payload = Action::new_web("sites", vec!["example.com".into()]);
        assert_ne!(a, same_payload);

        let mut edited = a.clone();
        edited.set_name("renamed");
        edited.set_payload(Payload::empty(ActionKind::Cmd));
        assert_eq!(a, edited);
    }

    #[test]
    fn test_set_keys_lowercases_and_pads() {
        let mut action = Action::new(ActionKind::Default, "apps");
        action.set_keys(["A", " F5 "]);
        assert_eq!(action.keys(), ["a", "f5"]);
        assert_eq!(action.activation_counts(), [0, 0]);

        action.record_activation(1);
        action.set_keys(["a"]);
        // counters are never trimmed
        assert_eq!(action.activation_counts(), [0, 1]);
    }

    #[test]
    fn test_add_key_keeps_duplicates() {
        let mut action = Action::new(ActionKind::Cmd, "cmd");
        action.add_key("x");
        action.add_key("X");
        assert_eq!(action.keys(), ["x", "x"]);
        assert_eq!(action.activation_counts().len(), 2);
        assert_eq!(action.key_index("x"), Some(0));
    }

    #[test]
    fn test_record_activation() {
        let mut action = Action::new(ActionKind::Web, "web").bound_to(["a", "b"]);
        action.record_activation(1);
        action.record_activation(1);
        assert_eq!(action.activation_count("B"), Some(2));
        assert_eq!(action.activation_count("a"), Some(0));
        assert_eq!(action.activation_count("z"), None);
        assert_eq!(action.total_activations(), 2);
    }

    #[test]
    fn test_restore_pads_counters() {
        let id = Uuid::new_v4();
        let action = Action::restore(
            id,
            "restored".into(),
            vec!["a".into(), "b".into(), "c".into()],
            vec![4],
            true,
            Payload::empty(ActionKind::Default),
        );
        assert_eq!(action.id(), id);
        assert_eq!(action.activation_counts(), [4, 0, 0]);
        assert!(action.is_locked());
    }

    #[test]
    fn test_convert_keeps_identity() {
        let action = Action::new_default("apps", vec!["notepad".into()]).bound_to(["n"]);
        let converted = action.clone().convert(ActionKind::Web);
        assert_eq!(converted, action);
        assert_eq!(converted.kind(), ActionKind::Web);
        assert_eq!(converted.keys(), ["n"]);
        assert_eq!(converted.payload(), &Payload::Web { websites: vec![] });

        let unchanged = action.clone().convert(ActionKind::Default);
        assert_eq!(unchanged.payload(), action.payload());
    }

    #[test]
    fn test_new_cmd_action_is_hidden_by_default() {
        let action = Action::new(ActionKind::Cmd, "script");
        assert_eq!(
            action.payload(),
            &Payload::Cmd {
                command: String::new(),
                is_hidden: true
            }
        );
    }

    #[test]
    fn test_display_string() {
        let apps = Action::new_default("apps", vec!["a".into(), "b".into()]).bound_to(["x"]);
        assert_eq!(apps.to_display_string(), "apps Keys[1] Act#[1] Apps#[2]");

        let cmd = Action::new_cmd("secret", "echo hunter2", true);
        let shown = cmd.to_display_string();
        assert_eq!(shown, "secret Keys[0] Act#[0] CommandLen[12]");
        assert!(!shown.contains("hunter2"));

        let web = Action::new_web("web", vec!["example.com".into()]);
        assert_eq!(web.to_display_string(), "web Keys[0] Act#[0] Site#[1]");
    }
}
