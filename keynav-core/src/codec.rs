//! Persisted encoding of actions
//!
//! A list of actions is stored as a single string: one token per action,
//! joined by [`DELIMITER`]. A token is the action's [tag](ActionKind::tag)
//! followed by the standard base64 encoding of a binary blob.
//!
//! # Blob layout
//!
//! All integers are little-endian. A `str` is a `u32` byte length followed
//! by UTF-8 bytes, a `list<T>` is a `u32` count followed by the items.
//!
//! ```text
//! u8         format version (FORMAT_VERSION)
//! u8         kind index (0 Default, 1 Cmd, 2 Web)
//! [u8; 16]   id
//! str        name
//! u8         is_locked
//! list<str>  keys
//! list<u32>  activation counts
//! payload    Default: list<str> applications
//!            Cmd:     str command, u8 is_hidden
//!            Web:     list<str> websites
//! ```
//!
//! The kind byte inside the blob must agree with the token's tag; a token
//! whose tag and content disagree is rejected rather than coerced.

use base64::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use crate::action::{Action, ActionKind, Payload};

/// Separator between tokens in the persisted string
pub const DELIMITER: char = '|';

/// Version byte written at the start of every blob
pub const FORMAT_VERSION: u8 = 1;

/// Why a token could not be turned back into an action
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty token")]
    EmptyToken,

    #[error("unknown action tag {0:?}")]
    UnknownTag(char),

    /// The text after the tag is not valid base64 at all
    #[error("token is not validly framed: {0}")]
    Framing(#[from] base64::DecodeError),

    #[error("unsupported blob format version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown action kind {0} in blob")]
    UnknownKind(u8),

    #[error("tag {tag:?} does not match {kind} blob")]
    TagMismatch { tag: char, kind: ActionKind },

    #[error("blob truncated: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("blob contains invalid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("{0} unexpected trailing bytes in blob")]
    TrailingBytes(usize),
}

impl DecodeError {
    /// Framing failures mean the stored string itself is corrupt, not just one action
    pub fn is_framing(&self) -> bool {
        matches!(self, DecodeError::Framing(_))
    }
}

/// Encode one action as a tag-prefixed token
pub fn encode_one(action: &Action) -> String {
    let mut token = String::new();
    token.push(action.kind().tag());
    BASE64_STANDARD.encode_string(encode_blob(action), &mut token);
    token
}

/// Decode one tag-prefixed token
pub fn decode_one(token: &str) -> Result<Action, DecodeError> {
    let mut chars = token.chars();
    let tag = chars.next().ok_or(DecodeError::EmptyToken)?;
    let tagged = ActionKind::from_tag(tag).ok_or(DecodeError::UnknownTag(tag))?;

    let blob = BASE64_STANDARD.decode(chars.as_str())?;
    let action = decode_blob(&blob)?;
    if action.kind() != tagged {
        return Err(DecodeError::TagMismatch {
            tag,
            kind: action.kind(),
        });
    }
    Ok(action)
}

/// Encode a list of actions; an empty list is the empty string
pub fn encode_list<'a, I>(actions: I) -> String
where
    I: IntoIterator<Item = &'a Action>,
{
    let mut out = String::new();
    for (i, action) in actions.into_iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(&encode_one(action));
    }
    out
}

/// Non-empty fragments of a persisted string
///
/// Empty fragments (doubled or trailing delimiters) are skipped.
pub fn fragments(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(DELIMITER).filter(|fragment| !fragment.is_empty())
}

/// Number of tokens a persisted string holds
pub fn fragment_count(raw: &str) -> usize {
    if raw.trim().is_empty() {
        0
    } else {
        fragments(raw).count()
    }
}

/// Decode every fragment, keeping the error for those that fail
pub fn decode_fragments(raw: &str) -> Vec<Result<Action, DecodeError>> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    fragments(raw).map(decode_one).collect()
}

/// Decode a persisted string
///
/// A fragment that cannot be decoded leaves a `None` in its slot, so the
/// output has one entry per non-empty fragment.
pub fn decode_list(raw: &str) -> Vec<Option<Action>> {
    decode_fragments(raw)
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(action) => Some(action),
            Err(err) => {
                tracing::warn!(index, error = %err, "Failed to decode stored action");
                None
            }
        })
        .collect()
}

fn encode_blob(action: &Action) -> Vec<u8> {
    let mut w = BlobWriter::default();
    w.u8(FORMAT_VERSION);
    w.u8(action.kind().index());
    w.bytes(action.id().as_bytes());
    w.str(action.name());
    w.bool(action.is_locked());
    w.str_list(action.keys());
    w.u32(action.activation_counts().len() as u32);
    for &count in action.activation_counts() {
        w.u32(count);
    }
    match action.payload() {
        Payload::Default { applications } => w.str_list(applications),
        Payload::Cmd { command, is_hidden } => {
            w.str(command);
            w.bool(*is_hidden);
        }
        Payload::Web { websites } => w.str_list(websites),
    }
    w.into_inner()
}

fn decode_blob(blob: &[u8]) -> Result<Action, DecodeError> {
    let mut r = BlobReader::new(blob);

    let version = r.u8()?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let kind_index = r.u8()?;
    let kind = ActionKind::from_index(kind_index).ok_or(DecodeError::UnknownKind(kind_index))?;

    let id = Uuid::from_bytes(r.array()?);
    let name = r.str()?;
    let is_locked = r.bool()?;
    let keys = r.str_list()?;
    let count_len = r.len()?;
    let mut counts = Vec::new();
    for _ in 0..count_len {
        counts.push(r.u32()?);
    }

    let payload = match kind {
        ActionKind::Default => Payload::Default {
            applications: r.str_list()?,
        },
        ActionKind::Cmd => Payload::Cmd {
            command: r.str()?,
            is_hidden: r.bool()?,
        },
        ActionKind::Web => Payload::Web {
            websites: r.str_list()?,
        },
    };

    if r.remaining() > 0 {
        return Err(DecodeError::TrailingBytes(r.remaining()));
    }

    Ok(Action::restore(id, name, keys, counts, is_locked, payload))
}

#[derive(Default)]
struct BlobWriter {
    buf: Vec<u8>,
}

impl BlobWriter {
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    fn str(&mut self, v: &str) {
        self.u32(v.len() as u32);
        self.bytes(v.as_bytes());
    }

    fn str_list(&mut self, items: &[String]) {
        self.u32(items.len() as u32);
        for item in items {
            self.str(item);
        }
    }

    fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

struct BlobReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BlobReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < needed {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.u8()? != 0)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn len(&mut self) -> Result<usize, DecodeError> {
        Ok(self.u32()? as usize)
    }

    fn str(&mut self) -> Result<String, DecodeError> {
        let len = self.len()?;
        let bytes = self.take(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn str_list(&mut self) -> Result<Vec<String>, DecodeError> {
        let count = self.len()?;
        // Every item needs at least its length prefix, so a corrupt count
        // fails on the read instead of on the allocation.
        let mut items = Vec::with_capacity(count.min(self.remaining() / 4));
        for _ in 0..count {
            items.push(self.str()?);
        }
        Ok(items)
    }
}
