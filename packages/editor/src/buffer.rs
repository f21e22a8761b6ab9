//! Text buffer collaborator.
//!
//! The model never owns the text; it reads the whole buffer during
//! prepare and replaces the whole buffer on flush. Buffer listeners see
//! the concrete delta a flush applied, so a hosting editor can bracket
//! it into one compound edit of its own history.

use xylem_common::CommonResult;

/// The textual change a flush applied to a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    /// Byte offset where old and new text first differ.
    pub offset: usize,
    pub removed: String,
    pub inserted: String,
}

pub trait Buffer: Send {
    /// Current buffer text.
    fn text(&self) -> CommonResult<String>;

    /// Replace the whole buffer text.
    fn replace(&mut self, text: &str) -> CommonResult<()>;
}

pub trait BufferListener: Send {
    fn on_delta(&self, delta: &TextDelta);
}

/// Handle for unregistering a buffer listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// In-memory buffer for tests and standalone use.
pub struct MemoryBuffer {
    text: String,
    listeners: Vec<(ListenerId, Box<dyn BufferListener>)>,
    next_listener: u64,
}

impl MemoryBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn BufferListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(l, _)| *l != id);
    }
}

impl Buffer for MemoryBuffer {
    fn text(&self) -> CommonResult<String> {
        Ok(self.text.clone())
    }

    fn replace(&mut self, text: &str) -> CommonResult<()> {
        if text != self.text {
            let delta = delta_between(&self.text, text);
            self.text = text.to_string();
            for (_, listener) in &self.listeners {
                listener.on_delta(&delta);
            }
        }
        Ok(())
    }
}

/// Minimal delta: strip the common prefix and suffix, report the middle.
fn delta_between(old: &str, new: &str) -> TextDelta {
    let prefix = old
        .as_bytes()
        .iter()
        .zip(new.as_bytes())
        .take_while(|(a, b)| a == b)
        .count();
    // Keep the prefix split on a char boundary.
    let prefix = (0..=prefix).rev().find(|&i| old.is_char_boundary(i) && new.is_char_boundary(i)).unwrap_or(0);

    let old_rest = &old[prefix..];
    let new_rest = &new[prefix..];
    let suffix = old_rest
        .as_bytes()
        .iter()
        .rev()
        .zip(new_rest.as_bytes().iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = (0..=suffix)
        .rev()
        .find(|&i| {
            old_rest.is_char_boundary(old_rest.len() - i) && new_rest.is_char_boundary(new_rest.len() - i)
        })
        .unwrap_or(0);

    TextDelta {
        offset: prefix,
        removed: old_rest[..old_rest.len() - suffix].to_string(),
        inserted: new_rest[..new_rest.len() - suffix].to_string(),
    }
}
