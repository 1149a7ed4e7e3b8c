//! Linear undo/redo history of generated images.
//!
//! [`History`] is a single timeline plus a cursor. Navigation only moves
//! the cursor; appending from anywhere but the tail discards the redo
//! branch first, so there is never more than one future.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::image_asset::ImageAsset;
use crate::types::{ItemId, Timestamp};

/// Label used for edits submitted without prompt text.
pub const IMAGE_EDIT_LABEL: &str = "Image-based edit";

/// Label used for an image uploaded directly instead of generated.
pub const UPLOAD_LABEL: &str = "Initial image";

/// One image state in the history.
///
/// `id` is only for stable list rendering and file names; it takes no part
/// in ordering or equality logic of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: ItemId,
    pub image: ImageAsset,
    /// Prompt text (or a synthetic label) that produced the image.
    pub label: String,
    pub created_at: Timestamp,
}

impl HistoryItem {
    pub fn new(image: ImageAsset, label: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            image,
            label: label.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// File name offered when the image is downloaded.
    pub fn download_file_name(&self) -> String {
        format!("virtual-model-{}.{}", self.id, self.image.file_extension())
    }
}

/// Ordered image states plus a cursor.
///
/// The cursor is `None` exactly when the history is empty; otherwise it is
/// a valid index.
#[derive(Debug, Clone, Default)]
pub struct History {
    items: Vec<HistoryItem>,
    cursor: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every item.
    pub fn reset(&mut self) {
        self.items.clear();
        self.cursor = None;
    }

    /// Start a fresh timeline containing only `item`.
    pub fn replace_all(&mut self, item: HistoryItem) {
        self.items = vec![item];
        self.cursor = Some(0);
    }

    /// Discard everything after the cursor, then append `item` and select it.
    ///
    /// On an empty history this is equivalent to [`replace_all`](Self::replace_all).
    pub fn append_after_cursor(&mut self, item: HistoryItem) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.items.truncate(keep);
        self.items.push(item);
        self.cursor = Some(self.items.len() - 1);
    }

    /// Move the cursor to `index` without touching the sequence.
    pub fn move_to(&mut self, index: usize) -> Result<(), CoreError> {
        if index >= self.items.len() {
            return Err(CoreError::Validation(format!(
                "History index {index} out of range (history has {} items)",
                self.items.len()
            )));
        }
        self.cursor = Some(index);
        Ok(())
    }

    /// Step back one item. Returns `false` when already at the start.
    pub fn undo(&mut self) -> bool {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                true
            }
            _ => false,
        }
    }

    /// Step forward one item. Returns `false` when already at the tail.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor = self.cursor.map(|c| c + 1);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.items.len())
    }

    pub fn current(&self) -> Option<&HistoryItem> {
        self.cursor.and_then(|c| self.items.get(c))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
