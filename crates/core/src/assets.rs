//! Reference asset slots (face, outfit, background).
//!
//! An [`AssetBag`] is a fixed-shape record with one optional slot per
//! [`AssetKey`]. It feeds both the initial model generation and the
//! per-edit reference images.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::image_asset::ImageAsset;

/// The closed set of reference slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKey {
    Face,
    Outfit,
    Background,
}

impl AssetKey {
    /// All keys, in display order.
    pub const ALL: [AssetKey; 3] = [AssetKey::Face, AssetKey::Outfit, AssetKey::Background];

    /// Lowercase name used in URLs, prompts and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKey::Face => "face",
            AssetKey::Outfit => "outfit",
            AssetKey::Background => "background",
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid asset key '{s}'. Must be one of: face, outfit, background"
                ))
            })
    }
}

/// One optional image per [`AssetKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    face: Option<ImageAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    outfit: Option<ImageAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    background: Option<ImageAsset>,
}

impl AssetBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `asset` under `key`, replacing any previous asset.
    pub fn set(&mut self, key: AssetKey, asset: ImageAsset) {
        *self.slot_mut(key) = Some(asset);
    }

    /// Remove the asset under `key`; no-op when absent.
    pub fn remove(&mut self, key: AssetKey) {
        *self.slot_mut(key) = None;
    }

    pub fn get(&self, key: AssetKey) -> Option<&ImageAsset> {
        match key {
            AssetKey::Face => self.face.as_ref(),
            AssetKey::Outfit => self.outfit.as_ref(),
            AssetKey::Background => self.background.as_ref(),
        }
    }

    pub fn contains(&self, key: AssetKey) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        AssetKey::ALL.into_iter().filter(|k| self.contains(*k)).count()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Populated slots in [`AssetKey::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (AssetKey, &ImageAsset)> {
        AssetKey::ALL
            .into_iter()
            .filter_map(move |key| self.get(key).map(|asset| (key, asset)))
    }

    fn slot_mut(&mut self, key: AssetKey) -> &mut Option<ImageAsset> {
        match key {
            AssetKey::Face => &mut self.face,
            AssetKey::Outfit => &mut self.outfit,
            AssetKey::Background => &mut self.background,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(payload: &str) -> ImageAsset {
        ImageAsset::from_base64("image/png", payload).unwrap()
    }

    #[test]
    fn new_bag_is_empty() {
        let bag = AssetBag::new();
        assert!(bag.is_empty());
        assert_eq!(bag.len(), 0);
        assert_eq!(bag.iter().count(), 0);
    }

    #[test]
    fn set_replaces_existing_asset() {
        let mut bag = AssetBag::new();
        bag.set(AssetKey::Face, asset("AAAA"));
        bag.set(AssetKey::Face, asset("BBBB"));
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.get(AssetKey::Face), Some(&asset("BBBB")));
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut bag = AssetBag::new();
        bag.set(AssetKey::Outfit, asset("AAAA"));
        bag.remove(AssetKey::Background);
        assert_eq!(bag.len(), 1);
        bag.remove(AssetKey::Outfit);
        assert!(bag.is_empty());
    }

    #[test]
    fn iter_follows_fixed_key_order() {
        let mut bag = AssetBag::new();
        bag.set(AssetKey::Background, asset("CCCC"));
        bag.set(AssetKey::Face, asset("AAAA"));
        let keys: Vec<_> = bag.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![AssetKey::Face, AssetKey::Background]);
    }

    #[test]
    fn clear_empties_every_slot() {
        let mut bag = AssetBag::new();
        for key in AssetKey::ALL {
            bag.set(key, asset("AAAA"));
        }
        assert_eq!(bag.len(), 3);
        bag.clear();
        assert!(bag.is_empty());
    }

    #[test]
    fn asset_key_parses_lowercase_names() {
        assert_eq!("face".parse::<AssetKey>().unwrap(), AssetKey::Face);
        assert_eq!("background".parse::<AssetKey>().unwrap(), AssetKey::Background);
        let err = "hat".parse::<AssetKey>().unwrap_err();
        assert!(err.to_string().contains("hat"));
    }

    #[test]
    fn empty_slots_are_omitted_from_json() {
        let mut bag = AssetBag::new();
        bag.set(AssetKey::Face, asset("AAAA"));
        let json = serde_json::to_value(&bag).unwrap();
        assert_eq!(json["face"], "data:image/png;base64,AAAA");
        assert!(json.get("outfit").is_none());
    }
}
