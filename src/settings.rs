//! Voice settings with a global layer and per-book overrides.
//!
//! Layers are free-form JSON objects so unknown keys written by newer
//! versions survive a round trip. Resolution merges key by key:
//! defaults, then the global layer, then the book's layer.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Result;
use crate::library::BookId;

/// Speech parameters applied to each utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub rate: f32,
    pub pitch: f32,
    /// Synthesizer voice identifier; `None` uses the platform default.
    pub voice: Option<String>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            voice: None,
        }
    }
}

/// Which layer a patch is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingScope {
    Global,
    Book(BookId),
}

pub type Layer = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsLayers {
    global: Layer,
    books: BTreeMap<BookId, Layer>,
}

impl SettingsLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load layers from a JSON file. A missing file gives empty layers.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Self::from_json(&text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Parse stored layers. Malformed JSON yields empty layers.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(layers) => layers,
            Err(e) => {
                warn!(error = %e, "ignoring malformed settings");
                Self::default()
            }
        }
    }

    pub fn layer(&self, scope: SettingScope) -> Option<&Layer> {
        match scope {
            SettingScope::Global => Some(&self.global),
            SettingScope::Book(id) => self.books.get(&id),
        }
    }

    /// Replace one layer from its stored JSON text. Anything other than a
    /// JSON object is stored as an empty layer.
    pub fn set_layer_json(&mut self, scope: SettingScope, stored: &str) {
        let layer = match serde_json::from_str::<Value>(stored) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(?scope, "ignoring malformed settings layer");
                Layer::new()
            }
        };
        *self.layer_mut(scope) = layer;
    }

    /// Shallow-merge `patch` into one layer; later keys win.
    pub fn patch(&mut self, scope: SettingScope, patch: Layer) {
        self.layer_mut(scope).extend(patch);
    }

    /// Write the given settings into a layer.
    pub fn patch_voice(&mut self, scope: SettingScope, voice: &VoiceSettings) -> Result<()> {
        if let Value::Object(map) = serde_json::to_value(voice)? {
            self.patch(scope, map);
        }
        Ok(())
    }

    /// Effective settings for a book, or global settings for `None`.
    ///
    /// A layer whose values do not fit [`VoiceSettings`] is skipped.
    pub fn resolve(&self, book: Option<BookId>) -> VoiceSettings {
        let mut merged = match serde_json::to_value(VoiceSettings::default()) {
            Ok(Value::Object(map)) => map,
            _ => Layer::new(),
        };

        let book_layer = book.and_then(|id| self.books.get(&id));
        for layer in std::iter::once(&self.global).chain(book_layer) {
            let mut candidate = merged.clone();
            candidate.extend(layer.clone());
            if serde_json::from_value::<VoiceSettings>(Value::Object(candidate.clone())).is_ok() {
                merged = candidate;
            } else {
                warn!("ignoring settings layer with invalid values");
            }
        }

        serde_json::from_value(Value::Object(merged)).unwrap_or_default()
    }

    fn layer_mut(&mut self, scope: SettingScope) -> &mut Layer {
        match scope {
            SettingScope::Global => &mut self.global,
            SettingScope::Book(id) => self.books.entry(id).or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn layer(value: Value) -> Layer {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SettingsLayers::new().resolve(None), VoiceSettings::default());
        assert_eq!(SettingsLayers::new().resolve(Some(BookId(1))), VoiceSettings::default());
    }

    #[test]
    fn test_book_overrides_global() {
        let mut settings = SettingsLayers::new();
        settings.patch(SettingScope::Global, layer(json!({"rate": 1.5, "voice": "alice"})));
        settings.patch(SettingScope::Book(BookId(7)), layer(json!({"rate": 0.8})));

        let global = settings.resolve(None);
        assert_eq!((global.rate, global.pitch, global.voice.as_deref()), (1.5, 1.0, Some("alice")));

        let book = settings.resolve(Some(BookId(7)));
        assert_eq!((book.rate, book.voice.as_deref()), (0.8, Some("alice")));

        // Other books only see the global layer.
        assert_eq!(settings.resolve(Some(BookId(8))).rate, 1.5);
    }

    #[test]
    fn test_patch_is_shallow_merge() {
        let mut settings = SettingsLayers::new();
        settings.patch(SettingScope::Global, layer(json!({"rate": 2.0, "pitch": 0.5})));
        settings.patch(SettingScope::Global, layer(json!({"pitch": 1.2})));

        let resolved = settings.resolve(None);
        assert_eq!((resolved.rate, resolved.pitch), (2.0, 1.2));
    }

    #[test]
    fn test_malformed_layers_are_empty() {
        let mut settings = SettingsLayers::new();
        settings.set_layer_json(SettingScope::Global, "{not json");
        settings.set_layer_json(SettingScope::Book(BookId(1)), "[1, 2]");
        assert_eq!(settings.layer(SettingScope::Global), Some(&Layer::new()));
        assert_eq!(settings.resolve(Some(BookId(1))), VoiceSettings::default());

        assert_eq!(SettingsLayers::from_json("nope"), SettingsLayers::default());
    }

    #[test]
    fn test_invalid_values_skip_layer() {
        let mut settings = SettingsLayers::new();
        settings.patch(SettingScope::Global, layer(json!({"rate": 1.25})));
        settings.patch(SettingScope::Book(BookId(2)), layer(json!({"rate": "fast"})));
        assert_eq!(settings.resolve(Some(BookId(2))).rate, 1.25);
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let mut settings = SettingsLayers::new();
        settings.patch(SettingScope::Global, layer(json!({"theme": "dark", "rate": 1.1})));
        let text = serde_json::to_string(&settings).unwrap();
        let restored = SettingsLayers::from_json(&text);
        assert_eq!(restored, settings);
        assert_eq!(restored.resolve(None).rate, 1.1);
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(SettingsLayers::load(&path).unwrap(), SettingsLayers::default());

        let mut settings = SettingsLayers::new();
        settings
            .patch_voice(
                SettingScope::Book(BookId(3)),
                &VoiceSettings {
                    rate: 0.9,
                    pitch: 1.1,
                    voice: Some("bob".into()),
                },
            )
            .unwrap();
        settings.save(&path).unwrap();

        let loaded = SettingsLayers::load(&path).unwrap();
        assert_eq!(loaded.resolve(Some(BookId(3))).voice.as_deref(), Some("bob"));
    }
}
