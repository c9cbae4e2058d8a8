use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::character::Character;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("could not read character registry `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse character registry: {0}")]
    Parse(String),
    #[error("character registry validation failed: {0}")]
    Validation(String),
    #[error("no character is configured for service `{0}`")]
    UnknownService(String),
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    defaults: Value,
    characters: Vec<Value>,
}

#[derive(Debug)]
struct Snapshot {
    modified: Option<SystemTime>,
    characters: Vec<Character>,
}

/// Owns the parsed character registry. File-backed registries re-read the file when its
/// modification time changes; `reload` forces a re-read.
#[derive(Debug)]
pub struct CharacterRegistry {
    path: Option<PathBuf>,
    snapshot: RwLock<Snapshot>,
}

impl CharacterRegistry {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let snapshot = read_snapshot(&path)?;
        Ok(Self { path: Some(path), snapshot: RwLock::new(snapshot) })
    }

    /// Builds a registry from an in-memory document. `reload` is a no-op for these.
    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let characters = parse_document(raw)?;
        Ok(Self { path: None, snapshot: RwLock::new(Snapshot { modified: None, characters }) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn pick(&self, service: &str) -> Result<Character, RegistryError> {
        self.refresh_if_stale()?;
        self.with_snapshot(|snapshot| {
            snapshot
                .characters
                .iter()
                .find(|character| character.service == service)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownService(service.to_owned()))
        })
    }

    pub fn list(&self) -> Result<Vec<Character>, RegistryError> {
        self.refresh_if_stale()?;
        Ok(self.with_snapshot(|snapshot| snapshot.characters.clone()))
    }

    pub fn services(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.list()?.into_iter().map(|character| character.service).collect())
    }

    /// Re-reads the backing file regardless of its modification time.
    pub fn reload(&self) -> Result<usize, RegistryError> {
        let Some(path) = &self.path else {
            return Ok(self.with_snapshot(|snapshot| snapshot.characters.len()));
        };

        let fresh = read_snapshot(path)?;
        let count = fresh.characters.len();
        self.replace(fresh);
        Ok(count)
    }

    fn refresh_if_stale(&self) -> Result<(), RegistryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let current = modified_at(path)?;
        let cached = self.with_snapshot(|snapshot| snapshot.modified);
        if current.is_some() && current == cached {
            return Ok(());
        }

        let fresh = read_snapshot(path)?;
        self.replace(fresh);
        Ok(())
    }

    fn with_snapshot<T>(&self, read: impl FnOnce(&Snapshot) -> T) -> T {
        match self.snapshot.read() {
            Ok(guard) => read(&guard),
            Err(poisoned) => read(&poisoned.into_inner()),
        }
    }

    fn replace(&self, fresh: Snapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
    }
}

fn modified_at(path: &Path) -> Result<Option<SystemTime>, RegistryError> {
    let metadata = fs::metadata(path)
        .map_err(|source| RegistryError::Read { path: path.to_path_buf(), source })?;
    Ok(metadata.modified().ok())
}

fn read_snapshot(path: &Path) -> Result<Snapshot, RegistryError> {
    let modified = modified_at(path)?;
    let raw = fs::read_to_string(path)
        .map_err(|source| RegistryError::Read { path: path.to_path_buf(), source })?;
    let characters = parse_document(&raw)?;
    Ok(Snapshot { modified, characters })
}

fn parse_document(raw: &str) -> Result<Vec<Character>, RegistryError> {
    let document: RegistryDocument =
        serde_json::from_str(raw).map_err(|error| RegistryError::Parse(error.to_string()))?;

    let characters = document
        .characters
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let merged = deep_merge(&document.defaults, &entry);
            serde_json::from_value::<Character>(merged).map_err(|error| {
                RegistryError::Validation(format!("characters[{index}]: {error}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    validate_characters(&characters)?;
    Ok(characters)
}

/// Objects merge key by key; arrays and scalars from `overlay` replace `base`.
fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                let next = match merged.get(key) {
                    Some(existing) if value.is_object() => deep_merge(existing, value),
                    _ => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, Value::Null) => base.clone(),
        _ => overlay.clone(),
    }
}

fn validate_characters(characters: &[Character]) -> Result<(), RegistryError> {
    if characters.is_empty() {
        return Err(RegistryError::Validation("registry declares no characters".to_owned()));
    }

    let mut services = BTreeSet::new();
    let mut ids = BTreeSet::new();
    for character in characters {
        let label =
            if character.id.is_empty() { character.name.as_str() } else { character.id.as_str() };
        let required = [
            ("id", &character.id),
            ("name", &character.name),
            ("service", &character.service),
            ("persona", &character.persona),
            ("tone", &character.tone),
            ("language.primary", &character.language.primary),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(RegistryError::Validation(format!(
                "character `{label}` is missing required field `{field}`"
            )));
        }

        if !ids.insert(character.id.as_str()) {
            return Err(RegistryError::Validation(format!(
                "character id `{}` is declared more than once",
                character.id
            )));
        }
        if !services.insert(character.service.as_str()) {
            return Err(RegistryError::Validation(format!(
                "service `{}` has more than one character",
                character.service
            )));
        }

        if character.eq.detection.is_empty() {
            return Err(RegistryError::Validation(format!(
                "character `{label}` must declare eq.detection keywords"
            )));
        }
        if let Some(signal) =
            character.eq.modulation.keys().find(|signal| !character.eq.detection.contains(signal))
        {
            return Err(RegistryError::Validation(format!(
                "character `{label}` modulates undeclared signal `{signal}`"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::thread;
    use std::time::Duration;

    use serde_json::json;
    use tempfile::TempDir;

    use super::{deep_merge, CharacterRegistry, RegistryError};

    fn registry_json(painting_tone: &str) -> String {
        json!({
            "defaults": {
                "tone": "calm and practical",
                "language": { "primary": "English", "secondary": ["Hindi"], "locale": "en-IN" },
                "guardrails": ["Never quote exact prices"]
            },
            "characters": [
                {
                    "id": "solar-asha",
                    "name": "Asha Rao - Solar Advisor",
                    "service": "solar_services",
                    "persona": "Rooftop solar specialist",
                    "language": { "openingPhrases": ["Namaste! Let's plan your solar setup."] },
                    "eq": {
                        "detection": ["worried", "confused"],
                        "empathyPhrases": ["I understand, let's take it step by step."],
                        "modulation": { "worried": "reassure" }
                    }
                },
                {
                    "id": "painting-meera",
                    "name": "Meera",
                    "service": "painting",
                    "persona": "Colour consultant",
                    "tone": painting_tone,
                    "language": { "secondary": ["Kannada"] },
                    "eq": { "detection": ["excited"] }
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn defaults_are_deep_merged_into_characters() {
        let registry = CharacterRegistry::from_json(&registry_json("bright")).expect("registry");

        let solar = registry.pick("solar_services").expect("solar character");
        assert_eq!(solar.tone, "calm and practical");
        assert_eq!(solar.language.primary, "English");
        assert_eq!(solar.language.secondary, vec!["Hindi".to_owned()]);
        assert_eq!(solar.opening_phrase(), "Namaste! Let's plan your solar setup.");
        assert_eq!(solar.guardrails, vec!["Never quote exact prices".to_owned()]);

        let painting = registry.pick("painting").expect("painting character");
        assert_eq!(painting.tone, "bright");
        assert_eq!(painting.language.secondary, vec!["Kannada".to_owned()]);
        assert_eq!(painting.language.locale, "en-IN");
    }

    #[test]
    fn unknown_service_is_reported() {
        let registry = CharacterRegistry::from_json(&registry_json("bright")).expect("registry");
        let error = registry.pick("irrigation").expect_err("no irrigation character");
        assert!(matches!(error, RegistryError::UnknownService(ref service) if service == "irrigation"));
    }

    #[test]
    fn missing_eq_is_rejected_at_load() {
        let raw = json!({
            "characters": [{
                "id": "x", "name": "X", "service": "painting", "persona": "p", "tone": "t",
                "language": { "primary": "English" }
            }]
        })
        .to_string();

        let error = CharacterRegistry::from_json(&raw).expect_err("eq is required");
        assert!(matches!(error, RegistryError::Validation(ref message) if message.contains("eq")));
    }

    #[test]
    fn duplicate_service_is_rejected() {
        let raw = json!({
            "defaults": { "tone": "t", "persona": "p", "language": { "primary": "English" },
                          "eq": { "detection": ["worried"] } },
            "characters": [
                { "id": "a", "name": "A", "service": "painting" },
                { "id": "b", "name": "B", "service": "painting" }
            ]
        })
        .to_string();

        let error = CharacterRegistry::from_json(&raw).expect_err("duplicate service");
        assert!(error.to_string().contains("more than one character"));
    }

    #[test]
    fn modulation_must_reference_declared_signal() {
        let raw = json!({
            "characters": [{
                "id": "x", "name": "X", "service": "painting", "persona": "p", "tone": "t",
                "language": { "primary": "English" },
                "eq": { "detection": ["worried"], "modulation": { "angry": "calm" } }
            }]
        })
        .to_string();

        let error = CharacterRegistry::from_json(&raw).expect_err("undeclared signal");
        assert!(error.to_string().contains("angry"));
    }

    #[test]
    fn reload_picks_up_file_changes() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("characters.json");
        fs::write(&path, registry_json("bright")).expect("write registry");

        let registry = CharacterRegistry::open(&path).expect("open registry");
        assert_eq!(registry.pick("painting").expect("painting").tone, "bright");

        thread::sleep(Duration::from_millis(20));
        fs::write(&path, registry_json("muted")).expect("rewrite registry");

        assert_eq!(registry.reload().expect("reload"), 2);
        assert_eq!(registry.pick("painting").expect("painting").tone, "muted");
    }

    #[test]
    fn arrays_replace_and_nulls_keep_base() {
        let merged = deep_merge(
            &json!({ "a": [1, 2], "b": { "c": 1, "d": 2 }, "e": "keep" }),
            &json!({ "a": [3], "b": { "d": 5 }, "e": null }),
        );
        assert_eq!(merged, json!({ "a": [3], "b": { "c": 1, "d": 5 }, "e": "keep" }));
    }
}
