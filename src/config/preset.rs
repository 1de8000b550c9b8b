use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::model::{BakeObject, ChannelSetting, CustomChannel, Job, JobSetting};
use crate::foundation::error::BakeResult;

/// Fields that are computed rather than configured.
const READ_ONLY: &[&str] = &["valid_for_mode"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresetStats {
    pub loaded: usize,
    pub obsolete: usize,
    pub read_only: usize,
    pub errors: usize,
}

impl fmt::Display for PresetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded: {}, Obsolete keys: {}, Read-only skipped: {}, Errors: {}",
            self.loaded, self.obsolete, self.read_only, self.errors
        )
    }
}

/// Configuration types a preset document can be merged into.
pub trait Preset: Serialize + DeserializeOwned {
    /// Take back the scene handles serde skips. Documents never carry
    /// them, so a merge must not clear them.
    fn keep_references(&mut self, _previous: &Self) {}
}

impl Preset for Job {
    fn keep_references(&mut self, previous: &Self) {
        self.setting.keep_references(&previous.setting);
    }
}

impl Preset for JobSetting {
    fn keep_references(&mut self, previous: &Self) {
        self.active_object = previous.active_object;
        self.cage_object = previous.cage_object;
        for (entry, old) in self.bake_objects.iter_mut().zip(&previous.bake_objects) {
            entry.keep_references(old);
        }
    }
}

impl Preset for BakeObject {
    fn keep_references(&mut self, previous: &Self) {
        self.object = previous.object;
    }
}

impl Preset for ChannelSetting {}

impl Preset for CustomChannel {}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Reads and writes configuration trees as nested documents.
///
/// Documents only ever carry configuration data: handle fields are skipped
/// by the model's serde attributes and never round-trip.
#[derive(Debug, Default)]
pub struct PresetIo {
    pub stats: PresetStats,
}

impl PresetIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `value`, dropping empty lists.
    pub fn to_value<T: Serialize>(value: &T) -> BakeResult<Value> {
        let mut doc = serde_json::to_value(value)?;
        prune_empty_lists(&mut doc);
        Ok(doc)
    }

    /// Merge `doc` into `target` key by key.
    ///
    /// Unknown keys count as obsolete, read-only keys are skipped, and a
    /// value that would make the target fail to deserialize is rejected
    /// without touching the target. Lists of documents are rebuilt from
    /// default items, each merged key by key. Scene handles on `target`
    /// are kept.
    pub fn apply<T: Preset>(&mut self, target: &mut T, doc: &Value) -> BakeResult<PresetStats> {
        let before = self.stats;
        let mut current = serde_json::to_value(&*target)?;
        let Value::Object(incoming) = doc else {
            self.stats.errors += 1;
            return Ok(self.delta(before));
        };

        let mut path = Vec::new();
        self.merge::<T>(&mut current, &mut path, incoming);

        let previous = std::mem::replace(target, serde_json::from_value(current)?);
        target.keep_references(&previous);
        Ok(self.delta(before))
    }

    /// Build a job from a preset document, repairing invalid mode combinations.
    pub fn load_job(&mut self, doc: &Value) -> BakeResult<Job> {
        let mut job = Job::default();
        job.setting.channels.clear();
        self.apply(&mut job, doc)?;
        if job.setting.channels.is_empty() {
            job.setting.sync_channels();
        }
        if job.setting.migrate() {
            tracing::info!(job = %job.name, "preset migrated SELECT_ACTIVE job from BSDF to BASIC");
        }
        Ok(job)
    }

    pub fn report(&self) -> String {
        self.stats.to_string()
    }

    fn delta(&self, before: PresetStats) -> PresetStats {
        PresetStats {
            loaded: self.stats.loaded - before.loaded,
            obsolete: self.stats.obsolete - before.obsolete,
            read_only: self.stats.read_only - before.read_only,
            errors: self.stats.errors - before.errors,
        }
    }

    fn merge<T: Preset>(
        &mut self,
        root: &mut Value,
        path: &mut Vec<Segment>,
        incoming: &Map<String, Value>,
    ) {
        for (key, value) in incoming {
            if READ_ONLY.contains(&key.as_str()) {
                self.stats.read_only += 1;
                continue;
            }
            let Some(existing) = lookup(root, path).and_then(|v| v.get(key)) else {
                tracing::debug!(key = %key, "obsolete preset key");
                self.stats.obsolete += 1;
                continue;
            };

            let existing_is_list = existing.is_array();
            if let (Value::Object(_), Value::Object(nested)) = (existing, value) {
                path.push(Segment::Key(key.clone()));
                self.merge::<T>(root, path, nested);
                path.pop();
                continue;
            }
            if existing_is_list
                && let Value::Array(items) = value
                && !items.is_empty()
                && items.iter().all(Value::is_object)
                && self.merge_items::<T>(root, path, key, items)
            {
                continue;
            }

            let Some(slot) = lookup_mut(root, path).and_then(|v| v.get_mut(key)) else {
                continue;
            };
            let previous = std::mem::replace(slot, value.clone());
            if serde_json::from_value::<T>(root.clone()).is_ok() {
                self.stats.loaded += 1;
            } else {
                tracing::warn!(key = %key, "preset value rejected");
                self.stats.errors += 1;
                if let Some(slot) = lookup_mut(root, path).and_then(|v| v.get_mut(key)) {
                    *slot = previous;
                }
            }
        }
    }

    /// Replace the list at `key` with default items and merge each
    /// document into its item. `false` leaves `root` untouched when the
    /// list cannot hold default items.
    fn merge_items<T: Preset>(
        &mut self,
        root: &mut Value,
        path: &mut Vec<Segment>,
        key: &str,
        items: &[Value],
    ) -> bool {
        let mut candidate = root.clone();
        let Some(slot) = lookup_mut(&mut candidate, path).and_then(|v| v.get_mut(key)) else {
            return false;
        };
        *slot = Value::Array(vec![Value::Object(Map::new()); items.len()]);
        let normalized =
            serde_json::from_value::<T>(candidate).and_then(|t| serde_json::to_value(&t));
        let Ok(normalized) = normalized else {
            return false;
        };
        *root = normalized;

        path.push(Segment::Key(key.to_string()));
        for (i, item) in items.iter().enumerate() {
            if let Value::Object(fields) = item {
                path.push(Segment::Index(i));
                self.merge::<T>(root, path, fields);
                path.pop();
            }
        }
        path.pop();
        true
    }
}

fn lookup<'a>(root: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    path.iter().try_fold(root, |v, seg| match seg {
        Segment::Key(k) => v.get(k),
        Segment::Index(i) => v.get(i),
    })
}

fn lookup_mut<'a>(root: &'a mut Value, path: &[Segment]) -> Option<&'a mut Value> {
    path.iter().try_fold(root, |v, seg| match seg {
        Segment::Key(k) => v.get_mut(k),
        Segment::Index(i) => v.get_mut(i),
    })
}

fn prune_empty_lists(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !matches!(v, Value::Array(a) if a.is_empty()));
            map.values_mut().for_each(prune_empty_lists);
        }
        Value::Array(items) => items.iter_mut().for_each(prune_empty_lists),
        _ => {}
    }
}

pub fn write_preset(path: &Path, doc: &Value) -> BakeResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create preset dir {}", dir.display()))?;
    }
    let text = serde_json::to_string_pretty(doc)?;
    fs::write(path, text).with_context(|| format!("write preset {}", path.display()))?;
    Ok(())
}

pub fn read_preset(path: &Path) -> BakeResult<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read preset {}", path.display()))?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
#[path = "../../tests/unit/config/preset.rs"]
mod tests;
