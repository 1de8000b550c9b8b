use std::path::Path;

use serde_json::Value;

use crate::config::model::{BakeObject, Job, JobSetting};
use crate::config::preset::{PresetIo, read_preset};
use crate::foundation::error::{BakeError, BakeResult};
use crate::scene::{ObjectId, Scene};

/// Scene references of a job, by object name. Presets never carry handles,
/// so a jobs file pairs each preset with its bindings.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct JobBindings {
    pub objects: Vec<String>,
    pub active: Option<String>,
    pub cage: Option<String>,
}

impl JobBindings {
    /// Resolve names against `scene` and write the handles into `setting`.
    ///
    /// The n-th name binds the n-th configured object entry, keeping its
    /// tile and resolution settings; extra names append new entries.
    pub fn bind(&self, scene: &Scene, setting: &mut JobSetting) -> BakeResult<()> {
        let resolve = |name: &str| -> BakeResult<ObjectId> {
            scene
                .find_object(name)
                .ok_or_else(|| BakeError::configuration(format!("object '{name}' not found in scene")))
        };

        for (i, name) in self.objects.iter().enumerate() {
            let id = resolve(name)?;
            match setting.bake_objects.get_mut(i) {
                Some(entry) => entry.object = Some(id),
                None => setting.bake_objects.push(BakeObject::new(id)),
            }
        }
        setting.active_object = self.active.as_deref().map(resolve).transpose()?;
        setting.cage_object = self.cage.as_deref().map(resolve).transpose()?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
struct JobEntry {
    job: Value,
    bindings: JobBindings,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
struct JobsDocument {
    jobs: Vec<JobEntry>,
}

/// Load a `{"jobs": [{"job": <preset>, "bindings": {..}}]}` document and
/// bind every job to `scene`. Returns the jobs and the preset load report.
pub fn load_jobs(path: &Path, scene: &Scene) -> BakeResult<(Vec<Job>, String)> {
    let doc: JobsDocument = serde_json::from_value(read_preset(path)?)?;
    let mut io = PresetIo::new();
    let mut jobs = Vec::with_capacity(doc.jobs.len());
    for entry in &doc.jobs {
        let mut job = io.load_job(&entry.job)?;
        entry.bindings.bind(scene, &mut job.setting)?;
        jobs.push(job);
    }
    Ok((jobs, io.report()))
}

#[cfg(test)]
#[path = "../../tests/unit/config/bindings.rs"]
mod tests;
