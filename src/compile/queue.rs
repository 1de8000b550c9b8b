use std::sync::Arc;

use crate::compile::channels::{ChannelConfig, collect_channels};
use crate::compile::tasks::{BakeTask, build_tasks};
use crate::config::{BakeMode, BakeType, Job, JobSetting};
use crate::scene::{ObjectId, Scene};

/// Animation frame a step renders and the index used in its file names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    pub frame: i32,
    pub save_idx: i32,
    pub digits: usize,
}

/// One atomic unit of queue execution.
#[derive(Clone, Debug)]
pub struct BakeStep {
    pub job: Arc<Job>,
    pub task: BakeTask,
    pub channels: Arc<[ChannelConfig]>,
    pub frame_info: Option<FrameInfo>,
}

/// Planned queue plus the surfaced diagnostics of skipped jobs.
#[derive(Clone, Debug, Default)]
pub struct ExecutionPlan {
    pub steps: Vec<BakeStep>,
    pub diagnostics: Vec<String>,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Diagnostics joined one per line, as shown in the error log.
    pub fn error_log(&self) -> String {
        self.diagnostics.iter().map(|d| format!("{d}\n")).collect()
    }
}

/// Animation frames of a job. Empty when animation is off, saving is off,
/// or the range is not positive.
pub fn frame_range(setting: &JobSetting, scene: &Scene) -> Vec<FrameInfo> {
    if !(setting.bake_motion && setting.save_out) {
        return Vec::new();
    }
    let (start, duration) = if setting.bake_motion_use_custom {
        (setting.bake_motion_start, setting.bake_motion_last)
    } else {
        (scene.frame_start, scene.frame_end - scene.frame_start + 1)
    };
    (0..duration.max(0))
        .map(|i| FrameInfo {
            frame: start + i,
            save_idx: setting.bake_motion_startindex + i,
            digits: setting.bake_motion_digit,
        })
        .collect()
}

/// Turn enabled jobs into the ordered step queue.
///
/// Configuration problems skip the affected job and are reported in the
/// plan's diagnostics; sibling jobs still plan.
#[tracing::instrument(skip_all, fields(jobs = jobs.len()))]
pub fn prepare_execution_queue(scene: &Scene, jobs: &[Job]) -> ExecutionPlan {
    let mut plan = ExecutionPlan::default();

    for job in jobs.iter().filter(|j| j.enabled) {
        let setting = &job.setting;
        let objects: Vec<ObjectId> = setting
            .bake_objects
            .iter()
            .filter_map(|b| b.object)
            .filter(|&id| scene.object(id).is_some_and(|o| o.is_mesh()))
            .collect();

        if objects.is_empty() {
            tracing::warn!(job = %job.name, "job skipped: no objects assigned");
            plan.diagnostics
                .push(format!("Job '{}' skipped: No objects assigned.", job.name));
            continue;
        }

        let missing: Vec<String> = objects
            .iter()
            .filter(|&&id| scene.object(id).is_some_and(|o| !o.has_uv()))
            .map(|&id| scene.object_name(id))
            .collect();
        if !missing.is_empty() {
            let msg = format!(
                "Job '{}' skipped: Missing UVs on {}",
                job.name,
                missing.join(", ")
            );
            tracing::error!("{msg}");
            plan.diagnostics.push(msg);
            continue;
        }

        if setting.bake_mode == BakeMode::SelectActive && setting.bake_type == BakeType::Bsdf {
            let msg = format!(
                "Job '{}' skipped: Selected-to-active baking needs the BASIC bake type",
                job.name
            );
            tracing::error!("{msg}");
            plan.diagnostics.push(msg);
            continue;
        }

        let mut active = setting.active_object.unwrap_or(objects[0]);
        if setting.bake_mode == BakeMode::SelectActive && !objects.contains(&active) {
            active = objects[0];
        }

        let tasks = build_tasks(scene, setting, &objects, Some(active));
        let channels: Arc<[ChannelConfig]> = collect_channels(job).into();
        if channels.is_empty() {
            tracing::warn!(job = %job.name, "job skipped: no enabled channels");
            plan.diagnostics
                .push(format!("Job '{}' skipped: No enabled channels.", job.name));
            continue;
        }

        let job = Arc::new(job.clone());
        let frames = frame_range(setting, scene);
        let frames: Vec<Option<FrameInfo>> = if setting.bake_motion && setting.save_out {
            frames.into_iter().map(Some).collect()
        } else {
            vec![None]
        };

        for frame_info in frames {
            for task in &tasks {
                plan.steps.push(BakeStep {
                    job: Arc::clone(&job),
                    task: task.clone(),
                    channels: Arc::clone(&channels),
                    frame_info,
                });
            }
        }
        tracing::debug!(job = %job.name, steps = plan.steps.len(), "job planned");
    }
    plan
}

#[cfg(test)]
#[path = "../../tests/unit/compile/queue.rs"]
mod tests;
