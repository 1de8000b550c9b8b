use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bake::{BakedImageResult, run_step};
use crate::compile::{BakeStep, ExecutionPlan};
use crate::render::Services;
use crate::scene::{ImageId, ImageSource, Scene};
use crate::session::state::SessionStateTracker;

/// State shown to the user while a queue runs.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct RunnerStatus {
    pub is_baking: bool,
    /// Percentage of processed steps, 0 to 100.
    pub progress: f32,
    pub status: String,
    /// Append-only, one diagnostic per line.
    pub error_log: String,
    pub results: Vec<BakedImageResult>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// More steps remain.
    Continue,
    Finished,
    Cancelled,
}

#[derive(Clone, Debug, Default)]
struct FrameUse {
    first_path: Option<PathBuf>,
    count: u32,
}

/// Cooperative queue executor: each [`tick`](Self::tick) runs exactly one
/// step. Step failures are logged and never stop the queue.
pub struct QueueRunner {
    steps: Vec<BakeStep>,
    index: usize,
    services: Services,
    tracker: Option<SessionStateTracker>,
    cancel: Arc<AtomicBool>,
    status: RunnerStatus,
    frames: BTreeMap<ImageId, FrameUse>,
    failed: bool,
}

impl QueueRunner {
    /// Runner over `plan`; the plan's diagnostics seed the error log.
    pub fn new(plan: ExecutionPlan, services: Services) -> Self {
        let status = RunnerStatus {
            error_log: plan.error_log(),
            ..RunnerStatus::default()
        };
        Self {
            steps: plan.steps,
            index: 0,
            services,
            tracker: None,
            cancel: Arc::new(AtomicBool::new(false)),
            status,
            frames: BTreeMap::new(),
            failed: false,
        }
    }

    pub fn with_tracker(mut self, tracker: SessionStateTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Shared flag; setting it stops the queue at the next tick.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn status(&self) -> &RunnerStatus {
        &self.status
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the next step to run.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn start(&mut self) {
        self.status.is_baking = true;
        self.status.progress = 0.0;
        self.status.status = String::from("Starting");
        let job = self
            .steps
            .first()
            .map(|s| s.job.name.clone())
            .unwrap_or_default();
        if let Some(tracker) = &self.tracker
            && let Err(err) = tracker.start(&job, self.steps.len())
        {
            tracing::warn!(%err, "could not write session record");
        }
        tracing::info!(steps = self.steps.len(), "bake queue started");
    }

    /// Run the next step, or wrap up when the queue is exhausted or cancelled.
    pub fn tick(&mut self, scene: &mut Scene) -> Tick {
        if self.cancel.load(Ordering::Relaxed) {
            self.status.is_baking = false;
            self.status.status = String::from("Cancelled");
            self.close_record();
            tracing::warn!(done = self.index, total = self.steps.len(), "bake queue cancelled");
            return Tick::Cancelled;
        }
        if self.index >= self.steps.len() {
            self.complete(scene);
            return Tick::Finished;
        }

        let total = self.steps.len();
        let step = &self.steps[self.index];
        let number = self.index + 1;
        let object = scene.object_name(step.task.active);
        self.status.status = format!("Baking {} ({number}/{total})", step.task.base_name);

        let tracker = self.tracker.as_ref();
        if let Some(t) = tracker
            && let Err(err) = t.update_step(number, &object, "")
        {
            tracing::warn!(%err, "could not update session record");
        }
        let outcome = run_step(scene, &mut self.services, step, |channel| {
            if let Some(t) = tracker
                && let Err(err) = t.update_step(number, &object, &channel.name)
            {
                tracing::warn!(%err, "could not update session record");
            }
        });

        match outcome {
            Ok(outcome) => {
                for line in &outcome.diagnostics {
                    self.status.error_log.push_str(line);
                    self.status.error_log.push('\n');
                }
                if step.frame_info.is_some() {
                    for record in &outcome.results {
                        let usage = self.frames.entry(record.image).or_default();
                        usage.count += 1;
                        if usage.first_path.is_none() {
                            usage.first_path.clone_from(&record.path);
                        }
                    }
                }
                self.status.results.extend(outcome.results);
            }
            Err(err) => {
                tracing::error!(step = number, %err, "bake step failed");
                let line = format!("Step {number} ({}) failed: {err}", step.task.base_name);
                self.status.error_log.push_str(&line);
                self.status.error_log.push('\n');
                self.failed = true;
                if let Some(t) = tracker
                    && let Err(err) = t.log_error(&line)
                {
                    tracing::warn!(%err, "could not record step failure");
                }
            }
        }

        self.index += 1;
        self.status.progress = self.index as f32 / total as f32 * 100.0;
        if self.index == total {
            self.complete(scene);
            return Tick::Finished;
        }
        Tick::Continue
    }

    /// Tick until the queue finishes or is cancelled.
    pub fn run(&mut self, scene: &mut Scene) -> Tick {
        if !self.status.is_baking {
            self.start();
        }
        loop {
            match self.tick(scene) {
                Tick::Continue => continue,
                done => return done,
            }
        }
    }

    fn complete(&mut self, scene: &mut Scene) {
        if !self.status.is_baking && self.status.status == "Finished" {
            return;
        }
        for (&id, usage) in &self.frames {
            if usage.count < 2 {
                continue;
            }
            let Some(image) = scene.image_mut(id) else {
                continue;
            };
            image.source = ImageSource::Sequence {
                frame_duration: usage.count,
            };
            if usage.first_path.is_some() {
                image.filepath.clone_from(&usage.first_path);
            }
            tracing::debug!(image = %image.name, frames = usage.count, "image turned into a sequence");
        }
        self.status.is_baking = false;
        self.status.progress = 100.0;
        self.status.status = String::from("Finished");
        self.close_record();
        tracing::info!(results = self.status.results.len(), "bake queue finished");
    }

    /// Drop the session record unless a step failed; an error record stays
    /// for the next startup.
    fn close_record(&self) {
        let Some(tracker) = &self.tracker else {
            return;
        };
        if self.failed {
            tracing::warn!(path = %tracker.path().display(), "session record kept after failed steps");
        } else {
            tracker.finish();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/runner.rs"]
mod tests;
