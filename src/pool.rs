use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::TaskError;

pub type TaskOutcome<T> = Result<T, TaskError>;

/// Fan-out of independent tasks, at most `capacity` running at once.
///
/// Results come back in completion order. `join_all` is the barrier: it
/// returns only once every spawned task has finished.
pub struct TaskGroup<T> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<TaskOutcome<T>>,
    progress: ProgressBar,
}

impl<T: Send + 'static> TaskGroup<T> {
    pub fn new(capacity: usize) -> Self {
        TaskGroup {
            permits: Arc::new(Semaphore::new(capacity.max(1))),
            tasks: JoinSet::new(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Shows a progress bar labelled `label` while joining.
    pub fn with_progress(mut self, label: &str, enabled: bool) -> Self {
        if !enabled {
            return self;
        }
        let pb = ProgressBar::new(self.tasks.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(label.to_string());
        self.progress = pb;
        self
    }

    pub fn spawn<F, E>(&mut self, fut: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Display,
    {
        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| TaskError::Failed(e.to_string()))?;
            fut.await.map_err(|e| TaskError::Failed(e.to_string()))
        });
        self.progress.inc_length(1);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub async fn join_all(mut self) -> Vec<TaskOutcome<T>> {
        let mut results = Vec::with_capacity(self.tasks.len());
        while let Some(joined) = self.tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(TaskError::Panicked(e.to_string())),
            };
            self.progress.inc(1);
            results.push(outcome);
        }
        self.progress.finish_and_clear();
        results
    }
}
