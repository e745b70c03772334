//! The durable step seam.
//!
//! The host substrate runs every named unit of work exactly once per run and
//! replays recorded results when a run is redelivered. The engine only sees
//! [`StepRunner`]; the implementations here cover local execution.

use crate::id::RunId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors raised by the step substrate itself (not by the wrapped work).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The step's result could not be recorded.
    Record { step: String, message: String },
    /// A recorded result no longer matches the expected type.
    Replay { step: String, message: String },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record { step, message } => {
                write!(f, "failed to record result of step '{step}': {message}")
            }
            Self::Replay { step, message } => {
                write!(f, "failed to replay result of step '{step}': {message}")
            }
        }
    }
}

impl std::error::Error for StepError {}

/// Runs named units of work through a durable execution substrate.
///
/// Step names must be unique within a run. The result type is serializable
/// so a substrate can record it and hand it back on replay without running
/// `work` again.
pub trait StepRunner: Send + Sync {
    /// Runs `work` as the step called `name`.
    fn run<T, E, Fut>(&self, name: &str, work: Fut) -> impl Future<Output = Result<T, E>> + Send
    where
        T: Serialize + DeserializeOwned + Send,
        E: From<StepError> + Send,
        Fut: Future<Output = Result<T, E>> + Send;
}

/// Runs work immediately without recording anything.
///
/// Used where steps cannot nest, e.g. inside a plugin that is itself running
/// as a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectStepRunner;

impl StepRunner for DirectStepRunner {
    async fn run<T, E, Fut>(&self, _name: &str, work: Fut) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send,
        E: From<StepError> + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        work.await
    }
}

/// A view of a shared substrate that scopes step names to one run.
///
/// Names are recorded as `{run_id}:{name}`, so two runs driven through the
/// same substrate never replay each other's steps.
#[derive(Debug)]
pub struct RunSteps<'a, S> {
    inner: &'a S,
    run_id: &'a RunId,
}

impl<'a, S: StepRunner> RunSteps<'a, S> {
    #[must_use]
    pub fn new(inner: &'a S, run_id: &'a RunId) -> Self {
        Self { inner, run_id }
    }

    /// The run the steps belong to.
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        self.run_id
    }
}

fn scoped_name(run_id: &RunId, name: &str) -> String {
    format!("{run_id}:{name}")
}

impl<S: StepRunner> StepRunner for RunSteps<'_, S> {
    async fn run<T, E, Fut>(&self, name: &str, work: Fut) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send,
        E: From<StepError> + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        self.inner.run(&scoped_name(self.run_id, name), work).await
    }
}

#[derive(Debug, Default)]
struct Journal {
    results: HashMap<String, JsonValue>,
    order: Vec<String>,
}

/// In-process substrate that memoizes step results by name.
///
/// A failed step records nothing, so running it again re-executes the work.
#[derive(Debug, Default)]
pub struct MemoizingStepRunner {
    journal: Mutex<Journal>,
}

impl MemoizingStepRunner {
    /// Creates a runner with an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded result of a step, if it completed.
    pub async fn recorded(&self, name: &str) -> Option<JsonValue> {
        self.journal.lock().await.results.get(name).cloned()
    }

    /// Returns the names of completed steps in completion order.
    pub async fn completed_steps(&self) -> Vec<String> {
        self.journal.lock().await.order.clone()
    }

    /// Returns the completed steps recorded through [`RunSteps`] for `run_id`,
    /// without the run prefix.
    pub async fn completed_steps_of(&self, run_id: &RunId) -> Vec<String> {
        let prefix = scoped_name(run_id, "");
        self.journal
            .lock()
            .await
            .order
            .iter()
            .filter_map(|name| name.strip_prefix(&prefix))
            .map(str::to_string)
            .collect()
    }
}

impl StepRunner for MemoizingStepRunner {
    async fn run<T, E, Fut>(&self, name: &str, work: Fut) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send,
        E: From<StepError> + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        let recorded = self.journal.lock().await.results.get(name).cloned();
        if let Some(value) = recorded {
            debug!(step = name, "replaying recorded step result");
            return serde_json::from_value(value).map_err(|e| {
                E::from(StepError::Replay {
                    step: name.to_string(),
                    message: e.to_string(),
                })
            });
        }

        let output = work.await?;
        let value = serde_json::to_value(&output).map_err(|e| {
            E::from(StepError::Record {
                step: name.to_string(),
                message: e.to_string(),
            })
        })?;

        let mut journal = self.journal.lock().await;
        journal.results.insert(name.to_string(), value);
        journal.order.push(name.to_string());
        Ok(output)
    }
}
