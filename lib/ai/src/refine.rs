//! The generate-verify loop.
//!
//! Bounded iterative refinement: generate a candidate, verify it, and feed
//! the verifier's feedback into the next prompt until a candidate passes or
//! the attempt budget is spent. Every call runs as a named step so a
//! redelivered job replays finished attempts.

use crate::backend::{ImageGenerator, ResultVerifier, Verdict};
use crate::error::{RefineError, StatusError};
use crate::prompt::prompt_for_attempt;
use async_trait::async_trait;
use mediaflow_core::{JobId, StepRunner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    7
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Externally visible job progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum JobStatus {
    Processing,
    Verifying { attempts: u32 },
    Completed { result_url: String, attempts: u32 },
    Failed { error: String, attempts: u32 },
}

/// Receives job status updates.
#[async_trait]
pub trait JobStatusSink: Send + Sync {
    async fn update(&self, job_id: &JobId, status: JobStatus) -> Result<(), StatusError>;
}

/// Reports job status as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusSink;

#[async_trait]
impl JobStatusSink for TracingStatusSink {
    async fn update(&self, job_id: &JobId, status: JobStatus) -> Result<(), StatusError> {
        info!(job_id = %job_id, status = ?status, "job status");
        Ok(())
    }
}

/// How a loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefineOutcome {
    /// A candidate passed verification.
    Success { url: String, attempts: u32 },
    /// No candidate passed; `reason` is the last feedback.
    Failed { attempts: u32, reason: String },
}

/// Runs generate-verify refinement against a generator and a verifier.
pub struct GenerateVerifyLoop {
    generator: Arc<dyn ImageGenerator>,
    verifier: Arc<dyn ResultVerifier>,
    max_attempts: u32,
    status: Option<(Arc<dyn JobStatusSink>, JobId)>,
}

impl GenerateVerifyLoop {
    /// Creates a loop with the default attempt budget and no status sink.
    #[must_use]
    pub fn new(generator: Arc<dyn ImageGenerator>, verifier: Arc<dyn ResultVerifier>) -> Self {
        Self {
            generator,
            verifier,
            max_attempts: default_max_attempts(),
            status: None,
        }
    }

    /// Applies loop settings.
    #[must_use]
    pub fn with_config(mut self, config: &RefineConfig) -> Self {
        self.max_attempts = config.max_attempts;
        self
    }

    /// Sets the attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Reports progress for `job_id` to `sink`.
    #[must_use]
    pub fn with_status(mut self, sink: Arc<dyn JobStatusSink>, job_id: JobId) -> Self {
        self.status = Some((sink, job_id));
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Refines `source_ref` starting from `base_prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`RefineError`] if a provider call fails, the generator
    /// returns no image, or a status update fails. Running out of attempts is
    /// an `Ok(RefineOutcome::Failed)`.
    #[instrument(skip_all, fields(source_ref = %source_ref, max_attempts = self.max_attempts))]
    pub async fn run<S: StepRunner>(
        &self,
        steps: &S,
        base_prompt: &str,
        source_ref: &str,
    ) -> Result<RefineOutcome, RefineError> {
        steps
            .run("update-status-processing", self.report(JobStatus::Processing))
            .await?;

        let mut attempt = 0;
        let mut last_feedback = String::new();
        let mut verified_url = None;

        while attempt < self.max_attempts && verified_url.is_none() {
            attempt += 1;
            let prompt = prompt_for_attempt(base_prompt, attempt, &last_feedback);

            let result_ref: String = steps
                .run(&format!("generate-attempt-{attempt}"), async {
                    debug!(attempt, "generating candidate");
                    let generated = self
                        .generator
                        .generate(&prompt, source_ref)
                        .await
                        .map_err(|source| RefineError::Generation { attempt, source })?;
                    generated
                        .result_ref
                        .ok_or(RefineError::EmptyResult { attempt })
                })
                .await?;

            let verdict: Verdict = steps
                .run(&format!("verify-attempt-{attempt}"), async {
                    debug!(attempt, "verifying candidate");
                    self.report(JobStatus::Verifying { attempts: attempt })
                        .await?;
                    self.verifier
                        .verify(&result_ref)
                        .await
                        .map_err(|source| RefineError::Verification { attempt, source })
                })
                .await?;

            if verdict.passed {
                verified_url = Some(result_ref);
            } else {
                debug!(attempt, feedback = %verdict.feedback, "candidate rejected");
                last_feedback = verdict.feedback;
            }
        }

        match verified_url {
            Some(url) => {
                let status = JobStatus::Completed {
                    result_url: url.clone(),
                    attempts: attempt,
                };
                steps.run("save-success", self.report(status)).await?;
                info!(attempts = attempt, "candidate verified");
                Ok(RefineOutcome::Success {
                    url,
                    attempts: attempt,
                })
            }
            None => {
                let status = JobStatus::Failed {
                    error: last_feedback.clone(),
                    attempts: attempt,
                };
                steps.run("mark-failed", self.report(status)).await?;
                info!(attempts = attempt, "no candidate passed verification");
                Ok(RefineOutcome::Failed {
                    attempts: attempt,
                    reason: last_feedback,
                })
            }
        }
    }

    async fn report(&self, status: JobStatus) -> Result<(), RefineError> {
        if let Some((sink, job_id)) = &self.status {
            sink.update(job_id, status).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Generated;
    use crate::error::BackendError;
    use mediaflow_core::{DirectStepRunner, MemoizingStepRunner};
    use std::sync::Mutex;

    /// Returns `memory://result-{n}` for call n and records prompts.
    #[derive(Default)]
    struct CountingGenerator {
        prompts: Mutex<Vec<String>>,
        empty: bool,
    }

    #[async_trait]
    impl ImageGenerator for CountingGenerator {
        async fn generate(&self, prompt: &str, _source_ref: &str) -> Result<Generated, BackendError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            if self.empty {
                return Ok(Generated {
                    result_ref: None,
                    text: Some("I cannot do that".to_string()),
                });
            }
            Ok(Generated {
                result_ref: Some(format!("memory://result-{}", prompts.len())),
                text: None,
            })
        }
    }

    /// Passes the candidate from call `pass_on`, failing the others.
    struct PassOn(Option<u32>);

    #[async_trait]
    impl ResultVerifier for PassOn {
        async fn verify(&self, result_ref: &str) -> Result<Verdict, BackendError> {
            let call: u32 = result_ref
                .trim_start_matches("memory://result-")
                .parse()
                .unwrap();
            if Some(call) == self.0 {
                Ok(Verdict::pass())
            } else {
                Ok(Verdict::fail(format!("sleeve missing on {call}")))
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<JobStatus>>);

    #[async_trait]
    impl JobStatusSink for RecordingSink {
        async fn update(&self, _job_id: &JobId, status: JobStatus) -> Result<(), StatusError> {
            self.0.lock().unwrap().push(status);
            Ok(())
        }
    }

    fn refine(
        generator: &Arc<CountingGenerator>,
        pass_on: Option<u32>,
        sink: &Arc<RecordingSink>,
    ) -> GenerateVerifyLoop {
        GenerateVerifyLoop::new(generator.clone(), Arc::new(PassOn(pass_on)))
            .with_status(sink.clone(), JobId::from("job_1"))
    }

    #[tokio::test]
    async fn exhausts_attempts_and_reports_last_feedback() {
        let generator = Arc::new(CountingGenerator::default());
        let sink = Arc::new(RecordingSink::default());

        let outcome = refine(&generator, None, &sink)
            .run(&DirectStepRunner, "base", "memory://source")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RefineOutcome::Failed {
                attempts: 7,
                reason: "sleeve missing on 7".to_string()
            }
        );
        let prompts = generator.prompts.lock().unwrap().clone();
        assert_eq!(prompts.len(), 7);
        assert_eq!(prompts[0], "base");
        assert!(prompts[1].contains("PREVIOUS ATTEMPT FAILED because: sleeve missing on 1"));
        assert!(prompts[6].contains("sleeve missing on 6"));

        let statuses = sink.0.lock().unwrap().clone();
        assert_eq!(statuses.len(), 9);
        assert_eq!(statuses[0], JobStatus::Processing);
        assert_eq!(statuses[7], JobStatus::Verifying { attempts: 7 });
        assert_eq!(
            statuses[8],
            JobStatus::Failed {
                error: "sleeve missing on 7".to_string(),
                attempts: 7
            }
        );
    }

    #[tokio::test]
    async fn stops_at_the_first_passing_candidate() {
        let generator = Arc::new(CountingGenerator::default());
        let sink = Arc::new(RecordingSink::default());

        let outcome = refine(&generator, Some(3), &sink)
            .run(&DirectStepRunner, "base", "memory://source")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RefineOutcome::Success {
                url: "memory://result-3".to_string(),
                attempts: 3
            }
        );
        assert_eq!(generator.prompts.lock().unwrap().len(), 3);
        assert_eq!(
            sink.0.lock().unwrap().last(),
            Some(&JobStatus::Completed {
                result_url: "memory://result-3".to_string(),
                attempts: 3
            })
        );
    }

    #[tokio::test]
    async fn empty_generation_is_an_error() {
        let generator = Arc::new(CountingGenerator {
            empty: true,
            ..CountingGenerator::default()
        });
        let sink = Arc::new(RecordingSink::default());

        let err = refine(&generator, None, &sink)
            .run(&DirectStepRunner, "base", "memory://source")
            .await
            .unwrap_err();
        assert_eq!(err, RefineError::EmptyResult { attempt: 1 });
    }

    #[tokio::test]
    async fn redelivery_replays_recorded_attempts() {
        let generator = Arc::new(CountingGenerator::default());
        let sink = Arc::new(RecordingSink::default());
        let steps = MemoizingStepRunner::new();
        let refine = refine(&generator, Some(2), &sink);

        let first = refine.run(&steps, "base", "memory://source").await.unwrap();
        let second = refine.run(&steps, "base", "memory://source").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(generator.prompts.lock().unwrap().len(), 2);
        assert_eq!(
            steps.completed_steps().await,
            vec![
                "update-status-processing",
                "generate-attempt-1",
                "verify-attempt-1",
                "generate-attempt-2",
                "verify-attempt-2",
                "save-success",
            ]
        );
    }

    #[tokio::test]
    async fn runs_without_a_status_sink() {
        let generator = Arc::new(CountingGenerator::default());
        let outcome = GenerateVerifyLoop::new(generator.clone(), Arc::new(PassOn(Some(1))))
            .with_max_attempts(2)
            .run(&DirectStepRunner, "base", "memory://source")
            .await
            .unwrap();
        assert!(matches!(outcome, RefineOutcome::Success { attempts: 1, .. }));
    }

    #[test]
    fn config_defaults_to_seven_attempts() {
        let config: RefineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_attempts, 7);
        assert_eq!(
            GenerateVerifyLoop::new(
                Arc::new(CountingGenerator::default()),
                Arc::new(PassOn(None))
            )
            .with_config(&config)
            .max_attempts(),
            7
        );
    }

    #[test]
    fn job_status_serializes_with_status_tag() {
        let value = serde_json::to_value(JobStatus::Completed {
            result_url: "memory://r".to_string(),
            attempts: 2,
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"status": "completed", "resultUrl": "memory://r", "attempts": 2})
        );
    }
}
