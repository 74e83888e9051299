use std::time::Duration;

use crate::error::{PublishError, UploadError};
use crate::retry::RetryPolicy;
use crate::sink::AssetSink;
use crate::staging::StagedFile;

/// Terminal success state of a publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// The destination already held an asset of that name; nothing was written.
    AlreadyExists,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishReport {
    pub name: String,
    pub outcome: PublishOutcome,
    pub attempts: u32,
}

/// Commits staged files to a sink with bounded retries on transient failures.
#[derive(Debug)]
pub struct Publisher<S> {
    sink: S,
    policy: RetryPolicy<UploadError>,
}

impl<S: AssetSink> Publisher<S> {
    /// Default budget: three attempts, three seconds apart.
    pub fn new(sink: S) -> Self {
        Self::with_retry(sink, 3, Duration::from_secs(3))
    }

    pub fn with_retry(sink: S, max_attempts: u32, delay: Duration) -> Self {
        Self {
            sink,
            policy: RetryPolicy::new(max_attempts, delay, UploadError::is_transient),
        }
    }

    pub fn policy(&self) -> &RetryPolicy<UploadError> {
        &self.policy
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Upload `staged` once, retrying transient failures within the policy budget.
    ///
    /// Each attempt reads the staged file from the beginning.
    pub fn publish(&self, staged: &StagedFile) -> Result<PublishReport, PublishError> {
        let name = staged.name();
        let result = self.policy.run(|attempt| {
            tracing::debug!(name, attempt, "uploading");
            let content = staged.open()?;
            match self.sink.upload(name, staged.size(), content) {
                Ok(()) => Ok(PublishOutcome::Published),
                Err(UploadError::AlreadyExists) => Ok(PublishOutcome::AlreadyExists),
                Err(e) => Err(e),
            }
        });

        match result {
            Ok(done) => {
                match done.value {
                    PublishOutcome::Published => {
                        tracing::info!(name, attempts = done.attempts, "published")
                    }
                    PublishOutcome::AlreadyExists => {
                        tracing::info!(name, "already published, skipping")
                    }
                }
                Ok(PublishReport {
                    name: name.to_string(),
                    outcome: done.value,
                    attempts: done.attempts,
                })
            }
            Err(exhausted) => Err(PublishError {
                name: name.to_string(),
                attempts: exhausted.attempts,
                source: exhausted.error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::Stager;
    use std::fs::File;
    use std::io::{Cursor, Read};
    use std::sync::Mutex;

    /// Replays a fixed script of responses, one per upload call.
    struct ScriptedSink {
        script: Mutex<Vec<Result<(), UploadError>>>,
        bodies: Mutex<Vec<Vec<u8>>>,
    }

    impl ScriptedSink {
        fn new(mut script: Vec<Result<(), UploadError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                bodies: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.bodies.lock().unwrap().len()
        }
    }

    impl AssetSink for ScriptedSink {
        fn upload(&self, _name: &str, _size: u64, mut content: File) -> Result<(), UploadError> {
            let mut body = Vec::new();
            content.read_to_end(&mut body)?;
            self.bodies.lock().unwrap().push(body);
            self.script.lock().unwrap().pop().unwrap_or(Ok(()))
        }
    }

    fn transient() -> Result<(), UploadError> {
        Err(UploadError::Transient {
            message: "502 bad gateway".into(),
        })
    }

    fn staged(stager: &Stager) -> StagedFile {
        stager.stage(&mut Cursor::new(b"binary"), "clang-17").unwrap()
    }

    fn publisher(script: Vec<Result<(), UploadError>>) -> Publisher<ScriptedSink> {
        Publisher::with_retry(ScriptedSink::new(script), 3, Duration::ZERO)
    }

    #[test]
    fn publishes_first_time() {
        let stager = Stager::new().unwrap();
        let publisher = publisher(vec![Ok(())]);
        let report = publisher.publish(&staged(&stager)).unwrap();
        assert_eq!(report.outcome, PublishOutcome::Published);
        assert_eq!(report.attempts, 1);
        assert_eq!(report.name, "clang-17");
    }

    #[test]
    fn already_exists_is_success_without_retry() {
        let stager = Stager::new().unwrap();
        let publisher = publisher(vec![Err(UploadError::AlreadyExists)]);
        let report = publisher.publish(&staged(&stager)).unwrap();
        assert_eq!(report.outcome, PublishOutcome::AlreadyExists);
        assert_eq!(report.attempts, 1);
        assert_eq!(publisher.sink().calls(), 1);
    }

    #[test]
    fn transient_failures_then_success() {
        let stager = Stager::new().unwrap();
        let publisher = publisher(vec![transient(), transient(), Ok(())]);
        let report = publisher.publish(&staged(&stager)).unwrap();
        assert_eq!(report.outcome, PublishOutcome::Published);
        assert_eq!(report.attempts, 3);
        // every attempt re-reads the full staged content
        let bodies = publisher.sink().bodies.lock().unwrap();
        assert!(bodies.iter().all(|b| b == b"binary"));
    }

    #[test]
    fn persistent_transient_failure_is_fatal_after_three_attempts() {
        let stager = Stager::new().unwrap();
        let publisher = publisher(vec![transient(), transient(), transient(), Ok(())]);
        let err = publisher.publish(&staged(&stager)).unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.name, "clang-17");
        assert!(err.source.is_transient());
        assert_eq!(publisher.sink().calls(), 3);
    }

    #[test]
    fn rejection_is_not_retried() {
        let stager = Stager::new().unwrap();
        let publisher = publisher(vec![Err(UploadError::Rejected {
            message: "401".into(),
        })]);
        let err = publisher.publish(&staged(&stager)).unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(matches!(err.source, UploadError::Rejected { .. }));
    }

    #[test]
    fn transient_then_already_exists() {
        let stager = Stager::new().unwrap();
        let publisher = publisher(vec![transient(), Err(UploadError::AlreadyExists)]);
        let report = publisher.publish(&staged(&stager)).unwrap();
        assert_eq!(report.outcome, PublishOutcome::AlreadyExists);
        assert_eq!(report.attempts, 2);
    }

    #[test]
    fn default_budget() {
        let publisher = Publisher::new(ScriptedSink::new(Vec::new()));
        assert_eq!(publisher.policy().max_attempts(), 3);
        assert_eq!(publisher.policy().delay(), Duration::from_secs(3));
    }
}
