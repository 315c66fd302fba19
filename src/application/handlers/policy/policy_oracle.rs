//! PolicyOracle - periodic refresh of access policies.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::policy::PolicyRepository;
use crate::ports::{PolicyError, PolicyFetcher};

pub struct PolicyOracle {
    fetcher: Arc<dyn PolicyFetcher>,
    repository: Arc<PolicyRepository>,
    policy_ids: Vec<String>,
    interval: Duration,
}

impl PolicyOracle {
    pub fn new(
        fetcher: Arc<dyn PolicyFetcher>,
        repository: Arc<PolicyRepository>,
        policy_ids: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            repository,
            policy_ids,
            interval,
        }
    }

    /// Fetches every configured policy and swaps the snapshot in one step.
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<usize, PolicyError> {
        let policies = self.fetcher.fetch(&self.policy_ids).await?;
        let count = policies.len();
        self.repository.replace(policies);
        debug!(policies = count, "Access policies refreshed");
        Ok(count)
    }

    /// Refreshes immediately, then every `interval`, until `shutdown`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if self.policy_ids.is_empty() {
            debug!("No access policies configured");
            return;
        }
        info!(policies = ?self.policy_ids, interval = ?self.interval, "Policy refresh started");

        loop {
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Policy refresh failed, keeping previous policies");
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("Policy refresh stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Identity;
    use crate::domain::policy::AccessPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Succeeds on the first fetch only.
    struct FlakyFetcher {
        calls: AtomicU32,
    }

    #[async_trait]
    impl PolicyFetcher for FlakyFetcher {
        async fn fetch(&self, ids: &[String]) -> Result<Vec<AccessPolicy>, PolicyError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(PolicyError::Request("oracle down".to_string()));
            }
            Ok(ids
                .iter()
                .map(|id| AccessPolicy::new(id.clone(), [Identity::new("0xbb").unwrap()]))
                .collect())
        }
    }

    fn oracle(fetcher: Arc<FlakyFetcher>, repository: Arc<PolicyRepository>) -> PolicyOracle {
        PolicyOracle::new(
            fetcher,
            repository,
            vec!["verified".to_string()],
            Duration::from_secs(600),
        )
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let repository = Arc::new(PolicyRepository::new());
        let oracle = oracle(
            Arc::new(FlakyFetcher {
                calls: AtomicU32::new(0),
            }),
            repository.clone(),
        );

        assert_eq!(oracle.refresh().await.unwrap(), 1);
        assert!(oracle.refresh().await.is_err());

        let snapshot = repository.snapshot();
        assert_eq!(snapshot.policies().len(), 1);
        assert!(repository.allows(&Identity::new("0xbb").unwrap()));
        assert!(!repository.allows(&Identity::new("0xcc").unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn run_refreshes_on_interval_until_shutdown() {
        let fetcher = Arc::new(FlakyFetcher {
            calls: AtomicU32::new(0),
        });
        let oracle = Arc::new(oracle(fetcher.clone(), Arc::new(PolicyRepository::new())));
        let (shutdown, rx) = watch::channel(false);

        let task = tokio::spawn({
            let oracle = Arc::clone(&oracle);
            async move { oracle.run(rx).await }
        });
        tokio::time::sleep(Duration::from_secs(1250)).await;
        shutdown.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }
}
