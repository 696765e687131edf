//! "First success wins" combinator shared by every fallback ladder.
//!
//! Discovery tiers, the probe ladder and the download ladder all try an
//! ordered list of candidates and stop at the first success. The outcome
//! keeps every failure, tagged with the candidate that produced it.

use std::future::Future;

/// Result of running a ladder.
#[derive(Debug)]
pub enum LadderOutcome<K, T, E> {
    /// A candidate succeeded.
    Success {
        index: usize,
        key: K,
        value: T,
        failures: Vec<(K, E)>,
    },
    /// Every candidate failed.
    Exhausted { failures: Vec<(K, E)> },
    /// A candidate failed with an error that stops the ladder.
    Halted {
        key: K,
        error: E,
        failures: Vec<(K, E)>,
    },
}

impl<K, T, E> LadderOutcome<K, T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Number of candidates that were attempted.
    pub fn attempts(&self) -> usize {
        match self {
            Self::Success { failures, .. } | Self::Exhausted { failures } => {
                failures.len() + usize::from(self.is_success())
            }
            Self::Halted { failures, .. } => failures.len() + 1,
        }
    }

    pub fn failures(&self) -> &[(K, E)] {
        match self {
            Self::Success { failures, .. }
            | Self::Exhausted { failures }
            | Self::Halted { failures, .. } => failures,
        }
    }
}

/// Try `attempt` on each candidate in order until one succeeds.
pub async fn first_success<K, T, E, F, Fut>(
    candidates: impl IntoIterator<Item = K>,
    attempt: F,
) -> LadderOutcome<K, T, E>
where
    K: Clone,
    F: FnMut(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    first_success_or_halt(candidates, attempt, |_| false).await
}

/// Like [`first_success`], but stops early when `halts` returns true for an error.
pub async fn first_success_or_halt<K, T, E, F, Fut, H>(
    candidates: impl IntoIterator<Item = K>,
    mut attempt: F,
    halts: H,
) -> LadderOutcome<K, T, E>
where
    K: Clone,
    F: FnMut(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    H: Fn(&E) -> bool,
{
    let mut failures = Vec::new();
    for (index, key) in candidates.into_iter().enumerate() {
        match attempt(key.clone()).await {
            Ok(value) => {
                return LadderOutcome::Success {
                    index,
                    key,
                    value,
                    failures,
                }
            }
            Err(error) if halts(&error) => {
                return LadderOutcome::Halted {
                    key,
                    error,
                    failures,
                }
            }
            Err(error) => failures.push((key, error)),
        }
    }
    LadderOutcome::Exhausted { failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_first_success_stops_at_winner() {
        let calls = AtomicUsize::new(0);
        let outcome = first_success(vec!["a", "b", "c"], |k| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if k == "b" {
                    Ok(k.to_uppercase())
                } else {
                    Err(format!("{} failed", k))
                }
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.attempts(), 2);
        match outcome {
            LadderOutcome::Success {
                index,
                key,
                value,
                failures,
            } => {
                assert_eq!(index, 1);
                assert_eq!(key, "b");
                assert_eq!(value, "B");
                assert_eq!(failures, vec![("a", "a failed".to_string())]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exhausted_keeps_all_failures_in_order() {
        let outcome: LadderOutcome<u8, (), String> =
            first_success(vec![1u8, 2, 3], |k| async move { Err(format!("e{}", k)) }).await;
        assert_eq!(outcome.attempts(), 3);
        let keys: Vec<u8> = outcome.failures().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 3]);
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_halt_stops_ladder() {
        let outcome: LadderOutcome<u8, (), &str> = first_success_or_halt(
            vec![1u8, 2, 3],
            |k| async move { Err(if k == 2 { "fatal" } else { "soft" }) },
            |e| *e == "fatal",
        )
        .await;
        match outcome {
            LadderOutcome::Halted { key, failures, .. } => {
                assert_eq!(key, 2);
                assert_eq!(failures.len(), 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_ladder_is_exhausted() {
        let outcome: LadderOutcome<u8, (), ()> =
            first_success(Vec::<u8>::new(), |_| async { Ok(()) }).await;
        assert!(matches!(outcome, LadderOutcome::Exhausted { ref failures } if failures.is_empty()));
        assert_eq!(outcome.attempts(), 0);
    }
}
