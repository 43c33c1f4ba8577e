use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use podling_core::ProbeSpec;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::probe::Probe;

/// Observed health of one Checker's target, published to callers and (for
/// the unhealthy transition) surfaced via `on_unhealthy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(v: u8) -> Self {
        match v {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// Timing and threshold parameters for one Checker. Mirrors the defaults a
/// `ProbeSpec` carries once deserialized.
#[derive(Debug, Clone, Copy)]
pub struct CheckerParams {
    pub initial_delay: Duration,
    pub period: Duration,
    pub timeout: Duration,
    pub success_threshold: u32,
    pub failure_threshold: u32,
}

impl Default for CheckerParams {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            period: Duration::from_secs(10),
            timeout: Duration::from_secs(1),
            success_threshold: 1,
            failure_threshold: 3,
        }
    }
}

impl From<&ProbeSpec> for CheckerParams {
    fn from(spec: &ProbeSpec) -> Self {
        Self {
            initial_delay: Duration::from_secs(spec.initial_delay_seconds as u64),
            period: Duration::from_secs(spec.period_seconds as u64),
            timeout: Duration::from_secs(spec.timeout_seconds as u64),
            success_threshold: spec.success_threshold.max(1),
            failure_threshold: spec.failure_threshold.max(1),
        }
    }
}

/// Fired at most once per healthy→unhealthy transition. Invoked on its own
/// detached task so a slow or stuck callback cannot stall the probe loop.
pub type OnUnhealthy = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Handle to a running Checker task. Dropping this does not stop the loop —
/// call `stop()` (idempotent) or let the process exit.
pub struct CheckerHandle {
    token: CancellationToken,
    state: Arc<AtomicU8>,
    join: tokio::task::JoinHandle<()>,
}

impl CheckerHandle {
    pub fn status(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::SeqCst))
    }

    /// Idempotent: a second call is a no-op, not an error.
    pub fn stop(&self) {
        self.token.cancel();
    }

    #[cfg(test)]
    pub async fn join(self) {
        let _ = self.join.await;
    }
}

/// Spawn the Checker loop for `probe`. Sleeps `initial_delay`, then on every
/// `period` tick runs one probe and updates the consecutive success/failure
/// counters against the configured thresholds.
pub fn spawn_checker(
    probe: Arc<dyn Probe>,
    params: CheckerParams,
    on_unhealthy: OnUnhealthy,
) -> CheckerHandle {
    let token = CancellationToken::new();
    let state = Arc::new(AtomicU8::new(HealthState::Unknown as u8));

    let loop_token = token.clone();
    let loop_state = Arc::clone(&state);

    let join = tokio::spawn(async move {
        if !params.initial_delay.is_zero() {
            tokio::select! {
                _ = loop_token.cancelled() => return,
                _ = tokio::time::sleep(params.initial_delay) => {}
            }
        }

        let mut consecutive_ok = 0u32;
        let mut consecutive_fail = 0u32;

        loop {
            tokio::select! {
                _ = loop_token.cancelled() => return,
                _ = tokio::time::sleep(params.period) => {}
            }
            if loop_token.is_cancelled() {
                return;
            }

            let result = probe.check(params.timeout).await;
            let previous = HealthState::from(loop_state.load(Ordering::SeqCst));

            if result.success {
                consecutive_fail = 0;
                consecutive_ok += 1;
                debug!(consecutive_ok, "probe succeeded");
                if consecutive_ok >= params.success_threshold {
                    loop_state.store(HealthState::Healthy as u8, Ordering::SeqCst);
                }
            } else {
                consecutive_ok = 0;
                consecutive_fail += 1;
                warn!(consecutive_fail, message = %result.message, "probe failed");
                if consecutive_fail >= params.failure_threshold {
                    loop_state.store(HealthState::Unhealthy as u8, Ordering::SeqCst);
                    if previous != HealthState::Unhealthy {
                        let cb = Arc::clone(&on_unhealthy);
                        tokio::spawn(async move { (cb)().await });
                    }
                }
            }
        }
    });

    CheckerHandle {
        token,
        state,
        join,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeResult;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;
    use tokio::sync::Mutex;

    struct ScriptedProbe {
        outcomes: Mutex<std::vec::IntoIter<bool>>,
    }

    impl ScriptedProbe {
        fn new(outcomes: Vec<bool>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter()),
            }
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn check(&self, _timeout: Duration) -> ProbeResult {
            let mut outcomes = self.outcomes.lock().await;
            match outcomes.next() {
                Some(true) => ProbeResult::success(StdDuration::ZERO),
                Some(false) | None => ProbeResult::failure("scripted failure", StdDuration::ZERO),
            }
        }
    }

    fn fast_params(failure_threshold: u32, success_threshold: u32) -> CheckerParams {
        CheckerParams {
            initial_delay: Duration::ZERO,
            period: Duration::from_millis(5),
            timeout: Duration::from_millis(50),
            success_threshold,
            failure_threshold,
        }
    }

    #[tokio::test]
    async fn test_transitions_to_unhealthy_after_threshold() {
        let probe = Arc::new(ScriptedProbe::new(vec![false, false, false, false]));
        let fire_count = Arc::new(AtomicUsize::new(0));
        let fire_count2 = Arc::clone(&fire_count);
        let on_unhealthy: OnUnhealthy = Arc::new(move || {
            let c = Arc::clone(&fire_count2);
            Box::pin(async move {
                c.fetch_add(1, Ordering::SeqCst);
            })
        });

        let handle = spawn_checker(probe, fast_params(3, 1), on_unhealthy);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(handle.status(), HealthState::Unhealthy);
        handle.stop();
    }

    #[tokio::test]
    async fn test_on_unhealthy_fires_at_most_once_per_transition() {
        let probe = Arc::new(ScriptedProbe::new(vec![
            false, false, false, false, false, false, false, false,
        ]));
        let fire_count = Arc::new(AtomicUsize::new(0));
        let fire_count2 = Arc::clone(&fire_count);
        let on_unhealthy: OnUnhealthy = Arc::new(move || {
            let c = Arc::clone(&fire_count2);
            Box::pin(async move {
                c.fetch_add(1, Ordering::SeqCst);
            })
        });

        let handle = spawn_checker(probe, fast_params(2, 1), on_unhealthy);
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fire_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transitions_to_healthy_after_threshold() {
        let probe = Arc::new(ScriptedProbe::new(vec![true, true, true]));
        let on_unhealthy: OnUnhealthy = Arc::new(|| Box::pin(async move {}));

        let handle = spawn_checker(probe, fast_params(3, 2), on_unhealthy);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(handle.status(), HealthState::Healthy);
        handle.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let probe = Arc::new(ScriptedProbe::new(vec![true; 20]));
        let on_unhealthy: OnUnhealthy = Arc::new(|| Box::pin(async move {}));
        let handle = spawn_checker(probe, fast_params(3, 1), on_unhealthy);
        handle.stop();
        handle.stop();
        handle.join().await;
    }

    #[test]
    fn test_checker_params_from_probe_spec_applies_defaults() {
        let spec = ProbeSpec::tcp(8080);
        let params = CheckerParams::from(&spec);
        assert_eq!(params.period, Duration::from_secs(10));
        assert_eq!(params.failure_threshold, 3);
        assert_eq!(params.success_threshold, 1);
    }
}
