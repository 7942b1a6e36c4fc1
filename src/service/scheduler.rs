//! Periodic re-optimization of the current request.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use super::optimizer::FleetOptimizer;
use crate::providers::{DirectionsProvider, PathGeometryProvider};

/// Background loop that refreshes the current solution on a fixed period.
///
/// Idle until [`start`](Self::start) succeeds, which needs a current
/// solution and a free scheduler slot on the session. Each tick rebuilds
/// the matrix, reruns the classical assigner for the stored request,
/// replaces the current solution and publishes it between a 10 % and a
/// 100 % progress event. A failing tick is logged and the loop waits for
/// the next period.
///
/// The stop signal lives on the session, so [`stop`](Self::stop) on any
/// scheduler sharing that session ends the running loop. It is checked at
/// the top of every iteration and interrupts a pending wait. A tick still
/// in flight when [`reset`](Self::reset) clears the session is discarded.
pub struct ReOptimizationScheduler<D, P> {
    optimizer: Arc<FleetOptimizer<D, P>>,
    period: Duration,
}

impl<D, P> ReOptimizationScheduler<D, P>
where
    D: DirectionsProvider + 'static,
    P: PathGeometryProvider + 'static,
{
    /// Creates an idle scheduler using the optimizer's configured period.
    pub fn new(optimizer: Arc<FleetOptimizer<D, P>>) -> Self {
        let period = optimizer.config().scheduler.period();
        Self { optimizer, period }
    }

    /// Overrides the period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Time between ticks.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether a loop is active on this session.
    pub fn is_running(&self) -> bool {
        self.optimizer.state().is_scheduler_running()
    }

    /// Starts the loop on the current tokio runtime.
    ///
    /// Returns `false` without doing anything when the session has no
    /// current solution or a loop is already running.
    pub fn start(&self) -> bool {
        let state = self.optimizer.state();
        if state.current().is_none() {
            return false;
        }
        let Some(stop) = state.try_claim_scheduler() else {
            return false;
        };

        let optimizer = Arc::clone(&self.optimizer);
        let period = self.period;
        info!(event = "scheduler_start", period_ms = period.as_millis() as u64);
        tokio::spawn(run_loop(optimizer, period, stop));
        true
    }

    /// Asks the session's loop to exit. Returns `false` if none was running.
    pub fn stop(&self) -> bool {
        self.optimizer.state().request_scheduler_stop();
        self.is_running()
    }

    /// Stops the loop and drops the current solution.
    pub fn reset(&self) {
        self.stop();
        self.optimizer.state().clear();
    }
}

async fn run_loop<D, P>(
    optimizer: Arc<FleetOptimizer<D, P>>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) where
    D: DirectionsProvider,
    P: PathGeometryProvider,
{
    let mut ticks: u64 = 0;
    loop {
        if *stop.borrow_and_update() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        ticks += 1;
        match optimizer.reoptimize().await {
            Ok(Some(solution)) => info!(
                event = "scheduler_tick",
                tick = ticks,
                total_distance_km = solution.metrics.total_distance_km
            ),
            Ok(None) => warn!(event = "scheduler_tick", tick = ticks, outcome = "discarded"),
            Err(e) => warn!(event = "scheduler_tick_failed", tick = ticks, error = %e),
        }
    }
    optimizer.state().release_scheduler();
    info!(event = "scheduler_stop", ticks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FleetConfig;
    use crate::error::ProviderError;
    use crate::models::{Coordinate, Location, OptimizationRequest, SolveMethod};
    use crate::providers::{PathGeometry, Unavailable};
    use crate::service::{FleetEvent, SessionState};

    /// Answers after five seconds.
    struct Slow;

    impl PathGeometryProvider for Slow {
        async fn path(&self, stops: &[Coordinate]) -> Result<PathGeometry, ProviderError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let legs = stops.len().saturating_sub(1);
            Ok(PathGeometry {
                polyline: stops.to_vec(),
                leg_distances_m: vec![1000.0; legs],
                leg_durations_s: vec![60.0; legs],
            })
        }
    }

    fn optimizer() -> Arc<FleetOptimizer<Unavailable, Unavailable>> {
        Arc::new(FleetOptimizer::new(
            FleetConfig::default(),
            Unavailable,
            Unavailable,
            Arc::new(SessionState::default()),
        ))
    }

    fn request() -> OptimizationRequest {
        OptimizationRequest::new(
            Location::depot(0.0, 0.0),
            vec![Location::new(0, 0.0, 1.0), Location::new(0, 1.0, 0.0)],
            2,
        )
    }

    async fn wait_until_idle<D, P>(scheduler: &ReOptimizationScheduler<D, P>)
    where
        D: DirectionsProvider + 'static,
        P: PathGeometryProvider + 'static,
    {
        while scheduler.is_running() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_needs_a_solution() {
        let scheduler = ReOptimizationScheduler::new(optimizer());
        assert!(!scheduler.start());
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_noop() {
        let opt = optimizer();
        opt.optimize(&request()).await.unwrap();
        let scheduler = ReOptimizationScheduler::new(Arc::clone(&opt));
        assert!(scheduler.start());
        assert!(!scheduler.start());

        let other = ReOptimizationScheduler::new(opt);
        assert!(!other.start());

        assert!(scheduler.stop());
        wait_until_idle(&scheduler).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_publish_updates() {
        let opt = optimizer();
        opt.optimize(&request()).await.unwrap();
        let first = opt.state().current().unwrap();
        let (_id, mut rx) = opt.state().subscribers().subscribe();

        let scheduler =
            ReOptimizationScheduler::new(Arc::clone(&opt)).with_period(Duration::from_secs(10));
        assert!(scheduler.start());

        let mut updates = Vec::new();
        while updates.len() < 2 {
            match rx.recv().await.unwrap() {
                FleetEvent::Progress { .. } => {}
                update => updates.push(update),
            }
        }
        match updates.remove(0) {
            FleetEvent::SolutionUpdate { solution } => {
                assert_eq!(solution.method, SolveMethod::Classical);
                assert!(!Arc::ptr_eq(&solution, &first));
                assert!(Arc::ptr_eq(&solution, &opt.state().current().unwrap()));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(updates[0], FleetEvent::SolutionUpdate { .. }));

        scheduler.stop();
        wait_until_idle(&scheduler).await;
        assert!(!opt.state().status().scheduler_running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_restart() {
        let opt = optimizer();
        opt.optimize(&request()).await.unwrap();
        let scheduler = ReOptimizationScheduler::new(opt);

        assert!(scheduler.start());
        scheduler.stop();
        wait_until_idle(&scheduler).await;
        assert!(!scheduler.stop());

        assert!(scheduler.start());
        scheduler.stop();
        wait_until_idle(&scheduler).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_solution() {
        let opt = optimizer();
        opt.optimize(&request()).await.unwrap();
        let scheduler = ReOptimizationScheduler::new(Arc::clone(&opt));
        assert!(scheduler.start());

        scheduler.reset();
        wait_until_idle(&scheduler).await;
        assert!(opt.state().current().is_none());
        assert!(!scheduler.start());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_is_bracketed_by_progress() {
        let opt = optimizer();
        opt.optimize(&request()).await.unwrap();
        let (_id, mut rx) = opt.state().subscribers().subscribe();

        let scheduler =
            ReOptimizationScheduler::new(Arc::clone(&opt)).with_period(Duration::from_secs(10));
        assert!(scheduler.start());

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(match rx.recv().await.unwrap() {
                FleetEvent::Progress { percent, .. } => format!("progress {percent}"),
                other => other.kind().to_string(),
            });
        }
        assert_eq!(seen, vec!["progress 10", "solution_update", "progress 100"]);

        scheduler.stop();
        wait_until_idle(&scheduler).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_slow_tick_discards_result() {
        let opt = Arc::new(FleetOptimizer::new(
            FleetConfig::default(),
            Unavailable,
            Slow,
            Arc::new(SessionState::default()),
        ));
        assert!(opt.config().matrix.provider_timeout() > Duration::from_secs(5));
        opt.optimize(&request()).await.unwrap();
        let (_id, mut rx) = opt.state().subscribers().subscribe();

        let scheduler =
            ReOptimizationScheduler::new(Arc::clone(&opt)).with_period(Duration::from_secs(10));
        assert!(scheduler.start());

        // first tick begins at 10s and waits on geometry until 15s
        tokio::time::sleep(Duration::from_secs(12)).await;
        while let Ok(event) = rx.try_recv() {
            assert!(matches!(event, FleetEvent::Progress { .. }));
        }
        scheduler.reset();
        wait_until_idle(&scheduler).await;
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert!(opt.state().current().is_none());
        assert!(opt.state().last_request().is_none());
        while let Ok(event) = rx.try_recv() {
            assert!(
                !matches!(event, FleetEvent::SolutionUpdate { .. }),
                "update published after reset"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_another_handle_ends_loop() {
        let opt = optimizer();
        opt.optimize(&request()).await.unwrap();
        let owner = ReOptimizationScheduler::new(Arc::clone(&opt));
        let other = ReOptimizationScheduler::new(Arc::clone(&opt));

        assert!(owner.start());
        assert!(other.stop());
        wait_until_idle(&owner).await;
        assert!(!owner.is_running());
        assert!(!other.stop());

        assert!(other.start());
        assert!(owner.stop());
        wait_until_idle(&other).await;
    }
}
