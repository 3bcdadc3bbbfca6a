//! The scheduler (§4.6): a repeating tick plus an on-demand wake,
//! selecting between plain FCFS and the optional batch dispatcher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::charging::{ChargingService, Wake};
use crate::domain::{ChargingPile, ChargingRequest, PileState};
use crate::scheduler::dispatcher::best_pile_for;
use crate::support::ShutdownSignal;

/// Default tick interval (§4.6).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

pub struct Scheduler {
    charging: Arc<ChargingService>,
    wake: Wake,
    tick_interval: Duration,
    dispatcher_enabled: AtomicBool,
}

impl Scheduler {
    pub fn new(charging: Arc<ChargingService>, wake: Wake, tick_interval: Duration) -> Self {
        Self {
            charging,
            wake,
            tick_interval,
            dispatcher_enabled: AtomicBool::new(false),
        }
    }

    /// Toggle the optional best-pile-by-total-time dispatcher (§4.7).
    /// Defaults to off (plain FCFS, §4.6).
    pub fn set_dispatcher_enabled(&self, enabled: bool) {
        self.dispatcher_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn dispatcher_enabled(&self) -> bool {
        self.dispatcher_enabled.load(Ordering::SeqCst)
    }

    /// Runs until `shutdown` fires, ticking on its own interval and
    /// whenever `wake` is notified.
    pub async fn run(&self, shutdown: ShutdownSignal) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let shutdown_wait = shutdown.notified();
        tokio::pin!(shutdown_wait);

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = self.wake.notified() => self.tick().await,
                _ = &mut shutdown_wait => {
                    debug!("scheduler stopping on shutdown signal");
                    break;
                }
            }
        }
    }

    async fn tick(&self) {
        if self.dispatcher_enabled.load(Ordering::SeqCst) {
            self.dispatch_tick().await;
        } else {
            self.fcfs_tick().await;
        }
    }

    /// §4.6 step 2: for each idle pile, in pile_id order, dequeue the
    /// next request of its mode and start charging. A failed
    /// `start_charging` puts the request back at the head of its
    /// queue and moves on to the next pile.
    async fn fcfs_tick(&self) {
        let mut piles = self.charging.piles_store().get_all().await;
        piles.sort_by(|a, b| a.pile_id.cmp(&b.pile_id));

        for pile in piles {
            if pile.state != PileState::Idle {
                continue;
            }
            let Some(car_id) = self.charging.queues().dequeue(pile.mode) else {
                continue;
            };
            self.assign(&pile.pile_id, pile.mode, &car_id).await;
        }
    }

    /// §4.7: replaces per-pile FCFS with a best-pile-by-total-time
    /// choice for each request still waiting in its mode's queue, in
    /// FIFO order, until every idle pile of that mode is spoken for.
    async fn dispatch_tick(&self) {
        let piles = self.charging.piles_store().get_all().await;
        let requests_by_car: HashMap<String, ChargingRequest> = self
            .charging
            .requests_store()
            .get_all()
            .await
            .into_iter()
            .map(|r| (r.car_id.clone(), r))
            .collect();

        let mut idle_by_mode: HashMap<_, Vec<&ChargingPile>> = HashMap::new();
        for pile in &piles {
            if pile.state == PileState::Idle {
                idle_by_mode.entry(pile.mode).or_default().push(pile);
            }
        }

        let queued_kwh_by_pile: HashMap<String, f64> = HashMap::new();
        let mut assigned_piles: std::collections::HashSet<String> = std::collections::HashSet::new();

        for mode in [crate::domain::Mode::Fast, crate::domain::Mode::Trickle] {
            for car_id in self.charging.queues().snapshot(mode) {
                let Some(request) = requests_by_car.get(&car_id) else {
                    continue;
                };
                let candidates: Vec<&ChargingPile> = idle_by_mode
                    .get(&mode)
                    .into_iter()
                    .flatten()
                    .filter(|p| !assigned_piles.contains(&p.pile_id))
                    .copied()
                    .collect();
                let Some(pile) = best_pile_for(request, mode, candidates.into_iter(), &queued_kwh_by_pile) else {
                    continue;
                };
                let pile_id = pile.pile_id.clone();
                if !self.charging.queues().remove(mode, &car_id) {
                    continue;
                }
                assigned_piles.insert(pile_id.clone());
                self.assign(&pile_id, mode, &car_id).await;
            }
        }
    }

    async fn assign(&self, pile_id: &str, mode: crate::domain::Mode, car_id: &str) {
        if let Err(err) = self.charging.start_charging(pile_id, car_id).await {
            error!(pile_id, car_id, %err, "start_charging failed, re-queuing at head");
            self.charging.queues().enqueue_head(mode, car_id);
        }
    }
}
