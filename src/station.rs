//! `ChargingStation`: the single value the binary wires at startup,
//! composing the five stores, the queue manager, the charging/identity/
//! report services, and the scheduler (§9 "Global singletons").

use std::sync::Arc;

use tracing::info;

use crate::charging::{ChargingService, Wake};
use crate::config::StationSection;
use crate::domain::{Bill, ChargingPile, ChargingRequest, ChargingSession, Mode, User};
use crate::identity::IdentityService;
use crate::queue::QueueManager;
use crate::reports::ReportService;
use crate::router::Router;
use crate::scheduler::Scheduler;
use crate::store::Store;
use crate::support::Clock;

/// The five stores a `ChargingStation` needs, handed in by whichever
/// backend the caller picked (in-memory for tests, JSON files for the
/// server binary).
pub struct StoreSet {
    pub users: Arc<dyn Store<User>>,
    pub piles: Arc<dyn Store<ChargingPile>>,
    pub sessions: Arc<dyn Store<ChargingSession>>,
    pub bills: Arc<dyn Store<Bill>>,
    pub requests: Arc<dyn Store<ChargingRequest>>,
}

/// Everything the router and scheduler need, built once and shared
/// behind `Arc`s for the lifetime of the process.
pub struct ChargingStation {
    pub identity: Arc<IdentityService>,
    pub charging: Arc<ChargingService>,
    pub reports: Arc<ReportService>,
    pub scheduler: Arc<Scheduler>,
    pub router: Arc<Router>,
}

impl ChargingStation {
    /// Wires a fresh station on top of `stores`: seeds the pile fleet
    /// per `station_cfg`, then builds the queue manager, services, and
    /// scheduler on top of it.
    pub async fn build(station_cfg: &StationSection, clock: Arc<dyn Clock>, stores: StoreSet) -> Self {
        let StoreSet {
            users,
            piles,
            sessions,
            bills,
            requests,
        } = stores;

        seed_piles(&piles, station_cfg).await;

        let queues = Arc::new(QueueManager::new(station_cfg.waiting_capacity));
        let wake: Wake = Arc::new(tokio::sync::Notify::new());

        let charging = Arc::new(ChargingService::new(
            users.clone(),
            piles,
            sessions,
            bills.clone(),
            requests,
            queues,
            clock,
            wake.clone(),
        ));
        let identity = Arc::new(IdentityService::new(users));
        let reports = Arc::new(ReportService::new(bills));
        let scheduler = Arc::new(Scheduler::new(
            charging.clone(),
            wake,
            std::time::Duration::from_secs(station_cfg.scheduler_tick_secs),
        ));
        let router = Arc::new(Router::new(identity.clone(), charging.clone(), reports.clone()));

        Self {
            identity,
            charging,
            reports,
            scheduler,
            router,
        }
    }
}

/// Seeds the pile fleet: `F01..F{fast_pile_count}` and
/// `T01..T{trickle_pile_count}`, matching the source's default layout
/// (2 fast piles at 30 kW, 3 trickle piles at 10 kW) unless overridden
/// by configuration. A no-op for piles already present, so restarting
/// against a populated `JsonFileStore` does not clobber pile counters.
async fn seed_piles(piles: &Arc<dyn Store<ChargingPile>>, cfg: &StationSection) {
    for i in 1..=cfg.fast_pile_count {
        let pile_id = format!("F{i:02}");
        if piles.get(&pile_id).await.is_some() {
            continue;
        }
        let pile = ChargingPile::new(&pile_id, Mode::Fast, cfg.fast_power_kw, cfg.local_queue_capacity);
        piles.put(&pile_id, pile).await;
    }
    for i in 1..=cfg.trickle_pile_count {
        let pile_id = format!("T{i:02}");
        if piles.get(&pile_id).await.is_some() {
            continue;
        }
        let pile = ChargingPile::new(&pile_id, Mode::Trickle, cfg.trickle_power_kw, cfg.local_queue_capacity);
        piles.put(&pile_id, pile).await;
    }
    info!(
        fast = cfg.fast_pile_count,
        trickle = cfg.trickle_pile_count,
        "pile fleet seeded"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::support::SystemClock;

    fn in_memory_stores() -> StoreSet {
        StoreSet {
            users: Arc::new(InMemoryStore::new()),
            piles: Arc::new(InMemoryStore::new()),
            sessions: Arc::new(InMemoryStore::new()),
            bills: Arc::new(InMemoryStore::new()),
            requests: Arc::new(InMemoryStore::new()),
        }
    }

    #[tokio::test]
    async fn build_seeds_the_configured_pile_fleet() {
        let cfg = StationSection::default();
        let station = ChargingStation::build(&cfg, Arc::new(SystemClock), in_memory_stores()).await;
        let piles = station.charging.piles_store().get_all().await;
        assert_eq!(piles.len(), (cfg.fast_pile_count + cfg.trickle_pile_count) as usize);
    }

    #[tokio::test]
    async fn build_does_not_reseed_existing_piles() {
        let cfg = StationSection::default();
        let stores = in_memory_stores();
        stores
            .piles
            .put("F01", ChargingPile::new("F01", Mode::Fast, 999.0, 2))
            .await;
        let station = ChargingStation::build(&cfg, Arc::new(SystemClock), stores).await;
        let f01 = station.charging.piles_store().get("F01").await.unwrap();
        assert_eq!(f01.power_kw, 999.0);
    }
}
