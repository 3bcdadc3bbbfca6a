//! Charging service (§4.5): request creation, session start/end, and
//! the fault/recovery protocol. This is where the core's real
//! invariants are enforced — at most one session per pile, at most
//! one active request/session per car, and the store→queue→pile lock
//! ordering the rest of the engine relies on.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::billing::build_bill;
use crate::domain::{
    Bill, ChargingPile, ChargingRequest, ChargingSession, Mode, PileState, RequestState, User,
};
use crate::queue::QueueManager;
use crate::store::Store;
use crate::support::{generate_id, Clock, DomainError, DomainResult};

/// Notified after any event that may let the scheduler make progress:
/// a request was admitted, a pile recovered, a pile went online, or a
/// session ended and freed its pile.
pub type Wake = Arc<tokio::sync::Notify>;

pub struct ChargingService {
    users: Arc<dyn Store<User>>,
    piles: Arc<dyn Store<ChargingPile>>,
    sessions: Arc<dyn Store<ChargingSession>>,
    bills: Arc<dyn Store<Bill>>,
    requests: Arc<dyn Store<ChargingRequest>>,
    queues: Arc<QueueManager>,
    clock: Arc<dyn Clock>,
    wake: Wake,
}

impl ChargingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn Store<User>>,
        piles: Arc<dyn Store<ChargingPile>>,
        sessions: Arc<dyn Store<ChargingSession>>,
        bills: Arc<dyn Store<Bill>>,
        requests: Arc<dyn Store<ChargingRequest>>,
        queues: Arc<QueueManager>,
        clock: Arc<dyn Clock>,
        wake: Wake,
    ) -> Self {
        Self {
            users,
            piles,
            sessions,
            bills,
            requests,
            queues,
            clock,
            wake,
        }
    }

    async fn car_is_registered(&self, car_id: &str) -> bool {
        self.users.get_all().await.iter().any(|u| u.car.car_id == car_id)
    }

    async fn find_session_by_car(&self, car_id: &str) -> Option<ChargingSession> {
        self.sessions
            .get_all()
            .await
            .into_iter()
            .find(|s| s.car_id == car_id)
    }

    /// §4.5 `create_request`.
    pub async fn create_request(
        &self,
        car_id: &str,
        mode: Mode,
        requested_kwh: f64,
    ) -> DomainResult<ChargingRequest> {
        if requested_kwh <= 0.0 {
            return Err(DomainError::Validation("amount must be > 0".to_string()));
        }
        if !self.car_is_registered(car_id).await {
            return Err(DomainError::NotFound {
                entity: "car",
                id: car_id.to_string(),
            });
        }
        if let Some(existing) = self.requests.get(car_id).await {
            if existing.state.is_active() {
                return Err(DomainError::Conflict(format!(
                    "car {car_id} already has an active request"
                )));
            }
        }

        let now = self.clock.now();
        let queue_number = self.queues.enqueue(mode, car_id, now)?;

        let mut request = ChargingRequest::new(car_id, mode, requested_kwh, now);
        request.queue_number = Some(queue_number.clone());
        self.requests.put(car_id, request.clone()).await;

        info!(car_id, %mode, %queue_number, "request admitted");
        self.wake.notify_one();
        Ok(request)
    }

    /// §4.5 `start_charging`. Called by the scheduler with a pile it
    /// has already confirmed is IDLE and a request dequeued from that
    /// pile's mode.
    pub async fn start_charging(&self, pile_id: &str, car_id: &str) -> DomainResult<ChargingSession> {
        let mut pile = self.piles.get(pile_id).await.ok_or(DomainError::NotFound {
            entity: "pile",
            id: pile_id.to_string(),
        })?;
        if pile.state != PileState::Idle {
            return Err(DomainError::State(format!("pile {pile_id} is not idle")));
        }

        let mut request = self.requests.get(car_id).await.ok_or(DomainError::NotFound {
            entity: "request",
            id: car_id.to_string(),
        })?;
        if !matches!(request.state, RequestState::WaitingMain | RequestState::WaitingAtPile) {
            return Err(DomainError::State(format!(
                "request for {car_id} is not waiting"
            )));
        }

        let now = self.clock.now();
        let session = ChargingSession {
            session_id: generate_id(),
            car_id: car_id.to_string(),
            pile_id: pile_id.to_string(),
            mode: pile.mode,
            power_kw: pile.power_kw,
            start_time: now,
            requested_kwh: request.requested_kwh,
        };
        self.sessions.put(&session.session_id, session.clone()).await;

        pile.state = PileState::Charging;
        pile.current_session_id = Some(session.session_id.clone());
        self.piles.put(pile_id, pile).await;

        request.state = RequestState::Charging;
        request.pile_id = Some(pile_id.to_string());
        self.requests.put(car_id, request).await;

        info!(car_id, pile_id, session_id = %session.session_id, "charging started");
        Ok(session)
    }

    /// §4.5 `end_charging`.
    pub async fn end_charging(&self, car_id: &str) -> DomainResult<Bill> {
        let session = self.find_session_by_car(car_id).await.ok_or(DomainError::NotFound {
            entity: "session",
            id: car_id.to_string(),
        })?;

        let mut pile = self.piles.get(&session.pile_id).await.ok_or(DomainError::NotFound {
            entity: "pile",
            id: session.pile_id.clone(),
        })?;

        let now = self.clock.now();
        let bill = build_bill(&session, now);
        self.bills.put(&bill.bill_id, bill.clone()).await;

        let elapsed_hours = (now - session.start_time).num_milliseconds() as f64 / 3_600_000.0;
        pile.counters.sessions_served += 1;
        pile.counters.total_charging_hours += elapsed_hours.max(0.0);
        pile.counters.total_energy_kwh += bill.delivered_kwh;
        pile.counters.total_income += bill.total_fee;
        pile.state = PileState::Idle;
        pile.current_session_id = None;
        self.piles.put(&session.pile_id, pile).await;

        self.sessions.delete(&session.session_id).await;

        if let Some(mut request) = self.requests.get(car_id).await {
            request.state = RequestState::Completed;
            self.requests.put(car_id, request).await;
        }

        info!(car_id, bill_id = %bill.bill_id, total_fee = bill.total_fee, "charging ended");
        self.wake.notify_one();
        Ok(bill)
    }

    /// §4.5 `report_fault`. Does not produce a partial bill — an
    /// explicit, source-preserved simplification (§9).
    pub async fn report_fault(&self, pile_id: &str) -> DomainResult<()> {
        let mut pile = self.piles.get(pile_id).await.ok_or(DomainError::NotFound {
            entity: "pile",
            id: pile_id.to_string(),
        })?;

        pile.state = PileState::Faulty;

        if let Some(session_id) = pile.current_session_id.take() {
            if let Some(session) = self.sessions.get(&session_id).await {
                if let Some(mut request) = self.requests.get(&session.car_id).await {
                    request.state = RequestState::WaitingMain;
                    request.pile_id = None;
                    self.requests.put(&session.car_id, request).await;
                    self.queues.enqueue_head(session.mode, &session.car_id);
                    warn!(pile_id, car_id = %session.car_id, "pile fault: request re-queued at head");
                }
                self.sessions.delete(&session_id).await;
            }
        }

        self.piles.put(pile_id, pile).await;
        self.wake.notify_one();
        Ok(())
    }

    /// §4.5 `recover`.
    pub async fn recover(&self, pile_id: &str) -> DomainResult<()> {
        let mut pile = self.piles.get(pile_id).await.ok_or(DomainError::NotFound {
            entity: "pile",
            id: pile_id.to_string(),
        })?;
        if pile.state != PileState::Faulty {
            return Err(DomainError::State(format!("pile {pile_id} is not faulty")));
        }
        pile.state = PileState::Idle;
        self.piles.put(pile_id, pile).await;
        info!(pile_id, "pile recovered");
        self.wake.notify_one();
        Ok(())
    }

    /// §4.5 `admin_set_online`.
    pub async fn admin_set_online(&self, pile_id: &str, online: bool) -> DomainResult<()> {
        let mut pile = self.piles.get(pile_id).await.ok_or(DomainError::NotFound {
            entity: "pile",
            id: pile_id.to_string(),
        })?;

        if online {
            if pile.state != PileState::Offline {
                return Err(DomainError::State(format!("pile {pile_id} is not offline")));
            }
            pile.state = PileState::Idle;
        } else {
            if pile.state != PileState::Idle {
                return Err(DomainError::State(format!(
                    "pile {pile_id} must be idle to take offline"
                )));
            }
            pile.state = PileState::Offline;
        }
        self.piles.put(pile_id, pile).await;
        if online {
            self.wake.notify_one();
        }
        Ok(())
    }

    pub fn piles_store(&self) -> &Arc<dyn Store<ChargingPile>> {
        &self.piles
    }

    pub fn requests_store(&self) -> &Arc<dyn Store<ChargingRequest>> {
        &self.requests
    }

    pub fn sessions_store(&self) -> &Arc<dyn Store<ChargingSession>> {
        &self.sessions
    }

    pub fn bills_store(&self) -> &Arc<dyn Store<Bill>> {
        &self.bills
    }

    pub fn queues(&self) -> &Arc<QueueManager> {
        &self.queues
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Car;
    use crate::store::InMemoryStore;
    use crate::support::SystemClock;
    use chrono::TimeZone;

    fn harness() -> (ChargingService, Arc<dyn Store<ChargingPile>>) {
        let users: Arc<dyn Store<User>> = Arc::new(InMemoryStore::new());
        let piles: Arc<dyn Store<ChargingPile>> = Arc::new(InMemoryStore::new());
        let sessions: Arc<dyn Store<ChargingSession>> = Arc::new(InMemoryStore::new());
        let bills: Arc<dyn Store<Bill>> = Arc::new(InMemoryStore::new());
        let requests: Arc<dyn Store<ChargingRequest>> = Arc::new(InMemoryStore::new());
        let queues = Arc::new(QueueManager::new(10));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let wake: Wake = Arc::new(tokio::sync::Notify::new());

        let service = ChargingService::new(
            users.clone(),
            piles.clone(),
            sessions,
            bills,
            requests,
            queues,
            clock,
            wake,
        );
        (service, piles)
    }

    async fn register_car(service: &ChargingService, car_id: &str) {
        let user = User {
            user_id: format!("user-{car_id}"),
            password_digest: "x".to_string(),
            car: Car {
                car_id: car_id.to_string(),
                user_id: format!("user-{car_id}"),
                battery_capacity_kwh: 50.0,
            },
        };
        service.users.put(&user.user_id, user).await;
    }

    #[tokio::test]
    async fn create_request_rejects_unregistered_car() {
        let (service, _) = harness();
        let err = service
            .create_request("CAR-GHOST", Mode::Fast, 10.0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn create_request_rejects_second_active_request() {
        let (service, _) = harness();
        register_car(&service, "CAR-A").await;
        service.create_request("CAR-A", Mode::Fast, 10.0).await.unwrap();
        let err = service
            .create_request("CAR-A", Mode::Fast, 5.0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn full_lifecycle_produces_bill_and_frees_pile() {
        let (service, piles) = harness();
        register_car(&service, "CAR-A").await;
        service.create_request("CAR-A", Mode::Fast, 10.0).await.unwrap();

        let pile = ChargingPile::new("F01", Mode::Fast, 30.0, 2);
        piles.put("F01", pile).await;

        service.start_charging("F01", "CAR-A").await.unwrap();
        let pile_after_start = piles.get("F01").await.unwrap();
        assert_eq!(pile_after_start.state, PileState::Charging);
        assert!(pile_after_start.invariant_holds());

        let bill = service.end_charging("CAR-A").await.unwrap();
        assert_eq!(bill.car_id, "CAR-A");

        let pile_after_end = piles.get("F01").await.unwrap();
        assert_eq!(pile_after_end.state, PileState::Idle);
        assert!(pile_after_end.invariant_holds());
        assert_eq!(pile_after_end.counters.sessions_served, 1);
    }

    #[tokio::test]
    async fn report_fault_requeues_at_head_with_no_partial_bill() {
        let (service, piles) = harness();
        register_car(&service, "CAR-A").await;
        register_car(&service, "CAR-B").await;
        service.create_request("CAR-A", Mode::Fast, 10.0).await.unwrap();
        service.create_request("CAR-B", Mode::Fast, 5.0).await.unwrap();

        piles.put("F01", ChargingPile::new("F01", Mode::Fast, 30.0, 2)).await;
        service.start_charging("F01", "CAR-A").await.unwrap();

        service.report_fault("F01").await.unwrap();

        let pile = piles.get("F01").await.unwrap();
        assert_eq!(pile.state, PileState::Faulty);
        assert!(pile.current_session_id.is_none());
        assert_eq!(service.bills.get_all().await.len(), 0);

        // CAR-A is back at the head of the main queue, ahead of CAR-B.
        assert_eq!(service.queues.snapshot(Mode::Fast), vec!["CAR-A", "CAR-B"]);

        let request = service.requests.get("CAR-A").await.unwrap();
        assert_eq!(request.state, RequestState::WaitingMain);
    }

    #[test]
    fn timestamp_sanity() {
        let t = Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap();
        assert_eq!(t.timestamp(), t.timestamp());
    }
}
