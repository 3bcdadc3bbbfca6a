//! Queue manager (§4.3): per-mode main queues, stable queue-number
//! allocation, and priority re-queue for fault recovery.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::Mode;
use crate::support::DomainError;

fn mode_index(mode: Mode) -> usize {
    match mode {
        Mode::Fast => 0,
        Mode::Trickle => 1,
    }
}

struct QueueState {
    /// car_ids waiting, one queue per mode. The canonical
    /// `ChargingRequest` record lives in the entity store; the queue
    /// holds only the reference.
    main: [VecDeque<String>; 2],
    next_number: [u64; 2],
    last_date: Option<NaiveDate>,
}

impl QueueState {
    fn new() -> Self {
        Self {
            main: [VecDeque::new(), VecDeque::new()],
            next_number: [0, 0],
            last_date: None,
        }
    }

    fn reset_counters_if_new_day(&mut self, today: NaiveDate) {
        if self.last_date != Some(today) {
            self.next_number = [0, 0];
            self.last_date = Some(today);
        }
    }
}

/// Two ordered main queues (one per mode) plus a shared waiting-area
/// capacity, behind a single mutex.
pub struct QueueManager {
    state: Mutex<QueueState>,
    waiting_capacity: usize,
}

impl QueueManager {
    pub fn new(waiting_capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::new()),
            waiting_capacity,
        }
    }

    /// Assign a fresh queue number and append `car_id` to the back of
    /// `mode`'s main queue. Fails with [`DomainError::Capacity`] if the
    /// queue already holds `waiting_capacity` entries.
    pub fn enqueue(&self, mode: Mode, car_id: &str, now: DateTime<Utc>) -> Result<String, DomainError> {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        let idx = mode_index(mode);

        if state.main[idx].len() >= self.waiting_capacity {
            return Err(DomainError::Capacity(format!(
                "waiting area for {mode} is full ({} entries)",
                self.waiting_capacity
            )));
        }

        state.reset_counters_if_new_day(now.date_naive());
        state.next_number[idx] += 1;
        let queue_number = format!("{}{}", mode.letter(), state.next_number[idx]);
        state.main[idx].push_back(car_id.to_string());
        Ok(queue_number)
    }

    /// Re-insert `car_id` at the head of `mode`'s main queue, preserving
    /// its already-assigned queue number. Used to give fault-interrupted
    /// requests priority (§4.5 `report_fault`).
    pub fn enqueue_head(&self, mode: Mode, car_id: &str) {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        state.main[mode_index(mode)].push_front(car_id.to_string());
    }

    /// Remove and return the car_id at the head of `mode`'s main queue.
    pub fn dequeue(&self, mode: Mode) -> Option<String> {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        state.main[mode_index(mode)].pop_front()
    }

    /// Remove a specific `car_id` from `mode`'s main queue wherever it
    /// sits, preserving the relative order of the rest. Used by the
    /// batch dispatcher (§4.7), which may pick a pile for a request
    /// that isn't at the head of its queue.
    pub fn remove(&self, mode: Mode, car_id: &str) -> bool {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        let queue = &mut state.main[mode_index(mode)];
        if let Some(pos) = queue.iter().position(|c| c == car_id) {
            queue.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn length(&self, mode: Mode) -> usize {
        self.state.lock().expect("queue mutex poisoned").main[mode_index(mode)].len()
    }

    /// A FIFO-ordered snapshot of car_ids currently waiting in `mode`'s
    /// main queue, for admin views.
    pub fn snapshot(&self, mode: Mode) -> Vec<String> {
        self.state.lock().expect("queue mutex poisoned").main[mode_index(mode)]
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, 9, 0, 0).unwrap()
    }

    #[test]
    fn queue_numbers_increase_per_mode() {
        let q = QueueManager::new(10);
        assert_eq!(q.enqueue(Mode::Fast, "A", now()).unwrap(), "F1");
        assert_eq!(q.enqueue(Mode::Trickle, "B", now()).unwrap(), "T1");
        assert_eq!(q.enqueue(Mode::Fast, "C", now()).unwrap(), "F2");
    }

    #[test]
    fn capacity_is_enforced_per_mode() {
        let q = QueueManager::new(2);
        q.enqueue(Mode::Fast, "A", now()).unwrap();
        q.enqueue(Mode::Fast, "B", now()).unwrap();
        let err = q.enqueue(Mode::Fast, "C", now()).unwrap_err();
        assert_eq!(err.kind(), "capacity");
        // Trickle is unaffected by fast's capacity.
        assert!(q.enqueue(Mode::Trickle, "D", now()).is_ok());
    }

    #[test]
    fn dequeue_is_fifo() {
        let q = QueueManager::new(10);
        q.enqueue(Mode::Fast, "A", now()).unwrap();
        q.enqueue(Mode::Fast, "B", now()).unwrap();
        assert_eq!(q.dequeue(Mode::Fast), Some("A".to_string()));
        assert_eq!(q.dequeue(Mode::Fast), Some("B".to_string()));
        assert_eq!(q.dequeue(Mode::Fast), None);
    }

    #[test]
    fn enqueue_head_jumps_the_line() {
        let q = QueueManager::new(10);
        q.enqueue(Mode::Fast, "A", now()).unwrap();
        q.enqueue(Mode::Fast, "B", now()).unwrap();
        q.enqueue_head(Mode::Fast, "C");
        assert_eq!(q.snapshot(Mode::Fast), vec!["C", "A", "B"]);
    }

    #[test]
    fn counters_reset_on_day_roll() {
        let q = QueueManager::new(10);
        let day1 = Utc.with_ymd_and_hms(2026, 7, 27, 23, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 7, 28, 0, 30, 0).unwrap();
        assert_eq!(q.enqueue(Mode::Fast, "A", day1).unwrap(), "F1");
        q.dequeue(Mode::Fast);
        assert_eq!(q.enqueue(Mode::Fast, "B", day2).unwrap(), "F1");
    }
}
