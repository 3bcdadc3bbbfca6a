//! Optional batch dispatcher (§4.7): best-pile-by-total-time
//! selection, as an alternative to plain per-pile FCFS.

use crate::domain::{ChargingPile, ChargingRequest, Mode, PileState};

/// For request `r` of mode `mode`, pick the pile minimizing
/// `total_time(pile) = (Σ queued kwh at pile) / pile.power_kw +
/// r.kwh / pile.power_kw` among non-faulty, non-offline piles of the
/// matching mode. `queued_kwh_by_pile` supplies the numerator for each
/// candidate pile (kwh already committed ahead of `r` there); piles
/// absent from the map are treated as having nothing queued.
pub fn best_pile_for<'a>(
    request: &ChargingRequest,
    mode: Mode,
    candidates: impl Iterator<Item = &'a ChargingPile>,
    queued_kwh_by_pile: &std::collections::HashMap<String, f64>,
) -> Option<&'a ChargingPile> {
    candidates
        .filter(|p| p.mode == mode)
        .filter(|p| !matches!(p.state, PileState::Faulty | PileState::Offline))
        .min_by(|a, b| {
            total_time(a, request, queued_kwh_by_pile)
                .partial_cmp(&total_time(b, request, queued_kwh_by_pile))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

fn total_time(pile: &ChargingPile, request: &ChargingRequest, queued_kwh_by_pile: &std::collections::HashMap<String, f64>) -> f64 {
    let queued_kwh = queued_kwh_by_pile.get(&pile.pile_id).copied().unwrap_or(0.0);
    (queued_kwh + request.requested_kwh) / pile.power_kw
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn pile(id: &str, mode: Mode, power_kw: f64) -> ChargingPile {
        ChargingPile::new(id, mode, power_kw, 2)
    }

    fn request(kwh: f64) -> ChargingRequest {
        ChargingRequest::new("CAR-A", Mode::Fast, kwh, chrono::Utc::now())
    }

    #[test]
    fn prefers_the_pile_with_less_queued_work() {
        let piles = vec![pile("F01", Mode::Fast, 30.0), pile("F02", Mode::Fast, 30.0)];
        let mut queued = HashMap::new();
        queued.insert("F01".to_string(), 60.0);
        queued.insert("F02".to_string(), 0.0);

        let r = request(10.0);
        let chosen = best_pile_for(&r, Mode::Fast, piles.iter(), &queued).unwrap();
        assert_eq!(chosen.pile_id, "F02");
    }

    #[test]
    fn ignores_faulty_and_offline_piles() {
        let mut p1 = pile("F01", Mode::Fast, 30.0);
        p1.state = PileState::Faulty;
        let p2 = pile("F02", Mode::Fast, 7.0);
        let piles = vec![p1, p2];
        let queued = HashMap::new();

        let r = request(10.0);
        let chosen = best_pile_for(&r, Mode::Fast, piles.iter(), &queued).unwrap();
        assert_eq!(chosen.pile_id, "F02");
    }

    #[test]
    fn ignores_piles_of_the_wrong_mode() {
        let piles = vec![pile("T01", Mode::Trickle, 7.0)];
        let queued = HashMap::new();
        let r = request(10.0);
        assert!(best_pile_for(&r, Mode::Fast, piles.iter(), &queued).is_none());
    }
}
