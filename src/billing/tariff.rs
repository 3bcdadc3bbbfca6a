//! Time-of-use tariff table and segmented cost computation (§4.1).

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Peak rate, currency per kWh: [10:00,15:00) and [18:00,21:00).
pub const PEAK_RATE: f64 = 1.00;
/// Normal rate, currency per kWh: [07:00,10:00), [15:00,18:00), [21:00,23:00).
pub const NORMAL_RATE: f64 = 0.70;
/// Valley rate, currency per kWh: [23:00,24:00) and [00:00,07:00).
pub const VALLEY_RATE: f64 = 0.40;
/// Flat service rate, currency per kWh delivered.
pub const SERVICE_RATE: f64 = 0.80;

/// Hour-of-day boundaries that bound a tariff segment.
const BOUNDARY_HOURS: [u32; 7] = [0, 7, 10, 15, 18, 21, 23];

fn rate_at(t: DateTime<Utc>) -> f64 {
    let hour = t.hour();
    if (10..15).contains(&hour) || (18..21).contains(&hour) {
        PEAK_RATE
    } else if (7..10).contains(&hour) || (15..18).contains(&hour) || (21..23).contains(&hour) {
        NORMAL_RATE
    } else {
        VALLEY_RATE
    }
}

/// The next tariff-segment boundary strictly after `t`, rolling over
/// to the next day's first boundary (00:00) when `t` is already past
/// every boundary for its own day (i.e. in [23:00, 24:00)).
fn next_boundary(t: DateTime<Utc>) -> DateTime<Utc> {
    let day = t.date_naive();
    for hour in BOUNDARY_HOURS {
        let candidate = day
            .and_hms_opt(hour, 0, 0)
            .expect("valid boundary hour")
            .and_utc();
        if candidate > t {
            return candidate;
        }
    }
    let next_day = day.succ_opt().expect("day after t is representable");
    next_day
        .and_hms_opt(0, 0, 0)
        .expect("midnight is valid")
        .and_utc()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Split `delivered_kwh` proportionally to elapsed time across tariff
/// segments between `start` and `end`, returning (charge_fee,
/// service_fee, total_fee) rounded to 2 decimal places.
///
/// Returns all-zero fees if `end` is not strictly after `start`.
pub fn compute_cost(delivered_kwh: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> (f64, f64, f64) {
    let total_hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
    if total_hours <= 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let mut charge_fee = 0.0;
    let mut cursor = start;
    while cursor < end {
        let boundary = next_boundary(cursor).min(end);
        let segment_hours = (boundary - cursor).num_milliseconds() as f64 / 3_600_000.0;
        let segment_kwh = delivered_kwh * segment_hours / total_hours;
        charge_fee += segment_kwh * rate_at(cursor);
        cursor = boundary;
    }

    let service_fee = delivered_kwh * SERVICE_RATE;
    let total_fee = charge_fee + service_fee;
    (round2(charge_fee), round2(service_fee), round2(total_fee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, hour, minute, 0).unwrap()
    }

    #[test]
    fn one_kwh_entirely_peak() {
        let (charge, _, _) = compute_cost(1.0, at(10, 0), at(14, 0));
        assert!((charge - 1.00).abs() < 1e-9);
    }

    #[test]
    fn one_kwh_entirely_valley() {
        let (charge, _, _) = compute_cost(1.0, at(23, 0), at(23, 59));
        assert!((charge - 0.40).abs() < 1e-9);
    }

    #[test]
    fn spans_normal_to_peak_boundary() {
        let (charge, _, _) = compute_cost(1.0, at(9, 30), at(10, 30));
        assert!((charge - 0.85).abs() < 1e-9);
    }

    #[test]
    fn scenario_five_trickle_hour() {
        let (charge, service, total) = compute_cost(10.0, at(14, 30), at(15, 30));
        assert!((charge - 8.50).abs() < 1e-9);
        assert!((service - 8.00).abs() < 1e-9);
        assert!((total - 16.50).abs() < 1e-9);
    }

    #[test]
    fn non_positive_duration_yields_zero_fees() {
        assert_eq!(compute_cost(5.0, at(10, 0), at(10, 0)), (0.0, 0.0, 0.0));
    }

    #[test]
    fn total_fee_is_non_decreasing_in_end_time() {
        let start = at(8, 0);
        let mut previous_total = 0.0;
        for minutes in [10, 30, 60, 120, 180] {
            let end = start + chrono::Duration::minutes(minutes);
            let (_, _, total) = compute_cost(3.0, start, end);
            assert!(total >= previous_total);
            previous_total = total;
        }
    }

    #[test]
    fn crosses_midnight() {
        let (charge, _, _) = compute_cost(2.0, at(22, 0), at(2, 0) + chrono::Duration::days(1));
        // [22,23) normal, [23,24) valley, [0,2) valley -> weighted average
        let expected = (1.0 * NORMAL_RATE + 1.0 * VALLEY_RATE + 2.0 * VALLEY_RATE) / 4.0 * 2.0;
        assert!((charge - expected).abs() < 1e-9);
    }
}
