//! Reports (§4.10): per-pile aggregation of Bills into day/week/month
//! buckets. The source has no implementation for this action; this
//! resolves the open question by aggregating Bills (not the pile's
//! all-time cumulative counters, which aren't bucketed by time).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Bill;
use crate::store::Store;

/// The bucket granularity requested for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Day,
    Week,
    Month,
}

impl Bucket {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "day" => Some(Bucket::Day),
            "week" => Some(Bucket::Week),
            "month" => Some(Bucket::Month),
            _ => None,
        }
    }

    fn contains(self, end_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Bucket::Day => end_time.date_naive() == now.date_naive(),
            Bucket::Week => end_time.iso_week() == now.iso_week(),
            Bucket::Month => end_time.year() == now.year() && end_time.month() == now.month(),
        }
    }
}

/// One pile's aggregated totals for the requested bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub pile_id: String,
    pub sessions: u64,
    pub total_energy_kwh: f64,
    pub total_income: f64,
}

pub struct ReportService {
    bills: Arc<dyn Store<Bill>>,
}

impl ReportService {
    pub fn new(bills: Arc<dyn Store<Bill>>) -> Self {
        Self { bills }
    }

    /// §4.10 `get_reports`: one row per pile that billed at least one
    /// session within `bucket`, ordered by `pile_id`.
    pub async fn get_reports(&self, bucket: Bucket, now: DateTime<Utc>) -> Vec<ReportRow> {
        let mut totals: BTreeMap<String, ReportRow> = BTreeMap::new();

        for bill in self.bills.get_all().await {
            if !bucket.contains(bill.end_time, now) {
                continue;
            }
            let row = totals.entry(bill.pile_id.clone()).or_insert_with(|| ReportRow {
                pile_id: bill.pile_id.clone(),
                sessions: 0,
                total_energy_kwh: 0.0,
                total_income: 0.0,
            });
            row.sessions += 1;
            row.total_energy_kwh += bill.delivered_kwh;
            row.total_income += bill.total_fee;
        }

        totals.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Mode;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;

    fn bill(pile_id: &str, end_time: DateTime<Utc>, kwh: f64, fee: f64) -> Bill {
        Bill {
            bill_id: format!("bill-{pile_id}-{end_time}"),
            car_id: "CAR-A".to_string(),
            pile_id: pile_id.to_string(),
            start_time: end_time - chrono::Duration::hours(1),
            end_time,
            delivered_kwh: kwh,
            mode: Mode::Fast,
            charge_fee: fee * 0.6,
            service_fee: fee * 0.4,
            total_fee: fee,
        }
    }

    #[tokio::test]
    async fn day_bucket_excludes_yesterdays_bills() {
        let bills: Arc<dyn Store<Bill>> = Arc::new(InMemoryStore::new());
        let today = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2026, 7, 26, 12, 0, 0).unwrap();

        bills.put("b1", bill("F01", today, 10.0, 16.5)).await;
        bills.put("b2", bill("F01", yesterday, 5.0, 8.0)).await;

        let report = ReportService::new(bills);
        let rows = report.get_reports(Bucket::Day, today).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sessions, 1);
        assert!((rows[0].total_energy_kwh - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn month_bucket_aggregates_across_piles() {
        let bills: Arc<dyn Store<Bill>> = Arc::new(InMemoryStore::new());
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
        let earlier_in_month = Utc.with_ymd_and_hms(2026, 7, 2, 8, 0, 0).unwrap();

        bills.put("b1", bill("F01", now, 10.0, 16.5)).await;
        bills.put("b2", bill("F01", earlier_in_month, 5.0, 8.0)).await;
        bills.put("b3", bill("T01", now, 3.0, 4.5)).await;

        let report = ReportService::new(bills);
        let mut rows = report.get_reports(Bucket::Month, now).await;
        rows.sort_by(|a, b| a.pile_id.cmp(&b.pile_id));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pile_id, "F01");
        assert_eq!(rows[0].sessions, 2);
        assert!((rows[0].total_energy_kwh - 15.0).abs() < 1e-9);
        assert_eq!(rows[1].pile_id, "T01");
        assert_eq!(rows[1].sessions, 1);
    }
}
