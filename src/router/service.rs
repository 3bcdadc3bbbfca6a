//! Request router (§4.8): maps the nine wire actions onto the charging
//! station's services. Every response has shape `{status, message?,
//! data?}`; unknown actions and malformed payloads become `error`
//! responses rather than panics.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;

use crate::charging::ChargingService;
use crate::domain::Mode;
use crate::identity::IdentityService;
use crate::reports::{Bucket, ReportService};
use crate::router::dto::{Status, WireRequest, WireResponse};
use crate::support::DomainError;

pub struct Router {
    identity: Arc<IdentityService>,
    charging: Arc<ChargingService>,
    reports: Arc<ReportService>,
}

fn field_str<'a>(data: &'a Value, key: &str) -> Result<&'a str, String> {
    data.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing or non-string field '{key}'"))
}

fn field_f64(data: &Value, key: &str) -> Result<f64, String> {
    data.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("missing or non-numeric field '{key}'"))
}

fn field_bool(data: &Value, key: &str) -> Result<bool, String> {
    data.get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| format!("missing or non-boolean field '{key}'"))
}

fn domain_err_to_response(err: DomainError) -> WireResponse {
    WireResponse::error(err.to_string())
}

impl Router {
    pub fn new(identity: Arc<IdentityService>, charging: Arc<ChargingService>, reports: Arc<ReportService>) -> Self {
        Self {
            identity,
            charging,
            reports,
        }
    }

    pub async fn dispatch(&self, request: WireRequest) -> WireResponse {
        let result = match request.action.as_str() {
            "register" => self.register(&request.data).await,
            "login" => self.login(&request.data).await,
            "submit_charging_request" => self.submit_charging_request(&request.data).await,
            "end_charging" => self.end_charging(&request.data).await,
            "get_charging_details" => self.get_charging_details(&request.data).await,
            "get_all_piles" => self.get_all_piles().await,
            "toggle_pile_state" => self.toggle_pile_state(&request.data).await,
            "get_pile_queue" => self.get_pile_queue(&request.data).await,
            "get_reports" => self.get_reports(&request.data).await,
            other => {
                warn!(action = other, "unknown action");
                Err("unknown action".to_string())
            }
        };

        match result {
            Ok(response) => response,
            Err(message) => WireResponse::error(message),
        }
    }

    async fn register(&self, data: &Value) -> Result<WireResponse, String> {
        let user_id = field_str(data, "user_id")?;
        let password = field_str(data, "password")?;
        let car_id = field_str(data, "car_id")?;
        let battery_capacity = field_f64(data, "battery_capacity")?;

        self.identity
            .register(user_id, password, car_id, battery_capacity)
            .await
            .map(|_| WireResponse::ok_empty())
            .map_err(|e| domain_err_to_response(e).message.unwrap_or_default())
    }

    async fn login(&self, data: &Value) -> Result<WireResponse, String> {
        let user_id = field_str(data, "user_id")?;
        let password = field_str(data, "password")?;

        let user = self
            .identity
            .login(user_id, password)
            .await
            .map_err(|e| domain_err_to_response(e).message.unwrap_or_default())?;

        Ok(WireResponse::ok(json!({
            "user_id": user.user_id,
            "car_id": user.car.car_id,
        })))
    }

    async fn submit_charging_request(&self, data: &Value) -> Result<WireResponse, String> {
        let car_id = field_str(data, "car_id")?;
        let raw_mode = field_str(data, "request_mode")?;
        let amount = field_f64(data, "amount")?;

        let mode = Mode::parse(raw_mode).ok_or_else(|| "invalid mode".to_string())?;
        if amount <= 0.0 {
            return Err("amount must be > 0".to_string());
        }

        let request = self
            .charging
            .create_request(car_id, mode, amount)
            .await
            .map_err(|e| domain_err_to_response(e).message.unwrap_or_default())?;

        Ok(WireResponse::ok(json!({
            "queue_number": request.queue_number,
        })))
    }

    async fn end_charging(&self, data: &Value) -> Result<WireResponse, String> {
        let car_id = field_str(data, "car_id")?;
        let bill = self
            .charging
            .end_charging(car_id)
            .await
            .map_err(|e| domain_err_to_response(e).message.unwrap_or_default())?;
        Ok(WireResponse::ok(json!({ "bill": bill })))
    }

    async fn get_charging_details(&self, data: &Value) -> Result<WireResponse, String> {
        let car_id = field_str(data, "car_id")?;

        let current_request = self.charging.requests_store().get(car_id).await;
        let current_session = self
            .charging
            .sessions_store()
            .get_all()
            .await
            .into_iter()
            .find(|s| s.car_id == car_id);
        let mut bills = self
            .charging
            .bills_store()
            .get_all()
            .await
            .into_iter()
            .filter(|b| b.car_id == car_id)
            .collect::<Vec<_>>();
        bills.sort_by(|a, b| a.end_time.cmp(&b.end_time));

        Ok(WireResponse::ok(json!({
            "current_request": current_request,
            "current_session": current_session,
            "bills": bills,
        })))
    }

    async fn get_all_piles(&self) -> Result<WireResponse, String> {
        let mut piles = self.charging.piles_store().get_all().await;
        piles.sort_by(|a, b| a.pile_id.cmp(&b.pile_id));
        Ok(WireResponse::ok(json!(piles)))
    }

    async fn toggle_pile_state(&self, data: &Value) -> Result<WireResponse, String> {
        let pile_id = field_str(data, "pile_id")?;
        let start = field_bool(data, "start")?;
        self.charging
            .admin_set_online(pile_id, start)
            .await
            .map(|_| WireResponse::ok_empty())
            .map_err(|e| domain_err_to_response(e).message.unwrap_or_default())
    }

    async fn get_pile_queue(&self, data: &Value) -> Result<WireResponse, String> {
        let pile_id = field_str(data, "pile_id")?;
        let pile = self
            .charging
            .piles_store()
            .get(pile_id)
            .await
            .ok_or_else(|| format!("not_found: pile {pile_id}"))?;

        let car_ids = self.charging.queues().snapshot(pile.mode);
        let mut entries = Vec::with_capacity(car_ids.len());
        for car_id in car_ids {
            if let Some(request) = self.charging.requests_store().get(&car_id).await {
                entries.push(json!({
                    "car_id": request.car_id,
                    "queue_number": request.queue_number,
                    "requested_kwh": request.requested_kwh,
                }));
            }
        }
        Ok(WireResponse::ok(json!(entries)))
    }

    async fn get_reports(&self, data: &Value) -> Result<WireResponse, String> {
        let raw_bucket = field_str(data, "time_range")?;
        let bucket = Bucket::parse(raw_bucket).ok_or_else(|| "invalid time_range".to_string())?;
        let now = self.charging.clock().now();
        let rows = self.reports.get_reports(bucket, now).await;
        Ok(WireResponse::ok(json!(rows)))
    }
}
