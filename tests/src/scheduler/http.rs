#![cfg(test)]
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

use scli_common::config::{ApiKey, Config};
use scli_common::provisioning::{FieldValue, LicenseKey, LotField, PartNumber, SystemId};
use scli_common::scheduler::{Scheduler, SchedulerError};
use scli_common::serial::BaseSerial;
use scli_core::expander::SerialExpander;
use scli_core::orchestrator::BatchOrchestrator;
use scli_core::scheduler::{API_KEY_HEADER, HttpScheduler};
use scli_core::workflow::{ProvisioningWorkflow, SystemJob};

const API_KEY: &str = "test-key";

/// Emulates the scheduler endpoint and keeps every request body it receives.
#[derive(Default)]
struct Emulator {
    requests: Mutex<Vec<Value>>,
}

impl Emulator {
    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(emulator): State<Arc<Emulator>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    emulator.requests.lock().unwrap().push(body.clone());

    let authorized = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| key == API_KEY);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    }

    let reply = match body["type"].as_str().unwrap_or_default() {
        "SystemID" => match body["serial"].as_str().unwrap_or_default() {
            "1098591-1" => json!({"status": "success", "systemid": "171376"}),
            "1098591-2" => json!({"status": "success", "systemid": 171377}),
            _ => json!({"status": "error", "message": "no system found"}),
        },
        "SystemGetDataLotSerial" => {
            let system = body["system"].as_str().unwrap_or_default();
            let suffix = &system[system.len().saturating_sub(2)..];
            match body["rule"].as_str().unwrap_or_default() {
                "MAC Address" => json!({
                    "status": "success",
                    "data": [{"LotSerial": format!("0cc47a0000{suffix}")}]
                }),
                "IPMI Password" if system == "171377" => json!({"status": "success", "data": []}),
                "IPMI Password" => json!({
                    "status": "success",
                    "data": [{"LotSerial": format!("pw{suffix}")}]
                }),
                _ => json!({"status": "error", "message": "unknown rule"}),
            }
        }
        "SumLookup" => json!({
            "status": "success",
            "expected_licenses": 1,
            "licenses": [{"partno": "SFT-DCMS-SINGLE", "qty": 1}]
        }),
        "SumAllocateKey" => json!({
            "status": "success",
            "productkey": format!("KEY-{}", body["mac"].as_str().unwrap_or_default())
        }),
        "SumApplyKey" => json!({"status": "success", "message": "key marked as applied"}),
        "SystemSearch" => json!({
            "status": "success",
            "message": "unique match system serial number 1107774-1",
            "systemid": "171376",
            "serial": "1107774-1"
        }),
        _ => json!({"status": "error", "message": "unknown request type"}),
    };

    Json(reply).into_response()
}

async fn spawn(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/schedule-api")).unwrap()
}

async fn emulated() -> (Url, Arc<Emulator>) {
    let emulator = Arc::new(Emulator::default());
    let router = Router::new()
        .route("/schedule-api", post(handle))
        .with_state(Arc::clone(&emulator));
    (spawn(router).await, emulator)
}

fn config(endpoint: Url, key: &str) -> Config {
    Config {
        endpoint,
        api_key: ApiKey::new(key),
        timeout: Duration::from_secs(5),
        accept_invalid_certs: false,
        log_file: PathBuf::from("scli.log"),
    }
}

fn client(endpoint: Url) -> HttpScheduler {
    HttpScheduler::new(&config(endpoint, API_KEY)).unwrap()
}

#[tokio::test]
async fn lookup_identifier_accepts_string_and_number_ids() {
    let (url, emulator) = emulated().await;
    let scheduler = client(url);

    let first = scheduler
        .lookup_identifier(&"1098591-01".parse().unwrap())
        .await
        .unwrap();
    let second = scheduler
        .lookup_identifier(&"1098591-2".parse().unwrap())
        .await
        .unwrap();
    let unknown = scheduler
        .lookup_identifier(&"1098591-3".parse().unwrap())
        .await
        .unwrap();

    assert_eq!(first, Some(SystemId::new("171376")));
    assert_eq!(second, Some(SystemId::new("171377")));
    assert_eq!(unknown, None);

    // The query form is sent, never the padded display form.
    assert_eq!(
        emulator.requests()[0],
        json!({"type": "SystemID", "serial": "1098591-1"})
    );
}

#[tokio::test]
async fn wrong_api_key_is_authentication_error() {
    let (url, _) = emulated().await;
    let scheduler = HttpScheduler::new(&config(url, "wrong-key")).unwrap();

    let err = scheduler
        .lookup_identifier(&"1098591-1".parse().unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, SchedulerError::Authentication);
}

#[tokio::test]
async fn license_calls_send_expected_payloads() {
    let (url, emulator) = emulated().await;
    let scheduler = client(url);
    let system = SystemId::new("171376");

    let mac = scheduler
        .lookup_field(&system, LotField::MacAddress)
        .await
        .unwrap();
    assert_eq!(mac.as_deref(), Some("0cc47a000076"));

    let passwords = scheduler
        .lookup_field_values(&SystemId::new("171377"), LotField::IpmiPassword)
        .await
        .unwrap();
    assert!(passwords.is_empty());

    let part = scheduler.check_license_eligibility(&system).await.unwrap();
    assert_eq!(part, Some(PartNumber::new("SFT-DCMS-SINGLE")));

    let key = scheduler
        .reserve_license_key(&system, "0cc47a000076", &PartNumber::new("SFT-DCMS-SINGLE"))
        .await
        .unwrap();
    assert_eq!(key, LicenseKey::new("KEY-0cc47a000076"));

    scheduler
        .apply_license_key(&system, "0cc47a000076")
        .await
        .unwrap();

    let requests = emulator.requests();
    assert_eq!(
        requests[0],
        json!({"type": "SystemGetDataLotSerial", "system": "171376", "rule": "MAC Address"})
    );
    assert_eq!(requests[1]["rule"], "IPMI Password");
    assert_eq!(requests[2], json!({"type": "SumLookup", "system": "171376"}));
    assert_eq!(
        requests[3],
        json!({
            "type": "SumAllocateKey",
            "system": "171376",
            "partno": "SFT-DCMS-SINGLE",
            "mac": "0cc47a000076"
        })
    );
    assert_eq!(
        requests[4],
        json!({"type": "SumApplyKey", "system": "171376", "mac": "0cc47a000076"})
    );
}

#[tokio::test]
async fn rejected_request_carries_service_message() {
    let router = Router::new().route(
        "/schedule-api",
        post(|| async { Json(json!({"status": "Error", "message": "system is locked"})) }),
    );
    let scheduler = client(spawn(router).await);
    let err = scheduler
        .check_license_eligibility(&SystemId::new("171376"))
        .await
        .unwrap_err();
    assert_eq!(err, SchedulerError::Rejected("system is locked".into()));
}

#[tokio::test]
async fn non_json_response_is_malformed() {
    let router = Router::new().route(
        "/schedule-api",
        post(|| async { (StatusCode::BAD_GATEWAY, "<html>502 Bad Gateway</html>") }),
    );
    let scheduler = client(spawn(router).await);

    let err = scheduler
        .lookup_identifier(&"1098591-1".parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Malformed(_)));
}

#[tokio::test]
async fn allocation_without_key_is_malformed() {
    let router = Router::new().route(
        "/schedule-api",
        post(|| async { Json(json!({"status": "success"})) }),
    );
    let scheduler = client(spawn(router).await);

    let err = scheduler
        .reserve_license_key(
            &SystemId::new("171376"),
            "0cc47a000076",
            &PartNumber::new("SFT-DCMS-SINGLE"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Malformed(_)));
}

#[tokio::test]
async fn search_returns_matching_system() {
    let (url, emulator) = emulated().await;
    let scheduler = client(url);
    let serials = vec!["WM123".to_string(), "ZL456".to_string()];

    let found = scheduler.search_system(&serials).await.unwrap().unwrap();

    assert_eq!(found.system_id, SystemId::new("171376"));
    assert_eq!(found.serial, "1107774-1");
    assert!(found.message.unwrap().contains("unique match"));
    assert_eq!(
        emulator.requests()[0],
        json!({"type": "SystemSearch", "serials": ["WM123", "ZL456"]})
    );
}

/// Serves one chassis whose second node has a blank MAC entry.
async fn chassis_with_blank_mac(Json(body): Json<Value>) -> Json<Value> {
    Json(match body["type"].as_str().unwrap_or_default() {
        "SystemGetDataLotSerial" if body["rule"] == "MAC Address" => json!({
            "status": "success",
            "data": [{"LotSerial": "aa01"}, {"LotSerial": ""}, {"LotSerial": "aa03"}]
        }),
        "SystemGetDataLotSerial" => json!({
            "status": "success",
            "data": [{"LotSerial": "pw1"}, {"LotSerial": "pw2"}, {"LotSerial": "pw3"}]
        }),
        "SumLookup" => json!({
            "status": "success",
            "expected_licenses": 1,
            "licenses": [{"partno": "SFT-DCMS-SINGLE"}]
        }),
        "SumAllocateKey" => json!({
            "status": "success",
            "productkey": format!("KEY-{}", body["mac"].as_str().unwrap_or_default())
        }),
        _ => json!({"status": "success"}),
    })
}

#[tokio::test]
async fn blank_lot_serial_entries_keep_their_position() {
    let router = Router::new().route("/schedule-api", post(chassis_with_blank_mac));
    let scheduler: Arc<dyn Scheduler> = Arc::new(client(spawn(router).await));
    let system = SystemId::new("171380");

    let macs = scheduler
        .lookup_field_values(&system, LotField::MacAddress)
        .await
        .unwrap();
    assert_eq!(
        macs,
        vec![Some("aa01".to_string()), None, Some("aa03".to_string())]
    );

    let workflow = ProvisioningWorkflow::new(Arc::clone(&scheduler));
    let records = workflow
        .run_multi_node(SystemJob::resolved("1098600-1".parse().unwrap(), system))
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[1].mac, FieldValue::Unavailable);
    assert_eq!(records[1].password, FieldValue::Known("pw2".into()));
    assert!(records[1].license_key.is_none());
    assert_eq!(records[2].mac, FieldValue::Known("aa03".into()));
    assert_eq!(records[2].license_key, Some(LicenseKey::new("KEY-aa03")));
}

#[tokio::test]
async fn lookup_field_reads_only_the_first_entry() {
    let router = Router::new().route(
        "/schedule-api",
        post(|| async {
            Json(json!({
                "status": "success",
                "data": [{"LotSerial": ""}, {"LotSerial": "aa02"}]
            }))
        }),
    );
    let scheduler = client(spawn(router).await);

    let mac = scheduler
        .lookup_field(&SystemId::new("171380"), LotField::MacAddress)
        .await
        .unwrap();
    assert!(mac.is_none());
}

/// Discovery and retrieval over HTTP, end to end.
#[tokio::test]
async fn full_batch_against_emulated_service() {
    let (url, _) = emulated().await;
    let scheduler: Arc<dyn Scheduler> = Arc::new(client(url));
    let base: BaseSerial = "1098591".parse().unwrap();

    let jobs = SerialExpander::new(Arc::clone(&scheduler))
        .discover_all(&base)
        .await
        .unwrap();
    assert_eq!(jobs.len(), 2);

    let batch = BatchOrchestrator::new(scheduler).run(jobs).await;
    let records = batch.records();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].serial.display_form(), "1098591-01");
    assert_eq!(records[0].mac, FieldValue::Known("0cc47a000076".into()));
    assert_eq!(records[0].password, FieldValue::Known("pw76".into()));
    assert_eq!(
        records[0].license_key,
        Some(LicenseKey::new("KEY-0cc47a000076"))
    );

    assert_eq!(records[1].system_id, SystemId::new("171377"));
    assert_eq!(records[1].password, FieldValue::Unavailable);
    assert_eq!(
        records[1].license_key,
        Some(LicenseKey::new("KEY-0cc47a000077"))
    );
}
