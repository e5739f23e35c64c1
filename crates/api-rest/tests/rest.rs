use api_rest::{router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use ptmatch_core::{CoreResult, MatchTransport, MemoryStore, TransportStatus};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const EVENT_SYSTEM: &str = "http://github.com/mitre/ptmatch/fhir/message-events";
const MPI_MATCH_URL: &str = "http://hl7.org/fhir/StructureDefinition/patient-mpi-match";
const BOUNDARY: &str = "ptmatch-test-boundary";

#[derive(Default)]
struct RecordingTransport {
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl MatchTransport for RecordingTransport {
    async fn put_bundle(&self, url: &str, _body: Vec<u8>) -> CoreResult<TransportStatus> {
        self.urls.lock().expect("lock").push(url.to_owned());
        Ok(TransportStatus {
            code: 200,
            text: "200 OK".into(),
        })
    }
}

struct Harness {
    app: Router,
    transport: Arc<RecordingTransport>,
}

fn harness() -> Harness {
    let transport = Arc::new(RecordingTransport::default());
    let state = AppState::new(Arc::new(MemoryStore::new()), transport.clone());
    Harness {
        app: router(state),
        transport,
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn upload_answer_key(app: &Router, record_set_id: &str, key: &Value) -> (StatusCode, Value) {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"recordSetId\"\r\n\r\n\
         {record_set_id}\r\n\
         --{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"answerKey\"; filename=\"key.json\"\r\n\
         Content-Type: application/json\r\n\r\n\
         {key}\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/AnswerKey")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request");
    read(app.clone().oneshot(request).await.expect("response")).await
}

fn link_entry(source: &str, target: &str, score: f64, grade: &str) -> Value {
    json!({
        "fullUrl": source,
        "link": [{"relation": "related", "url": target}],
        "search": {
            "score": score,
            "extension": [{"url": MPI_MATCH_URL, "valueCode": grade}]
        }
    })
}

fn answer_key() -> Value {
    json!({
        "resourceType": "Bundle",
        "id": "answer-key-1",
        "type": "document",
        "entry": [
            {"fullUrl": "urn:uuid:summary", "resource": {"resourceType": "Composition"}},
            link_entry("http://records/Patient/1", "http://records/Patient/2", 1.0, "certain"),
            link_entry("http://records/Patient/3", "http://records/Patient/4", 1.0, "certain")
        ]
    })
}

fn response_bundle(id: &str, in_response_to: &str, links: Vec<Value>) -> Value {
    let mut entry = vec![json!({
        "fullUrl": "urn:uuid:response-header",
        "resource": {
            "resourceType": "MessageHeader",
            "id": format!("header-{id}"),
            "event": {"system": EVENT_SYSTEM, "code": "record-match"},
            "response": {"identifier": in_response_to, "code": "ok"}
        }
    })];
    entry.extend(links);
    json!({"resourceType": "Bundle", "id": id, "type": "message", "entry": entry})
}

struct Job {
    id: String,
    correlation_id: String,
}

/// Creates an interface, a record set with an answer key, a deduplication configuration and a job.
async fn create_job(app: &Router) -> Job {
    let (status, iface) = send(
        app,
        Method::POST,
        "/RecordMatchSystemInterface",
        Some(json!({
            "name": "Engine",
            "destinationEndpoint": "http://engine.example",
            "serverEndpoint": "http://fhir.example",
            "responseEndpoint": "http://harness.example/Bundle"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{iface}");

    let (status, set) = send(
        app,
        Method::POST,
        "/RecordSet",
        Some(json!({"name": "Patients A", "resourceType": "Patient"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{set}");
    let set_id = set["id"].as_str().expect("set id").to_owned();

    let (status, body) = upload_answer_key(app, &set_id, &answer_key()).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, configuration) = send(
        app,
        Method::POST,
        "/RecordMatchConfiguration",
        Some(json!({
            "name": "dedup",
            "matchingMode": "deduplication",
            "recordMatchSystemInterfaceId": iface["id"],
            "masterRecordSetId": set_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{configuration}");

    let (status, job) = send(
        app,
        Method::POST,
        "/RecordMatchJob",
        Some(json!({
            "recordMatchConfigurationId": configuration["id"],
            "note": "nightly run"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{job}");

    Job {
        id: job["id"].as_str().expect("job id").to_owned(),
        correlation_id: job["request"]["message"]["entry"][0]["resource"]["id"]
            .as_str()
            .expect("correlation id")
            .to_owned(),
    }
}

#[tokio::test]
async fn health_reports_alive() {
    let h = harness();
    let (status, body) = send(&h.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn openapi_document_lists_routes() {
    let h = harness();
    let (status, body) = send(&h.app, Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/RecordMatchJob/{id}/links"].is_object());
}

#[tokio::test]
async fn record_set_crud_round_trip() {
    let h = harness();

    let (status, created) = send(
        &h.app,
        Method::POST,
        "/RecordSet",
        Some(json!({"id": "ignored", "name": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().expect("id").to_owned();
    assert_ne!(id, "ignored");
    assert!(created["meta"]["createdOn"].is_string());

    let (status, fetched) = send(&h.app, Method::GET, &format!("/RecordSet/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "A");

    let (status, replaced) = send(
        &h.app,
        Method::PUT,
        &format!("/RecordSet/{id}"),
        Some(json!({"name": "B"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["name"], "B");
    assert_eq!(replaced["meta"]["createdOn"], created["meta"]["createdOn"]);

    let (status, listed) = send(&h.app, Method::GET, "/RecordSet", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&h.app, Method::DELETE, &format!("/RecordSet/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&h.app, Method::GET, &format!("/RecordSet/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_ids_are_bad_requests() {
    let h = harness();
    let (status, _) = send(&h.app, Method::GET, "/RecordSet/not-an-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&h.app, Method::GET, "/RecordMatchJob/nope/links", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn put_creates_unknown_resources() {
    let h = harness();
    let (_, created) = send(&h.app, Method::POST, "/RecordSet", Some(json!({"name": "A"}))).await;
    let id = created["id"].as_str().expect("id").to_owned();
    send(&h.app, Method::DELETE, &format!("/RecordSet/{id}"), None).await;

    let (status, body) = send(
        &h.app,
        Method::PUT,
        &format!("/RecordSet/{id}"),
        Some(json!({"name": "again"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], id);
}

#[tokio::test]
async fn job_creation_requires_existing_configuration() {
    let h = harness();
    let (status, _) = send(&h.app, Method::POST, "/RecordMatchJob", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &h.app,
        Method::POST,
        "/RecordMatchJob",
        Some(json!({"recordMatchConfigurationId": "0123456789abcdef0123456789abcdef"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(h.transport.urls.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn response_flow_updates_metrics_and_links() {
    let h = harness();
    let job = create_job(&h.app).await;

    assert_eq!(
        h.transport.urls.lock().expect("lock").as_slice(),
        [format!("http://fhir.example/Bundle/{}", job.correlation_id)]
    );

    let response = response_bundle(
        "response-1",
        &job.correlation_id,
        vec![
            link_entry("http://records/Patient/1", "http://records/Patient/2", 0.9, "probable"),
            link_entry("http://records/Patient/5", "http://records/Patient/6", 0.4, "possible"),
        ],
    );
    let (status, stored) = send(&h.app, Method::POST, "/Bundle", Some(response)).await;
    assert_eq!(status, StatusCode::CREATED, "{stored}");
    assert_eq!(stored["bundle"]["id"], "response-1");

    let (status, fetched) = send(&h.app, Method::GET, &format!("/RecordMatchJob/{}", job.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["responses"].as_array().map(Vec::len), Some(1));

    let (status, summaries) = send(&h.app, Method::GET, "/RecordMatchJobMetrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let metrics = &summaries[0]["metrics"];
    assert_eq!(metrics["matchCount"], 2);
    assert_eq!(metrics["truePositiveCount"], 1);
    assert_eq!(metrics["falsePositiveCount"], 1);
    assert_eq!(metrics["precision"], 0.5);
    assert_eq!(metrics["recall"], 0.5);
    assert_eq!(metrics["f1"], 0.5);

    let (status, best) = send(
        &h.app,
        Method::GET,
        &format!("/RecordMatchJob/{}/links?limit=1", job.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(best.as_array().map(Vec::len), Some(1));
    assert_eq!(best[0]["source"], "http://records/Patient/1");
    assert_eq!(best[0]["match"], "probable");

    let (_, worst) = send(
        &h.app,
        Method::GET,
        &format!("/RecordMatchJob/{}/links?category=worst&limit=0", job.id),
        None,
    )
    .await;
    assert_eq!(worst.as_array().map(Vec::len), Some(2));
    assert_eq!(worst[0]["score"], 0.4);
}

#[tokio::test]
async fn duplicate_delivery_keeps_one_response() {
    let h = harness();
    let job = create_job(&h.app).await;
    let response = response_bundle(
        "response-1",
        &job.correlation_id,
        vec![link_entry("http://records/Patient/1", "http://records/Patient/2", 0.9, "certain")],
    );

    let (first, _) = send(&h.app, Method::POST, "/Bundle", Some(response.clone())).await;
    let (second, _) = send(&h.app, Method::POST, "/Bundle", Some(response)).await;
    assert_eq!((first, second), (StatusCode::CREATED, StatusCode::CREATED));

    let (_, fetched) = send(&h.app, Method::GET, &format!("/RecordMatchJob/{}", job.id), None).await;
    assert_eq!(fetched["responses"].as_array().map(Vec::len), Some(1));
    let messages: Vec<&str> = fetched["status"]
        .as_array()
        .expect("status")
        .iter()
        .filter_map(|s| s["message"].as_str())
        .collect();
    assert!(messages.contains(&"Duplicate Response Received and Ignored [response-1]"));
}

#[tokio::test]
async fn put_response_under_fhir_id_is_correlated() {
    let h = harness();
    let job = create_job(&h.app).await;
    let fhir_id = "6f1c2b9e-3a4d-4e5f-8a7b-1c2d3e4f5a6b";
    let mut response = response_bundle(
        fhir_id,
        &job.correlation_id,
        vec![link_entry("http://records/Patient/1", "http://records/Patient/2", 0.9, "certain")],
    );

    let uri = format!("/Bundle/{fhir_id}");
    let (status, stored) = send(&h.app, Method::PUT, &uri, Some(response.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{stored}");
    assert_eq!(stored["bundle"]["id"], fhir_id);

    response["entry"][1]["search"]["score"] = json!(0.95);
    let (status, _) = send(&h.app, Method::PUT, &uri, Some(response)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, fetched) = send(&h.app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["bundle"]["entry"][1]["search"]["score"], 0.95);

    let (_, job) = send(&h.app, Method::GET, &format!("/RecordMatchJob/{}", job.id), None).await;
    assert_eq!(job["responses"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn request_submitted_to_own_bundle_endpoint_is_stored() {
    let h = harness();
    let job = create_job(&h.app).await;
    let (_, fetched) = send(&h.app, Method::GET, &format!("/RecordMatchJob/{}", job.id), None).await;
    let request = fetched["request"]["message"].clone();

    let (status, stored) = send(
        &h.app,
        Method::PUT,
        &format!("/Bundle/{}", job.correlation_id),
        Some(request),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{stored}");
    assert_eq!(stored["bundle"]["entry"][0]["resource"]["id"], job.correlation_id.as_str());

    let (status, _) = send(&h.app, Method::PUT, "/Bundle/not%20an%20id", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stored_bundles_keep_every_element() {
    let h = harness();
    let bundle = json!({
        "resourceType": "Bundle",
        "id": "b1",
        "type": "collection",
        "meta": {"lastUpdated": "2024-03-01T10:00:00Z"},
        "timestamp": "2024-03-01T10:00:00Z",
        "link": [{"relation": "self", "url": "http://x/Bundle/b1"}],
        "entry": [{
            "fullUrl": "http://x/Patient/1",
            "resource": {"resourceType": "Patient", "id": "1"},
            "request": {"method": "PUT", "url": "Patient/1"}
        }]
    });

    let (status, stored) = send(&h.app, Method::POST, "/Bundle", Some(bundle.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, fetched) = send(
        &h.app,
        Method::GET,
        &format!("/Bundle/{}", stored["id"].as_str().expect("id")),
        None,
    )
    .await;
    assert_eq!(fetched["bundle"], bundle);
}

#[tokio::test]
async fn uncorrelated_response_is_unprocessable() {
    let h = harness();
    let job = create_job(&h.app).await;

    let (status, body) = send(
        &h.app,
        Method::POST,
        "/Bundle",
        Some(response_bundle("stray", "no-such-request", Vec::new())),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.as_str().is_some_and(|m| m.contains("no-such-request")));

    let (_, fetched) = send(&h.app, Method::GET, &format!("/RecordMatchJob/{}", job.id), None).await;
    assert!(fetched["responses"].as_array().is_none_or(Vec::is_empty));
}

#[tokio::test]
async fn unrelated_bundles_are_stored_without_correlation() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        Method::POST,
        "/Bundle",
        Some(json!({"resourceType": "Bundle", "type": "collection"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn answer_key_upload_validates_input() {
    let h = harness();
    let (_, set) = send(&h.app, Method::POST, "/RecordSet", Some(json!({"name": "A"}))).await;
    let set_id = set["id"].as_str().expect("id").to_owned();

    let mut not_document = answer_key();
    not_document["type"] = json!("collection");
    let (status, _) = upload_answer_key(&h.app, &set_id, &not_document).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        upload_answer_key(&h.app, "0123456789abcdef0123456789abcdef", &answer_key()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = upload_answer_key(&h.app, &set_id, &answer_key()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["answerKey"]["id"], "answer-key-1");
}
