//! End-to-end collection flow against a mock InPost server
//!
//! Walks the whole lifecycle: SMS login, collect session, open, confirm the
//! door open, confirm it closed, terminate, then persist and restore the
//! session.

use inpost_client::{
    AuthState, ClientConfig, CollectionStage, ExpectedStatus, GeoPoint, InpostClient, Parcel,
    SessionStore,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn locker_parcel() -> Value {
    json!({
        "shipmentNumber": "620000000000000000000001",
        "shipmentType": "parcel",
        "status": "READY_TO_PICKUP",
        "openCode": "123321",
        "receiver": {"phoneNumber": "123456789"},
        "pickUpPoint": {
            "name": "KRA01M",
            "location": {"latitude": 50.06, "longitude": 19.94}
        }
    })
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/sendSMSCode"))
        .and(body_json(json!({"phoneNumber": "123456789"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/confirmSMSCode"))
        .and(body_json(json!({
            "phoneNumber": "123456789",
            "smsCode": "000000",
            "phoneOS": "Android"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"authToken": "A", "refreshToken": "R"})),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_collection(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/collect/validate"))
        .and(header("Authorization", "A"))
        .and(body_partial_json(json!({
            "parcel": {
                "shipmentNumber": "620000000000000000000001",
                "openCode": "123321",
                "receiverPhoneNumber": "123456789"
            }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"sessionUuid": "U", "sessionExpirationTime": 40000})),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/collect/compartment/open"))
        .and(body_json(json!({"sessionUuid": "U"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "compartment": {"name": "1L2", "location": {"side": "L", "column": 1, "row": 2}},
            "openCompartmentWaitingTime": 34,
            "actionTime": 20,
            "confirmActionTime": 5
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/collect/compartment/status"))
        .and(body_json(json!({"sessionUuid": "U", "expectedStatus": "OPENED"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OPENED"})))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/collect/compartment/status"))
        .and(body_json(json!({"sessionUuid": "U", "expectedStatus": "CLOSED"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "CLOSED"})))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/collect/terminate"))
        .and(body_json(json!({"sessionUuid": "U"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_and_collect_step_by_step() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_collection(&server).await;

    let mut client = InpostClient::with_config(ClientConfig::new(server.uri())).unwrap();

    // Login
    client.set_phone_number("123456789").unwrap();
    client.send_sms_code().await.unwrap();
    assert_eq!(client.auth_state(), AuthState::SmsSent);

    client.confirm_sms_code("000000").await.unwrap();
    assert_eq!(client.session().auth_token(), Some("A"));

    // Collect
    let parcel = Parcel::from_json(locker_parcel()).unwrap();
    let mut parcel = client
        .collect_compartment_properties(None, Some(parcel), None)
        .await
        .unwrap();
    assert_eq!(parcel.compartment_properties().unwrap().session_uuid(), "U");

    let stage = client.open_compartment(&mut parcel).await.unwrap();
    assert_eq!(stage, CollectionStage::CompartmentOpened);
    assert_eq!(parcel.compartment_location().unwrap().column, "1");

    assert!(client
        .check_compartment_status(&mut parcel, ExpectedStatus::Opened)
        .await
        .unwrap());
    assert_eq!(parcel.collection_stage(), Some(CollectionStage::ConfirmedOpen));

    // Close
    assert!(client.close_compartment(&mut parcel).await.unwrap());
    assert_eq!(parcel.collection_stage(), Some(CollectionStage::Terminated));

    // Persist and restore
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("inpost").join("session.json"));
    client.save_session(&store).await.unwrap();

    let mut restored = InpostClient::with_config(ClientConfig::new(server.uri())).unwrap();
    assert!(restored.restore_session(&store).await.unwrap());
    assert_eq!(restored.to_mapping(), client.to_mapping());
    assert_eq!(restored.auth_state(), AuthState::Authenticated);
}

#[tokio::test]
async fn test_composite_collect_and_close() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_collection(&server).await;

    let mut client = InpostClient::with_config(ClientConfig::new(server.uri())).unwrap();
    client.set_phone_number("123456789").unwrap();
    client.send_sms_code().await.unwrap();
    client.confirm_sms_code("000000").await.unwrap();

    let outcome = client
        .collect(
            None,
            Some(Parcel::from_json(locker_parcel()).unwrap()),
            Some(GeoPoint::new(50.06, 19.94, 3.0)),
        )
        .await
        .unwrap();
    assert!(outcome.opened);

    let mut parcel = outcome.parcel;
    assert!(client.close_compartment(&mut parcel).await.unwrap());
}

#[tokio::test]
async fn test_session_mapping_round_trip() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let mut client = InpostClient::with_config(ClientConfig::new(server.uri())).unwrap();
    client.set_phone_number("123456789").unwrap();
    client.send_sms_code().await.unwrap();
    client.confirm_sms_code("000000").await.unwrap();

    let mapping = client.to_mapping();
    assert_eq!(
        serde_json::to_value(&mapping).unwrap(),
        json!({
            "phone_number": "123456789",
            "sms_code": "000000",
            "auth_token": "A",
            "refr_token": "R"
        })
    );

    let config = ClientConfig::new(server.uri());
    let transport = inpost_client::ReqwestTransport::new(&config).unwrap();
    let restored = InpostClient::from_mapping(config, transport, mapping.clone()).unwrap();
    assert_eq!(restored.to_mapping(), mapping);
}
