//! Test utilities and fixtures for InPost client testing
//!
//! Payloads mirror what the mobile API returns, trimmed to the fields the
//! client reads.

#![allow(dead_code)]

use crate::http::{ClientConfig, HttpRequest, MockTransport, RawResponse};
use crate::InpostClient;

/// Test phone numbers and codes
pub mod phones {
    /// A well-formed phone number
    pub const VALID: &str = "123456789";

    /// A well-formed SMS code
    pub const SMS_CODE: &str = "000000";
}

/// JSON payloads
pub mod fixtures {
    use serde_json::{json, Value};

    /// Locker parcel waiting for pickup
    pub fn locker_parcel() -> Value {
        json!({
            "shipmentNumber": "991798006092038618752844",
            "shipmentType": "parcel",
            "openCode": "465649",
            "qrCode": "P|524507211|465649",
            "storedDate": "2022-11-30T06:55:08.000Z",
            "expiryDate": "2022-12-02T06:55:08.000Z",
            "parcelSize": "B",
            "receiver": {"email": "john@doe.com", "phoneNumber": "524507211", "name": "John Doe"},
            "sender": {"name": "Wrapster Sp. z o.o."},
            "pickUpPoint": {
                "name": "WRO23A",
                "location": {"latitude": 51.0775, "longitude": 17.04745},
                "locationDescription": "Przy Centrum Handlowym Gaj",
                "openingHours": "24/7",
                "addressDetails": {
                    "postCode": "50-559",
                    "city": "Wrocław",
                    "province": "dolnośląskie",
                    "street": "Świeradowska",
                    "buildingNumber": "70"
                },
                "pointType": "PL",
                "location247": true,
                "imageUrl": "https://static.easypack24.net/points/pl/images/WRO23A.jpg",
                "airSensor": true
            },
            "endOfWeekCollection": false,
            "status": "READY_TO_PICKUP",
            "sharedTo": [],
            "ownershipStatus": "OWN"
        })
    }

    /// Courier parcel, already delivered
    pub fn courier_parcel() -> Value {
        json!({
            "shipmentNumber": "954928772800409758129169",
            "shipmentType": "courier",
            "pickUpDate": "2022-12-13T11:20:59.000Z",
            "parcelSize": "OTHER",
            "receiver": {"email": "john@doe.com", "phoneNumber": "594244881", "name": "John Doe"},
            "sender": {"name": "Blueboat Trade"},
            "endOfWeekCollection": false,
            "status": "DELIVERED",
            "sharedTo": [],
            "ownershipStatus": "OWN"
        })
    }

    /// Tracked parcel list
    pub fn parcel_list() -> Value {
        json!({ "parcels": [locker_parcel(), courier_parcel()] })
    }

    /// Response of collect/validate
    pub fn validate_response() -> Value {
        json!({"sessionUuid": "U", "sessionExpirationTime": 40000})
    }

    /// Response of compartment/open
    pub fn compartment_location() -> Value {
        json!({
            "compartment": {
                "name": "2R3",
                "location": {"side": "L", "column": "2", "row": "3"}
            },
            "openCompartmentWaitingTime": 34,
            "actionTime": 20,
            "confirmActionTime": 5
        })
    }

    /// Response of confirmSMSCode
    pub fn tokens() -> Value {
        json!({"authToken": "A", "refreshToken": "R"})
    }
}

/// 200 response with a JSON body
pub fn ok_json(value: serde_json::Value) -> RawResponse {
    RawResponse::new(200, value.to_string())
}

/// Empty response with the given status
pub fn status(status: u16) -> RawResponse {
    RawResponse::new(status, "")
}

/// Whether the request targets `path` on the test host
pub fn targets(request: &HttpRequest, path: &str) -> bool {
    request.url == format!("{}{}", BASE_URL, path)
}

/// Base URL the mocked clients use
pub const BASE_URL: &str = "https://inpost.test";

/// Client over a mock transport with no session
pub fn client(transport: MockTransport) -> InpostClient<MockTransport> {
    InpostClient::with_transport(ClientConfig::new(BASE_URL), transport)
}

/// Client over a mock transport holding tokens `A`/`R`
pub fn authenticated_client(transport: MockTransport) -> InpostClient<MockTransport> {
    let mut client = client(transport);
    client
        .set_phone_number(phones::VALID)
        .expect("fixture phone number is valid");
    client.session_mut().store_tokens("A", "R", phones::SMS_CODE);
    client
}
