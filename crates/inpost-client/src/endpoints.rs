//! API endpoint paths
//!
//! Paths are relative to [`ClientConfig::base_url`](crate::http::ClientConfig),
//! which defaults to [`DEFAULT_BASE_URL`].

/// Production API host
pub const DEFAULT_BASE_URL: &str = "https://api-inmobile-pl.easypack24.net";

// Auth
/// Request an SMS code (POST)
pub const SEND_SMS_CODE: &str = "/v1/sendSMSCode";
/// Exchange an SMS code for tokens (POST)
pub const CONFIRM_SMS_CODE: &str = "/v1/confirmSMSCode";
/// Exchange a refresh token for an auth token (POST)
pub const REFRESH_TOKEN: &str = "/v1/authenticate";
/// Invalidate the session server side (POST)
pub const LOGOUT: &str = "/v1/logout";

// Incoming parcels
/// Tracked parcel list (GET)
pub const TRACKED_PARCELS: &str = "/v3/parcels/tracked";
/// Sent parcel list (GET)
pub const SENT_PARCELS: &str = "/v2/parcels/sent";
/// Returned parcel list (GET)
pub const RETURNED_PARCELS: &str = "/v1/returns/parcels";

// Collection
/// Validate a parcel for collection and open a collect session (POST)
pub const COLLECT_VALIDATE: &str = "/v1/collect/validate";
/// Open the compartment (POST)
pub const COMPARTMENT_OPEN: &str = "/v1/collect/compartment/open";
/// Reopen the compartment within a live session (POST)
pub const COMPARTMENT_REOPEN: &str = "/v1/collect/compartment/reopen";
/// Query the compartment door status (POST)
pub const COMPARTMENT_STATUS: &str = "/v1/collect/compartment/status";
/// Terminate the collect session (POST)
pub const COLLECT_TERMINATE: &str = "/v1/collect/terminate";

// Misc
/// Parcel price list (GET)
pub const PARCEL_PRICES: &str = "/v1/prices/parcels";
/// Point details (GET)
pub const POINTS: &str = "/v3/points";

/// Path of a single tracked parcel
pub fn tracked_parcel(shipment_number: &str) -> String {
    format!("{}/{}", TRACKED_PARCELS, urlencoding::encode(shipment_number))
}

/// Path of a single point
pub fn point(name: &str) -> String {
    format!("{}/{}", POINTS, urlencoding::encode(name))
}

/// Join a base URL and an endpoint path
pub fn resolve(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
