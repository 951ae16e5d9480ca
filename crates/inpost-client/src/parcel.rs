//! Parcel model and collection stage
//!
//! [`Parcel`] is decoded from the tracked-parcel payload. Once a collection
//! starts it carries [`CompartmentProperties`], the only holder of the server
//! session UUID and of the [`CollectionStage`] that gates every later step.

use crate::statuses::{
    CompartmentStatus, ExpectedStatus, ParcelOwnership, ParcelSize, ParcelStatus, ShipmentType,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

/// Latitude/longitude jitter applied to a mocked GPS fix, in degrees
pub const MOCK_LOCATION_JITTER: f64 = 0.00005;

// =============================================================================
// Collection Stage
// =============================================================================

/// Where a collection stands once compartment properties exist
///
/// A parcel without compartment properties is simply looked up; the stages
/// below only exist inside [`CompartmentProperties`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CollectionStage {
    /// Collect session validated, compartment still shut
    #[default]
    PropertiesCollected,
    /// Open command accepted
    CompartmentOpened,
    /// Server confirmed the door is open
    ConfirmedOpen,
    /// Server confirmed the door is closed again
    ConfirmedClosed,
    /// Collect session terminated; the session UUID is spent
    Terminated,
}

/// A step of the collection flow, used to check stage preconditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStep {
    /// Open the compartment
    Open,
    /// Reopen the compartment
    Reopen,
    /// Confirm the door status
    CheckStatus(ExpectedStatus),
    /// Terminate the collect session
    Terminate,
}

impl CollectionStep {
    /// Short name for errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            CollectionStep::Open => "open compartment",
            CollectionStep::Reopen => "reopen compartment",
            CollectionStep::CheckStatus(ExpectedStatus::Opened) => "check compartment opened",
            CollectionStep::CheckStatus(ExpectedStatus::Closed) => "check compartment closed",
            CollectionStep::Terminate => "terminate collect session",
        }
    }
}

impl CollectionStage {
    /// Whether `step` may be issued from this stage
    pub fn permits(self, step: CollectionStep) -> bool {
        use CollectionStage::*;

        match step {
            CollectionStep::Open => matches!(self, PropertiesCollected),
            CollectionStep::Reopen => {
                matches!(self, CompartmentOpened | ConfirmedOpen | ConfirmedClosed)
            }
            CollectionStep::CheckStatus(ExpectedStatus::Opened) => {
                matches!(self, CompartmentOpened | ConfirmedOpen)
            }
            CollectionStep::CheckStatus(ExpectedStatus::Closed) => {
                matches!(self, CompartmentOpened | ConfirmedOpen | ConfirmedClosed)
            }
            CollectionStep::Terminate => matches!(self, ConfirmedClosed),
        }
    }

    /// Stage reached after `step` succeeded
    ///
    /// `confirmed` only matters for status checks: a mismatch leaves the stage
    /// where it was.
    pub fn after(self, step: CollectionStep, confirmed: bool) -> Self {
        match step {
            CollectionStep::Open | CollectionStep::Reopen => CollectionStage::CompartmentOpened,
            CollectionStep::CheckStatus(_) if !confirmed => self,
            CollectionStep::CheckStatus(ExpectedStatus::Opened) => CollectionStage::ConfirmedOpen,
            CollectionStep::CheckStatus(ExpectedStatus::Closed) => CollectionStage::ConfirmedClosed,
            CollectionStep::Terminate => CollectionStage::Terminated,
        }
    }

    pub(crate) fn ensure(self, step: CollectionStep) -> Result<()> {
        if self.permits(step) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                stage: self,
                step: step.name(),
            })
        }
    }
}

// =============================================================================
// Compartment
// =============================================================================

/// Physical placement of an opened compartment
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawCompartmentLocation")]
pub struct CompartmentLocation {
    /// Compartment name as printed on the locker
    pub name: String,
    /// Locker side
    pub side: String,
    /// Column
    pub column: String,
    /// Row
    pub row: String,
    /// Seconds the door waits to be opened
    pub open_compartment_waiting_time: u32,
    /// Seconds granted for taking the parcel out
    pub action_time: u32,
    /// Seconds granted for confirming the action
    pub confirm_action_time: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompartmentLocation {
    compartment: RawCompartment,
    #[serde(default)]
    open_compartment_waiting_time: u32,
    #[serde(default)]
    action_time: u32,
    #[serde(default)]
    confirm_action_time: u32,
}

#[derive(Deserialize)]
struct RawCompartment {
    #[serde(default, deserialize_with = "stringish")]
    name: String,
    location: RawPlacement,
}

#[derive(Deserialize)]
struct RawPlacement {
    #[serde(default, deserialize_with = "stringish")]
    side: String,
    #[serde(default, deserialize_with = "stringish")]
    column: String,
    #[serde(default, deserialize_with = "stringish")]
    row: String,
}

impl From<RawCompartmentLocation> for CompartmentLocation {
    fn from(raw: RawCompartmentLocation) -> Self {
        Self {
            name: raw.compartment.name,
            side: raw.compartment.location.side,
            column: raw.compartment.location.column,
            row: raw.compartment.location.row,
            open_compartment_waiting_time: raw.open_compartment_waiting_time,
            action_time: raw.action_time,
            confirm_action_time: raw.confirm_action_time,
        }
    }
}

/// Accept strings or numbers for fields the API is loose about
fn stringish<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// State of an in-progress collection
///
/// Created once per collection attempt from the validate response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentProperties {
    session_uuid: String,
    #[serde(default)]
    session_expiration_time: u64,
    #[serde(skip)]
    location: Option<CompartmentLocation>,
    #[serde(skip)]
    status: Option<CompartmentStatus>,
    #[serde(skip)]
    stage: CollectionStage,
}

impl CompartmentProperties {
    /// Create properties for a freshly validated session
    pub fn new(session_uuid: impl Into<String>, session_expiration_time: u64) -> Self {
        Self {
            session_uuid: session_uuid.into(),
            session_expiration_time,
            location: None,
            status: None,
            stage: CollectionStage::PropertiesCollected,
        }
    }

    /// Server handle of the collect session
    pub fn session_uuid(&self) -> &str {
        &self.session_uuid
    }

    /// Session lifetime as reported by the server
    pub fn session_expiration_time(&self) -> u64 {
        self.session_expiration_time
    }

    /// Compartment placement, once opened
    pub fn location(&self) -> Option<&CompartmentLocation> {
        self.location.as_ref()
    }

    /// Last door status reported by the server
    pub fn status(&self) -> Option<&CompartmentStatus> {
        self.status.as_ref()
    }

    /// Current collection stage
    pub fn stage(&self) -> CollectionStage {
        self.stage
    }

    pub(crate) fn record_location(&mut self, location: CompartmentLocation) {
        self.location = Some(location);
    }

    pub(crate) fn record_status(&mut self, status: CompartmentStatus) {
        self.status = Some(status);
    }

    pub(crate) fn advance(&mut self, step: CollectionStep, confirmed: bool) -> CollectionStage {
        let next = self.stage.after(step, confirmed);
        tracing::debug!(from = ?self.stage, to = ?next, step = step.name(), "collection stage");
        self.stage = next;
        next
    }
}

// =============================================================================
// Parcel
// =============================================================================

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude
    pub latitude: f64,
    /// Longitude
    pub longitude: f64,
}

/// GPS fix sent with the collect request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude
    pub latitude: f64,
    /// Longitude
    pub longitude: f64,
    /// Accuracy in metres
    pub accuracy: f64,
}

impl GeoPoint {
    /// Create a GPS fix
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
        }
    }

    /// A plausible fix near `origin`
    ///
    /// Latitude and longitude move by up to [`MOCK_LOCATION_JITTER`] and are
    /// rounded to 6 places; accuracy is 1 to 4 metres rounded to 1 place.
    pub fn jittered<R: Rng>(origin: Coordinates, rng: &mut R) -> Self {
        let jitter = MOCK_LOCATION_JITTER;
        Self {
            latitude: round_to(origin.latitude + rng.gen_range(-jitter..=jitter), 6),
            longitude: round_to(origin.longitude + rng.gen_range(-jitter..=jitter), 6),
            accuracy: round_to(rng.gen_range(1.0..=4.0), 1),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Parcel receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receiver {
    /// Phone number
    pub phone_number: String,
    /// Email address
    pub email: Option<String>,
    /// Display name
    pub name: Option<String>,
}

/// Parcel sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    /// Display name
    pub name: Option<String>,
    /// Email address
    pub email: Option<String>,
}

/// Postal address of a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDetails {
    /// Post code
    pub post_code: Option<String>,
    /// City
    pub city: Option<String>,
    /// Province
    pub province: Option<String>,
    /// Street
    pub street: Option<String>,
    /// Building number
    pub building_number: Option<String>,
}

/// Parcel locker or parcel point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    /// Point name, e.g. "WRO23A"
    pub name: String,
    /// Coordinates
    pub location: Coordinates,
    /// Where to find the point
    pub location_description: Option<String>,
    /// Opening hours
    pub opening_hours: Option<String>,
    /// Postal address
    pub address_details: Option<AddressDetails>,
    /// Point type code
    pub point_type: Option<String>,
    /// Open around the clock
    #[serde(rename = "location247")]
    pub round_the_clock: Option<bool>,
    /// Photo of the point
    pub image_url: Option<String>,
    /// Point has an air quality sensor
    pub air_sensor: Option<bool>,
}

/// Person a parcel is shared with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedTo {
    /// Display name
    pub name: Option<String>,
    /// Phone number
    pub phone_number: String,
}

/// Parcel fields the collect/validate endpoint identifies a parcel by
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentOpenData {
    /// Shipment number
    pub shipment_number: String,
    /// Open code
    pub open_code: String,
    /// Receiver phone number
    pub receiver_phone_number: String,
}

/// Incoming parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ParcelPayload")]
pub struct Parcel {
    /// Shipment number
    pub shipment_number: String,
    /// How the parcel travels
    pub shipment_type: ShipmentType,
    /// Tracking status
    pub status: ParcelStatus,
    /// Code that opens the compartment
    pub open_code: Option<String>,
    /// QR payload
    pub qr_code: Option<String>,
    /// Size, on the locker or courier scale depending on the shipment type
    pub parcel_size: Option<ParcelSize>,
    /// When the parcel was stored in the locker
    pub stored_date: Option<DateTime<Utc>>,
    /// When the parcel was picked up
    #[serde(rename = "pickUpDate")]
    pub pickup_date: Option<DateTime<Utc>>,
    /// Pickup deadline
    pub expiry_date: Option<DateTime<Utc>>,
    /// Receiver
    pub receiver: Option<Receiver>,
    /// Sender
    pub sender: Option<Sender>,
    /// Pickup point
    #[serde(rename = "pickUpPoint")]
    pub pickup_point: Option<Point>,
    /// Own or friend's parcel
    pub ownership_status: Option<ParcelOwnership>,
    /// Friends the parcel is shared with
    #[serde(default)]
    pub shared_to: Vec<SharedTo>,
    /// End-of-week collection flag
    pub end_of_week_collection: Option<bool>,
    #[serde(skip)]
    compartment_properties: Option<CompartmentProperties>,
}

/// Parcel as sent by the server; the size scale depends on the shipment type
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParcelPayload {
    shipment_number: String,
    shipment_type: ShipmentType,
    status: ParcelStatus,
    open_code: Option<String>,
    qr_code: Option<String>,
    parcel_size: Option<String>,
    stored_date: Option<DateTime<Utc>>,
    #[serde(rename = "pickUpDate")]
    pickup_date: Option<DateTime<Utc>>,
    expiry_date: Option<DateTime<Utc>>,
    receiver: Option<Receiver>,
    sender: Option<Sender>,
    #[serde(rename = "pickUpPoint")]
    pickup_point: Option<Point>,
    ownership_status: Option<ParcelOwnership>,
    #[serde(default)]
    shared_to: Vec<SharedTo>,
    end_of_week_collection: Option<bool>,
}

impl From<ParcelPayload> for Parcel {
    fn from(payload: ParcelPayload) -> Self {
        let parcel_size = payload
            .parcel_size
            .map(|code| ParcelSize::for_shipment(&payload.shipment_type, code));

        Self {
            shipment_number: payload.shipment_number,
            shipment_type: payload.shipment_type,
            status: payload.status,
            open_code: payload.open_code,
            qr_code: payload.qr_code,
            parcel_size,
            stored_date: payload.stored_date,
            pickup_date: payload.pickup_date,
            expiry_date: payload.expiry_date,
            receiver: payload.receiver,
            sender: payload.sender,
            pickup_point: payload.pickup_point,
            ownership_status: payload.ownership_status,
            shared_to: payload.shared_to,
            end_of_week_collection: payload.end_of_week_collection,
            compartment_properties: None,
        }
    }
}

impl Parcel {
    /// Decode a parcel from its JSON payload
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let parcel: Parcel = serde_json::from_value(value)?;
        tracing::debug!(shipment_number = %parcel.shipment_number, "parsed parcel");
        Ok(parcel)
    }

    /// Whether the parcel sits in a locker
    pub fn is_locker_parcel(&self) -> bool {
        self.shipment_type == ShipmentType::Parcel
    }

    /// Identification sent to collect/validate
    ///
    /// `None` unless this is a locker parcel with an open code and a receiver.
    pub fn compartment_open_data(&self) -> Option<CompartmentOpenData> {
        if !self.is_locker_parcel() {
            tracing::warn!(shipment_type = %self.shipment_type, "no open data for non-locker parcel");
            return None;
        }

        Some(CompartmentOpenData {
            shipment_number: self.shipment_number.clone(),
            open_code: self.open_code.clone()?,
            receiver_phone_number: self.receiver.as_ref()?.phone_number.clone(),
        })
    }

    /// A jittered GPS fix next to the pickup point
    pub fn mocked_location(&self) -> Option<GeoPoint> {
        if !self.is_locker_parcel() {
            return None;
        }
        let point = self.pickup_point.as_ref()?;
        Some(GeoPoint::jittered(point.location, &mut rand::thread_rng()))
    }

    /// Collection state, once a collection has started
    pub fn compartment_properties(&self) -> Option<&CompartmentProperties> {
        self.compartment_properties.as_ref()
    }

    /// Compartment placement, once opened
    pub fn compartment_location(&self) -> Option<&CompartmentLocation> {
        self.compartment_properties.as_ref()?.location()
    }

    /// Last door status, once checked
    pub fn compartment_status(&self) -> Option<&CompartmentStatus> {
        self.compartment_properties.as_ref()?.status()
    }

    /// Collection stage, `None` when no collection has started
    pub fn collection_stage(&self) -> Option<CollectionStage> {
        self.compartment_properties.as_ref().map(|p| p.stage())
    }

    /// Forget a collection whose session expired server side
    pub fn clear_compartment_properties(&mut self) -> Option<CompartmentProperties> {
        self.compartment_properties.take()
    }

    pub(crate) fn attach_compartment_properties(&mut self, properties: CompartmentProperties) {
        if let Some(previous) = &self.compartment_properties {
            if previous.stage() != CollectionStage::Terminated {
                tracing::warn!(
                    shipment_number = %self.shipment_number,
                    stage = ?previous.stage(),
                    "replacing a collect session that was never terminated"
                );
            }
        }
        self.compartment_properties = Some(properties);
    }

    pub(crate) fn compartment_properties_mut(&mut self) -> Option<&mut CompartmentProperties> {
        self.compartment_properties.as_mut()
    }
}
