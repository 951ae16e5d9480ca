//! Wire enums
//!
//! Server enum strings map onto known variants; anything else is kept as
//! `Unknown(raw)` and logged, so a new server value never breaks decoding.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, $label:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Value this client does not recognise
            Unknown(String),
        }

        impl $name {
            /// Wire name of the value
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )+
                    Self::Unknown(raw) => raw,
                }
            }

            /// Human readable label, `None` for unknown values
            pub fn label(&self) -> Option<&'static str> {
                match self {
                    $( Self::$variant => Some($label), )+
                    Self::Unknown(_) => None,
                }
            }

            /// Whether the server sent a value outside the known set
            pub fn is_unknown(&self) -> bool {
                matches!(self, Self::Unknown(_))
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                match raw.as_str() {
                    $( $wire => Self::$variant, )+
                    _ => {
                        tracing::warn!(kind = stringify!($name), value = %raw, "unexpected wire value");
                        Self::Unknown(raw)
                    }
                }
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::from(raw.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Tracking status of a parcel
    ParcelStatus {
        /// Confirmed
        Confirmed => "CONFIRMED", "Potwierdzona";
        /// Collected from sender
        CollectedFromSender => "COLLECTED_FROM_SENDER", "Odebrana od nadawcy";
        /// Dispatched by sender at a parcel point
        DispatchedBySenderToPok => "DISPATCHED_BY_SENDER_TO_POK", "Nadana w PaczkoPunkcie";
        /// Dispatched by sender at a locker
        DispatchedBySender => "DISPATCHED_BY_SENDER", "Nadana w paczkomacie";
        /// Taken by courier
        TakenByCourier => "TAKEN_BY_COURIER", "Odebrana przez Kuriera";
        /// Taken by courier from a parcel point
        TakenByCourierFromPok => "TAKEN_BY_COURIER_FROM_POK", "Odebrana z PaczkoPunktu nadawczego";
        /// Adopted at source branch
        AdoptedAtSourceBranch => "ADOPTED_AT_SOURCE_BRANCH", "Przyjęta w oddziale";
        /// Adopted at sorting center
        AdoptedAtSortingCenter => "ADOPTED_AT_SORTING_CENTER", "Przyjęta w sortowni";
        /// Sent from source branch
        SentFromSourceBranch => "SENT_FROM_SOURCE_BRANCH", "Wysłana z oddziału";
        /// Out for delivery
        OutForDelivery => "OUT_FOR_DELIVERY", "Wydana do doręczenia";
        /// Out for delivery to an address
        OutForDeliveryToAddress => "OUT_FOR_DELIVERY_TO_ADDRESS", "Gotowa do doręczenia";
        /// Waiting in the locker
        ReadyToPickup => "READY_TO_PICKUP", "Gotowa do odbioru";
        /// Delivered
        Delivered => "DELIVERED", "Doręczona";
    }
}

wire_enum! {
    /// How a parcel travels
    ShipmentType {
        /// Parcel locker
        Parcel => "parcel", "Paczkomat";
        /// Courier
        Courier => "courier", "Kurier";
        /// Parcel point
        ParcelPoint => "parcel_point", "PaczkoPunkt";
    }
}

wire_enum! {
    /// Whether the parcel is the user's own or shared by a friend
    ParcelOwnership {
        /// Shared by a friend
        Friend => "FRIEND", "Zaprzyjaźniona";
        /// Own parcel
        Own => "OWN", "Własna";
    }
}

wire_enum! {
    /// Compartment door status reported by the server
    CompartmentStatus {
        /// Door open
        Opened => "OPENED", "Otwarta";
        /// Door closed
        Closed => "CLOSED", "Zamknięta";
    }
}

wire_enum! {
    /// Locker compartment size, labelled with its dimensions in cm
    ParcelLockerSize {
        /// Small
        A => "A", "8x38x64";
        /// Medium
        B => "B", "19x38x64";
        /// Large
        C => "C", "41x38x64";
    }
}

wire_enum! {
    /// Courier parcel size, labelled with its dimensions in cm
    ParcelCarrierSize {
        /// Small
        A => "A", "8x38x64";
        /// Medium
        B => "B", "19x38x64";
        /// Large
        C => "C", "41x38x64";
        /// Extra large
        D => "D", "50x50x80";
        /// Non-standard
        Other => "OTHER", "UNKNOWN";
    }
}

/// Size of a parcel
///
/// The same size code means different things for locker and courier parcels,
/// so the shipment type decides which scale applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ParcelSize {
    /// Locker parcel size
    Locker(ParcelLockerSize),
    /// Courier parcel size
    Carrier(ParcelCarrierSize),
}

impl ParcelSize {
    /// Decode a size code on the scale of `shipment_type`
    pub fn for_shipment(shipment_type: &ShipmentType, code: impl Into<String>) -> Self {
        match shipment_type {
            ShipmentType::Parcel => ParcelSize::Locker(ParcelLockerSize::from(code.into())),
            _ => ParcelSize::Carrier(ParcelCarrierSize::from(code.into())),
        }
    }

    /// Wire code of the size
    pub fn as_str(&self) -> &str {
        match self {
            ParcelSize::Locker(size) => size.as_str(),
            ParcelSize::Carrier(size) => size.as_str(),
        }
    }

    /// Dimensions label, `None` for unknown codes
    pub fn label(&self) -> Option<&'static str> {
        match self {
            ParcelSize::Locker(size) => size.label(),
            ParcelSize::Carrier(size) => size.label(),
        }
    }

    /// Whether the code is outside the known scale
    pub fn is_unknown(&self) -> bool {
        match self {
            ParcelSize::Locker(size) => size.is_unknown(),
            ParcelSize::Carrier(size) => size.is_unknown(),
        }
    }
}

impl From<ParcelLockerSize> for ParcelSize {
    fn from(size: ParcelLockerSize) -> Self {
        ParcelSize::Locker(size)
    }
}

impl From<ParcelCarrierSize> for ParcelSize {
    fn from(size: ParcelCarrierSize) -> Self {
        ParcelSize::Carrier(size)
    }
}

impl fmt::Display for ParcelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Door status the client asks the server to confirm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpectedStatus {
    /// Expect the door open
    #[default]
    Opened,
    /// Expect the door closed
    Closed,
}

impl ExpectedStatus {
    /// Wire name of the value
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpectedStatus::Opened => "OPENED",
            ExpectedStatus::Closed => "CLOSED",
        }
    }

    /// Compare against a reported status by wire name
    pub fn matches(&self, actual: &CompartmentStatus) -> bool {
        actual.as_str() == self.as_str()
    }
}

/// Which parcel list to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParcelType {
    /// Incoming parcels
    Tracked,
    /// Parcels sent by the user
    Sent,
    /// Returns
    Returns,
}

impl ParcelType {
    /// Endpoint path of the list
    pub fn endpoint(&self) -> &'static str {
        match self {
            ParcelType::Tracked => crate::endpoints::TRACKED_PARCELS,
            ParcelType::Sent => crate::endpoints::SENT_PARCELS,
            ParcelType::Returns => crate::endpoints::RETURNED_PARCELS,
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            ParcelType::Tracked => "Przychodzące",
            ParcelType::Sent => "Wysłane",
            ParcelType::Returns => "Zwroty",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values_decode() {
        let status: ParcelStatus = serde_json::from_str("\"READY_TO_PICKUP\"").unwrap();
        assert_eq!(status, ParcelStatus::ReadyToPickup);
        assert_eq!(status.label(), Some("Gotowa do odbioru"));
        assert!(!status.is_unknown());

        let kind: ShipmentType = serde_json::from_str("\"parcel\"").unwrap();
        assert_eq!(kind, ShipmentType::Parcel);
    }

    #[test]
    fn test_unknown_value_keeps_raw() {
        let status: CompartmentStatus = serde_json::from_str("\"HALF_OPEN\"").unwrap();
        assert_eq!(status, CompartmentStatus::Unknown("HALF_OPEN".to_string()));
        assert!(status.is_unknown());
        assert_eq!(status.label(), None);
        assert_eq!(status.to_string(), "HALF_OPEN");
    }

    #[test]
    fn test_serializes_wire_name() {
        assert_eq!(
            serde_json::to_string(&ParcelOwnership::Own).unwrap(),
            "\"OWN\""
        );
        assert_eq!(
            serde_json::to_string(&ParcelStatus::Unknown("NEW_ONE".to_string())).unwrap(),
            "\"NEW_ONE\""
        );
        assert_eq!(
            serde_json::to_string(&ExpectedStatus::Closed).unwrap(),
            "\"CLOSED\""
        );
    }

    #[test]
    fn test_parcel_size_scale_follows_shipment_type() {
        let locker = ParcelSize::for_shipment(&ShipmentType::Parcel, "B");
        assert_eq!(locker, ParcelSize::Locker(ParcelLockerSize::B));
        assert_eq!(locker.label(), Some("19x38x64"));

        let courier = ParcelSize::for_shipment(&ShipmentType::Courier, "OTHER");
        assert_eq!(courier, ParcelSize::Carrier(ParcelCarrierSize::Other));

        let oversized = ParcelSize::for_shipment(&ShipmentType::Parcel, "D");
        assert!(oversized.is_unknown());
        assert_eq!(oversized.as_str(), "D");
        assert_eq!(serde_json::to_value(&oversized).unwrap(), serde_json::json!("D"));
    }

    #[test]
    fn test_expected_status_matches_by_name() {
        assert!(ExpectedStatus::Opened.matches(&CompartmentStatus::Opened));
        assert!(!ExpectedStatus::Opened.matches(&CompartmentStatus::Closed));
        assert!(!ExpectedStatus::Closed.matches(&CompartmentStatus::Unknown("X".to_string())));
        assert_eq!(ExpectedStatus::default(), ExpectedStatus::Opened);
    }

    #[test]
    fn test_parcel_type_endpoints() {
        assert_eq!(ParcelType::Tracked.endpoint(), "/v3/parcels/tracked");
        assert_eq!(ParcelType::Sent.endpoint(), "/v2/parcels/sent");
        assert_eq!(ParcelType::Returns.endpoint(), "/v1/returns/parcels");
        assert_eq!(ParcelType::Returns.label(), "Zwroty");
    }
}
