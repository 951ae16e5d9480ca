//! Parcel and point lookups
//!
//! Lists are filtered client side; the API has no query parameters for it.

use crate::endpoints;
use crate::http::{ApiRequest, Transport};
use crate::parcel::{Parcel, Point};
use crate::statuses::{ParcelSize, ParcelStatus, ParcelType, ShipmentType};
use crate::{InpostClient, Result};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Deserialize)]
struct ParcelList {
    #[serde(default)]
    parcels: Vec<serde_json::Value>,
}

/// Client side filter for parcel lists
///
/// An empty set matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParcelFilter {
    /// Keep parcels in one of these statuses
    pub statuses: HashSet<ParcelStatus>,
    /// Keep parcels waiting at one of these points
    pub pickup_points: HashSet<String>,
    /// Keep parcels of one of these shipment types
    pub shipment_types: HashSet<ShipmentType>,
    /// Keep parcels of one of these sizes
    ///
    /// Locker and courier sizes are distinct values, so a locker size only
    /// matches locker parcels.
    pub sizes: HashSet<ParcelSize>,
}

impl ParcelFilter {
    /// Filter matching every parcel
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep parcels with `status`
    pub fn with_status(mut self, status: ParcelStatus) -> Self {
        self.statuses.insert(status);
        self
    }

    /// Also keep parcels at `point`
    pub fn with_pickup_point(mut self, point: impl Into<String>) -> Self {
        self.pickup_points.insert(point.into());
        self
    }

    /// Also keep parcels of `shipment_type`
    pub fn with_shipment_type(mut self, shipment_type: ShipmentType) -> Self {
        self.shipment_types.insert(shipment_type);
        self
    }

    /// Also keep parcels of `size`
    pub fn with_size(mut self, size: impl Into<ParcelSize>) -> Self {
        self.sizes.insert(size.into());
        self
    }

    /// Whether `parcel` passes every non-empty criterion
    pub fn matches(&self, parcel: &Parcel) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&parcel.status);
        let type_ok =
            self.shipment_types.is_empty() || self.shipment_types.contains(&parcel.shipment_type);
        let point_ok = self.pickup_points.is_empty()
            || parcel
                .pickup_point
                .as_ref()
                .map(|point| self.pickup_points.contains(&point.name))
                .unwrap_or(false);
        let size_ok = self.sizes.is_empty()
            || parcel
                .parcel_size
                .as_ref()
                .map(|size| self.sizes.contains(size))
                .unwrap_or(false);

        status_ok && type_ok && point_ok && size_ok
    }
}

impl<T: Transport> InpostClient<T> {
    /// Fetch one tracked parcel
    pub async fn get_parcel(&mut self, shipment_number: &str) -> Result<Parcel> {
        let request = ApiRequest::get("get parcel", endpoints::tracked_parcel(shipment_number));
        let response = self.request(request).await?;
        Parcel::from_json(response.json()?)
    }

    /// Fetch tracked parcels passing `filter`
    ///
    /// Entries that do not decode as a [`Parcel`] are skipped with a warning
    /// so one odd payload does not hide the rest of the list.
    pub async fn get_parcels(&mut self, filter: &ParcelFilter) -> Result<Vec<Parcel>> {
        let list = self.get_parcel_list(ParcelType::Tracked).await?;

        let mut parcels = Vec::with_capacity(list.len());
        for value in list {
            let shipment_number = value
                .get("shipmentNumber")
                .and_then(|n| n.as_str())
                .unwrap_or("<none>")
                .to_owned();

            match Parcel::from_json(value) {
                Ok(parcel) if filter.matches(&parcel) => parcels.push(parcel),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        parent: self.span(),
                        shipment_number = %shipment_number,
                        error = %e,
                        "skipping undecodable parcel"
                    );
                }
            }
        }

        tracing::debug!(parent: self.span(), count = parcels.len(), "parcels matched filter");
        Ok(parcels)
    }

    /// Fetch a parcel list as raw JSON entries
    ///
    /// Sent parcels and returns use payloads [`Parcel`] does not model.
    pub async fn get_parcel_list(&mut self, parcel_type: ParcelType) -> Result<Vec<serde_json::Value>> {
        let request = ApiRequest::get(
            format!("get {} parcels", parcel_type.label()),
            parcel_type.endpoint(),
        );
        let response = self.request(request).await?;
        let list: ParcelList = response.json()?;
        Ok(list.parcels)
    }

    /// Fetch the parcel price list
    pub async fn get_prices(&mut self) -> Result<serde_json::Value> {
        let response = self
            .request(ApiRequest::get("get prices", endpoints::PARCEL_PRICES))
            .await?;
        response.json()
    }

    /// Fetch details of a parcel locker or parcel point
    pub async fn get_point(&mut self, name: &str) -> Result<Point> {
        let response = self
            .request(ApiRequest::get("get point", endpoints::point(name)))
            .await?;
        response.json()
    }
}
