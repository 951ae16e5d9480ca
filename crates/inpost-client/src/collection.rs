//! Compartment collection flow
//!
//! Picking a parcel up from a locker is a short server side session:
//!
//! ```text
//! collect_compartment_properties -> open_compartment -> check_compartment_status(OPENED)
//!     -> (user takes the parcel) -> check_compartment_status(CLOSED) -> terminate_collect_session
//! ```
//!
//! The session UUID lives in the parcel's [`CompartmentProperties`] and every
//! step checks the parcel's [`CollectionStage`] before sending anything.
//! [`InpostClient::collect`] and [`InpostClient::close_compartment`] chain the
//! steps for the common case.

use crate::endpoints;
use crate::http::{ApiRequest, Transport};
use crate::parcel::{
    CollectionStage, CollectionStep, CompartmentLocation, CompartmentOpenData, CompartmentProperties,
    GeoPoint, Parcel,
};
use crate::statuses::{CompartmentStatus, ExpectedStatus};
use crate::{Error, InpostClient, Result};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateBody {
    parcel: CompartmentOpenData,
    geo_point: GeoPoint,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody<'a> {
    session_uuid: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody<'a> {
    session_uuid: &'a str,
    expected_status: ExpectedStatus,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: CompartmentStatus,
}

/// Result of [`InpostClient::collect`]
#[derive(Debug, Clone, PartialEq)]
pub struct CollectOutcome {
    /// Parcel carrying the live collect session
    pub parcel: Parcel,
    /// Whether the server confirmed the door open
    pub opened: bool,
}

/// Session UUID of `parcel`, once `step` is allowed from its stage
fn session_for(parcel: &Parcel, step: CollectionStep) -> Result<String> {
    let properties = parcel.compartment_properties().ok_or_else(|| {
        Error::NoParcel(format!(
            "{}: parcel {} has no compartment properties",
            step.name(),
            parcel.shipment_number
        ))
    })?;

    properties.stage().ensure(step)?;
    Ok(properties.session_uuid().to_owned())
}

fn properties_mut(parcel: &mut Parcel) -> Result<&mut CompartmentProperties> {
    let shipment_number = parcel.shipment_number.clone();
    parcel
        .compartment_properties_mut()
        .ok_or_else(|| Error::NoParcel(format!("parcel {} lost its compartment properties", shipment_number)))
}

impl<T: Transport> InpostClient<T> {
    /// Start a collection: validate the parcel and open a collect session
    ///
    /// Pass exactly one of `shipment_number` (the parcel is fetched first) or
    /// `parcel`. Without `location`, a GPS fix is mocked next to the parcel's
    /// pickup point. The returned parcel carries fresh compartment properties
    /// in [`CollectionStage::PropertiesCollected`].
    ///
    /// # Errors
    ///
    /// - [`Error::SingleParam`] when both identifiers are given
    /// - [`Error::MissingParams`] when neither is given, or no location can be
    ///   derived
    /// - [`Error::NoParcel`] when the parcel cannot be collected from a locker
    /// - the request pipeline errors
    pub async fn collect_compartment_properties(
        &mut self,
        shipment_number: Option<&str>,
        parcel: Option<Parcel>,
        location: Option<GeoPoint>,
    ) -> Result<Parcel> {
        let mut parcel = match (shipment_number, parcel) {
            (Some(_), Some(_)) => {
                return Err(Error::SingleParam(
                    "pass either a shipment number or a parcel, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(Error::MissingParams(
                    "a shipment number or a parcel is required".to_string(),
                ))
            }
            (Some(number), None) => self.get_parcel(number).await?,
            (None, Some(parcel)) => parcel,
        };

        let span = self.span().clone();
        async move {
            let open_data = parcel.compartment_open_data().ok_or_else(|| {
                Error::NoParcel(format!(
                    "parcel {} cannot be collected from a locker",
                    parcel.shipment_number
                ))
            })?;

            let geo_point = match location {
                Some(location) => location,
                None => parcel.mocked_location().ok_or_else(|| {
                    Error::MissingParams(format!(
                        "location is required, parcel {} has no pickup point",
                        parcel.shipment_number
                    ))
                })?,
            };

            let request = ApiRequest::post("collect compartment properties", endpoints::COLLECT_VALIDATE)
                .json_body(&ValidateBody {
                    parcel: open_data,
                    geo_point,
                })?;

            let response = self.request(request).await?;
            let properties: CompartmentProperties = response.json()?;

            tracing::info!(
                shipment_number = %parcel.shipment_number,
                expires_in = properties.session_expiration_time(),
                "collect session opened"
            );

            parcel.attach_compartment_properties(properties);
            Ok(parcel)
        }
        .instrument(span)
        .await
    }

    /// Open the compartment of a validated collect session
    ///
    /// Records the compartment placement on the parcel.
    ///
    /// # Errors
    ///
    /// [`Error::NoParcel`] without compartment properties,
    /// [`Error::InvalidState`] unless in [`CollectionStage::PropertiesCollected`],
    /// plus the request pipeline errors.
    pub async fn open_compartment(&mut self, parcel: &mut Parcel) -> Result<CollectionStage> {
        self.open_step(parcel, CollectionStep::Open, endpoints::COMPARTMENT_OPEN)
            .await
    }

    /// Open the compartment again within the same collect session
    pub async fn reopen_compartment(&mut self, parcel: &mut Parcel) -> Result<CollectionStage> {
        self.open_step(parcel, CollectionStep::Reopen, endpoints::COMPARTMENT_REOPEN)
            .await
    }

    async fn open_step(
        &mut self,
        parcel: &mut Parcel,
        step: CollectionStep,
        path: &str,
    ) -> Result<CollectionStage> {
        let session_uuid = session_for(parcel, step)?;
        let span = self.span().clone();

        async move {
            let request = ApiRequest::post(step.name(), path).json_body(&SessionBody {
                session_uuid: &session_uuid,
            })?;

            let response = self.request(request).await?;
            let location: CompartmentLocation = response.json()?;

            tracing::info!(
                shipment_number = %parcel.shipment_number,
                compartment = %location.name,
                waiting_time = location.open_compartment_waiting_time,
                "compartment opened"
            );

            let properties = properties_mut(parcel)?;
            properties.record_location(location);
            Ok(properties.advance(step, true))
        }
        .instrument(span)
        .await
    }

    /// Ask the server whether the door is in the `expected` state
    ///
    /// Returns `true` when the reported status matches. A mismatch, including
    /// a status this client does not know, returns `false` and leaves the
    /// stage unchanged. The reported status is recorded either way.
    ///
    /// # Errors
    ///
    /// [`Error::NoParcel`] without compartment properties,
    /// [`Error::InvalidState`] when the door was never opened or the session
    /// is terminated, plus the request pipeline errors.
    pub async fn check_compartment_status(
        &mut self,
        parcel: &mut Parcel,
        expected: ExpectedStatus,
    ) -> Result<bool> {
        let step = CollectionStep::CheckStatus(expected);
        let session_uuid = session_for(parcel, step)?;
        let span = self.span().clone();

        async move {
            let request = ApiRequest::post(step.name(), endpoints::COMPARTMENT_STATUS).json_body(
                &StatusBody {
                    session_uuid: &session_uuid,
                    expected_status: expected,
                },
            )?;

            let response = self.request(request).await?;
            let reported: StatusResponse = response.json()?;
            let status = reported.status;
            let confirmed = expected.matches(&status);

            if confirmed {
                tracing::debug!(status = %status, "compartment status confirmed");
            } else {
                tracing::warn!(
                    expected = expected.as_str(),
                    reported = %status,
                    "compartment status mismatch"
                );
            }

            let properties = properties_mut(parcel)?;
            properties.record_status(status);
            properties.advance(step, confirmed);
            Ok(confirmed)
        }
        .instrument(span)
        .await
    }

    /// End the collect session; the session UUID is spent afterwards
    ///
    /// # Errors
    ///
    /// [`Error::NoParcel`] without compartment properties,
    /// [`Error::InvalidState`] unless the door was confirmed closed,
    /// plus the request pipeline errors.
    pub async fn terminate_collect_session(&mut self, parcel: &mut Parcel) -> Result<CollectionStage> {
        let step = CollectionStep::Terminate;
        let session_uuid = session_for(parcel, step)?;
        let span = self.span().clone();

        async move {
            let request = ApiRequest::post(step.name(), endpoints::COLLECT_TERMINATE)
                .json_body(&SessionBody {
                    session_uuid: &session_uuid,
                })?;

            self.request(request).await?;
            tracing::info!(shipment_number = %parcel.shipment_number, "collect session terminated");

            Ok(properties_mut(parcel)?.advance(step, true))
        }
        .instrument(span)
        .await
    }

    /// Validate, open and confirm the door open in one go
    ///
    /// Stops at the first failing step. `opened` is `false` when the server
    /// reports the door in another state; the parcel is still returned so the
    /// caller can check again or reopen.
    pub async fn collect(
        &mut self,
        shipment_number: Option<&str>,
        parcel: Option<Parcel>,
        location: Option<GeoPoint>,
    ) -> Result<CollectOutcome> {
        let mut parcel = self
            .collect_compartment_properties(shipment_number, parcel, location)
            .await?;
        self.open_compartment(&mut parcel).await?;
        let opened = self
            .check_compartment_status(&mut parcel, ExpectedStatus::Opened)
            .await?;

        Ok(CollectOutcome { parcel, opened })
    }

    /// Confirm the door closed, then terminate the collect session
    ///
    /// Returns `false` without terminating when the door is not reported
    /// closed.
    pub async fn close_compartment(&mut self, parcel: &mut Parcel) -> Result<bool> {
        if !self
            .check_compartment_status(parcel, ExpectedStatus::Closed)
            .await?
        {
            return Ok(false);
        }

        self.terminate_collect_session(parcel).await?;
        Ok(true)
    }
}
