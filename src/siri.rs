//! SIRI service-delivery object tree.
//!
//! Only the parts of the SIRI schema that vehicle- and stop-monitoring
//! servers actually return are modeled. Field names are the lowerCamelCase
//! counterparts of the PascalCase wire names; unknown elements are ignored.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::parser::de::{lenient, one_or_many, text};

pub type Timestamp = DateTime<FixedOffset>;

/// Root of every SIRI response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Siri {
    pub service_delivery: Option<ServiceDelivery>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceDelivery {
    pub response_timestamp: Option<Timestamp>,
    pub producer_ref: Option<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub vehicle_monitoring_delivery: Vec<VehicleMonitoringDelivery>,
    #[serde(deserialize_with = "one_or_many")]
    pub stop_monitoring_delivery: Vec<StopMonitoringDelivery>,
    #[serde(deserialize_with = "one_or_many")]
    pub situation_exchange_delivery: Vec<SituationExchangeDelivery>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleMonitoringDelivery {
    pub response_timestamp: Option<Timestamp>,
    pub valid_until: Option<Timestamp>,
    #[serde(deserialize_with = "one_or_many")]
    pub vehicle_activity: Vec<VehicleActivity>,
    pub error_condition: Option<ErrorCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleActivity {
    pub recorded_at_time: Option<Timestamp>,
    pub monitored_vehicle_journey: Option<MonitoredVehicleJourney>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StopMonitoringDelivery {
    pub response_timestamp: Option<Timestamp>,
    pub valid_until: Option<Timestamp>,
    #[serde(deserialize_with = "one_or_many")]
    pub monitored_stop_visit: Vec<MonitoredStopVisit>,
    pub error_condition: Option<ErrorCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitoredStopVisit {
    pub recorded_at_time: Option<Timestamp>,
    pub monitored_vehicle_journey: Option<MonitoredVehicleJourney>,
}

/// Error reported by the server inside a delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorCondition {
    pub description: Option<NaturalLanguageString>,
    pub other_error: Option<OtherError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OtherError {
    pub error_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitoredVehicleJourney {
    pub line_ref: Option<String>,
    #[serde(deserialize_with = "text")]
    pub direction_ref: Option<String>,
    pub framed_vehicle_journey_ref: Option<FramedVehicleJourneyRef>,
    pub journey_pattern_ref: Option<String>,
    pub published_line_name: Option<NaturalLanguageString>,
    pub operator_ref: Option<String>,
    pub origin_ref: Option<String>,
    pub destination_ref: Option<String>,
    pub destination_name: Option<NaturalLanguageString>,
    #[serde(deserialize_with = "one_or_many")]
    pub situation_ref: Vec<SituationRef>,
    #[serde(deserialize_with = "lenient")]
    pub monitored: Option<bool>,
    pub vehicle_location: Option<Location>,
    #[serde(deserialize_with = "lenient")]
    pub bearing: Option<f64>,
    pub progress_rate: Option<ProgressRate>,
    pub progress_status: Option<String>,
    pub block_ref: Option<String>,
    pub vehicle_ref: Option<String>,
    pub monitored_call: Option<Call>,
    pub onward_calls: Option<OnwardCalls>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FramedVehicleJourneyRef {
    pub data_frame_ref: Option<String>,
    pub dated_vehicle_journey_ref: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SituationRef {
    pub situation_simple_ref: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    #[serde(deserialize_with = "lenient")]
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub latitude: Option<f64>,
}

/// Progress of a vehicle relative to its schedule, read by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressRate {
    NoProgress,
    SlowProgress,
    NormalProgress,
    FastProgress,
    #[serde(other)]
    Unknown,
}

/// A stop visited by a journey (monitored or onward).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Call {
    pub stop_point_ref: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub visit_number: Option<u32>,
    pub stop_point_name: Option<NaturalLanguageString>,
    pub aimed_arrival_time: Option<Timestamp>,
    pub expected_arrival_time: Option<Timestamp>,
    pub expected_departure_time: Option<Timestamp>,
    pub extensions: Option<Extensions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnwardCalls {
    #[serde(deserialize_with = "one_or_many")]
    pub onward_call: Vec<Call>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Extensions {
    pub distances: Option<Distances>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Distances {
    pub presentable_distance: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub distance_from_call: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub stops_from_call: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub call_distance_along_route: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SituationExchangeDelivery {
    pub response_timestamp: Option<Timestamp>,
    pub situations: Option<Situations>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Situations {
    #[serde(deserialize_with = "one_or_many")]
    pub pt_situation_element: Vec<PtSituationElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PtSituationElement {
    pub situation_number: Option<String>,
    pub creation_time: Option<Timestamp>,
    pub publication_window: Option<PublicationWindow>,
    pub severity: Option<String>,
    pub summary: Option<NaturalLanguageString>,
    pub description: Option<NaturalLanguageString>,
    pub affects: Option<Affects>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublicationWindow {
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Affects {
    pub vehicle_journeys: Option<AffectedVehicleJourneys>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AffectedVehicleJourneys {
    #[serde(deserialize_with = "one_or_many")]
    pub affected_vehicle_journey: Vec<AffectedVehicleJourney>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AffectedVehicleJourney {
    pub line_ref: Option<String>,
    #[serde(deserialize_with = "text")]
    pub direction_ref: Option<String>,
}

/// Free text with an optional `xml:lang` tag.
///
/// JSON producers usually send a bare string; XML carries the text as element
/// content next to the `xml:lang` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NaturalLanguageRepr")]
pub struct NaturalLanguageString {
    pub value: Option<String>,
    pub lang: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NaturalLanguageRepr {
    Plain(String),
    Tagged {
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        lang: Option<String>,
    },
}

impl From<NaturalLanguageRepr> for NaturalLanguageString {
    fn from(repr: NaturalLanguageRepr) -> Self {
        match repr {
            NaturalLanguageRepr::Plain(value) => Self {
                value: Some(value),
                lang: None,
            },
            NaturalLanguageRepr::Tagged { value, lang } => Self { value, lang },
        }
    }
}

impl NaturalLanguageString {
    pub fn as_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

impl Siri {
    pub fn vehicle_monitoring_deliveries(&self) -> &[VehicleMonitoringDelivery] {
        self.service_delivery
            .as_ref()
            .map(|sd| sd.vehicle_monitoring_delivery.as_slice())
            .unwrap_or_default()
    }

    pub fn stop_monitoring_deliveries(&self) -> &[StopMonitoringDelivery] {
        self.service_delivery
            .as_ref()
            .map(|sd| sd.stop_monitoring_delivery.as_slice())
            .unwrap_or_default()
    }

    pub fn situation_exchange_deliveries(&self) -> &[SituationExchangeDelivery] {
        self.service_delivery
            .as_ref()
            .map(|sd| sd.situation_exchange_delivery.as_slice())
            .unwrap_or_default()
    }
}
