//! Decoding of SIRI JSON and XML responses.
//!
//! Both formats are first read into a generic tree ([`serde_json::Value`]),
//! normalized by a [`SiriMapper`] (wire names translated to field names,
//! empty strings dropped) and then bound to the [`Siri`] model in one step.
//! Nothing is returned unless binding succeeds as a whole.

pub(crate) mod de;
pub mod naming;
pub mod xml;

use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::config::{DecoderMode, ResponseFormat};
use crate::error::DecodeError;
use crate::siri::Siri;
use naming::{NamingStrategy, PascalCaseStrategy};

/// Name of the root element / wrapper property.
pub const ROOT_NAME: &str = "Siri";

/// Wire name of the pseudo-property holding element text, as JAXB names it.
pub const TEXT_ELEMENT_NAME: &str = "Value";

/// A configured reader for SIRI documents.
///
/// Immutable once built, so one instance can be shared between threads.
#[derive(Debug, Clone)]
pub struct SiriMapper {
    naming: Arc<dyn NamingStrategy>,
    text_element_name: String,
}

impl Default for SiriMapper {
    fn default() -> Self {
        Self::new(Arc::new(PascalCaseStrategy::default()))
    }
}

impl SiriMapper {
    pub fn new(naming: Arc<dyn NamingStrategy>) -> Self {
        let text_element_name = naming.translate("value").into_owned();
        Self {
            naming,
            text_element_name,
        }
    }

    pub fn naming(&self) -> &dyn NamingStrategy {
        self.naming.as_ref()
    }

    /// Decodes a JSON document of the form `{"Siri": {...}}`.
    pub fn read_json(&self, bytes: &[u8]) -> Result<Siri, DecodeError> {
        let document: Value = serde_json::from_slice(bytes)?;
        let root = match document {
            Value::Object(mut map) => map.remove(ROOT_NAME).ok_or(DecodeError::MissingRoot)?,
            _ => return Err(DecodeError::MissingRoot),
        };
        self.bind(root)
    }

    /// Decodes an XML document whose root element is `<Siri>`.
    pub fn read_xml(&self, bytes: &[u8]) -> Result<Siri, DecodeError> {
        let (root_name, root) = xml::read_tree(bytes, &self.text_element_name)?;
        if root_name != ROOT_NAME {
            debug!(root = %root_name, "Unexpected XML root element");
            return Err(DecodeError::MissingRoot);
        }
        self.bind(root)
    }

    pub fn read(&self, bytes: &[u8], format: ResponseFormat) -> Result<Siri, DecodeError> {
        match format {
            ResponseFormat::Json => self.read_json(bytes),
            ResponseFormat::Xml => self.read_xml(bytes),
        }
    }

    fn bind(&self, root: Value) -> Result<Siri, DecodeError> {
        let root = match self.normalize(root) {
            Some(value @ Value::Object(_)) => value,
            // `<Siri/>` or `"Siri": ""`
            None => Value::Object(Map::new()),
            Some(other) => {
                return Err(DecodeError::Structure(format!(
                    "expected an object under {ROOT_NAME}, found {other}"
                )));
            }
        };
        Ok(serde_json::from_value(root)?)
    }

    /// Translates keys to field names and drops empty strings and nulls.
    /// Returns `None` when the value itself is absent.
    fn normalize(&self, value: Value) -> Option<Value> {
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, value) in map {
                    if let Some(value) = self.normalize(value) {
                        let field = self.naming.field_name(&key).into_owned();
                        trace!(wire = %key, field = %field, "Mapped property");
                        out.insert(field, value);
                    }
                }
                Some(Value::Object(out))
            }
            Value::Array(items) => Some(Value::Array(
                items
                    .into_iter()
                    .filter_map(|item| self.normalize(item))
                    .collect(),
            )),
            other => Some(other),
        }
    }
}

/// Decodes response payloads according to the request configuration.
///
/// The shared mapper is built lazily on first use and then only read, so a
/// decoder can be wrapped in an `Arc` and handed to several clients.
/// [`DecoderMode::SingleShot`] builds a throwaway mapper per call instead;
/// the decoded value is the same either way. XML always uses the shared
/// mapper.
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    shared: OnceLock<SiriMapper>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lazily-initialized shared mapper.
    pub fn shared(&self) -> &SiriMapper {
        self.shared.get_or_init(|| {
            debug!("Initializing shared SIRI mapper");
            SiriMapper::default()
        })
    }

    pub fn decode(
        &self,
        bytes: &[u8],
        format: ResponseFormat,
        mode: DecoderMode,
    ) -> Result<Siri, DecodeError> {
        match (format, mode) {
            (ResponseFormat::Json, DecoderMode::SingleShot) => SiriMapper::default().read_json(bytes),
            (ResponseFormat::Json, DecoderMode::ReusableInstance) => self.shared().read_json(bytes),
            (ResponseFormat::Xml, _) => self.shared().read_xml(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::siri::ProgressRate;

    const VM_JSON: &str = include_str!("../../tests/fixtures/vehicle_monitoring.json");
    const VM_XML: &str = include_str!("../../tests/fixtures/vehicle_monitoring.xml");
    const SM_JSON: &str = include_str!("../../tests/fixtures/stop_monitoring.json");

    #[test]
    fn test_decode_vehicle_monitoring_json() {
        let decoder = ResponseDecoder::new();
        let siri = decoder
            .decode(
                VM_JSON.as_bytes(),
                ResponseFormat::Json,
                DecoderMode::ReusableInstance,
            )
            .unwrap();

        let vmd = siri.vehicle_monitoring_deliveries();
        assert_eq!(vmd.len(), 1);
        assert_eq!(vmd[0].vehicle_activity.len(), 2);

        let journey = vmd[0].vehicle_activity[0]
            .monitored_vehicle_journey
            .as_ref()
            .unwrap();
        assert_eq!(journey.line_ref.as_deref(), Some("MTA NYCT_S40"));
        assert_eq!(journey.direction_ref.as_deref(), Some("0"));
        assert_eq!(journey.progress_rate, Some(ProgressRate::NormalProgress));
        assert_eq!(journey.bearing, Some(124.24));
        assert_eq!(journey.situation_ref.len(), 1);
        // Empty strings are absent.
        assert_eq!(journey.block_ref, None);
        assert_eq!(
            journey.destination_name.as_ref().unwrap().as_str(),
            "ST GEORGE FERRY"
        );
    }

    #[test]
    fn test_single_value_accepted_as_array() {
        let siri = SiriMapper::default().read_json(VM_JSON.as_bytes()).unwrap();
        let second = siri.vehicle_monitoring_deliveries()[0].vehicle_activity[1]
            .monitored_vehicle_journey
            .as_ref()
            .unwrap();
        // `OnwardCall` is a single object in the fixture.
        assert_eq!(second.onward_calls.as_ref().unwrap().onward_call.len(), 1);
    }

    #[test]
    fn test_json_and_xml_decode_to_same_value() {
        let decoder = ResponseDecoder::new();
        let from_json = decoder
            .decode(VM_JSON.as_bytes(), ResponseFormat::Json, DecoderMode::SingleShot)
            .unwrap();
        let from_xml = decoder
            .decode(VM_XML.as_bytes(), ResponseFormat::Xml, DecoderMode::SingleShot)
            .unwrap();

        let json_sx = &from_json.situation_exchange_deliveries()[0];
        let xml_sx = &from_xml.situation_exchange_deliveries()[0];
        let xml_description = xml_sx.situations.as_ref().unwrap().pt_situation_element[0]
            .description
            .as_ref()
            .unwrap();
        assert_eq!(xml_description.lang.as_deref(), Some("EN"));
        assert!(xml_description.as_str().starts_with("b/d 1:00pm until f/n"));

        // Apart from the language tag, both documents carry the same data.
        let mut from_xml = from_xml;
        for element in &mut from_xml.service_delivery.as_mut().unwrap().situation_exchange_delivery[0]
            .situations
            .as_mut()
            .unwrap()
            .pt_situation_element
        {
            if let Some(d) = element.description.as_mut() {
                d.lang = None;
            }
        }
        assert_eq!(json_sx.situations, from_xml.situation_exchange_deliveries()[0].situations);
        assert_eq!(from_json, from_xml);
    }

    #[test]
    fn test_reusable_decoding_is_idempotent() {
        let decoder = ResponseDecoder::new();
        let first = decoder
            .decode(SM_JSON.as_bytes(), ResponseFormat::Json, DecoderMode::ReusableInstance)
            .unwrap();
        let second = decoder
            .decode(SM_JSON.as_bytes(), ResponseFormat::Json, DecoderMode::ReusableInstance)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.stop_monitoring_deliveries()[0].monitored_stop_visit.len(), 1);

        let single = decoder
            .decode(SM_JSON.as_bytes(), ResponseFormat::Json, DecoderMode::SingleShot)
            .unwrap();
        assert_eq!(first, single);
    }

    #[test]
    fn test_shared_mapper_initialized_once() {
        let decoder = ResponseDecoder::new();
        let a: *const SiriMapper = decoder.shared();
        let b: *const SiriMapper = decoder.shared();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_root() {
        let mapper = SiriMapper::default();
        assert!(matches!(
            mapper.read_json(br#"{"ServiceDelivery": {}}"#),
            Err(DecodeError::MissingRoot)
        ));
        assert!(matches!(
            mapper.read_json(b"[1, 2]"),
            Err(DecodeError::MissingRoot)
        ));
        assert!(matches!(
            mapper.read_xml(b"<Other><A>1</A></Other>"),
            Err(DecodeError::MissingRoot)
        ));
    }

    #[test]
    fn test_empty_root_decodes_to_empty_siri() {
        let mapper = SiriMapper::default();
        assert_eq!(mapper.read_xml(b"<Siri/>").unwrap(), Siri::default());
        assert_eq!(mapper.read_json(br#"{"Siri": ""}"#).unwrap(), Siri::default());
    }

    #[test]
    fn test_malformed_payloads_fail() {
        let mapper = SiriMapper::default();
        assert!(matches!(
            mapper.read_json(b"{\"Siri\": {"),
            Err(DecodeError::Json(_))
        ));
        assert!(mapper.read_xml(b"<Siri><ServiceDelivery></Siri>").is_err());
        // Schema mismatch: a timestamp that is not a timestamp.
        assert!(matches!(
            mapper.read_json(br#"{"Siri": {"ServiceDelivery": {"ResponseTimestamp": "yesterday"}}}"#),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            mapper.read_json(br#"{"Siri": 42}"#),
            Err(DecodeError::Structure(_))
        ));
    }

    #[test]
    fn test_decode_error_keeps_field_diagnostic() {
        let mapper = SiriMapper::default();

        let err = mapper
            .read_json(
                br#"{"Siri":{"ServiceDelivery":{"VehicleMonitoringDelivery":[
                    {"VehicleActivity":[{"RecordedAtTime":"not-a-time"}]}]}}}"#,
            )
            .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, DecodeError::Json(_)));
        assert!(!msg.contains("did not match any variant"), "{msg}");
        assert!(msg.contains("invalid"), "{msg}");

        let err = mapper
            .read_xml(
                b"<Siri><ServiceDelivery><VehicleMonitoringDelivery><VehicleActivity>\
                  <MonitoredVehicleJourney><Bearing>north-east</Bearing></MonitoredVehicleJourney>\
                  </VehicleActivity></VehicleMonitoringDelivery></ServiceDelivery></Siri>",
            )
            .unwrap_err();
        assert!(err.to_string().contains("north-east"), "{err}");
    }

    #[test]
    fn test_text_element_name_follows_naming() {
        let mapper = SiriMapper::default();
        assert_eq!(mapper.text_element_name, TEXT_ELEMENT_NAME);
        assert_eq!(mapper.naming().translate("lang"), "lang");
    }
}
