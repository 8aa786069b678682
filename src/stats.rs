use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::RequestConfig;
use crate::siri::{MonitoredVehicleJourney, Siri};

/// One row of benchmark output: what a single response contained, or why
/// there was no response.
#[derive(Debug, Default, Serialize)]
pub struct DeliveryStats {
    pub timestamp: DateTime<Utc>,
    pub request_kind: Option<String>,
    pub config: Option<String>,
    pub sample: Option<usize>,
    pub latency_ms: f64,
    pub response_timestamp: Option<String>,

    // deliveries
    pub vehicle_monitoring_deliveries: usize,
    pub stop_monitoring_deliveries: usize,
    pub situation_exchange_deliveries: usize,
    pub error_conditions: usize,

    // delivery contents
    pub vehicle_activities: usize,
    pub stop_visits: usize,
    pub situations: usize,

    // journey fields
    pub journeys: usize,
    pub with_location: usize,
    pub with_bearing: usize,
    pub with_progress_rate: usize,
    pub with_vehicle_ref: usize,
    pub with_monitored_call: usize,
    pub with_onward_calls: usize,
    pub with_situation_ref: usize,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl DeliveryStats {
    pub fn from_siri(siri: &Siri) -> Self {
        let mut s = DeliveryStats {
            timestamp: Utc::now(),
            ..Default::default()
        };

        let Some(delivery) = &siri.service_delivery else {
            return s;
        };

        s.response_timestamp = delivery.response_timestamp.map(|t| t.to_rfc3339());
        s.vehicle_monitoring_deliveries = delivery.vehicle_monitoring_delivery.len();
        s.stop_monitoring_deliveries = delivery.stop_monitoring_delivery.len();
        s.situation_exchange_deliveries = delivery.situation_exchange_delivery.len();

        for vmd in &delivery.vehicle_monitoring_delivery {
            if vmd.error_condition.is_some() {
                s.error_conditions += 1;
            }

            s.vehicle_activities += vmd.vehicle_activity.len();
            for activity in &vmd.vehicle_activity {
                if let Some(journey) = &activity.monitored_vehicle_journey {
                    s.count_journey(journey);
                }
            }
        }

        for smd in &delivery.stop_monitoring_delivery {
            if smd.error_condition.is_some() {
                s.error_conditions += 1;
            }

            s.stop_visits += smd.monitored_stop_visit.len();
            for visit in &smd.monitored_stop_visit {
                if let Some(journey) = &visit.monitored_vehicle_journey {
                    s.count_journey(journey);
                }
            }
        }

        for sxd in &delivery.situation_exchange_delivery {
            if let Some(situations) = &sxd.situations {
                s.situations += situations.pt_situation_element.len();
            }
        }

        s
    }

    fn count_journey(&mut self, journey: &MonitoredVehicleJourney) {
        self.journeys += 1;

        if let Some(location) = &journey.vehicle_location {
            if location.latitude.is_some() && location.longitude.is_some() {
                self.with_location += 1;
            }
        }

        if journey.bearing.is_some() {
            self.with_bearing += 1;
        }

        if journey.progress_rate.is_some() {
            self.with_progress_rate += 1;
        }

        if journey.vehicle_ref.is_some() {
            self.with_vehicle_ref += 1;
        }

        if journey.monitored_call.is_some() {
            self.with_monitored_call += 1;
        }

        if journey
            .onward_calls
            .as_ref()
            .is_some_and(|calls| !calls.onward_call.is_empty())
        {
            self.with_onward_calls += 1;
        }

        if !journey.situation_ref.is_empty() {
            self.with_situation_ref += 1;
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn location_pct(&self) -> f64 {
        Self::pct(self.with_location, self.journeys)
    }

    pub fn bearing_pct(&self) -> f64 {
        Self::pct(self.with_bearing, self.journeys)
    }

    /// Create an error record with timestamp and error information
    pub fn from_error(error_type: &str, error_message: &str) -> Self {
        DeliveryStats {
            timestamp: Utc::now(),
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
            ..Default::default()
        }
    }

    /// Set request metadata (kind, configuration and position in the run)
    pub fn with_request_info(mut self, kind: &str, config: RequestConfig, sample: usize) -> Self {
        self.request_kind = Some(kind.to_string());
        self.config = Some(config.to_string());
        self.sample = Some(sample);
        self
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

/// Latency statistics of successful requests, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub mean_ms: f64,
    /// Population standard deviation.
    pub stddev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl LatencySummary {
    /// `None` for an empty slice.
    pub fn from_latencies(latencies: &[f64]) -> Option<Self> {
        let (&first, rest) = latencies.split_first()?;
        let (min_ms, max_ms) = rest
            .iter()
            .fold((first, first), |(lo, hi), &ms| (lo.min(ms), hi.max(ms)));

        let n = latencies.len() as f64;
        let mean_ms = latencies.iter().sum::<f64>() / n;
        let variance = latencies
            .iter()
            .map(|ms| (ms - mean_ms).powi(2))
            .sum::<f64>()
            / n;

        Some(Self {
            count: latencies.len(),
            mean_ms,
            stddev_ms: variance.sqrt(),
            min_ms,
            max_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::siri::{
        Location, MonitoredStopVisit, ServiceDelivery, StopMonitoringDelivery, VehicleActivity,
        VehicleMonitoringDelivery,
    };

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(DeliveryStats::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(DeliveryStats::pct(50, 100), 50.0);
        assert_eq!(DeliveryStats::pct(1, 4), 25.0);
    }

    #[test]
    fn test_from_siri_empty() {
        let stats = DeliveryStats::from_siri(&Siri::default());

        assert_eq!(stats.vehicle_monitoring_deliveries, 0);
        assert_eq!(stats.journeys, 0);
        assert_eq!(stats.response_timestamp, None);
    }

    #[test]
    fn test_from_siri_with_vehicle() {
        let siri = Siri {
            service_delivery: Some(ServiceDelivery {
                vehicle_monitoring_delivery: vec![VehicleMonitoringDelivery {
                    vehicle_activity: vec![
                        VehicleActivity {
                            monitored_vehicle_journey: Some(MonitoredVehicleJourney {
                                vehicle_location: Some(Location {
                                    longitude: Some(-74.1),
                                    latitude: Some(40.6),
                                }),
                                bearing: Some(180.0),
                                vehicle_ref: Some("MTA NYCT_7560".to_string()),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                        VehicleActivity::default(),
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }),
        };

        let stats = DeliveryStats::from_siri(&siri);

        assert_eq!(stats.vehicle_monitoring_deliveries, 1);
        assert_eq!(stats.vehicle_activities, 2);
        assert_eq!(stats.journeys, 1);
        assert_eq!(stats.with_location, 1);
        assert_eq!(stats.with_bearing, 1);
        assert_eq!(stats.with_vehicle_ref, 1);
        assert_eq!(stats.with_monitored_call, 0);
        assert_eq!(stats.location_pct(), 100.0);
    }

    #[test]
    fn test_from_siri_counts_stop_visits() {
        let siri = Siri {
            service_delivery: Some(ServiceDelivery {
                stop_monitoring_delivery: vec![StopMonitoringDelivery {
                    monitored_stop_visit: vec![MonitoredStopVisit {
                        monitored_vehicle_journey: Some(MonitoredVehicleJourney::default()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }),
        };

        let stats = DeliveryStats::from_siri(&siri);
        assert_eq!(stats.stop_monitoring_deliveries, 1);
        assert_eq!(stats.stop_visits, 1);
        assert_eq!(stats.journeys, 1);
        assert_eq!(stats.bearing_pct(), 0.0);
    }

    #[test]
    fn test_error_record_with_request_info() {
        let stats = DeliveryStats::from_error("transport_error", "connection refused")
            .with_request_info("vehicle-monitoring", RequestConfig::default(), 3);

        assert_eq!(stats.error_type.as_deref(), Some("transport_error"));
        assert_eq!(stats.request_kind.as_deref(), Some("vehicle-monitoring"));
        assert_eq!(stats.sample, Some(3));
        assert_eq!(stats.latency_ms, 0.0);
    }

    #[test]
    fn test_latency_summary() {
        assert_eq!(LatencySummary::from_latencies(&[]), None);

        let summary =
            LatencySummary::from_latencies(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(summary.count, 8);
        assert_eq!(summary.mean_ms, 5.0);
        assert_eq!(summary.stddev_ms, 2.0);
        assert_eq!(summary.min_ms, 2.0);
        assert_eq!(summary.max_ms, 9.0);

        let single = LatencySummary::from_latencies(&[12.5]).unwrap();
        assert_eq!(single.stddev_ms, 0.0);
        assert_eq!(single.min_ms, single.max_ms);
    }
}
