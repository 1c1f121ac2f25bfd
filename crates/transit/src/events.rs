// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Passenger event and crowding snapshot documents.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identifiers::StationId;

/// Direction of a passenger movement at a station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerEventType {
    In,
    Out,
}

/// A single passenger arrival or departure at a station.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerEvent {
    pub station_id: StationId,
    pub event_type: PassengerEventType,
}

/// The wire envelope carried in the body of an ingest `MESSAGE` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerEventEnvelope {
    pub passenger_event: PassengerEvent,
}

/// Passenger-count snapshot document: absolute counts per station.
pub type CrowdingCounts = HashMap<StationId, i64>;

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::inbound("in", PassengerEventType::In)]
    #[case::outbound("out", PassengerEventType::Out)]
    fn test_event_envelope_parses(#[case] raw: &str, #[case] expected: PassengerEventType) {
        let json = format!(
            r#"{{"passenger_event": {{"station_id": "station_7", "event_type": "{raw}"}}}}"#,
        );
        let envelope: PassengerEventEnvelope = serde_json::from_str(&json).unwrap();

        assert_eq!(envelope.passenger_event.station_id.as_str(), "station_7");
        assert_eq!(envelope.passenger_event.event_type, expected);
    }

    #[rstest]
    fn test_event_envelope_rejects_unknown_event_type() {
        let json = r#"{"passenger_event": {"station_id": "station_7", "event_type": "sideways"}}"#;
        let result = serde_json::from_str::<PassengerEventEnvelope>(json);

        assert!(result.is_err());
    }

    #[rstest]
    fn test_crowding_counts_document() {
        let json = r#"{"station_1": 12, "station_2": -3}"#;
        let counts: CrowdingCounts = serde_json::from_str(json).unwrap();

        assert_eq!(counts.get("station_1"), Some(&12));
        assert_eq!(counts.get("station_2"), Some(&-3));
    }
}
