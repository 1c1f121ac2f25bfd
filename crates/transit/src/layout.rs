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

//! Network-layout document model.
//!
//! The layout document is the JSON description of the static network: the
//! stations, the lines with their directional routes, and the symmetric
//! travel times between adjacent stations.

use serde::{Deserialize, Serialize};

use crate::{
    errors::TransitError,
    identifiers::{LineId, RouteId, StationId},
};

/// A station entry in the layout document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSpec {
    pub station_id: StationId,
    pub name: String,
}

/// A directional route of a line, listing every station it calls at in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub route_id: RouteId,
    pub direction: String,
    pub line_id: LineId,
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    pub route_stops: Vec<StationId>,
}

/// A line entry: a named service comprising one or more directional routes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpec {
    pub line_id: LineId,
    pub name: String,
    pub routes: Vec<RouteSpec>,
}

/// A symmetric travel-time entry for one adjacency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelTimeSpec {
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    /// Travel time in seconds.
    pub travel_time: u32,
}

/// The complete network-layout document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLayout {
    pub stations: Vec<StationSpec>,
    pub lines: Vec<LineSpec>,
    pub travel_times: Vec<TravelTimeSpec>,
}

impl NetworkLayout {
    /// Parses a layout document from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, TransitError> {
        serde_json::from_str(json).map_err(|e| TransitError::LayoutInvalid(e.to_string()))
    }
}

impl RouteSpec {
    /// Checks the structural invariants of a single route entry.
    ///
    /// A route must call at two or more stations and its declared termini
    /// must agree with the first and last stop.
    pub(crate) fn validate(&self) -> Result<(), TransitError> {
        if self.route_stops.len() < 2 {
            return Err(TransitError::LayoutInvalid(format!(
                "route '{}' has fewer than two stops",
                self.route_id,
            )));
        }
        if self.route_stops.first() != Some(&self.start_station_id) {
            return Err(TransitError::LayoutInvalid(format!(
                "route '{}' start station does not match its first stop",
                self.route_id,
            )));
        }
        if self.route_stops.last() != Some(&self.end_station_id) {
            return Err(TransitError::LayoutInvalid(format!(
                "route '{}' end station does not match its last stop",
                self.route_id,
            )));
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const LAYOUT_JSON: &str = r#"{
        "stations": [
            {"station_id": "station_1", "name": "Alpha"},
            {"station_id": "station_2", "name": "Beta"}
        ],
        "lines": [
            {
                "line_id": "line_a",
                "name": "Line A",
                "routes": [
                    {
                        "route_id": "route_0",
                        "direction": "outbound",
                        "line_id": "line_a",
                        "start_station_id": "station_1",
                        "end_station_id": "station_2",
                        "route_stops": ["station_1", "station_2"]
                    }
                ]
            }
        ],
        "travel_times": [
            {
                "start_station_id": "station_1",
                "end_station_id": "station_2",
                "travel_time": 180
            }
        ]
    }"#;

    #[rstest]
    fn test_layout_from_json() {
        let layout = NetworkLayout::from_json(LAYOUT_JSON).unwrap();

        assert_eq!(layout.stations.len(), 2);
        assert_eq!(layout.lines.len(), 1);
        assert_eq!(layout.lines[0].routes[0].route_stops.len(), 2);
        assert_eq!(layout.travel_times[0].travel_time, 180);
    }

    #[rstest]
    fn test_layout_rejects_malformed_json() {
        let result = NetworkLayout::from_json("{\"stations\": 7}");

        assert!(matches!(result, Err(TransitError::LayoutInvalid(_))));
    }

    #[rstest]
    fn test_layout_round_trip_preserves_ordering() {
        let layout = NetworkLayout::from_json(LAYOUT_JSON).unwrap();
        let json = serde_json::to_string(&layout).unwrap();
        let reparsed = NetworkLayout::from_json(&json).unwrap();

        assert_eq!(layout, reparsed);
    }

    #[rstest]
    #[case::too_few_stops(vec!["station_1"], "station_1", "station_1")]
    #[case::start_mismatch(vec!["station_1", "station_2"], "station_2", "station_2")]
    #[case::end_mismatch(vec!["station_1", "station_2"], "station_1", "station_1")]
    fn test_route_validate_rejects(
        #[case] stops: Vec<&str>,
        #[case] start: &str,
        #[case] end: &str,
    ) {
        let route = RouteSpec {
            route_id: RouteId::new("route_0"),
            direction: "outbound".to_string(),
            line_id: LineId::new("line_a"),
            start_station_id: StationId::new(start),
            end_station_id: StationId::new(end),
            route_stops: stops.into_iter().map(StationId::new).collect(),
        };

        assert!(route.validate().is_err());
    }
}
