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

//! Wire messages of the quiet-route query endpoint.

use metronet_transit::{RouteLeg, StationId, TravelRoute};
use serde::{Deserialize, Serialize};

/// A quiet-route request body. Optional fields override the monitor's
/// configured planner defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuietRouteQuery {
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_slowdown: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_quietness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k_candidates: Option<usize>,
}

/// A quiet-route response body: a `TravelRoute` on success, or empty steps
/// with an `error` string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuietRouteResponse {
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    pub total_travel_time: u64,
    pub steps: Vec<RouteLeg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuietRouteResponse {
    /// A failure response carrying no itinerary.
    #[must_use]
    pub fn failure(start: StationId, end: StationId, message: impl Into<String>) -> Self {
        Self {
            start_station_id: start,
            end_station_id: end,
            total_travel_time: 0,
            steps: Vec::new(),
            error: Some(message.into()),
        }
    }
}

impl From<TravelRoute> for QuietRouteResponse {
    fn from(route: TravelRoute) -> Self {
        Self {
            start_station_id: route.start_station_id,
            end_station_id: route.end_station_id,
            total_travel_time: route.total_travel_time,
            steps: route.steps,
            error: None,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
