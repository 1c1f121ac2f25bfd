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

//! Playground binary exercising the planner on the two-route network:
//!
//! ```text
//!                  (100)
//! route_0:    1---2---3---4---5        (1 s per adjacency)
//! route_1:  20---1---21---22---4---23  (2 s per adjacency)
//!                    (50)
//! ```
//!
//! The fastest route from station 1 to station 4 runs through the crowded
//! station 3; with a generous slowdown budget the planner detours over
//! route 1 instead.

use metronet_transit::{
    CrowdingCounts, NetworkLayout, PlannerConfig, QuietRouteRequest, StationId, TransportNetwork,
    find_quiet_route,
};
use tracing_subscriber::EnvFilter;

const LAYOUT: &str = r#"{
    "stations": [
        {"station_id": "station_1", "name": "Station 1"},
        {"station_id": "station_2", "name": "Station 2"},
        {"station_id": "station_3", "name": "Station 3"},
        {"station_id": "station_4", "name": "Station 4"},
        {"station_id": "station_5", "name": "Station 5"},
        {"station_id": "station_20", "name": "Station 20"},
        {"station_id": "station_21", "name": "Station 21"},
        {"station_id": "station_22", "name": "Station 22"},
        {"station_id": "station_23", "name": "Station 23"}
    ],
    "lines": [
        {
            "line_id": "line_0",
            "name": "Line 0",
            "routes": [
                {
                    "route_id": "route_0",
                    "direction": "outbound",
                    "line_id": "line_0",
                    "start_station_id": "station_1",
                    "end_station_id": "station_5",
                    "route_stops": [
                        "station_1", "station_2", "station_3", "station_4", "station_5"
                    ]
                }
            ]
        },
        {
            "line_id": "line_1",
            "name": "Line 1",
            "routes": [
                {
                    "route_id": "route_1",
                    "direction": "outbound",
                    "line_id": "line_1",
                    "start_station_id": "station_20",
                    "end_station_id": "station_23",
                    "route_stops": [
                        "station_20", "station_1", "station_21", "station_22",
                        "station_4", "station_23"
                    ]
                }
            ]
        }
    ],
    "travel_times": [
        {"start_station_id": "station_1", "end_station_id": "station_2", "travel_time": 1},
        {"start_station_id": "station_2", "end_station_id": "station_3", "travel_time": 1},
        {"start_station_id": "station_3", "end_station_id": "station_4", "travel_time": 1},
        {"start_station_id": "station_4", "end_station_id": "station_5", "travel_time": 1},
        {"start_station_id": "station_20", "end_station_id": "station_1", "travel_time": 2},
        {"start_station_id": "station_1", "end_station_id": "station_21", "travel_time": 2},
        {"start_station_id": "station_21", "end_station_id": "station_22", "travel_time": 2},
        {"start_station_id": "station_22", "end_station_id": "station_4", "travel_time": 2},
        {"start_station_id": "station_4", "end_station_id": "station_23", "travel_time": 2}
    ]
}"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let layout = NetworkLayout::from_json(LAYOUT)?;
    let mut network = TransportNetwork::from_layout(&layout)?;
    network.set_network_crowding(&CrowdingCounts::from([
        (StationId::new("station_3"), 100),
        (StationId::new("station_21"), 50),
    ]));

    let request = QuietRouteRequest {
        start: StationId::new("station_1"),
        end: StationId::new("station_4"),
        max_slowdown: 1.0,
        min_quietness: 0.1,
        k_candidates: 20,
    };
    let route = find_quiet_route(&network, &request, &PlannerConfig::default())?;

    println!(
        "Quiet route from {} to {} takes {} s over {} leg(s):",
        route.start_station_id,
        route.end_station_id,
        route.total_travel_time,
        route.steps.len(),
    );
    for leg in &route.steps {
        let via = leg
            .intermediate_stops
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {} -> {} on {} ({}), via [{via}]",
            leg.start_station_id, leg.end_station_id, leg.line_id, leg.route_id,
        );
    }
    Ok(())
}
