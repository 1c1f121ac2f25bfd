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

//! Transport-network data model, live crowding state, and quiet-route planning.
//!
//! The network topology (stations, lines, routes, adjacencies) is loaded once
//! from a layout document and frozen; passenger counts and travel times mutate
//! during operation. The planner trades a bounded amount of extra travel time
//! for a reduction in crowding along the itinerary.

pub mod events;
pub mod graph;
pub mod identifiers;
pub mod layout;
pub mod planner;

mod errors;

pub use errors::TransitError;
pub use events::{CrowdingCounts, PassengerEvent, PassengerEventEnvelope, PassengerEventType};
pub use graph::{Station, TransportNetwork};
pub use identifiers::{LineId, RouteId, StationId};
pub use layout::{LineSpec, NetworkLayout, RouteSpec, StationSpec, TravelTimeSpec};
pub use planner::{PlannerConfig, QuietRouteRequest, RouteLeg, TravelRoute, find_quiet_route};
