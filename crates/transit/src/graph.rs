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

//! The transport-network graph: stations, lines, routes, and adjacencies.
//!
//! Ownership cycles of the domain (station ↔ edge ↔ route ↔ line) are
//! resolved arena-style: station nodes live in a vector keyed by a dense
//! index, edges store the destination index and a `(line, route)` index pair,
//! and all id lookups go through small dense maps. Topology is frozen after
//! loading; passenger counts and travel times mutate during operation.

use ahash::AHashMap;

use crate::{
    errors::TransitError,
    events::{CrowdingCounts, PassengerEvent, PassengerEventType},
    identifiers::{LineId, RouteId, StationId},
    layout::{LineSpec, NetworkLayout},
};

/// Dense index of a station node within the graph arena.
pub type StationIx = usize;

/// Index pair identifying a route within its owning line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RouteRef {
    pub line: usize,
    pub route: usize,
}

/// A physical stop identified by an opaque id. Immutable after insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Station {
    pub id: StationId,
    pub name: String,
}

/// A directed hop to the next station along one route.
#[derive(Clone, Debug)]
pub(crate) struct Edge {
    pub route: RouteRef,
    pub dest: StationIx,
    /// Travel time in seconds; zero until the layout's travel times are applied.
    pub travel_time: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct StationNode {
    pub station: Station,
    /// May go negative when out-events precede their in-events.
    pub passenger_count: i64,
    pub edges: Vec<Edge>,
}

#[derive(Clone, Debug)]
pub(crate) struct RouteRecord {
    pub id: RouteId,
    #[allow(dead_code)] // Carried from the layout for itinerary presentation
    pub direction: String,
    pub stops: Vec<StationIx>,
}

#[derive(Clone, Debug)]
pub(crate) struct LineRecord {
    pub id: LineId,
    #[allow(dead_code)] // Carried from the layout for itinerary presentation
    pub name: String,
    pub routes: Vec<RouteRecord>,
}

/// The transport network: topology plus live crowding state.
#[derive(Clone, Debug, Default)]
pub struct TransportNetwork {
    stations: Vec<StationNode>,
    station_ids: AHashMap<StationId, StationIx>,
    lines: Vec<LineRecord>,
    line_ids: AHashMap<LineId, usize>,
    /// Precomputed station → serving routes index, termini included.
    serving: Vec<Vec<RouteRef>>,
}

impl TransportNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates a network from a layout document.
    ///
    /// Phases are ordered: stations, then lines with their routes, then
    /// travel times. References to entities not yet loaded fail fast.
    /// Adjacencies without a travel-time entry keep a zero travel time.
    pub fn from_layout(layout: &NetworkLayout) -> Result<Self, TransitError> {
        let mut network = Self::new();

        for spec in &layout.stations {
            network.try_add_station(Station {
                id: spec.station_id.clone(),
                name: spec.name.clone(),
            })?;
        }
        for line in &layout.lines {
            network.try_add_line(line)?;
        }
        for entry in &layout.travel_times {
            for id in [&entry.start_station_id, &entry.end_station_id] {
                if !network.station_ids.contains_key(id.as_str()) {
                    return Err(TransitError::LayoutInvalid(format!(
                        "travel time references unknown station '{id}'",
                    )));
                }
            }
            if !network.set_travel_time(
                &entry.start_station_id,
                &entry.end_station_id,
                entry.travel_time,
            ) {
                tracing::warn!(
                    "Ignoring travel time for non-adjacent pair {} - {}",
                    entry.start_station_id,
                    entry.end_station_id,
                );
            }
        }

        Ok(network)
    }

    /// Adds a station to the network.
    ///
    /// Returns `false` if a station with the same id is already present.
    pub fn add_station(&mut self, station: Station) -> bool {
        self.try_add_station(station).is_ok()
    }

    /// Adds a line (and all of its routes) to the network.
    ///
    /// Every stop referenced by the line's routes must already exist. The
    /// operation is transactional: on any validation failure the graph is
    /// left unchanged and `false` is returned.
    pub fn add_line(&mut self, line: &LineSpec) -> bool {
        self.try_add_line(line).is_ok()
    }

    fn try_add_station(&mut self, station: Station) -> Result<(), TransitError> {
        if self.station_ids.contains_key(station.id.as_str()) {
            return Err(TransitError::LayoutInvalid(format!(
                "duplicate station '{}'",
                station.id,
            )));
        }

        let ix = self.stations.len();
        self.station_ids.insert(station.id.clone(), ix);
        self.stations.push(StationNode {
            station,
            passenger_count: 0,
            edges: Vec::new(),
        });
        self.serving.push(Vec::new());
        Ok(())
    }

    fn try_add_line(&mut self, line: &LineSpec) -> Result<(), TransitError> {
        if self.line_ids.contains_key(line.line_id.as_str()) {
            return Err(TransitError::LayoutInvalid(format!(
                "duplicate line '{}'",
                line.line_id,
            )));
        }

        // Validate every route fully before touching the arena (T3).
        let mut resolved: Vec<Vec<StationIx>> = Vec::with_capacity(line.routes.len());
        for (route_ix, route) in line.routes.iter().enumerate() {
            route.validate()?;
            if route.line_id != line.line_id {
                return Err(TransitError::LayoutInvalid(format!(
                    "route '{}' declares line '{}' inside line '{}'",
                    route.route_id, route.line_id, line.line_id,
                )));
            }
            if line.routes[..route_ix]
                .iter()
                .any(|other| other.route_id == route.route_id)
            {
                return Err(TransitError::LayoutInvalid(format!(
                    "duplicate route '{}' in line '{}'",
                    route.route_id, line.line_id,
                )));
            }
            let mut stops = Vec::with_capacity(route.route_stops.len());
            for stop in &route.route_stops {
                let ix = self.station_ids.get(stop.as_str()).copied().ok_or_else(|| {
                    TransitError::LayoutInvalid(format!(
                        "route '{}' references unknown station '{stop}'",
                        route.route_id,
                    ))
                })?;
                stops.push(ix);
            }
            resolved.push(stops);
        }

        // Commit: no failure is possible past this point.
        let line_ix = self.lines.len();
        let mut records = Vec::with_capacity(line.routes.len());
        for (route_ix, (route, stops)) in line.routes.iter().zip(resolved).enumerate() {
            let route_ref = RouteRef {
                line: line_ix,
                route: route_ix,
            };
            for pair in stops.windows(2) {
                self.stations[pair[0]].edges.push(Edge {
                    route: route_ref,
                    dest: pair[1],
                    travel_time: 0,
                });
            }
            for &stop in &stops {
                if !self.serving[stop].contains(&route_ref) {
                    self.serving[stop].push(route_ref);
                }
            }
            records.push(RouteRecord {
                id: route.route_id.clone(),
                direction: route.direction.clone(),
                stops,
            });
        }
        self.line_ids.insert(line.line_id.clone(), line_ix);
        self.lines.push(LineRecord {
            id: line.line_id.clone(),
            name: line.name.clone(),
            routes: records,
        });
        Ok(())
    }

    /// Sets the travel time of the adjacency between `a` and `b`.
    ///
    /// Every edge `a → b` and every edge `b → a`, across all routes, receives
    /// the new value (T2). Returns `true` iff at least one edge was updated.
    pub fn set_travel_time(&mut self, a: &StationId, b: &StationId, travel_time: u32) -> bool {
        let (Some(&a_ix), Some(&b_ix)) = (
            self.station_ids.get(a.as_str()),
            self.station_ids.get(b.as_str()),
        ) else {
            return false;
        };

        let mut updated = false;
        for (from, to) in [(a_ix, b_ix), (b_ix, a_ix)] {
            for edge in &mut self.stations[from].edges {
                if edge.dest == to {
                    edge.travel_time = travel_time;
                    updated = true;
                }
            }
        }
        updated
    }

    /// Returns the symmetric adjacency travel time, or 0 if not adjacent.
    #[must_use]
    pub fn get_travel_time(&self, a: &StationId, b: &StationId) -> u32 {
        let (Some(&a_ix), Some(&b_ix)) = (
            self.station_ids.get(a.as_str()),
            self.station_ids.get(b.as_str()),
        ) else {
            return 0;
        };

        self.arc_travel_time(a_ix, b_ix)
            .or_else(|| self.arc_travel_time(b_ix, a_ix))
            .unwrap_or(0)
    }

    /// Returns the cumulative travel time along `route` from `a` to `b`.
    ///
    /// The sum includes the edge out of `a` and ends at `b`. Returns 0 if
    /// either stop is missing from the route or appears in reverse order.
    #[must_use]
    pub fn route_travel_time(
        &self,
        line: &LineId,
        route: &RouteId,
        a: &StationId,
        b: &StationId,
    ) -> u32 {
        let Some(&line_ix) = self.line_ids.get(line.as_str()) else {
            return 0;
        };
        let Some(route_ix) = self.lines[line_ix]
            .routes
            .iter()
            .position(|r| &r.id == route)
        else {
            return 0;
        };
        let (Some(&a_ix), Some(&b_ix)) = (
            self.station_ids.get(a.as_str()),
            self.station_ids.get(b.as_str()),
        ) else {
            return 0;
        };

        let stops = &self.lines[line_ix].routes[route_ix].stops;
        let (Some(pa), Some(pb)) = (
            stops.iter().position(|&s| s == a_ix),
            stops.iter().position(|&s| s == b_ix),
        ) else {
            return 0;
        };
        if pa >= pb {
            return 0;
        }

        let route_ref = RouteRef {
            line: line_ix,
            route: route_ix,
        };
        (pa..pb)
            .map(|i| {
                self.stations[stops[i]]
                    .edges
                    .iter()
                    .find(|e| e.dest == stops[i + 1] && e.route == route_ref)
                    .map_or(0, |e| e.travel_time)
            })
            .sum()
    }

    /// Returns every `(line, route)` pair serving the station, termini included.
    #[must_use]
    pub fn routes_serving(&self, station: &StationId) -> Vec<(LineId, RouteId)> {
        let Some(&ix) = self.station_ids.get(station.as_str()) else {
            return Vec::new();
        };
        self.serving[ix]
            .iter()
            .map(|r| {
                let line = &self.lines[r.line];
                (line.id.clone(), line.routes[r.route].id.clone())
            })
            .collect()
    }

    /// Applies a single passenger event.
    ///
    /// Returns `false` if the station is not in the network.
    pub fn record_passenger_event(&mut self, event: &PassengerEvent) -> bool {
        let Some(&ix) = self.station_ids.get(event.station_id.as_str()) else {
            return false;
        };
        match event.event_type {
            PassengerEventType::In => self.stations[ix].passenger_count += 1,
            PassengerEventType::Out => self.stations[ix].passenger_count -= 1,
        }
        true
    }

    /// Bulk-assigns absolute passenger counts. Unknown stations are logged
    /// and skipped.
    pub fn set_network_crowding(&mut self, counts: &CrowdingCounts) {
        for (station, &count) in counts {
            match self.station_ids.get(station.as_str()) {
                Some(&ix) => self.stations[ix].passenger_count = count,
                None => tracing::warn!("Crowding override for unknown station '{station}'"),
            }
        }
    }

    /// Returns the passenger count at a station.
    pub fn get_passenger_count(&self, station: &StationId) -> Result<i64, TransitError> {
        self.station_ids
            .get(station.as_str())
            .map(|&ix| self.stations[ix].passenger_count)
            .ok_or_else(|| TransitError::StationUnknown(station.clone()))
    }

    /// Number of stations in the network.
    #[must_use]
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    fn arc_travel_time(&self, from: StationIx, to: StationIx) -> Option<u32> {
        self.stations[from]
            .edges
            .iter()
            .find(|e| e.dest == to)
            .map(|e| e.travel_time)
    }

    // -- Internal accessors for the planner -------------------------------------------------------

    pub(crate) fn station_ix(&self, id: &StationId) -> Option<StationIx> {
        self.station_ids.get(id.as_str()).copied()
    }

    pub(crate) fn node(&self, ix: StationIx) -> &StationNode {
        &self.stations[ix]
    }

    pub(crate) fn station_id(&self, ix: StationIx) -> &StationId {
        &self.stations[ix].station.id
    }

    pub(crate) fn line(&self, ix: usize) -> &LineRecord {
        &self.lines[ix]
    }

    pub(crate) fn station_len(&self) -> usize {
        self.stations.len()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::layout::{RouteSpec, StationSpec, TravelTimeSpec};

    fn station(id: &str) -> Station {
        Station {
            id: StationId::new(id),
            name: format!("Station {id}"),
        }
    }

    fn line_spec(line_id: &str, route_id: &str, stops: &[&str]) -> LineSpec {
        LineSpec {
            line_id: LineId::new(line_id),
            name: format!("Line {line_id}"),
            routes: vec![RouteSpec {
                route_id: RouteId::new(route_id),
                direction: "outbound".to_string(),
                line_id: LineId::new(line_id),
                start_station_id: StationId::new(stops[0]),
                end_station_id: StationId::new(stops[stops.len() - 1]),
                route_stops: stops.iter().map(StationId::new).collect(),
            }],
        }
    }

    fn three_station_network() -> TransportNetwork {
        let mut network = TransportNetwork::new();
        for id in ["a", "b", "c"] {
            assert!(network.add_station(station(id)));
        }
        assert!(network.add_line(&line_spec("line_1", "route_1", &["a", "b", "c"])));
        network
    }

    #[rstest]
    fn test_add_station_rejects_duplicate() {
        let mut network = TransportNetwork::new();

        assert!(network.add_station(station("a")));
        assert!(!network.add_station(station("a")));
        assert_eq!(network.station_count(), 1);
    }

    #[rstest]
    fn test_add_line_with_unknown_stop_is_transactional() {
        let mut network = TransportNetwork::new();
        network.add_station(station("a"));

        let line = line_spec("line_1", "route_1", &["a", "ghost"]);

        assert!(!network.add_line(&line));
        assert!(network.routes_serving(&StationId::new("a")).is_empty());
        assert_eq!(network.get_travel_time(&StationId::new("a"), &StationId::new("ghost")), 0);
    }

    #[rstest]
    fn test_add_line_rejects_duplicate_line_id() {
        let mut network = three_station_network();

        assert!(!network.add_line(&line_spec("line_1", "route_9", &["a", "b"])));
    }

    #[rstest]
    fn test_set_travel_time_is_symmetric() {
        let mut network = three_station_network();
        let a = StationId::new("a");
        let b = StationId::new("b");

        assert!(network.set_travel_time(&a, &b, 42));
        assert_eq!(network.get_travel_time(&b, &a), 42);
        assert_eq!(network.get_travel_time(&a, &b), 42);
    }

    #[rstest]
    fn test_set_travel_time_unknown_pair_returns_false() {
        let mut network = three_station_network();

        assert!(!network.set_travel_time(&StationId::new("a"), &StationId::new("ghost"), 10));
        // Non-adjacent stations share no edge.
        assert!(!network.set_travel_time(&StationId::new("a"), &StationId::new("c"), 10));
    }

    #[rstest]
    fn test_route_travel_time_is_cumulative() {
        let mut network = three_station_network();
        network.set_travel_time(&StationId::new("a"), &StationId::new("b"), 10);
        network.set_travel_time(&StationId::new("b"), &StationId::new("c"), 20);

        let line = LineId::new("line_1");
        let route = RouteId::new("route_1");

        assert_eq!(
            network.route_travel_time(&line, &route, &StationId::new("a"), &StationId::new("c")),
            30,
        );
        assert_eq!(
            network.route_travel_time(&line, &route, &StationId::new("b"), &StationId::new("c")),
            20,
        );
    }

    #[rstest]
    fn test_route_travel_time_reversed_order_is_zero() {
        let mut network = three_station_network();
        network.set_travel_time(&StationId::new("a"), &StationId::new("b"), 10);

        assert_eq!(
            network.route_travel_time(
                &LineId::new("line_1"),
                &RouteId::new("route_1"),
                &StationId::new("c"),
                &StationId::new("a"),
            ),
            0,
        );
    }

    #[rstest]
    fn test_routes_serving_includes_terminus() {
        let network = three_station_network();

        let serving = network.routes_serving(&StationId::new("c"));

        assert_eq!(serving.len(), 1);
        assert_eq!(serving[0].0.as_str(), "line_1");
        assert_eq!(serving[0].1.as_str(), "route_1");
    }

    #[rstest]
    fn test_record_passenger_event() {
        let mut network = three_station_network();
        let a = StationId::new("a");
        let event_in = PassengerEvent {
            station_id: a.clone(),
            event_type: PassengerEventType::In,
        };
        let event_out = PassengerEvent {
            station_id: a.clone(),
            event_type: PassengerEventType::Out,
        };

        assert!(network.record_passenger_event(&event_in));
        assert!(network.record_passenger_event(&event_in));
        assert!(network.record_passenger_event(&event_out));
        assert_eq!(network.get_passenger_count(&a).unwrap(), 1);
    }

    #[rstest]
    fn test_passenger_count_may_go_negative() {
        let mut network = three_station_network();
        let a = StationId::new("a");
        let event_out = PassengerEvent {
            station_id: a.clone(),
            event_type: PassengerEventType::Out,
        };

        assert!(network.record_passenger_event(&event_out));
        assert_eq!(network.get_passenger_count(&a).unwrap(), -1);
    }

    #[rstest]
    fn test_record_passenger_event_unknown_station() {
        let mut network = three_station_network();
        let event = PassengerEvent {
            station_id: StationId::new("ghost"),
            event_type: PassengerEventType::In,
        };

        assert!(!network.record_passenger_event(&event));
        assert!(matches!(
            network.get_passenger_count(&StationId::new("ghost")),
            Err(TransitError::StationUnknown(_)),
        ));
    }

    #[rstest]
    fn test_set_network_crowding_overrides_counts() {
        let mut network = three_station_network();
        let counts = CrowdingCounts::from([
            (StationId::new("a"), 100),
            (StationId::new("ghost"), 5),
        ]);

        network.set_network_crowding(&counts);

        assert_eq!(network.get_passenger_count(&StationId::new("a")).unwrap(), 100);
        assert_eq!(network.get_passenger_count(&StationId::new("b")).unwrap(), 0);
    }

    #[rstest]
    fn test_from_layout_applies_travel_times() {
        let layout = NetworkLayout {
            stations: vec![
                StationSpec {
                    station_id: StationId::new("a"),
                    name: "A".to_string(),
                },
                StationSpec {
                    station_id: StationId::new("b"),
                    name: "B".to_string(),
                },
            ],
            lines: vec![line_spec("line_1", "route_1", &["a", "b"])],
            travel_times: vec![TravelTimeSpec {
                start_station_id: StationId::new("a"),
                end_station_id: StationId::new("b"),
                travel_time: 120,
            }],
        };

        let network = TransportNetwork::from_layout(&layout).unwrap();

        assert_eq!(network.get_travel_time(&StationId::new("a"), &StationId::new("b")), 120);
    }

    #[rstest]
    fn test_from_layout_fails_fast_on_unknown_travel_time_station() {
        let layout = NetworkLayout {
            stations: vec![StationSpec {
                station_id: StationId::new("a"),
                name: "A".to_string(),
            }],
            lines: vec![],
            travel_times: vec![TravelTimeSpec {
                start_station_id: StationId::new("a"),
                end_station_id: StationId::new("ghost"),
                travel_time: 60,
            }],
        };

        assert!(matches!(
            TransportNetwork::from_layout(&layout),
            Err(TransitError::LayoutInvalid(_)),
        ));
    }

    #[rstest]
    fn test_from_layout_rejects_duplicate_station() {
        let layout = NetworkLayout {
            stations: vec![
                StationSpec {
                    station_id: StationId::new("a"),
                    name: "A".to_string(),
                },
                StationSpec {
                    station_id: StationId::new("a"),
                    name: "A again".to_string(),
                },
            ],
            lines: vec![],
            travel_times: vec![],
        };

        assert!(matches!(
            TransportNetwork::from_layout(&layout),
            Err(TransitError::LayoutInvalid(_)),
        ));
    }
}
