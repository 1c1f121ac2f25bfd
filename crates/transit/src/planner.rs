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

//! Quiet-route planning.
//!
//! The planner first finds the fastest itinerary by plain travel time, then
//! enumerates alternative loop-free paths with Yen's algorithm (Dijkstra as
//! the inner solver, edges weighted by crowding at the destination station)
//! and picks the least-crowded candidate whose travel time stays within the
//! requested slowdown bound. If no candidate clears the quietness threshold
//! the fastest path is returned unchanged.

use std::{cmp::Reverse, collections::BinaryHeap};

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::{
    errors::TransitError,
    graph::{RouteRef, StationIx, TransportNetwork},
    identifiers::{LineId, RouteId, StationId},
};

/// Default bound on accepted extra travel time, as a fraction of the fastest.
pub const DEFAULT_MAX_SLOWDOWN: f64 = 0.1;
/// Default minimum relative reduction in crowd cost to accept a detour.
pub const DEFAULT_MIN_QUIETNESS: f64 = 0.1;
/// Default number of alternative paths evaluated per query.
pub const DEFAULT_K_CANDIDATES: usize = 20;

const QUIETNESS_EPSILON: f64 = 1e-9;
/// Crowding-weighted edge costs are computed in fixed-point millis so the
/// search heap stays on a totally ordered integer key.
const COST_SCALE: f64 = 1_000.0;

/// Tuning knobs for the crowding model.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Nominal passenger capacity used to normalize counts into [0, 1].
    pub station_capacity: f64,
    /// Weight of the crowding factor in the edge cost (the spec's alpha).
    pub crowding_weight: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            station_capacity: 100.0,
            crowding_weight: 1.0,
        }
    }
}

/// A quiet-route query.
#[derive(Clone, Debug)]
pub struct QuietRouteRequest {
    pub start: StationId,
    pub end: StationId,
    /// Accepted extra travel time as a fraction of the fastest route.
    pub max_slowdown: f64,
    /// Minimum relative crowd-cost reduction for a detour to qualify.
    pub min_quietness: f64,
    /// Number of alternative paths to evaluate (at least 1).
    pub k_candidates: usize,
}

/// A maximal contiguous sub-path of an itinerary on one `(line, route)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    pub line_id: LineId,
    pub route_id: RouteId,
    pub intermediate_stops: Vec<StationId>,
}

/// A planned itinerary. Consecutive legs imply a line change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelRoute {
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    /// Total travel time in seconds over all legs.
    pub total_travel_time: u64,
    pub steps: Vec<RouteLeg>,
}

/// Plans an itinerary from `request.start` to `request.end`.
pub fn find_quiet_route(
    network: &TransportNetwork,
    request: &QuietRouteRequest,
    config: &PlannerConfig,
) -> Result<TravelRoute, TransitError> {
    let source = network
        .station_ix(&request.start)
        .ok_or_else(|| TransitError::StationUnknown(request.start.clone()))?;
    let target = network
        .station_ix(&request.end)
        .ok_or_else(|| TransitError::StationUnknown(request.end.clone()))?;

    let raw_cost = |_dest: StationIx, time: u32| u64::from(time);
    let no_nodes = vec![false; network.station_len()];
    let no_arcs = AHashSet::new();

    let Some((t_fast, p_fast)) = dijkstra(network, source, target, &raw_cost, &no_nodes, &no_arcs)
    else {
        return Err(TransitError::NoRouteFound {
            start: request.start.clone(),
            end: request.end.clone(),
        });
    };

    let bound = (t_fast as f64) * (1.0 + request.max_slowdown.max(0.0));
    let c_fast = crowd_cost(network, &p_fast, config);
    let k = request.k_candidates.max(1);

    let mut chosen: Option<(f64, Vec<RouteLeg>, Vec<StationIx>)> = None;
    for path in k_shortest_paths(network, config, source, target, k) {
        let time = path_time(network, &path) as f64;
        if time > bound {
            continue;
        }
        let cost = crowd_cost(network, &path, config);
        let gain = (c_fast - cost) / c_fast.max(QUIETNESS_EPSILON);
        if gain < request.min_quietness {
            continue;
        }
        let legs = assemble_legs(network, &path);
        let better = match &chosen {
            None => true,
            Some((best_cost, best_legs, _)) => match cost.total_cmp(best_cost) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => leg_order_key(&legs) < leg_order_key(best_legs),
            },
        };
        if better {
            chosen = Some((cost, legs, path));
        }
    }

    let (legs, path) = match chosen {
        Some((_, legs, path)) => (legs, path),
        None => {
            let legs = assemble_legs(network, &p_fast);
            (legs, p_fast)
        }
    };

    let total_travel_time = legs
        .iter()
        .map(|leg| {
            u64::from(network.route_travel_time(
                &leg.line_id,
                &leg.route_id,
                &leg.start_station_id,
                &leg.end_station_id,
            ))
        })
        .sum();

    debug_assert_eq!(path.first(), Some(&source));
    debug_assert_eq!(path.last(), Some(&target));

    Ok(TravelRoute {
        start_station_id: request.start.clone(),
        end_station_id: request.end.clone(),
        total_travel_time,
        steps: legs,
    })
}

/// Normalized crowding at a station, clamped to [0, 1]. Zero iff the count
/// is zero or negative.
fn crowding_factor(network: &TransportNetwork, station: StationIx, config: &PlannerConfig) -> f64 {
    let count = network.node(station).passenger_count;
    if count <= 0 {
        return 0.0;
    }
    (count as f64 / config.station_capacity.max(1.0)).clamp(0.0, 1.0)
}

/// Total crowd cost of a path: the sum of crowding factors over its interior
/// stops (endpoints are where the passenger already is, or leaves).
fn crowd_cost(network: &TransportNetwork, path: &[StationIx], config: &PlannerConfig) -> f64 {
    if path.len() < 3 {
        return 0.0;
    }
    path[1..path.len() - 1]
        .iter()
        .map(|&s| crowding_factor(network, s, config))
        .sum()
}

fn path_time(network: &TransportNetwork, path: &[StationIx]) -> u64 {
    path.windows(2)
        .map(|pair| {
            network
                .node(pair[0])
                .edges
                .iter()
                .find(|e| e.dest == pair[1])
                .map_or(0, |e| u64::from(e.travel_time))
        })
        .sum()
}

fn path_cost<F>(network: &TransportNetwork, path: &[StationIx], edge_cost: &F) -> u64
where
    F: Fn(StationIx, u32) -> u64,
{
    path.windows(2)
        .map(|pair| {
            network
                .node(pair[0])
                .edges
                .iter()
                .find(|e| e.dest == pair[1])
                .map_or(0, |e| edge_cost(pair[1], e.travel_time))
        })
        .sum()
}

/// Dijkstra over the station arena.
///
/// Parallel edges between a station pair share one travel time (T2), so the
/// relaxation treats them as a single arc. Ties on cost break on the lower
/// station index, keeping results deterministic.
fn dijkstra<F>(
    network: &TransportNetwork,
    source: StationIx,
    target: StationIx,
    edge_cost: &F,
    banned_nodes: &[bool],
    banned_arcs: &AHashSet<(StationIx, StationIx)>,
) -> Option<(u64, Vec<StationIx>)>
where
    F: Fn(StationIx, u32) -> u64,
{
    if banned_nodes[source] {
        return None;
    }

    let n = network.station_len();
    let mut dist = vec![u64::MAX; n];
    let mut prev: Vec<Option<StationIx>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    dist[source] = 0;
    heap.push(Reverse((0u64, source)));

    while let Some(Reverse((cost, station))) = heap.pop() {
        if cost > dist[station] {
            continue;
        }
        if station == target {
            break;
        }
        for edge in &network.node(station).edges {
            if banned_nodes[edge.dest] || banned_arcs.contains(&(station, edge.dest)) {
                continue;
            }
            let next = cost + edge_cost(edge.dest, edge.travel_time);
            if next < dist[edge.dest] {
                dist[edge.dest] = next;
                prev[edge.dest] = Some(station);
                heap.push(Reverse((next, edge.dest)));
            }
        }
    }

    if dist[target] == u64::MAX {
        return None;
    }

    let mut path = vec![target];
    while let Some(p) = prev[*path.last().expect("path is non-empty")] {
        path.push(p);
    }
    path.reverse();
    Some((dist[target], path))
}

/// Yen's k-shortest loop-free paths, ordered by crowding-weighted cost.
fn k_shortest_paths(
    network: &TransportNetwork,
    config: &PlannerConfig,
    source: StationIx,
    target: StationIx,
    k: usize,
) -> Vec<Vec<StationIx>> {
    let weighted = |dest: StationIx, time: u32| -> u64 {
        let factor = crowding_factor(network, dest, config);
        ((time as f64) * (1.0 + config.crowding_weight * factor) * COST_SCALE).round() as u64
    };

    let n = network.station_len();
    let no_nodes = vec![false; n];
    let no_arcs = AHashSet::new();
    let Some((_, first)) = dijkstra(network, source, target, &weighted, &no_nodes, &no_arcs) else {
        return Vec::new();
    };

    let mut known: AHashSet<Vec<StationIx>> = AHashSet::new();
    known.insert(first.clone());
    let mut accepted = vec![first];
    let mut candidates: BinaryHeap<Reverse<(u64, Vec<StationIx>)>> = BinaryHeap::new();

    while accepted.len() < k {
        let prev_path = accepted.last().expect("accepted is non-empty").clone();
        for i in 0..prev_path.len().saturating_sub(1) {
            let spur_node = prev_path[i];
            let root = &prev_path[..=i];

            let mut banned_arcs = AHashSet::new();
            for path in &accepted {
                if path.len() > i + 1 && path[..=i] == *root {
                    banned_arcs.insert((path[i], path[i + 1]));
                }
            }
            let mut banned_nodes = vec![false; n];
            for &node in &root[..i] {
                banned_nodes[node] = true;
            }

            if let Some((_, spur)) =
                dijkstra(network, spur_node, target, &weighted, &banned_nodes, &banned_arcs)
            {
                let mut total = root[..i].to_vec();
                total.extend(spur);
                if known.insert(total.clone()) {
                    let cost = path_cost(network, &total, &weighted);
                    candidates.push(Reverse((cost, total)));
                }
            }
        }
        match candidates.pop() {
            Some(Reverse((_, path))) => accepted.push(path),
            None => break,
        }
    }

    accepted
}

/// Collapses a station path into legs, one per maximal run on a single
/// `(line, route)`. The route for each run is chosen greedily by longest
/// continuation so the leg count is minimal; ties break lexicographically by
/// line id, then route id.
fn assemble_legs(network: &TransportNetwork, path: &[StationIx]) -> Vec<RouteLeg> {
    let mut legs = Vec::new();
    let mut i = 0;
    while i + 1 < path.len() {
        let tail = &path[i..];
        let mut best: Option<(RouteRef, usize)> = None;
        for edge in &network.node(path[i]).edges {
            if edge.dest != path[i + 1] {
                continue;
            }
            let run = continuation_len(network, edge.route, tail);
            let replace = match best {
                None => true,
                Some((best_route, best_run)) => {
                    run > best_run
                        || (run == best_run && route_key(network, edge.route) < route_key(network, best_route))
                }
            };
            if replace {
                best = Some((edge.route, run));
            }
        }
        let Some((route_ref, run)) = best else {
            // Paths come from the edge relaxation, so every arc has a route.
            break;
        };

        let line = network.line(route_ref.line);
        legs.push(RouteLeg {
            start_station_id: network.station_id(path[i]).clone(),
            end_station_id: network.station_id(path[i + run]).clone(),
            line_id: line.id.clone(),
            route_id: line.routes[route_ref.route].id.clone(),
            intermediate_stops: path[i + 1..i + run]
                .iter()
                .map(|&s| network.station_id(s).clone())
                .collect(),
        });
        i += run;
    }
    legs
}

/// Number of consecutive arcs of `tail` served in order by `route`,
/// starting from `tail[0] → tail[1]`. At least 1 when the first arc matches.
fn continuation_len(network: &TransportNetwork, route: RouteRef, tail: &[StationIx]) -> usize {
    let stops = &network.line(route.line).routes[route.route].stops;
    let Some(p) = stops
        .windows(2)
        .position(|w| w[0] == tail[0] && w[1] == tail[1])
    else {
        return 0;
    };

    let mut run = 1;
    while run + 1 < tail.len() && p + run + 1 < stops.len() && stops[p + run + 1] == tail[run + 1] {
        run += 1;
    }
    run
}

fn route_key(network: &TransportNetwork, route: RouteRef) -> (LineId, RouteId) {
    let line = network.line(route.line);
    (line.id.clone(), line.routes[route.route].id.clone())
}

fn leg_order_key(legs: &[RouteLeg]) -> (usize, Vec<(LineId, RouteId)>) {
    (
        legs.len(),
        legs.iter()
            .map(|leg| (leg.line_id.clone(), leg.route_id.clone()))
            .collect(),
    )
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
