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

//! The network-monitor orchestrator.
//!
//! Owns the transport-network graph and two STOMP sessions: an outbound
//! ingest client subscribed to the passenger event feed, and a local query
//! server answering quiet-route requests. Inbound events mutate the graph;
//! inbound queries run the planner and reply over the querying session.

pub mod config;
pub mod env;
pub mod error;
pub mod messages;
pub mod monitor;

pub use config::MonitorConfig;
pub use error::MonitorError;
pub use messages::{QuietRouteQuery, QuietRouteResponse};
pub use monitor::NetworkMonitor;
