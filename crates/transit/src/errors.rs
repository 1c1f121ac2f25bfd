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

use thiserror::Error;

use crate::identifiers::StationId;

/// Error type for graph construction and routing queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitError {
    /// The network layout document is structurally invalid.
    #[error("Invalid network layout: {0}")]
    LayoutInvalid(String),

    /// A station identifier does not match any station in the network.
    #[error("Unknown station: {0}")]
    StationUnknown(StationId),

    /// No itinerary connects the requested endpoints.
    #[error("No route found from {start} to {end}")]
    NoRouteFound { start: StationId, end: StationId },
}
