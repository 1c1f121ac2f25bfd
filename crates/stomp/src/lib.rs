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

//! STOMP 1.2 over WebSocket: frame codec, client, and single-session server.
//!
//! Frames travel one per WebSocket text message. The client drives login,
//! subscriptions, receipted sends, and message demultiplexing; the server
//! authenticates one session at a time and dispatches `SEND` frames to its
//! embedder.

pub mod client;
pub mod frame;
pub mod server;

pub use client::{StompClient, StompClientError, StompMessage};
pub use frame::{FrameError, StompCommand, StompFrame};
pub use server::{StompRequest, StompServer, StompServerError, StompServerSession};
