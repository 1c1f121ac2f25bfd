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

//! Asynchronous WebSocket-over-TLS transport.
//!
//! Provides the duplex text-message channel the STOMP layer runs on: an
//! outbound client (resolve → TCP → TLS → WebSocket upgrade) and a listening
//! server accepting one peer at a time, both yielding the same session type
//! with serialized writes and an ordered inbound event stream.

pub mod error;
pub mod tls;
pub mod websocket;

pub use error::SocketError;
pub use websocket::{
    MessageReader, SocketEvent, WebSocketClient, WebSocketServer, WebSocketSession,
};
