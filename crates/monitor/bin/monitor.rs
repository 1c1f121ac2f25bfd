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

//! The quiet-route monitor process.
//!
//! # Environment Variables
//!
//! - `METRONET_SERVER_URL`: Host of the upstream passenger event feed.
//! - `METRONET_SERVER_PORT`: Port of the upstream feed (default 443).
//! - `METRONET_TIMEOUT_MS`: Bounded run duration; 0 runs indefinitely.
//! - `METRONET_NETWORK_LAYOUT_FILE_PATH`: Path of the layout document.
//! - `METRONET_CACERT_PEM_PATH`: Optional CA bundle for the feed connection.
//! - `METRONET_SERVER_CERT_PATH` / `METRONET_SERVER_KEY_PATH`: Query server
//!   TLS material.
//!
//! Feed credentials are baked in at build time via `METRONET_USERNAME` and
//! `METRONET_PASSWORD`.
//!
//! Exit codes: 0 on clean shutdown, -1 on configuration errors, -2 on any
//! non-recoverable runtime error other than a query client disconnecting.

use std::{path::PathBuf, time::Duration};

use metronet_monitor::{MonitorConfig, NetworkMonitor, env::get_env_var};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    std::process::exit(run().await);
}

async fn run() -> i32 {
    let (config, timeout_ms) = match load_environment() {
        Ok(loaded) => loaded,
        Err(error) => {
            tracing::error!("Invalid environment: {error}");
            return -1;
        }
    };

    let mut monitor = match NetworkMonitor::configure(config) {
        Ok(monitor) => monitor,
        Err(error) => {
            tracing::error!("Configuration failed: {error}");
            return -1;
        }
    };

    if timeout_ms == 0 {
        monitor.run().await;
    } else {
        monitor.run_for(Duration::from_millis(timeout_ms)).await;
    }

    // The disconnection of a query client is an acceptable outcome; every
    // other latched error is a failure.
    match monitor.last_error() {
        None => 0,
        Some(error) if error.is_benign() => 0,
        Some(error) => {
            tracing::error!("Last error: {error}");
            -2
        }
    }
}

fn load_environment() -> anyhow::Result<(MonitorConfig, u64)> {
    let defaults = MonitorConfig::default();

    let server_host = get_env_var("METRONET_SERVER_URL", Some(&defaults.server_host))?;
    let server_port = get_env_var("METRONET_SERVER_PORT", Some("443"))?.parse()?;
    let timeout_ms = get_env_var("METRONET_TIMEOUT_MS", Some("0"))?.parse()?;
    let network_layout_file =
        get_env_var("METRONET_NETWORK_LAYOUT_FILE_PATH", Some("network-layout.json"))?;
    let ca_file = std::env::var("METRONET_CACERT_PEM_PATH").ok().map(PathBuf::from);
    let query_cert_file = get_env_var("METRONET_SERVER_CERT_PATH", Some("server-cert.pem"))?;
    let query_key_file = get_env_var("METRONET_SERVER_KEY_PATH", Some("server-key.pem"))?;

    let config = MonitorConfig {
        server_host,
        server_port,
        username: option_env!("METRONET_USERNAME").unwrap_or_default().to_string(),
        password: option_env!("METRONET_PASSWORD").unwrap_or_default().to_string(),
        ca_file,
        network_layout_file: network_layout_file.into(),
        query_cert_file: query_cert_file.into(),
        query_key_file: query_key_file.into(),
        ..defaults
    };
    Ok((config, timeout_ms))
}
