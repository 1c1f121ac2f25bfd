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

use std::path::PathBuf;

use metronet_transit::planner::{DEFAULT_K_CANDIDATES, DEFAULT_MAX_SLOWDOWN, DEFAULT_MIN_QUIETNESS};

use crate::error::MonitorError;

/// Configuration for a `NetworkMonitor` instance.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Host of the upstream passenger event feed.
    pub server_host: String,
    /// Port of the upstream feed.
    pub server_port: u16,
    /// WebSocket endpoint path on the upstream feed.
    pub server_path: String,
    /// Credential pair: used to log into the feed and to authenticate query
    /// clients.
    pub username: String,
    pub password: String,
    /// Optional CA bundle extending the client trust store.
    pub ca_file: Option<PathBuf>,
    /// Path of the network-layout document.
    pub network_layout_file: PathBuf,
    /// Bind host of the local query server.
    pub query_host: String,
    /// Bind port of the local query server.
    pub query_port: u16,
    /// PEM certificate chain presented by the query server.
    pub query_cert_file: PathBuf,
    /// PEM private key of the query server.
    pub query_key_file: PathBuf,
    /// Default accepted slowdown when a request omits it.
    pub max_slowdown: f64,
    /// Default quietness threshold when a request omits it.
    pub min_quietness: f64,
    /// Default number of alternative paths evaluated per request.
    pub k_candidates: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            server_host: "ltnm.learncppthroughprojects.com".to_string(),
            server_port: 443,
            server_path: "/network-events".to_string(),
            username: String::new(),
            password: String::new(),
            ca_file: None,
            network_layout_file: PathBuf::from("network-layout.json"),
            query_host: "127.0.0.1".to_string(),
            query_port: 8042,
            query_cert_file: PathBuf::from("server-cert.pem"),
            query_key_file: PathBuf::from("server-key.pem"),
            max_slowdown: DEFAULT_MAX_SLOWDOWN,
            min_quietness: DEFAULT_MIN_QUIETNESS,
            k_candidates: DEFAULT_K_CANDIDATES,
        }
    }
}

impl MonitorConfig {
    /// Checks the configuration for values that cannot work at runtime.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.server_host.is_empty() {
            return Err(MonitorError::ConfigInvalid(
                "server host must not be empty".to_string(),
            ));
        }
        if self.query_host.is_empty() {
            return Err(MonitorError::ConfigInvalid(
                "query server host must not be empty".to_string(),
            ));
        }
        if self.network_layout_file.as_os_str().is_empty() {
            return Err(MonitorError::ConfigInvalid(
                "network layout file path must not be empty".to_string(),
            ));
        }
        if self.max_slowdown < 0.0 {
            return Err(MonitorError::ConfigInvalid(format!(
                "max slowdown must be non-negative, was {}",
                self.max_slowdown,
            )));
        }
        if !(0.0..=1.0).contains(&self.min_quietness) {
            return Err(MonitorError::ConfigInvalid(format!(
                "min quietness must be within [0, 1], was {}",
                self.min_quietness,
            )));
        }
        if self.k_candidates == 0 {
            return Err(MonitorError::ConfigInvalid(
                "k candidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_default_config_is_valid() {
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[rstest]
    fn test_empty_server_host_is_rejected() {
        let config = MonitorConfig {
            server_host: String::new(),
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(MonitorError::ConfigInvalid(_)),
        ));
    }

    #[rstest]
    #[case::negative_slowdown(-0.5, 0.1, 20)]
    #[case::quietness_above_one(0.1, 1.5, 20)]
    #[case::zero_candidates(0.1, 0.1, 0)]
    fn test_planner_defaults_are_validated(
        #[case] max_slowdown: f64,
        #[case] min_quietness: f64,
        #[case] k_candidates: usize,
    ) {
        let config = MonitorConfig {
            max_slowdown,
            min_quietness,
            k_candidates,
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(MonitorError::ConfigInvalid(_)),
        ));
    }
}
