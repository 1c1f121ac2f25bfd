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

//! Environment variable helpers for the process entry point.

/// Reads an environment variable, falling back to `default` when unset.
///
/// Fails only when the variable is unset and no default was given.
pub fn get_env_var(name: &str, default: Option<&str>) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(value) => Ok(value),
        Err(_) => default
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Could not find environment variable: {name}")),
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
    fn test_set_variable_wins_over_default() {
        // PATH is set in any test environment.
        let value = get_env_var("PATH", Some("fallback")).unwrap();

        assert_ne!(value, "fallback");
    }

    #[rstest]
    fn test_unset_variable_falls_back_to_default() {
        let value = get_env_var("METRONET_SURELY_UNSET_VARIABLE", Some("fallback")).unwrap();

        assert_eq!(value, "fallback");
    }

    #[rstest]
    fn test_unset_variable_without_default_fails() {
        let result = get_env_var("METRONET_SURELY_UNSET_VARIABLE", None);

        assert!(result.is_err());
    }
}
