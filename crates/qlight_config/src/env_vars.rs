//! Environment variable naming for qlight configuration.
//!
//! Plain settings are overridden through `QLIGHT__SECTION__KEY` variables (handled by the
//! `config` crate). Values written as `secret_from_env` in a config file are resolved here,
//! first from `QLIGHT_SECRET_SECTION_KEY` and then from the shorter `SECTION_KEY` form.

use std::env;

use serde_json::Value;
use tracing::warn;

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "QLIGHT";

/// The prefix for secret environment variables
pub const SECRET_PREFIX: &str = "QLIGHT_SECRET";

/// The separator for configuration environment variables
pub const CONFIG_SEPARATOR: &str = "__";

/// The separator for secret environment variables
pub const SECRET_SEPARATOR: &str = "_";

/// Marker value replaced by an environment variable at load time
pub const SECRET_MARKER: &str = "secret_from_env";

/// Convert a secret path to an environment variable name
///
/// `auth.key` becomes `QLIGHT_SECRET_AUTH_KEY`.
pub fn secret_path_to_env_var(path: &str) -> String {
    let path = path.replace('.', SECRET_SEPARATOR);
    format!("{}{}{}", SECRET_PREFIX, SECRET_SEPARATOR, path).to_uppercase()
}

/// Convert a secret path to its short environment variable name
///
/// `auth.key` becomes `AUTH_KEY`.
pub fn short_secret_path_to_env_var(path: &str) -> String {
    path.replace('.', SECRET_SEPARATOR).to_uppercase()
}

/// Look up the value for a secret path, preferring the prefixed variable.
pub fn get_secret_env_var(path: &str) -> Option<String> {
    if let Ok(value) = env::var(secret_path_to_env_var(path)) {
        return Some(value);
    }
    env::var(short_secret_path_to_env_var(path)).ok()
}

/// Replace every `secret_from_env` string in `value` with its environment variable.
///
/// Returns the dotted paths that could not be resolved; those keep the marker.
pub fn inject_env_secrets(value: &mut Value) -> Vec<String> {
    fn walk(path: &mut Vec<String>, obj: &mut Value, missing: &mut Vec<String>) {
        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    path.push(k.clone());
                    walk(path, v, missing);
                    path.pop();
                }
            }
            Value::String(s) if s == SECRET_MARKER => {
                let path_str = path.join(".");
                match get_secret_env_var(&path_str) {
                    Some(env_val) => *s = env_val,
                    None => {
                        warn!(path = %path_str, "env var for secret_from_env not found");
                        missing.push(path_str);
                    }
                }
            }
            _ => {}
        }
    }

    let mut missing = Vec::new();
    walk(&mut Vec::new(), value, &mut missing);
    missing
}
