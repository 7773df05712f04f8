use std::collections::HashSet;

use log::{error, info};

use crate::config::Config;

pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

// (alias, canonical name)
pub const POLICY_ALIASES: &[(&str, &str)] = &[
    ("round-robin", "round-robin"),
    ("round_robin", "round-robin"),
    ("rr", "round-robin"),
    ("least-connections", "least-connections"),
    ("least_connections", "least-connections"),
    ("lc", "least-connections"),
    ("fallback", "fallback"),
    ("failover", "fallback"),
];

/// Canonical policy name for a configured alias, case-insensitively.
pub fn canonical_policy(policy: &str) -> Option<&'static str> {
    let policy = policy.trim();
    POLICY_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(policy))
        .map(|(_, canonical)| *canonical)
}

pub fn validate(config: &Config) -> bool {
    info!("Starting configuration validation...");

    // --- Validate Log level ---
    if !VALID_LOG_LEVELS
        .iter()
        .any(|lvl| lvl.eq_ignore_ascii_case(&config.log.level))
    {
        error!("Invalid log level: {}", config.log.level);
        return false;
    }

    // --- Validate directors ---
    if config.directors.is_empty() {
        error!("No directors configured");
        return false;
    }

    for (name, director) in &config.directors {
        if canonical_policy(&director.policy).is_none() {
            error!(
                "Invalid policy '{}' for director '{}'",
                director.policy, name
            );
            return false;
        }

        if director.backends.is_empty() {
            error!("No backends configured for director '{}'", name);
            return false;
        }

        let mut seen = HashSet::new();
        for backend in &director.backends {
            if backend.name.is_empty() {
                error!("Backend name is missing in director '{}'", name);
                return false;
            }

            if !seen.insert(backend.name.as_str()) {
                error!(
                    "Backend '{}' is listed twice in director '{}'",
                    backend.name, name
                );
                return false;
            }

            if !backend.weight.is_finite() || backend.weight < 0.0 {
                error!(
                    "Backend weight is invalid ({}) for backend '{}' in director '{}'",
                    backend.weight, backend.name, name
                );
                return false;
            }
        }
    }

    info!("Configuration validation passed successfully");

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Backend, Director};

    fn backend(name: &str, weight: f64) -> Backend {
        Backend {
            name: name.to_string(),
            address: String::new(),
            weight,
            healthy: true,
            max_conns: 0,
            active: 0,
        }
    }

    fn config_with(director: Director) -> Config {
        let mut config = Config::default();
        config.log.level = "info".to_string();
        config.directors.insert("api".to_string(), director);
        config
    }

    fn director(policy: &str, backends: Vec<Backend>) -> Director {
        Director {
            policy: policy.to_string(),
            backends,
            ..Director::default()
        }
    }

    #[test]
    fn accepts_every_policy_alias() {
        for (alias, _) in POLICY_ALIASES {
            let config = config_with(director(alias, vec![backend("a", 1.0)]));
            assert!(validate(&config), "policy {alias} rejected");
        }
    }

    #[test]
    fn canonical_policy_folds_aliases() {
        assert_eq!(canonical_policy(" RR "), Some("round-robin"));
        assert_eq!(canonical_policy("least_connections"), Some("least-connections"));
        assert_eq!(canonical_policy("Failover"), Some("fallback"));
        assert_eq!(canonical_policy("random"), None);
    }

    #[test]
    fn rejects_unknown_policy() {
        let config = config_with(director("random", vec![backend("a", 1.0)]));
        assert!(!validate(&config));
    }

    #[test]
    fn rejects_empty_directors_and_backends() {
        let mut config = Config::default();
        config.log.level = "info".to_string();
        assert!(!validate(&config));

        let config = config_with(director("rr", Vec::new()));
        assert!(!validate(&config));
    }

    #[test]
    fn rejects_bad_backends() {
        let duplicate = config_with(director("rr", vec![backend("a", 1.0), backend("a", 2.0)]));
        assert!(!validate(&duplicate));

        let unnamed = config_with(director("rr", vec![backend("", 1.0)]));
        assert!(!validate(&unnamed));

        let negative = config_with(director("rr", vec![backend("a", -1.0)]));
        assert!(!validate(&negative));

        let nan = config_with(director("rr", vec![backend("a", f64::NAN)]));
        assert!(!validate(&nan));
    }

    #[test]
    fn zero_weight_is_allowed() {
        let config = config_with(director("rr", vec![backend("a", 0.0), backend("b", 1.0)]));
        assert!(validate(&config));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = config_with(director("rr", vec![backend("a", 1.0)]));
        config.log.level = "chatty".to_string();
        assert!(!validate(&config));
    }
}
