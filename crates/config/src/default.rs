use crate::config::Log;

// default values
pub fn get_default_version() -> u32 {
    1
}

pub fn get_default_policy() -> String {
    String::from("round-robin")
}

pub fn get_default_weight() -> f64 {
    1.0
}

pub fn get_default_healthy() -> bool {
    true
}

pub fn get_default_log_level() -> String {
    String::from("info")
}

pub fn get_default_log() -> Log {
    Log {
        level: get_default_log_level(),
        file: None,
    }
}
