//! Configuration access port.
//!
//! Lookups are raw strings by INI section and key. Typed parsing and defaults
//! live in `domain::config_validation`, so an unparseable value is reported
//! rather than silently replaced.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
