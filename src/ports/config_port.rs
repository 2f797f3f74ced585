//! Configuration access port.
//!
//! Keys are looked up by INI section and name. Numeric getters fall back to
//! `default` when the key is absent or does not parse.

use std::path::PathBuf;

pub trait ConfigPort {
    /// Trimmed value; `None` when absent or blank.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_string(section, key).map(PathBuf::from)
    }
}
