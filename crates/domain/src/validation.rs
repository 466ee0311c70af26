//! Error-collecting validation for the first step of every pipeline.

use std::fmt::Display;

/// Separator between collected error messages.
pub const REASON_SEPARATOR: &str = "; ";

/// Collects every rejected field before the step decides.
///
/// Each value object is constructed independently; `check` records the
/// error of any that reject and hands back the ones that succeed.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    /// Creates an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the error of a failed construction, or returns the value.
    pub fn check<T, E: Display>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors.push(err.to_string());
                None
            }
        }
    }

    /// All collected messages joined into one reason.
    pub fn reason(&self) -> String {
        self.errors.join(REASON_SEPARATOR)
    }
}
