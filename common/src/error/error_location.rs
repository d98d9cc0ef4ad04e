use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

/// Where an error was raised.
///
/// Every error variant in the workspace carries one. Conversions marked
/// `#[track_caller]` record the `?` site rather than the conversion body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorLocation {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl ErrorLocation {
    pub const fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }

    /// Location of the caller, shorthand for `from(Location::caller())`.
    #[track_caller]
    pub fn here() -> Self {
        Self::from(Location::caller())
    }
}

/// Renders as `[file:line:column]`, the suffix every error message ends with.
impl Display for ErrorLocation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "[{}:{}:{}]", self.file, self.line, self.column)
    }
}
