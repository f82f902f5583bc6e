/// Core error type.
///
/// Adapter crates map their specific errors into this type so the controller
/// can decide what the user sees (one generic message per category) and what
/// only ends up in the logs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("extraction unavailable: {0}")]
    ExtractionUnavailable(String),

    #[error("an extraction is already in progress")]
    ExtractionInFlight,

    #[error("persisted history unreadable: {0}")]
    PersistenceRead(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// The message shown to the end user.
    ///
    /// Detail carried by the variant is for logs only.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "Please enter a valid number.",
            Error::ExtractionUnavailable(_) => "Could not find a valid number or AI unavailable.",
            Error::ExtractionInFlight => "Still looking for a number, please wait.",
            Error::PersistenceRead(_) | Error::Io(_) | Error::Json(_) => {
                "Could not access the local history."
            }
            Error::Config(_) => "Configuration problem, check your environment.",
            Error::External(_) => "Something went wrong, please try again.",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_reasons_collapse_to_one_message() {
        let missing_key = Error::ExtractionUnavailable("missing api key".to_string());
        let no_match = Error::ExtractionUnavailable("no number in text".to_string());
        assert_eq!(missing_key.user_message(), no_match.user_message());
        assert_ne!(missing_key.to_string(), no_match.to_string());
    }
}
