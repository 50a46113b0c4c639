use thiserror::Error;

pub const CONNECT_FAILED_MESSAGE: &str = "Could not connect to the server.";

/// A rule the engine refused to break. Each variant maps to a short message shown inline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("Joker already used this season")]
    ChipSpent,
    #[error("predictions for {0} are closed")]
    WindowClosed(String),
    #[error("predictions for {0} are already submitted; press edit to change them")]
    AlreadySubmitted(String),
    #[error("fill in both scores for every match on {0} before submitting")]
    IncompletePredictions(String),
    #[error("unknown fixture {0}")]
    UnknownFixture(String),
    #[error("unknown match day {0}")]
    UnknownDay(String),
    #[error("prophecies are locked for the season")]
    ProphecyLocked,
    #[error("prophecy incomplete: {0}")]
    ProphecyIncomplete(&'static str),
    #[error("relegation picks must be three different teams")]
    DuplicateRelegation,
    #[error("a save is already in progress")]
    SaveInFlight,
    #[error("late submission must be confirmed first")]
    GraceNotAcknowledged,
}

#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Network failure or a non-2xx status. `message` is the server's own text when it sent one.
    #[error("transport failure: {detail}")]
    Transport {
        detail: String,
        message: Option<String>,
    },
    #[error("could not decode credential: {0}")]
    AuthDecode(String),
    #[error(transparent)]
    Invariant(#[from] Violation),
}

impl AppError {
    pub fn transport(err: &anyhow::Error) -> Self {
        AppError::Transport {
            detail: format!("{err:#}"),
            message: None,
        }
    }

    /// Text for the inline message line. Transport failures never leak their detail.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Transport {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            AppError::Transport { .. } => CONNECT_FAILED_MESSAGE.to_string(),
            AppError::AuthDecode(_) => "Your session is invalid. Please log in again.".to_string(),
            AppError::Invariant(v) => capitalize(&v.to_string()),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::AuthDecode(_))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_hides_detail_unless_server_sent_text() {
        let err = AppError::transport(&anyhow::anyhow!("dns error"));
        assert_eq!(err.user_message(), CONNECT_FAILED_MESSAGE);

        let err = AppError::Transport {
            detail: "http 401".to_string(),
            message: Some("Invalid credentials".to_string()),
        };
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[test]
    fn only_auth_decode_is_fatal() {
        assert!(AppError::AuthDecode("bad".into()).is_fatal());
        assert!(!AppError::from(Violation::ChipSpent).is_fatal());
        assert_eq!(
            AppError::from(Violation::ChipSpent).user_message(),
            "Joker already used this season"
        );
    }
}
