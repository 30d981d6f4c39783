use std::fmt;
use std::result;

use thiserror::Error;

/// Message shown to end users for remote failures that are not their fault
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred when getting the data.";

/// How the client reacts when the remote API reports an error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Authentication token is stale: fetch a new one and retry
    RefreshAuth,
    /// Session token is stale: fetch new authentication and session tokens and retry
    RefreshSession,
    /// Caused by user input; the remote message can be shown verbatim
    Validation,
    /// Terminal, never retried
    Fatal,
}

macro_rules! error_codes {
    ($($code:literal => $name:ident, $recovery:ident;)*) => {
        /// Error codes reported by the EDS API
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorCode {
            /// Failure synthesized by the client (unexpected HTTP status, missing token)
            Critical,
            $($name,)*
            /// Code outside the documented table
            Other(u32),
        }

        impl ErrorCode {
            /// Map a numeric wire code onto the table
            pub fn from_code(code: u32) -> Self {
                match code {
                    1 => ErrorCode::Critical,
                    $($code => ErrorCode::$name,)*
                    other => ErrorCode::Other(other),
                }
            }

            /// Numeric wire code
            pub fn code(&self) -> u32 {
                match self {
                    ErrorCode::Critical => 1,
                    $(ErrorCode::$name => $code,)*
                    ErrorCode::Other(code) => *code,
                }
            }

            /// Recovery classification for this code
            pub fn recovery(&self) -> Recovery {
                match self {
                    $(ErrorCode::$name => Recovery::$recovery,)*
                    ErrorCode::Critical | ErrorCode::Other(_) => Recovery::Fatal,
                }
            }
        }
    };
}

error_codes! {
    100 => UnknownParameter, Fatal;
    101 => IncorrectParameterFormat, Fatal;
    102 => InvalidParameterIndex, Fatal;
    103 => MissingParameter, Fatal;
    104 => AuthTokenInvalid, RefreshAuth;
    105 => IncorrectArgumentsNumber, Fatal;
    106 => UnknownError, Fatal;
    107 => AuthTokenMissing, Fatal;
    108 => SessionTokenMissing, Fatal;
    109 => SessionTokenInvalid, RefreshSession;
    110 => InvalidRecordFormat, Fatal;
    111 => UnknownAction, Fatal;
    112 => InvalidArgumentValue, Validation;
    113 => CreateSessionError, Fatal;
    114 => RequiredDataMissing, Fatal;
    115 => TransactionLoggingError, Fatal;
    116 => DuplicateParameter, Fatal;
    117 => UnableToAuthenticate, Fatal;
    118 => SearchError, Fatal;
    119 => InvalidPageSize, Validation;
    120 => SessionSaveError, Fatal;
    121 => SessionEndingError, Fatal;
    122 => CachingResultsetError, Fatal;
    123 => InvalidExpander, Validation;
    124 => InvalidSearchMode, Validation;
    125 => InvalidLimiter, Validation;
    126 => InvalidLimiterValue, Validation;
    127 => UnsupportedProfile, Fatal;
    128 => ProfileNotSupported, Fatal;
    129 => InvalidContentProvider, Fatal;
    130 => InvalidSourceType, Fatal;
    131 => XsltError, Fatal;
    132 => RecordNotFound, Fatal;
    133 => SimultaneousUserLimit, Fatal;
    134 => NoGuestAccess, Fatal;
    135 => DbIdNotInProfile, Fatal;
    136 => InvalidSearchView, Fatal;
    137 => RetrievingFullText, Fatal;
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure, timeout, or a body that could not be parsed
    Transport,
    /// Error reported by the remote API
    Remote,
    /// Remote error caused by the caller's input
    Validation,
    /// Response did not match any known shape
    Protocol,
}

/// Error types for EDS client operations
#[derive(Error, Debug)]
pub enum EdsError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Response body could not be parsed
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Error reported by the API (or synthesized from an unexpected HTTP status)
    #[error("API error {code}: {message}")]
    ApiError { code: ErrorCode, message: String },

    /// Response parsed but matched none of the known shapes
    #[error("Unexpected response with root element <{root}>")]
    UnexpectedResponse { root: String, payload: String },

    /// Token exchange succeeded but carried no token
    #[error("No {token} token was found in the response")]
    MissingToken { token: &'static str },

    /// JSON (de)serialization failed
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Record identifier is not of the form `an|dbid`
    #[error("Invalid record id: {id}")]
    InvalidRecordId { id: String },
}

pub type Result<T> = result::Result<T, EdsError>;

impl EdsError {
    /// Build an API error from a numeric wire code
    pub fn api(code: u32, message: impl Into<String>) -> Self {
        EdsError::ApiError {
            code: ErrorCode::from_code(code),
            message: message.into(),
        }
    }

    /// Error code, when the error came from the API
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            EdsError::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EdsError::RequestError(_) | EdsError::MalformedResponse { .. } => ErrorKind::Transport,
            EdsError::ApiError { code, .. } if code.recovery() == Recovery::Validation => {
                ErrorKind::Validation
            }
            EdsError::ApiError { .. } | EdsError::MissingToken { .. } => ErrorKind::Remote,
            EdsError::UnexpectedResponse { .. }
            | EdsError::JsonError(_)
            | EdsError::InvalidRecordId { .. } => ErrorKind::Protocol,
        }
    }

    /// Whether a token refresh followed by a retry can recover from this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code().map(|c| c.recovery()),
            Some(Recovery::RefreshAuth | Recovery::RefreshSession)
        )
    }

    /// Message suitable for end users
    ///
    /// Validation errors carry the remote message; everything else collapses to
    /// [`GENERIC_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        match self {
            EdsError::ApiError { code, message } if code.recovery() == Recovery::Validation => {
                message.clone()
            }
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}
