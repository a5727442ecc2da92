//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so logs from producers and
//! verifiers can be grouped without parsing messages.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - SOURCE_xxx: external data source errors
//! - LAYER_xxx: layer execution errors
//! - FUSION_xxx: fusion engine errors
//! - STORE_xxx: pending-verification store errors
//! - CFG_xxx: configuration errors
//! - API_xxx: transport errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // External Source Errors
    // ============================================
    /// Connection to the source failed
    SourceConnectionFailed,
    /// Source call exceeded its timeout
    SourceTimeout,
    /// Source rate limited us (HTTP 429)
    SourceRateLimited,
    /// Source answered with a non-success status
    SourceHttpStatus,
    /// Source answered with a body we could not understand
    SourceInvalidResponse,
    /// Source has no credentials/endpoint configured
    SourceNotConfigured,

    // ============================================
    // Layer Errors
    // ============================================
    /// Layer analysis returned an error
    LayerFailed,
    /// Layer analysis panicked
    LayerPanicked,
    /// Layer analysis exceeded its time budget
    LayerTimeout,

    // ============================================
    // Fusion Errors
    // ============================================
    /// Weight table does not sum to 1.0
    FusionInvalidWeights,
    /// Token address rejected before fan-out
    FusionInvalidAddress,
    /// Fan-in did not produce all seven results
    FusionRoundIncomplete,

    // ============================================
    // Store Errors
    // ============================================
    /// Reading or writing the store failed
    StoreIo,
    /// Store document could not be parsed
    StoreCorrupt,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // API Errors
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Unauthorized (unknown API key)
    ApiUnauthorized,
    /// Internal server error
    ApiInternalError,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceConnectionFailed => "SOURCE_CONNECTION_FAILED",
            Self::SourceTimeout => "SOURCE_TIMEOUT",
            Self::SourceRateLimited => "SOURCE_RATE_LIMITED",
            Self::SourceHttpStatus => "SOURCE_HTTP_STATUS",
            Self::SourceInvalidResponse => "SOURCE_INVALID_RESPONSE",
            Self::SourceNotConfigured => "SOURCE_NOT_CONFIGURED",

            Self::LayerFailed => "LAYER_FAILED",
            Self::LayerPanicked => "LAYER_PANICKED",
            Self::LayerTimeout => "LAYER_TIMEOUT",

            Self::FusionInvalidWeights => "FUSION_INVALID_WEIGHTS",
            Self::FusionInvalidAddress => "FUSION_INVALID_ADDRESS",
            Self::FusionRoundIncomplete => "FUSION_ROUND_INCOMPLETE",

            Self::StoreIo => "STORE_IO",
            Self::StoreCorrupt => "STORE_CORRUPT",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiUnauthorized => "API_UNAUTHORIZED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest | Self::FusionInvalidAddress | Self::ConfigInvalidValue => 400,
            Self::ApiUnauthorized => 401,
            Self::SourceRateLimited => 429,
            Self::SourceTimeout | Self::LayerTimeout => 504,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceTimeout
                | Self::SourceRateLimited
                | Self::SourceConnectionFailed
                | Self::LayerTimeout
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Source connection failed
    pub fn source_connection_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SourceConnectionFailed, msg)
    }

    /// Source timeout
    pub fn source_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SourceTimeout, msg)
    }

    /// Source rate limited
    pub fn source_rate_limited(source: &str) -> Self {
        Self::new(
            ErrorCode::SourceRateLimited,
            format!("{} rate limited (HTTP 429)", source),
        )
    }

    /// Source returned a non-success HTTP status
    pub fn source_status(source: &str, status: u16) -> Self {
        Self::new(
            ErrorCode::SourceHttpStatus,
            format!("{} returned HTTP {}", source, status),
        )
    }

    /// Source body could not be parsed
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SourceInvalidResponse, msg)
    }

    /// Source is not configured
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SourceNotConfigured, msg)
    }

    /// Layer failed
    pub fn layer_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::LayerFailed, msg)
    }

    /// Layer panicked
    pub fn layer_panicked(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::LayerPanicked, msg)
    }

    /// Layer ran out of time
    pub fn layer_timeout(layer: &str, budget_ms: u128) -> Self {
        Self::new(
            ErrorCode::LayerTimeout,
            format!("{} layer exceeded {}ms budget", layer, budget_ms),
        )
    }

    /// Weight table rejected
    pub fn invalid_weights(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FusionInvalidWeights, msg)
    }

    /// Token address rejected
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FusionInvalidAddress, msg)
    }

    /// Store IO failure
    pub fn store_io(msg: impl Into<String>, source: std::io::Error) -> Self {
        Self::with_source(ErrorCode::StoreIo, msg, source)
    }

    /// Invalid config value
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::StoreIo, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::SourceTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::SourceConnectionFailed, "Connection failed")
        } else if err.is_decode() {
            Self::new(ErrorCode::SourceInvalidResponse, err.to_string())
        } else {
            Self::new(ErrorCode::Unknown, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::SourceInvalidResponse, "JSON parse error", err)
    }
}
