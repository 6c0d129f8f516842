use thiserror::Error;

/// Classified failure for a visit.
///
/// Failures surface to the requesting destination via callback; they are
/// never thrown across the runtime boundary. Unrecognized codes degrade to a
/// generic kind while preserving the original code for diagnostics.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum VisitError {
    /// The runtime failed to report a recognized web-navigation library
    /// within the bounded startup window. Reported once, no automatic retry.
    #[error("web runtime failed to initialize")]
    LoadFailure,
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    WebResource(#[from] WebResourceError),
    #[error(transparent)]
    Ssl(#[from] SslError),
}

impl VisitError {
    /// Classifies an HTTP status code reported by the runtime.
    pub fn from_status_code(code: u16) -> Self {
        Self::Http(HttpError::from_status_code(code))
    }

    /// The HTTP status code, when this is an HTTP failure.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http(error) => Some(error.status_code()),
            _ => None,
        }
    }
}

/// HTTP failure families keyed by status code.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum HttpError {
    #[error("400 bad request")]
    BadRequest,
    #[error("401 unauthorized")]
    Unauthorized,
    #[error("403 forbidden")]
    Forbidden,
    #[error("404 not found")]
    NotFound,
    #[error("408 request timeout")]
    RequestTimeout,
    #[error("409 conflict")]
    Conflict,
    /// 4xx codes without a named kind.
    #[error("client error {0}")]
    ClientOther(u16),
    #[error("500 internal server error")]
    InternalServerError,
    #[error("502 bad gateway")]
    BadGateway,
    #[error("503 service unavailable")]
    ServiceUnavailable,
    #[error("504 gateway timeout")]
    GatewayTimeout,
    /// 5xx codes without a named kind.
    #[error("server error {0}")]
    ServerOther(u16),
    /// Codes outside 400-599.
    #[error("unknown error {0}")]
    Unknown(u16),
}

impl HttpError {
    pub fn from_status_code(code: u16) -> Self {
        match code {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 => Self::RequestTimeout,
            409 => Self::Conflict,
            402 | 405..=407 | 410..=499 => Self::ClientOther(code),
            500 => Self::InternalServerError,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            501 | 505..=599 => Self::ServerOther(code),
            _ => Self::Unknown(code),
        }
    }

    pub fn status_code(&self) -> u16 {
        match *self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::RequestTimeout => 408,
            Self::Conflict => 409,
            Self::InternalServerError => 500,
            Self::BadGateway => 502,
            Self::ServiceUnavailable => 503,
            Self::GatewayTimeout => 504,
            Self::ClientOther(code) | Self::ServerOther(code) | Self::Unknown(code) => code,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code())
    }
}

/// Web-resource failures classified from the runtime's native error codes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum WebResourceError {
    #[error("host lookup failed")]
    HostLookup,
    #[error("connection failed")]
    Connect,
    #[error("connection timed out")]
    Timeout,
    #[error("no network connection")]
    NoConnection,
    #[error("too many redirects")]
    RedirectLoop,
    #[error("unsupported scheme")]
    UnsupportedScheme,
    /// Unrecognized runtime error code, kept for diagnostics.
    #[error("web resource error {0}")]
    Other(i32),
}

impl WebResourceError {
    /// Maps the embedded runtime's error codes. Unrecognized codes degrade
    /// to `Other` rather than failing; a new runtime must never crash an
    /// older native build.
    pub fn from_error_code(code: i32) -> Self {
        match code {
            -2 => Self::HostLookup,
            -6 => Self::Connect,
            -8 => Self::Timeout,
            -9 => Self::RedirectLoop,
            -10 => Self::UnsupportedScheme,
            -11 => Self::NoConnection,
            _ => Self::Other(code),
        }
    }
}

/// TLS failures classified from the runtime's certificate error codes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum SslError {
    #[error("certificate is not yet valid")]
    NotYetValid,
    #[error("certificate has expired")]
    Expired,
    #[error("certificate hostname mismatch")]
    HostnameMismatch,
    #[error("certificate authority is not trusted")]
    Untrusted,
    #[error("certificate date is invalid")]
    DateInvalid,
    /// Unrecognized certificate error code, kept for diagnostics.
    #[error("ssl error {0}")]
    Other(i32),
}

impl SslError {
    pub fn from_error_code(code: i32) -> Self {
        match code {
            0 => Self::NotYetValid,
            1 => Self::Expired,
            2 => Self::HostnameMismatch,
            3 => Self::Untrusted,
            4 => Self::DateInvalid,
            _ => Self::Other(code),
        }
    }
}
