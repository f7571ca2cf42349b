//! 失败分类：将上游状态码与传输故障映射为本地化、对用户安全的提示。
//!
//! Failure classification and the user-facing message catalogue.
//!
//! Every outcome that crosses the gateway boundary is reduced to a
//! [`FailureKind`]. The kind drives three things:
//!
//! | Use | Method |
//! |-----|--------|
//! | Metric labels (`errors_total{error_type}`) | [`FailureKind::label`] |
//! | Localized message shown to end users | [`FailureKind::user_message`] |
//! | Status mapping for received responses | [`FailureKind::from_http_status`] |
//!
//! ## Example
//!
//! ```rust
//! use completion_gateway::failure::FailureKind;
//!
//! let kind = FailureKind::from_http_status(429);
//! assert_eq!(kind, FailureKind::UpstreamRateLimited);
//! assert_eq!(kind.label(), "upstream_rate_limited");
//! ```

use std::fmt;

/// Returned as a successful result when no upstream credential is configured.
pub const SERVICE_UNCONFIGURED: &str =
    "La asistencia de IA no está disponible. Por favor contacta al administrador.";

pub const CIRCUIT_OPEN: &str = "El servicio de IA está experimentando problemas temporales. Por favor, intenta de nuevo en unos minutos.";

pub const CALLER_RATE_LIMITED: &str =
    "Has excedido el límite de solicitudes. Por favor, intenta de nuevo en un momento.";

pub const SATURATED: &str = "El servicio de IA está atendiendo demasiadas solicitudes. Por favor, intenta de nuevo en un momento.";

pub const CANCELLED: &str = "La solicitud fue cancelada antes de completarse.";

pub const IMAGE_REQUIRED: &str =
    "Se requiere una imagen para el análisis visual. Por favor adjunta una imagen.";

pub const IMAGE_TOO_LARGE: &str =
    "La imagen es demasiado grande. Por favor utiliza una imagen menor a 5MB.";

const AUTHENTICATION: &str = "Error de autenticación con el servicio de IA. Verifica la configuración de la clave de API.";
const PERMISSION_DENIED: &str =
    "El servicio de IA rechazó la solicitud por falta de permisos. Contacta al administrador.";
const UPSTREAM_RATE_LIMITED: &str = "Hemos alcanzado el límite de solicitudes a la API. Por favor intenta de nuevo en unos minutos.";
const SERVICE_UNAVAILABLE: &str =
    "El servicio de IA no está disponible temporalmente. Por favor intenta más tarde.";
const PAYLOAD_TOO_LARGE: &str =
    "La solicitud es demasiado grande. Reduce el tamaño de la consulta o de la imagen.";
const MALFORMED_RESPONSE: &str =
    "El servicio de IA devolvió una respuesta inválida. Por favor intenta de nuevo.";
const GENERIC: &str = "Error en el procesamiento de la consulta. Intenta reformularla.";

/// Failure category for an outcome that did not yield completion text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// HTTP 401: the configured credential was rejected
    Authentication,
    /// HTTP 403: valid credential without access to the model/endpoint
    PermissionDenied,
    /// HTTP 429 from the upstream service
    UpstreamRateLimited,
    /// HTTP 503: upstream temporarily out of service
    ServiceUnavailable,
    /// HTTP 413: request body over the upstream size limit
    PayloadTooLarge,
    /// Any other non-2xx status
    UpstreamStatus,
    /// Vision call without image data, rejected before any upstream contact
    MissingImage,
    /// Connection, TLS, DNS or body read failure
    Network,
    /// The call deadline elapsed while talking to the upstream
    Timeout,
    /// 2xx response whose body could not be parsed or had no choices
    MalformedResponse,
    /// Per-caller admission gate rejected the request
    CallerRateLimited,
    /// Circuit breaker is open
    CircuitOpen,
    /// No admission slot became free before the call deadline
    Saturated,
    /// The caller cancelled the request
    Cancelled,
    /// Gateway setup problem (configuration, metrics registry)
    Internal,
}

impl FailureKind {
    /// Maps a received non-2xx HTTP status to its failure kind.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::PermissionDenied,
            413 => Self::PayloadTooLarge,
            429 => Self::UpstreamRateLimited,
            503 => Self::ServiceUnavailable,
            _ => Self::UpstreamStatus,
        }
    }

    /// Stable label for the `error_type` metric dimension.
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission_denied",
            Self::UpstreamRateLimited => "upstream_rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::PayloadTooLarge => "payload_too_large",
            Self::UpstreamStatus => "upstream_status",
            Self::MissingImage => "missing_image",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::MalformedResponse => "malformed_response",
            Self::CallerRateLimited => "caller_rate_limited",
            Self::CircuitOpen => "circuit_open",
            Self::Saturated => "saturated",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }

    /// Localized message that is safe to show to the end user.
    ///
    /// Transport failures (network and timeout alike) share the generic
    /// processing message; raw transport errors are never surfaced.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Authentication => AUTHENTICATION,
            Self::PermissionDenied => PERMISSION_DENIED,
            Self::UpstreamRateLimited => UPSTREAM_RATE_LIMITED,
            Self::ServiceUnavailable => SERVICE_UNAVAILABLE,
            Self::PayloadTooLarge => PAYLOAD_TOO_LARGE,
            Self::MissingImage => IMAGE_REQUIRED,
            Self::MalformedResponse => MALFORMED_RESPONSE,
            Self::CallerRateLimited => CALLER_RATE_LIMITED,
            Self::CircuitOpen => CIRCUIT_OPEN,
            Self::Saturated => SATURATED,
            Self::Cancelled => CANCELLED,
            Self::UpstreamStatus | Self::Network | Self::Timeout | Self::Internal => GENERIC,
        }
    }

    /// Whether this is a "try again later" admission outcome (no upstream cost incurred).
    #[inline]
    pub fn is_admission_rejection(&self) -> bool {
        matches!(
            self,
            Self::CallerRateLimited | Self::CircuitOpen | Self::Saturated
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
