//! Domain-tagged status codes and the crate's error type.
//!
//! A [`Status`] pairs a domain singleton with a numeric code and an optional
//! message. Every domain maps its codes onto one of the coarse [`Canonical`]
//! categories, so statuses from different domains stay comparable: equality
//! is exact within a domain and categorical across domains.
//!
//! [`Error`] wraps a status whose category is never `Ok`; it is what the
//! crate's [`Result`] alias carries and what async operations resolve with.

mod domains;

pub use domains::{address_info_domain, canonical_domain, errno_domain, http_status_domain};

use std::borrow::Cow;
use std::fmt;

/// Coarse status categories every domain code maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum Canonical {
    /// The operation succeeded.
    Ok = 0,
    /// The caller or peer supplied invalid input.
    ClientError = 1,
    /// The operation may succeed if retried.
    TransientError = 2,
    /// The operation will keep failing if retried.
    PermanentError = 3,
    /// The requested resource does not exist or is unreachable.
    NotAvailable = 4,
    /// A failure that fits no other category.
    UnknownError = 5,
    /// A byte source or sink ended before the operation completed.
    Exhausted = 6,
}

impl Canonical {
    /// Decodes a canonical-domain code, if the value is in range.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::ClientError),
            2 => Some(Self::TransientError),
            3 => Some(Self::PermanentError),
            4 => Some(Self::NotAvailable),
            5 => Some(Self::UnknownError),
            6 => Some(Self::Exhausted),
            _ => None,
        }
    }

    /// The snake_case name used when rendering statuses.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::ClientError => "client_error",
            Self::TransientError => "transient_error",
            Self::PermanentError => "permanent_error",
            Self::NotAvailable => "not_available",
            Self::UnknownError => "unknown_error",
            Self::Exhausted => "exhausted",
        }
    }
}

/// A family of status codes with a stable identity.
///
/// Domains are singletons; a [`Status`] carries a `&'static dyn Domain` and
/// compares domains by [`Domain::id`]. Implementations decode a raw `i64`
/// code into a printable name and a [`Canonical`] category.
pub trait Domain: fmt::Debug {
    /// Stable 64-bit identity of this domain.
    fn id(&self) -> u64;

    /// Printable domain name.
    fn name(&self) -> &'static str;

    /// Printable name for a code in this domain.
    fn code_name(&self, code: i64) -> Cow<'static, str>;

    /// Canonical category for a code in this domain.
    fn canonical(&self, code: i64) -> Canonical;

    /// Whether a code in this domain represents a failure.
    fn failure(&self, code: i64) -> bool {
        self.canonical(code) != Canonical::Ok
    }
}

/// A domain-tagged status code with an optional message payload.
#[derive(Clone)]
pub struct Status {
    domain: &'static dyn Domain,
    code: i64,
    message: Option<Box<str>>,
}

impl Status {
    /// Creates a status from a domain singleton and a raw code.
    #[must_use]
    pub fn new(domain: &'static dyn Domain, code: i64) -> Self {
        Self {
            domain,
            code,
            message: None,
        }
    }

    /// The canonical `ok` status.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(canonical_domain(), Canonical::Ok as i64)
    }

    /// Creates a canonical-domain status for the given category.
    #[must_use]
    pub fn canonical_code(canonical: Canonical) -> Self {
        Self::new(canonical_domain(), canonical as i64)
    }

    /// Attaches a message payload.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into().into_boxed_str());
        self
    }

    /// The domain this status belongs to.
    #[must_use]
    pub fn domain(&self) -> &'static dyn Domain {
        self.domain
    }

    /// The raw code within the domain.
    #[must_use]
    pub fn code(&self) -> i64 {
        self.code
    }

    /// The message payload, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The canonical category of this status.
    #[must_use]
    pub fn canonical(&self) -> Canonical {
        self.domain.canonical(self.code)
    }

    /// Whether this status represents a failure.
    #[must_use]
    pub fn failure(&self) -> bool {
        self.domain.failure(self.code)
    }

    /// Whether this status represents success.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.failure()
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        if self.domain.id() == other.domain.id() {
            self.code == other.code && self.message == other.message
        } else {
            self.canonical() == other.canonical()
        }
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Status")
            .field("domain", &self.domain.name())
            .field("code", &self.domain.code_name(self.code))
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.domain.code_name(self.code))?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// A status whose canonical category is never [`Canonical::Ok`].
///
/// Constructing an error from an `ok` status yields `unknown_error`.
#[derive(Clone, PartialEq)]
pub struct Error(Status);

impl Error {
    /// The underlying status.
    #[must_use]
    pub fn status(&self) -> &Status {
        &self.0
    }

    /// Unwraps the underlying status.
    #[must_use]
    pub fn into_status(self) -> Status {
        self.0
    }

    /// The raw code within the error's domain.
    #[must_use]
    pub fn code(&self) -> i64 {
        self.0.code()
    }

    /// The canonical category of this error.
    #[must_use]
    pub fn canonical(&self) -> Canonical {
        self.0.canonical()
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        if status.failure() {
            Self(status)
        } else {
            Self(Status::canonical_code(Canonical::UnknownError))
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.raw_os_error() {
            Some(code) => Self(Status::new(errno_domain(), i64::from(code))),
            None => unknown_error(error.to_string()),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Error {}

/// Result alias carrying a [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

fn canonical_error(canonical: Canonical, message: impl Into<String>) -> Error {
    Error(Status::canonical_code(canonical).with_message(message))
}

/// A failure caused by invalid input from the caller or peer.
pub fn client_error(message: impl Into<String>) -> Error {
    canonical_error(Canonical::ClientError, message)
}

/// A failure that may clear up on retry.
pub fn transient_error(message: impl Into<String>) -> Error {
    canonical_error(Canonical::TransientError, message)
}

/// A failure that will not clear up on retry.
pub fn permanent_error(message: impl Into<String>) -> Error {
    canonical_error(Canonical::PermanentError, message)
}

/// A failure due to a missing or unreachable resource.
pub fn not_available(message: impl Into<String>) -> Error {
    canonical_error(Canonical::NotAvailable, message)
}

/// A failure that fits no other category.
pub fn unknown_error(message: impl Into<String>) -> Error {
    canonical_error(Canonical::UnknownError, message)
}

/// A byte source or sink ended before the operation completed.
pub fn exhausted(message: impl Into<String>) -> Error {
    canonical_error(Canonical::Exhausted, message)
}

/// An error carrying a numeric HTTP status code.
pub fn http_error(code: u16, message: impl Into<String>) -> Error {
    Error(Status::new(http_status_domain(), i64::from(code)).with_message(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_failure_are_exclusive() {
        let statuses = [
            Status::ok(),
            Status::canonical_code(Canonical::TransientError),
            Status::new(http_status_domain(), 200),
            Status::new(http_status_domain(), 404),
            Status::new(errno_domain(), i64::from(libc::ECONNREFUSED)),
        ];
        for status in statuses {
            assert_ne!(status.success(), status.failure(), "{status:?}");
        }
    }

    #[test]
    fn equality_is_reflexive() {
        let statuses = [
            Status::ok(),
            Status::new(http_status_domain(), 404).with_message("missing"),
            transient_error("busy").into_status(),
        ];
        for status in &statuses {
            assert_eq!(status, status);
        }
    }

    #[test]
    fn equality_is_exact_within_a_domain() {
        let a = Status::new(http_status_domain(), 404);
        let b = Status::new(http_status_domain(), 404);
        let c = Status::new(http_status_domain(), 410);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, a.clone().with_message("missing"));
    }

    #[test]
    fn equality_is_categorical_across_domains() {
        let http = Status::new(http_status_domain(), 404);
        let canonical = Status::canonical_code(Canonical::ClientError);
        assert_eq!(http.canonical(), Canonical::ClientError);
        assert_eq!(http, canonical);

        let errno = Status::new(errno_domain(), i64::from(libc::EAGAIN));
        assert_ne!(errno, canonical);
    }

    #[test]
    fn default_status_is_ok() {
        let status = Status::default();
        assert!(status.success());
        assert_eq!(status.code(), Canonical::Ok as i64);
    }

    #[test]
    fn error_from_ok_status_is_unknown() {
        let error = Error::from(Status::ok());
        assert_eq!(error.canonical(), Canonical::UnknownError);
    }

    #[test]
    fn error_from_io_error_lands_in_errno_domain() {
        let io = std::io::Error::from_raw_os_error(libc::ECONNRESET);
        let error = Error::from(io);
        assert_eq!(error.status().domain().id(), errno_domain().id());
        assert_eq!(error.canonical(), Canonical::NotAvailable);
    }

    #[test]
    fn display_includes_code_name_and_message() {
        let error = http_error(431, "header line too long");
        assert_eq!(
            error.to_string(),
            "request_header_fields_too_large: header line too long"
        );
        assert_eq!(not_available("gone").to_string(), "not_available: gone");
    }
}
