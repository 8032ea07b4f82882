//! Built-in status domains.
//!
//! Each domain is a unit singleton addressed through an accessor returning
//! `&'static dyn Domain`. Identities are FNV-1a hashes of the domain name,
//! computed at compile time, so they stay stable across builds.

use super::{Canonical, Domain};
use std::borrow::Cow;

const fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        i += 1;
    }
    hash
}

/// The domain of the [`Canonical`] categories themselves.
#[must_use]
pub fn canonical_domain() -> &'static dyn Domain {
    static DOMAIN: CanonicalDomain = CanonicalDomain;
    &DOMAIN
}

/// POSIX errno values, as carried by `std::io::Error::raw_os_error`.
#[must_use]
pub fn errno_domain() -> &'static dyn Domain {
    static DOMAIN: ErrnoDomain = ErrnoDomain;
    &DOMAIN
}

/// Host and service name resolution failures.
#[must_use]
pub fn address_info_domain() -> &'static dyn Domain {
    static DOMAIN: AddressInfoDomain = AddressInfoDomain;
    &DOMAIN
}

/// Numeric HTTP status codes, grouped by hundreds.
#[must_use]
pub fn http_status_domain() -> &'static dyn Domain {
    static DOMAIN: HttpStatusDomain = HttpStatusDomain;
    &DOMAIN
}

#[derive(Debug)]
struct CanonicalDomain;

impl Domain for CanonicalDomain {
    fn id(&self) -> u64 {
        fnv1a(b"canonical")
    }

    fn name(&self) -> &'static str {
        "canonical"
    }

    fn code_name(&self, code: i64) -> Cow<'static, str> {
        Cow::Borrowed(self.canonical(code).name())
    }

    fn canonical(&self, code: i64) -> Canonical {
        Canonical::from_code(code).unwrap_or(Canonical::UnknownError)
    }
}

#[derive(Debug)]
struct ErrnoDomain;

impl Domain for ErrnoDomain {
    fn id(&self) -> u64 {
        fnv1a(b"errno")
    }

    fn name(&self) -> &'static str {
        "errno"
    }

    fn code_name(&self, code: i64) -> Cow<'static, str> {
        let Ok(code) = i32::try_from(code) else {
            return Cow::Owned(format!("errno_{code}"));
        };
        let name = match code {
            0 => "ok",
            libc::EINTR => "interrupted",
            libc::EAGAIN => "would_block",
            libc::EINPROGRESS => "in_progress",
            libc::ETIMEDOUT => "timed_out",
            libc::ECONNREFUSED => "connection_refused",
            libc::ECONNRESET => "connection_reset",
            libc::ECONNABORTED => "connection_aborted",
            libc::EPIPE => "broken_pipe",
            libc::EHOSTUNREACH => "host_unreachable",
            libc::ENETUNREACH => "network_unreachable",
            libc::ENOENT => "not_found",
            libc::EADDRINUSE => "address_in_use",
            libc::EADDRNOTAVAIL => "address_not_available",
            libc::EMFILE => "too_many_open_files",
            libc::EINVAL => "invalid_argument",
            libc::EBADF => "bad_file_descriptor",
            libc::EACCES => "permission_denied",
            libc::ENOTCONN => "not_connected",
            _ => return Cow::Owned(format!("errno_{code}")),
        };
        Cow::Borrowed(name)
    }

    fn canonical(&self, code: i64) -> Canonical {
        let Ok(code) = i32::try_from(code) else {
            return Canonical::UnknownError;
        };
        match code {
            0 => Canonical::Ok,
            libc::EINTR | libc::EAGAIN | libc::EINPROGRESS | libc::ETIMEDOUT | libc::EMFILE => {
                Canonical::TransientError
            }
            libc::ECONNREFUSED
            | libc::ECONNRESET
            | libc::ECONNABORTED
            | libc::EPIPE
            | libc::EHOSTUNREACH
            | libc::ENETUNREACH
            | libc::ENOENT
            | libc::EADDRNOTAVAIL
            | libc::ENOTCONN => Canonical::NotAvailable,
            libc::EINVAL | libc::EBADF | libc::EACCES | libc::EADDRINUSE => Canonical::ClientError,
            _ => Canonical::UnknownError,
        }
    }
}

#[derive(Debug)]
struct AddressInfoDomain;

impl Domain for AddressInfoDomain {
    fn id(&self) -> u64 {
        fnv1a(b"address_info")
    }

    fn name(&self) -> &'static str {
        "address_info"
    }

    fn code_name(&self, code: i64) -> Cow<'static, str> {
        match code {
            0 => Cow::Borrowed("ok"),
            _ => Cow::Borrowed("resolution_failed"),
        }
    }

    fn canonical(&self, code: i64) -> Canonical {
        match code {
            0 => Canonical::Ok,
            _ => Canonical::NotAvailable,
        }
    }
}

#[derive(Debug)]
struct HttpStatusDomain;

impl Domain for HttpStatusDomain {
    fn id(&self) -> u64 {
        fnv1a(b"http_status")
    }

    fn name(&self) -> &'static str {
        "http_status"
    }

    fn code_name(&self, code: i64) -> Cow<'static, str> {
        let name = match code {
            101 => "switching_protocols",
            200 => "ok",
            201 => "created",
            204 => "no_content",
            301 => "moved_permanently",
            302 => "found",
            304 => "not_modified",
            400 => "bad_request",
            401 => "unauthorized",
            403 => "forbidden",
            404 => "not_found",
            405 => "method_not_allowed",
            408 => "request_timeout",
            411 => "length_required",
            413 => "payload_too_large",
            414 => "uri_too_long",
            431 => "request_header_fields_too_large",
            500 => "internal_server_error",
            501 => "not_implemented",
            502 => "bad_gateway",
            503 => "service_unavailable",
            100..=199 => "informational",
            200..=299 => "success",
            300..=399 => "redirection",
            400..=499 => "client_error",
            500..=599 => "server_error",
            _ => return Cow::Owned(format!("http_{code}")),
        };
        Cow::Borrowed(name)
    }

    fn canonical(&self, code: i64) -> Canonical {
        match code {
            100..=399 => Canonical::Ok,
            400..=499 => Canonical::ClientError,
            _ => Canonical::UnknownError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_ids_are_distinct() {
        let ids = [
            canonical_domain().id(),
            errno_domain().id(),
            address_info_domain().id(),
            http_status_domain().id(),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn http_status_names_are_snake_case() {
        let domain = http_status_domain();
        assert_eq!(domain.code_name(200), "ok");
        assert_eq!(domain.code_name(404), "not_found");
        assert_eq!(domain.code_name(431), "request_header_fields_too_large");
        assert_eq!(domain.code_name(101), "switching_protocols");
        assert_eq!(domain.code_name(418), "client_error");
    }

    #[test]
    fn http_status_canonicalization() {
        let domain = http_status_domain();
        assert_eq!(domain.canonical(200), Canonical::Ok);
        assert_eq!(domain.canonical(101), Canonical::Ok);
        assert_eq!(domain.canonical(302), Canonical::Ok);
        assert_eq!(domain.canonical(404), Canonical::ClientError);
        assert_eq!(domain.canonical(500), Canonical::UnknownError);
        assert!(!domain.failure(204));
        assert!(domain.failure(503));
    }

    #[test]
    fn errno_canonicalization() {
        let domain = errno_domain();
        assert_eq!(
            domain.canonical(i64::from(libc::EAGAIN)),
            Canonical::TransientError
        );
        assert_eq!(
            domain.canonical(i64::from(libc::ECONNREFUSED)),
            Canonical::NotAvailable
        );
        assert_eq!(
            domain.canonical(i64::from(libc::EINVAL)),
            Canonical::ClientError
        );
        assert_eq!(domain.canonical(0), Canonical::Ok);
    }
}
