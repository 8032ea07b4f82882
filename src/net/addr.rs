//! Host and service name resolution.

use crate::status::{self, Result, Status};
use std::net::{SocketAddr, ToSocketAddrs};

/// Resolves a host/port pair into one or more socket addresses.
///
/// Numeric addresses resolve without touching the system resolver. Failures
/// land in the `address_info` status domain.
///
/// # Errors
///
/// Fails when the name cannot be resolved or resolves to no addresses.
pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addresses: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|error| resolution_error(host, port, &error.to_string()))?
        .collect();
    if addresses.is_empty() {
        return Err(resolution_error(host, port, "no addresses found"));
    }
    Ok(addresses)
}

fn resolution_error(host: &str, port: u16, detail: &str) -> status::Error {
    Status::new(status::address_info_domain(), 1)
        .with_message(format!("{host}:{port}: {detail}"))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Canonical;

    #[test]
    fn numeric_addresses_resolve() {
        let addresses = resolve("127.0.0.1", 8000).expect("resolve");
        assert_eq!(addresses, vec!["127.0.0.1:8000".parse().unwrap()]);
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        let addresses = resolve("localhost", 80).expect("resolve");
        assert!(addresses.iter().all(|address| address.ip().is_loopback()));
    }

    #[test]
    fn bogus_names_fail_as_not_available() {
        let error = resolve("name.invalid.", 80).expect_err("must fail");
        assert_eq!(error.canonical(), Canonical::NotAvailable);
        assert_eq!(
            error.status().domain().id(),
            status::address_info_domain().id()
        );
    }
}
