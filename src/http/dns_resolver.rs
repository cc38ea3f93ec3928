use crate::error::Error;
use std::net::SocketAddr;

/// Resolves `host:port` to every address the system resolver returns.
/// IP literals come back immediately without a lookup.
pub async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, Error> {
    // hyper keeps the brackets on IPv6 literals
    let host = host.trim_start_matches('[').trim_end_matches(']');
    debug!("Resolving DNS for: {}", host);

    let addresses: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| Error::Dns {
            host: host.to_string(),
            source,
        })?
        .collect();

    if addresses.is_empty() {
        error!("DNS resolution for {} returned no addresses.", host);
        return Err(Error::NoAddress(host.to_string()));
    }

    for (i, addr) in addresses.iter().enumerate() {
        if i == 0 {
            debug!("Resolved IP: {}", addr.ip());
        } else {
            debug!("Resolved IP (alternative): {}", addr.ip());
        }
    }
    Ok(addresses)
}
