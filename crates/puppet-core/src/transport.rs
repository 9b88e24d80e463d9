//! Loopback socket plumbing between designer and worker

use crate::supervisor::LaunchError;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

/// Listen on an ephemeral loopback port for the worker to connect back to
pub async fn bind_loopback() -> io::Result<TcpListener> {
    TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await
}

/// Accept the worker's connection, bounded by `timeout`
pub async fn accept_worker(
    listener: &TcpListener,
    timeout: Duration,
) -> Result<TcpStream, LaunchError> {
    match tokio::time::timeout(timeout, listener.accept()).await {
        Ok(Ok((stream, peer))) => {
            debug!("Worker connected from {}", peer);
            stream.set_nodelay(true).map_err(LaunchError::Listen)?;
            Ok(stream)
        }
        Ok(Err(e)) => Err(LaunchError::Listen(e)),
        Err(_) => Err(LaunchError::StartupTimeout { waited: timeout }),
    }
}

/// Resolve a worker address argument: a bare port means loopback
pub fn parse_address(address: &str) -> io::Result<SocketAddr> {
    let address = address.trim();
    if let Ok(port) = address.parse::<u16>() {
        return Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
    }
    address.parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid socket address '{}'", address),
        )
    })
}

/// Connect to the designer at `address`
pub async fn connect(address: &str) -> io::Result<TcpStream> {
    let addr = parse_address(address)?;
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    debug!("Connected to {}", addr);
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(
            parse_address("4711").unwrap(),
            "127.0.0.1:4711".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_address("127.0.0.1:80").unwrap().port(),
            80
        );
        assert!(parse_address("localhost:abc").is_err());
        assert!(parse_address("").is_err());
    }

    #[tokio::test]
    async fn test_connect_and_accept() {
        let listener = bind_loopback().await.unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        let (accepted, connected) = tokio::join!(
            accept_worker(&listener, Duration::from_secs(5)),
            connect(&port)
        );
        assert!(accepted.is_ok());
        assert!(connected.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_times_out() {
        let listener = bind_loopback().await.unwrap();
        let err = accept_worker(&listener, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::StartupTimeout { .. }));
    }
}
