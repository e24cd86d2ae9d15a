use futures_util::Stream;
use futures_util::TryFutureExt;
use socket2::Domain;
use socket2::Protocol;
use socket2::Socket;
use socket2::Type;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;
use std::net::UdpSocket as StdUdpSocket;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;

/// Datagrams larger than this are truncated and will fail to parse.
pub const DATAGRAM_BUFFER_SIZE: usize = 10 * 1024;

/// Deadline used when `now + timeout` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Probes must not leave the local link.
const MULTICAST_TTL: u32 = 1;

/// Runs one discovery round.
///
/// Sends `probe` from `local_ip` to `destination` and yields every datagram received on the same
/// socket until `timeout` has elapsed since the round started. The stream ends without error
/// at the deadline. Any other socket error is yielded once and ends the stream.
///
/// The socket lives inside the stream and is closed when the stream is dropped.
pub fn run_round(
    local_ip: Ipv4Addr,
    destination: SocketAddrV4,
    probe: Vec<u8>,
    timeout: Duration,
) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Send + 'static {
    send_probe(local_ip, destination, probe, timeout)
        .map_ok(|(socket, deadline)| receive_until(socket, deadline))
        .try_flatten_stream()
}

async fn send_probe(
    local_ip: Ipv4Addr,
    destination: SocketAddrV4,
    probe: Vec<u8>,
    timeout: Duration,
) -> std::io::Result<(UdpSocket, Instant)> {
    let now = Instant::now();
    let deadline = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);
    let socket = new_probe_socket(local_ip)?;
    log::debug!("Created probe socket at {}", socket.local_addr()?);
    socket.send_to(&probe, destination).await?;
    log::debug!("Sent {} bytes to {}", probe.len(), destination);
    Ok((socket, deadline))
}

fn receive_until(
    socket: UdpSocket,
    deadline: Instant,
) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Send + 'static {
    futures_util::stream::try_unfold(socket, move |socket| async move {
        let mut buffer = vec![0u8; DATAGRAM_BUFFER_SIZE];
        match tokio::time::timeout_at(deadline, socket.recv_from(&mut buffer)).await {
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(e),
            Ok(Ok((size, remote_address))) => {
                log::debug!("Received {} bytes from {}", size, remote_address);
                buffer.truncate(size);
                Ok(Some((buffer, socket)))
            }
        }
    })
}

fn new_probe_socket(local_ip: Ipv4Addr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_multicast_if_v4(&local_ip)?;
    socket.set_multicast_ttl_v4(MULTICAST_TTL)?;

    // Multicast loop should be enabled only in test.
    socket.set_multicast_loop_v4(false)?;
    #[cfg(test)]
    {
        socket.set_multicast_loop_v4(true)?;
    }

    socket.bind(&SocketAddrV4::new(local_ip, 0).into())?;
    socket.set_nonblocking(true)?;
    let socket: StdUdpSocket = socket.into();
    UdpSocket::from_std(socket)
}

#[cfg(test)]
mod test {
    use super::*;
    use futures_util::TryStreamExt;

    const TIMEOUT: Duration = Duration::from_millis(300);

    #[tokio::test]
    async fn collects_responses_until_timeout() -> anyhow::Result<()> {
        crate::test::init();

        let responder = UdpSocket::bind("127.0.0.1:0").await?;
        let responder_address = match responder.local_addr()? {
            std::net::SocketAddr::V4(addr) => addr,
            std::net::SocketAddr::V6(_) => panic!("Must be IPv4"),
        };
        let responder_task = async move {
            let mut buffer = [0; 64];
            let (size, prober) = responder.recv_from(&mut buffer).await?;
            responder.send_to(&buffer[..size], prober).await?;
            responder.send_to(b"second", prober).await?;
            anyhow::Ok(responder)
        };

        // When
        let (datagrams, responder) = tokio::join!(
            run_round(
                Ipv4Addr::LOCALHOST,
                responder_address,
                b"probe".to_vec(),
                TIMEOUT
            )
            .try_collect::<Vec<_>>(),
            responder_task,
        );

        // Then
        responder?;
        assert_eq!(datagrams?, vec![b"probe".to_vec(), b"second".to_vec()]);
        Ok(())
    }

    #[tokio::test]
    async fn ends_at_deadline_without_responders() -> anyhow::Result<()> {
        crate::test::init();

        let silent = UdpSocket::bind("127.0.0.1:0").await?;
        let silent_address = match silent.local_addr()? {
            std::net::SocketAddr::V4(addr) => addr,
            std::net::SocketAddr::V6(_) => panic!("Must be IPv4"),
        };
        let start = std::time::Instant::now();

        // When
        let datagrams: Vec<_> =
            run_round(Ipv4Addr::LOCALHOST, silent_address, b"probe".to_vec(), TIMEOUT)
                .try_collect()
                .await?;

        // Then
        let elapsed = start.elapsed();
        assert!(datagrams.is_empty());
        assert!(elapsed >= TIMEOUT, "Ended early after {:?}", elapsed);
        assert!(
            elapsed < TIMEOUT + Duration::from_secs(2),
            "Ended late after {:?}",
            elapsed
        );
        Ok(())
    }

    #[tokio::test]
    async fn unbounded_timeout_keeps_waiting() -> anyhow::Result<()> {
        crate::test::init();

        let silent = UdpSocket::bind("127.0.0.1:0").await?;
        let silent_address = match silent.local_addr()? {
            std::net::SocketAddr::V4(addr) => addr,
            std::net::SocketAddr::V6(_) => panic!("Must be IPv4"),
        };

        // When
        let result = tokio::time::timeout(
            TIMEOUT,
            run_round(
                Ipv4Addr::LOCALHOST,
                silent_address,
                b"probe".to_vec(),
                Duration::MAX,
            )
            .try_collect::<Vec<_>>(),
        )
        .await;

        // Then
        assert!(result.is_err(), "Round must still be waiting");
        Ok(())
    }

    #[tokio::test]
    async fn truncates_oversized_datagrams() -> anyhow::Result<()> {
        crate::test::init();

        let responder = UdpSocket::bind("127.0.0.1:0").await?;
        let responder_address = match responder.local_addr()? {
            std::net::SocketAddr::V4(addr) => addr,
            std::net::SocketAddr::V6(_) => panic!("Must be IPv4"),
        };
        let responder_task = async move {
            let mut buffer = [0; 64];
            let (_, prober) = responder.recv_from(&mut buffer).await?;
            responder
                .send_to(&vec![b'x'; DATAGRAM_BUFFER_SIZE * 2], prober)
                .await?;
            anyhow::Ok(())
        };

        // When
        let (datagrams, responder) = tokio::join!(
            run_round(
                Ipv4Addr::LOCALHOST,
                responder_address,
                b"probe".to_vec(),
                TIMEOUT
            )
            .try_collect::<Vec<_>>(),
            responder_task,
        );

        // Then
        responder?;
        let datagrams = datagrams?;
        assert_eq!(datagrams.len(), 1);
        assert_eq!(datagrams[0].len(), DATAGRAM_BUFFER_SIZE);
        Ok(())
    }
}
