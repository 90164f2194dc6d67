//! Minimal SNTPv4 client (RFC 4330), enough to set a clock once an hour.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use log::{debug, info};
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use crate::error::SyncError;
use crate::time_source::TimeSource;

const PACKET_LEN: usize = 48;
const VERSION: u8 = 4;
const MODE_CLIENT: u8 = 3;
const MODE_SERVER: u8 = 4;
const LEAP_UNSYNCHRONISED: u8 = 3;

/// Seconds from 1900-01-01 (NTP) to 1970-01-01 (Unix).
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;
const NTP_ERA: i64 = 1 << 32;

/// 64-bit NTP timestamp: seconds since 1900 and a binary fraction.
pub fn encode_timestamp(at: DateTime<Utc>) -> [u8; 8] {
    let secs = (at.timestamp() + NTP_UNIX_OFFSET) as u32;
    let frac = ((u64::from(at.timestamp_subsec_nanos()) << 32) / 1_000_000_000) as u32;

    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&secs.to_be_bytes());
    out[4..].copy_from_slice(&frac.to_be_bytes());
    out
}

/// Client request carrying `transmit`, which the server echoes back as
/// the originate timestamp.
pub fn build_request(transmit: [u8; 8]) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = (VERSION << 3) | MODE_CLIENT;
    packet[40..48].copy_from_slice(&transmit);
    packet
}

/// Server transmit time from a reply to the request sent with `originate`.
pub fn parse_response(buf: &[u8], originate: &[u8; 8]) -> Result<DateTime<Utc>, SyncError> {
    if buf.len() < PACKET_LEN {
        return Err(SyncError::Malformed("short packet"));
    }
    if buf[0] & 0x07 != MODE_SERVER {
        return Err(SyncError::Malformed("not a server reply"));
    }
    if buf[24..32] != originate[..] {
        return Err(SyncError::Stale);
    }
    if buf[0] >> 6 == LEAP_UNSYNCHRONISED {
        return Err(SyncError::Malformed("server clock unsynchronised"));
    }
    if buf[1] == 0 {
        let mut code = [0u8; 4];
        code.copy_from_slice(&buf[12..16]);
        return Err(SyncError::KissOfDeath(code));
    }

    let secs = u32::from_be_bytes([buf[40], buf[41], buf[42], buf[43]]);
    let frac = u32::from_be_bytes([buf[44], buf[45], buf[46], buf[47]]);
    if secs == 0 && frac == 0 {
        return Err(SyncError::Malformed("zero transmit timestamp"));
    }

    // Timestamps before 1970 are read as era 1, which starts in 2036.
    let mut unix = i64::from(secs) - NTP_UNIX_OFFSET;
    if unix < 0 {
        unix += NTP_ERA;
    }
    let nanos = ((u64::from(frac) * 1_000_000_000) >> 32) as u32;

    Utc.timestamp_opt(unix, nanos)
        .single()
        .ok_or(SyncError::Malformed("timestamp out of range"))
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    utc: DateTime<Utc>,
    at: Instant,
}

/// Time kept by periodically asking an SNTP server.
#[derive(Debug)]
pub struct SntpClock {
    server: String,
    timeout: Duration,
    anchor: Option<Anchor>,
}

impl SntpClock {
    pub fn new<S: Into<String>>(server: S, timeout: Duration) -> Self {
        Self {
            server: server.into(),
            timeout,
            anchor: None,
        }
    }

    async fn query(&self) -> Result<Anchor, SyncError> {
        let addr = lookup_host(self.server.as_str())
            .await?
            .next()
            .ok_or(SyncError::NoAddress)?;
        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(addr).await?;

        let originate = encode_timestamp(Utc::now());
        let sent = Instant::now();
        socket.send(&build_request(originate)).await?;

        let mut buf = [0u8; 128];
        let (transmit, received) = loop {
            let len = socket.recv(&mut buf).await?;
            let received = Instant::now();
            match parse_response(&buf[..len], &originate) {
                Err(SyncError::Stale) => debug!("sntp reply discarded, peer: {}", addr),
                reply => break (reply?, received),
            }
        };
        let half_rtt = received.duration_since(sent) / 2;
        debug!("sntp reply, peer: {}, rtt: {:.2?}", addr, half_rtt * 2);

        Ok(Anchor {
            utc: transmit + to_chrono(half_rtt),
            at: received,
        })
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}

impl TimeSource for SntpClock {
    async fn sync(&mut self) -> Result<(), SyncError> {
        let anchor = timeout(self.timeout, self.query()).await??;
        info!("sntp sync, server: {}, utc: {}", self.server, anchor.utc);
        self.anchor = Some(anchor);
        Ok(())
    }

    fn local_now(&self) -> NaiveDateTime {
        match self.anchor {
            Some(anchor) => (anchor.utc + to_chrono(anchor.at.elapsed()))
                .with_timezone(&Local)
                .naive_local(),
            None => Local::now().naive_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: [u8; 8] = [0xe3, 0x1f, 0x5a, 0x10, 0x80, 0, 0, 0];

    fn reply(stratum: u8, secs: u32, frac: u32) -> [u8; PACKET_LEN] {
        let mut packet = [0u8; PACKET_LEN];
        packet[0] = (VERSION << 3) | MODE_SERVER;
        packet[1] = stratum;
        packet[24..32].copy_from_slice(&ORIGIN);
        packet[40..44].copy_from_slice(&secs.to_be_bytes());
        packet[44..48].copy_from_slice(&frac.to_be_bytes());
        packet
    }

    #[test]
    fn test_request() {
        let at = Utc.timestamp_opt(1_600_000_000, 500_000_000).unwrap();
        let transmit = encode_timestamp(at);
        let secs = (NTP_UNIX_OFFSET + 1_600_000_000) as u32;
        assert_eq!(transmit[..4], secs.to_be_bytes());
        assert_eq!(transmit[4..], 0x8000_0000u32.to_be_bytes());

        let request = build_request(transmit);
        assert_eq!(request[0], 0x23);
        assert!(request[1..40].iter().all(|&b| b == 0));
        assert_eq!(request[40..], transmit);
    }

    #[test]
    fn test_parse_response() {
        let secs = (NTP_UNIX_OFFSET + 1_600_000_000) as u32;
        let at = parse_response(&reply(2, secs, 0x8000_0000), &ORIGIN).unwrap();
        assert_eq!(at.timestamp(), 1_600_000_000);
        assert_eq!(at.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_era_rollover() {
        let at = parse_response(&reply(1, 100, 0), &ORIGIN).unwrap();
        assert_eq!(at.timestamp(), 100 - NTP_UNIX_OFFSET + NTP_ERA);
    }

    #[test]
    fn test_parse_rejects() {
        assert!(matches!(
            parse_response(&[0x24; 20], &ORIGIN),
            Err(SyncError::Malformed("short packet"))
        ));

        let mut client = reply(2, 1, 0);
        client[0] = (VERSION << 3) | MODE_CLIENT;
        assert!(matches!(
            parse_response(&client, &ORIGIN),
            Err(SyncError::Malformed("not a server reply"))
        ));

        let mut unsynced = reply(2, 1, 0);
        unsynced[0] |= LEAP_UNSYNCHRONISED << 6;
        assert!(matches!(
            parse_response(&unsynced, &ORIGIN),
            Err(SyncError::Malformed("server clock unsynchronised"))
        ));

        let mut kiss = reply(0, 1, 0);
        kiss[12..16].copy_from_slice(b"RATE");
        assert!(matches!(
            parse_response(&kiss, &ORIGIN),
            Err(SyncError::KissOfDeath(code)) if &code == b"RATE"
        ));

        assert!(matches!(
            parse_response(&reply(2, 0, 0), &ORIGIN),
            Err(SyncError::Malformed("zero transmit timestamp"))
        ));
    }

    #[test]
    fn test_parse_rejects_unanswered_originate() {
        let secs = (NTP_UNIX_OFFSET + 1_600_000_000) as u32;
        assert!(matches!(
            parse_response(&reply(2, secs, 0), &[0u8; 8]),
            Err(SyncError::Stale)
        ));

        // a kiss-o'-death for someone else's request is ignored too
        let mut kiss = reply(0, 1, 0);
        kiss[24] ^= 0xff;
        assert!(matches!(parse_response(&kiss, &ORIGIN), Err(SyncError::Stale)));
    }

    #[tokio::test]
    async fn test_sync_against_local_server() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 128];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(len, PACKET_LEN);
            assert_eq!(buf[0], 0x23);

            // an answer to an older request arrives first and is skipped
            let stale = (NTP_UNIX_OFFSET + 1_500_000_000) as u32;
            server.send_to(&reply(2, stale, 0), peer).await.unwrap();

            let secs = (NTP_UNIX_OFFSET + 1_600_000_000) as u32;
            let mut answer = reply(2, secs, 0);
            answer[24..32].copy_from_slice(&buf[40..48]);
            server.send_to(&answer, peer).await.unwrap();
        });

        let mut clock = SntpClock::new(addr.to_string(), Duration::from_secs(5));
        clock.sync().await.unwrap();

        let expected = Utc
            .timestamp_opt(1_600_000_000, 0)
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        let drift = clock.local_now() - expected;
        assert!(drift.num_seconds().abs() < 5);
    }

    #[tokio::test]
    async fn test_sync_times_out() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap();

        let mut clock = SntpClock::new(addr.to_string(), Duration::from_millis(50));
        assert!(matches!(clock.sync().await, Err(SyncError::Timeout)));
        drop(silent);
    }
}
