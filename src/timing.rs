use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Keys present in every successful result, in lifecycle order.
pub const DURATION_KEYS: [&str; 7] = [
    "socketOpen",
    "dnsLookup",
    "tcpConnection",
    "tlsHandshake",
    "firstByte",
    "download",
    "total",
];

/// Lifecycle signals a transport reports while a request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The transport is about to open a socket.
    Socket,
    DnsResolved,
    Connected,
    SecureConnected,
    /// Response status line and headers were parsed.
    HeadersReceived,
    /// A body chunk of the given length arrived.
    Data(usize),
    /// The body has been read to the end.
    End,
}

/// A measured segment of the request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    SocketOpen,
    DnsLookup,
    TcpConnection,
    TlsHandshake,
    FirstByte,
    Download,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::SocketOpen,
        Phase::DnsLookup,
        Phase::TcpConnection,
        Phase::TlsHandshake,
        Phase::FirstByte,
        Phase::Download,
    ];

    pub fn key(self) -> &'static str {
        DURATION_KEYS[self as usize]
    }
}

impl Signal {
    /// The phase this signal closes. `Data` closes nothing on its own.
    pub fn phase(self) -> Option<Phase> {
        match self {
            Signal::Socket => Some(Phase::SocketOpen),
            Signal::DnsResolved => Some(Phase::DnsLookup),
            Signal::Connected => Some(Phase::TcpConnection),
            Signal::SecureConnected => Some(Phase::TlsHandshake),
            Signal::HeadersReceived => Some(Phase::FirstByte),
            Signal::Data(_) => None,
            Signal::End => Some(Phase::Download),
        }
    }
}

/// Receiver of lifecycle signals. The transport only talks to this trait.
pub trait LifecycleObserver {
    fn on_signal(&mut self, signal: Signal);
}

/// Per-request phase state machine.
///
/// Holds a checkpoint that starts at t0. Every accepted signal assigns
/// `now - checkpoint` to the phase it closes and moves the checkpoint to
/// `now`, so the phases always tile `[t0, end]` without gaps or overlap.
/// Phases whose signal never fires stay at zero.
#[derive(Debug)]
pub struct TimingCollector {
    checkpoint: Instant,
    closed: Option<Phase>,
    phases: [Duration; 6],
    received: u64,
}

impl TimingCollector {
    pub fn start() -> Self {
        Self::start_at(Instant::now())
    }

    pub fn start_at(t0: Instant) -> Self {
        Self {
            checkpoint: t0,
            closed: None,
            phases: [Duration::ZERO; 6],
            received: 0,
        }
    }

    pub fn record(&mut self, signal: Signal) {
        self.record_at(signal, Instant::now());
    }

    pub fn record_at(&mut self, signal: Signal, now: Instant) {
        let phase = match signal {
            Signal::Data(len) => {
                self.received += len as u64;
                if self.closed >= Some(Phase::FirstByte) {
                    trace!("received {} bytes", len);
                    return;
                }
                // body bytes before headers were reported: headers are in
                Phase::FirstByte
            }
            other => match other.phase() {
                Some(phase) => phase,
                None => return,
            },
        };

        if self.closed >= Some(phase) {
            trace!("ignoring out-of-order signal {:?}", signal);
            return;
        }

        let elapsed = now.saturating_duration_since(self.checkpoint);
        self.phases[phase as usize] = elapsed;
        self.checkpoint = self.checkpoint.max(now);
        self.closed = Some(phase);
        debug!("{}: {:.3} ms", phase.key(), millis(elapsed));
    }

    /// Closes the download phase if the transport did not, and returns the
    /// finalized map. `total` is the exact sum of the phases.
    pub fn finish(self) -> Durations {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(mut self, now: Instant) -> Durations {
        if self.closed < Some(Phase::Download) {
            self.record_at(Signal::End, now);
        }
        Durations::from_phases(&self.phases)
    }

    /// Phases observed before a failure. No total is synthesized.
    pub fn fail(self) -> Vec<(Phase, Duration)> {
        let Some(last) = self.closed else {
            return Vec::new();
        };
        Phase::ALL
            .iter()
            .filter(|phase| **phase <= last)
            .map(|phase| (*phase, self.phases[*phase as usize]))
            .collect()
    }

    pub fn bytes_received(&self) -> u64 {
        self.received
    }
}

impl LifecycleObserver for TimingCollector {
    fn on_signal(&mut self, signal: Signal) {
        self.record(signal);
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// Finalized phase durations in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Durations {
    pub socket_open: f64,
    pub dns_lookup: f64,
    pub tcp_connection: f64,
    pub tls_handshake: f64,
    pub first_byte: f64,
    pub download: f64,
    pub total: f64,
}

impl Durations {
    fn from_phases(phases: &[Duration; 6]) -> Self {
        let total: Duration = phases.iter().sum();
        Self {
            socket_open: millis(phases[Phase::SocketOpen as usize]),
            dns_lookup: millis(phases[Phase::DnsLookup as usize]),
            tcp_connection: millis(phases[Phase::TcpConnection as usize]),
            tls_handshake: millis(phases[Phase::TlsHandshake as usize]),
            first_byte: millis(phases[Phase::FirstByte as usize]),
            download: millis(phases[Phase::Download as usize]),
            total: millis(total),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        let value = match key {
            "socketOpen" => self.socket_open,
            "dnsLookup" => self.dns_lookup,
            "tcpConnection" => self.tcp_connection,
            "tlsHandshake" => self.tls_handshake,
            "firstByte" => self.first_byte,
            "download" => self.download,
            "total" => self.total,
            _ => return None,
        };
        Some(value)
    }

    /// `(key, milliseconds)` pairs in [`DURATION_KEYS`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        DURATION_KEYS
            .iter()
            .map(move |key| (*key, self.get(key).unwrap_or_default()))
    }

    /// Sum of every key except `total`.
    pub fn phase_sum(&self) -> f64 {
        self.iter()
            .filter(|(key, _)| *key != "total")
            .map(|(_, value)| value)
            .sum()
    }
}

impl fmt::Display for Durations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\nTime breakdown:")?;
        writeln!(f, "  Socket open:     {:>10.3} ms", self.socket_open)?;
        writeln!(f, "  DNS lookup:      {:>10.3} ms", self.dns_lookup)?;
        writeln!(f, "  TCP connect:     {:>10.3} ms", self.tcp_connection)?;
        writeln!(f, "  TLS handshake:   {:>10.3} ms", self.tls_handshake)?;
        writeln!(f, "  First byte:      {:>10.3} ms", self.first_byte)?;
        writeln!(f, "  Download:        {:>10.3} ms", self.download)?;
        writeln!(f, "  Total time:      {:>10.3} ms", self.total)?;
        Ok(())
    }
}
