pub mod almanac;
pub mod cache;
pub mod weather;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{AlmanacReading, DayInputs, WeatherReading};

pub use almanac::{AlmanacApi, AlmanacFile, NoAlmanac};
pub use weather::{OpenMeteo, WeatherError};

/// Source of daily weather readings.
///
/// Errors are fatal for the forecast run; implementations must not retry.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_weather(&self, day: &DayInputs) -> Result<WeatherReading, WeatherError>;
}

/// Source of almanac ratings. Every failure is folded into an absent reading.
#[async_trait]
pub trait AlmanacSource: Send + Sync {
    async fn fetch_almanac(&self, day: &DayInputs) -> AlmanacReading;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlmanacMode {
    #[default]
    Api,
    File,
    None,
}

impl AlmanacMode {
    /// Parse a mode name, treating anything unrecognized as `None`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::warn!(mode = s, "unknown almanac mode, almanac disabled");
            AlmanacMode::None
        })
    }
}

impl FromStr for AlmanacMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(AlmanacMode::Api),
            "file" => Ok(AlmanacMode::File),
            "none" => Ok(AlmanacMode::None),
            other => anyhow::bail!("unknown almanac mode '{}'", other),
        }
    }
}

impl fmt::Display for AlmanacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlmanacMode::Api => "api",
            AlmanacMode::File => "file",
            AlmanacMode::None => "none",
        };
        f.write_str(name)
    }
}

/// Minimal HTTP server for provider tests: answers every request with one
/// canned response and counts the requests it served.
#[cfg(test)]
pub(crate) mod test_server {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub struct TestServer {
        pub addr: SocketAddr,
        hits: Arc<AtomicUsize>,
    }

    impl TestServer {
        pub fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }

        pub fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    pub async fn serve(status: u16, body: &'static str) -> TestServer {
        // reqwest clients need a process-wide crypto provider, as in main
        let _ = rustls::crypto::ring::default_provider().install_default();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while let Ok(n) = stream.read(&mut buf[read..]).await {
                    read += n;
                    if n == 0 || buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let response = format!(
                    "HTTP/1.1 {} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        TestServer { addr, hits }
    }
}
