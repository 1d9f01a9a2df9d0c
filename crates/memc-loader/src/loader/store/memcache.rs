//! Minimal memcached client speaking the text protocol.
//!
//! Only the storage command the loader needs is implemented:
//!
//! ```text
//! set <key> 0 0 <bytes>\r\n
//! <value>\r\n
//! ```
//!
//! answered by `STORED\r\n` on success. Connections are opened lazily and
//! kept in a small idle pool so concurrent workers writing to the same
//! address do not serialize on one socket. A connection that saw any error is
//! dropped instead of being returned to the pool.

use super::Store;
use core::time::Duration;
use memc_loader_core::{Error, Result};
use parking_lot::Mutex;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufStream},
    net::TcpStream,
    time::timeout,
};

/// Longest key memcached accepts.
pub const MAX_KEY_LEN: usize = 250;

/// Idle connections kept per address.
pub const MAX_IDLE_CONNS: usize = 8;

type Conn = BufStream<TcpStream>;

pub struct MemcacheClient {
    addr: String,
    timeout: Duration,
    idle: Mutex<Vec<Conn>>,
}

impl MemcacheClient {
    /// Creates a client for `addr`. No connection is made until the first
    /// write.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            idle: Mutex::new(Vec::new()),
        }
    }

    async fn checkout(&self) -> Result<Conn> {
        let idle = self.idle.lock().pop();
        if let Some(conn) = idle {
            return Ok(conn);
        }

        tracing::debug!(addr = %self.addr, "Opening memcached connection");
        let stream = timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| Error::Timeout {
                op: "connect",
                addr: self.addr.clone(),
            })??;
        stream.set_nodelay(true)?;
        Ok(BufStream::new(stream))
    }

    fn checkin(&self, conn: Conn) {
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE_CONNS {
            idle.push(conn);
        }
    }
}

#[async_trait::async_trait]
impl Store for MemcacheClient {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;

        let mut conn = self.checkout().await?;
        match timeout(self.timeout, set(&mut conn, key, value)).await {
            Ok(Ok(())) => {
                self.checkin(conn);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout {
                op: "set",
                addr: self.addr.clone(),
            }),
        }
    }
}

async fn set(conn: &mut Conn, key: &str, value: &[u8]) -> Result<()> {
    let header = format!("set {key} 0 0 {}\r\n", value.len());
    conn.write_all(header.as_bytes()).await?;
    conn.write_all(value).await?;
    conn.write_all(b"\r\n").await?;
    conn.flush().await?;

    let mut reply = String::new();
    if conn.read_line(&mut reply).await? == 0 {
        return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }

    match reply.trim_end() {
        "STORED" => Ok(()),
        other => Err(Error::Store {
            key: key.to_string(),
            reason: other.to_string(),
        }),
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.len() > MAX_KEY_LEN
        || key.bytes().any(|b| b <= b' ' || b == 0x7f)
    {
        return Err(Error::MalformedKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, BufReader};
    use tokio::net::TcpListener;

    /// Accepts connections and answers every `set` with `reply`, returning
    /// the received `(key, value)` pairs once `expected` have arrived.
    async fn fake_memcached(
        reply: &'static str,
        expected: usize,
    ) -> (String, tokio::task::JoinHandle<Vec<(String, Vec<u8>)>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let mut received = Vec::new();
            while received.len() < expected {
                let (socket, _) = listener.accept().await.unwrap();
                let mut reader = BufReader::new(socket);
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).await.unwrap() == 0 {
                        break;
                    }
                    let parts: Vec<_> = header.split_whitespace().collect();
                    assert_eq!(parts[0], "set");
                    let len: usize = parts[4].parse().unwrap();
                    let mut value = vec![0; len + 2];
                    reader.read_exact(&mut value).await.unwrap();
                    value.truncate(len);
                    received.push((parts[1].to_string(), value));
                    reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
                    if received.len() == expected {
                        break;
                    }
                }
            }
            received
        });

        (addr, handle)
    }

    #[tokio::test]
    async fn put_sends_set_and_accepts_stored() {
        let (addr, server) = fake_memcached("STORED\r\n", 2).await;
        let client = MemcacheClient::new(addr, Duration::from_secs(3));

        client.put("idfa:1", b"\x08\x01").await.unwrap();
        client.put("idfa:2", b"").await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received[0], ("idfa:1".to_string(), b"\x08\x01".to_vec()));
        assert_eq!(received[1], ("idfa:2".to_string(), Vec::new()));
    }

    #[tokio::test]
    async fn put_reuses_idle_connection() {
        let (addr, server) = fake_memcached("STORED\r\n", 3).await;
        let client = MemcacheClient::new(addr, Duration::from_secs(3));

        for key in ["a:1", "a:2", "a:3"] {
            client.put(key, b"v").await.unwrap();
        }

        // the fake server only handles a second connection once the first
        // closes, so three writes on one socket prove reuse
        assert_eq!(server.await.unwrap().len(), 3);
        assert_eq!(client.idle.lock().len(), 1);
    }

    #[tokio::test]
    async fn non_stored_reply_is_an_error() {
        let (addr, _server) = fake_memcached("SERVER_ERROR out of memory\r\n", 1).await;
        let client = MemcacheClient::new(addr, Duration::from_secs(3));

        let err = client.put("gaid:1", b"v").await.unwrap_err();
        assert!(matches!(err, Error::Store { reason, .. } if reason == "SERVER_ERROR out of memory"));
        assert!(client.idle.lock().is_empty());
    }

    #[tokio::test]
    async fn unreachable_address_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = MemcacheClient::new(addr, Duration::from_secs(3));
        assert!(client.put("adid:1", b"v").await.is_err());
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let client = MemcacheClient::new(addr, Duration::from_millis(100));
        let err = client.put("dvid:1", b"v").await.unwrap_err();
        assert!(matches!(err, Error::Timeout { op: "set", .. }));
    }

    #[tokio::test]
    async fn malformed_keys_are_rejected_before_connecting() {
        let client = MemcacheClient::new("127.0.0.1:1", Duration::from_secs(3));

        let long = "k".repeat(MAX_KEY_LEN + 1);
        for key in ["", "idfa:has space", "idfa:tab\there", long.as_str()] {
            let err = client.put(key, b"v").await.unwrap_err();
            assert!(matches!(err, Error::MalformedKey { .. }), "{key:?}");
        }
    }
}
