//! In-process SMTP server for transport tests.
//!
//! Speaks just enough of the protocol for `lettre`: greeting, EHLO with
//! `AUTH PLAIN LOGIN`, AUTH, MAIL, RCPT, DATA, NOOP, RSET and QUIT. Every
//! command line is recorded (AUTH payloads included) across all sessions.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Server behaviour knobs.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    /// Answer every AUTH with `535`.
    pub reject_auth: bool,
    /// Accept TCP connections but never greet.
    pub silent: bool,
}

/// Handle to a running [`FakeServer`].
#[derive(Debug, Clone)]
pub struct FakeServerHandle {
    pub port: u16,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeServerHandle {
    /// Every command line received so far, in arrival order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    /// Addresses from `RCPT TO` commands.
    pub fn recipients(&self) -> Vec<String> {
        self.commands()
            .iter()
            .filter_map(|c| c.strip_prefix("RCPT TO:"))
            .map(|rcpt| rcpt.trim_matches(['<', '>']).to_string())
            .collect()
    }
}

/// Bind to an ephemeral local port and serve until the runtime ends.
pub async fn spawn_server(behaviour: FakeServer) -> FakeServerHandle {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake smtp server");
    let port = listener.local_addr().expect("local addr").port();
    let handle = FakeServerHandle {
        port,
        commands: Arc::default(),
    };

    let server = handle.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let commands = Arc::clone(&server.commands);
            let behaviour = behaviour.clone();
            tokio::spawn(async move {
                if behaviour.silent {
                    // Hold the socket open without a greeting.
                    let _stream = stream;
                    std::future::pending::<()>().await;
                } else {
                    let _ = serve(stream, &behaviour, &commands).await;
                }
            });
        }
    });

    handle
}

async fn serve(
    stream: TcpStream,
    behaviour: &FakeServer,
    commands: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    write.write_all(b"220 fake.example.com ESMTP ready\r\n").await?;

    let mut in_data = false;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let line = line.trim_end();
        if in_data {
            if line == "." {
                in_data = false;
                write.write_all(b"250 2.0.0 queued\r\n").await?;
            }
            continue;
        }
        commands.lock().push(line.to_string());

        let verb = line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        let reply: &[u8] = match verb.as_str() {
            "EHLO" | "HELO" => b"250-fake.example.com\r\n250 AUTH PLAIN LOGIN\r\n",
            "AUTH" if behaviour.reject_auth => {
                b"535 5.7.8 Error: authentication failed\r\n"
            }
            "AUTH" => b"235 2.7.0 Authentication successful\r\n",
            "DATA" => {
                in_data = true;
                b"354 End data with <CR><LF>.<CR><LF>\r\n"
            }
            "QUIT" => {
                write.write_all(b"221 2.0.0 Bye\r\n").await?;
                return Ok(());
            }
            _ => b"250 2.0.0 OK\r\n",
        };
        write.write_all(reply).await?;
    }
}
