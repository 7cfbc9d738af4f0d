//! Scripted loopback FTP server for the integration tests.
//!
//! Each test drives the server side by hand: expect a command line, write a
//! reply, open or accept data connections.

#![allow(dead_code)]

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use rax_ftp_client::ClientConfig;
use rax_ftp_client::FtpSession;
use rax_ftp_client::transfer::{DataEndpoint, encode_port};
use rax_ftp_client::utils::network::FixedAddrDiscovery;

/// Server end of one control connection.
pub struct ServerConn {
    reader: BufReader<TcpStream>,
}

impl ServerConn {
    /// Reads the next command line without its CRLF.
    pub async fn read_command(&mut self) -> String {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await.unwrap();
        assert!(n > 0, "client closed the control connection");
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Reads the next command line and checks it.
    pub async fn expect(&mut self, command: &str) {
        let line = self.read_command().await;
        assert_eq!(line, command);
    }

    /// Writes one reply line.
    pub async fn reply(&mut self, line: &str) {
        let stream = self.reader.get_mut();
        stream
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
        stream.flush().await.unwrap();
    }

    /// Answers USER/PASS with 331 then 230.
    pub async fn login(&mut self) {
        self.expect("USER anonymous").await;
        self.reply("331 Password required").await;
        self.expect("PASS guest").await;
        self.reply("230 Logged in").await;
    }

    /// Answers an expected PASV with a fresh loopback listener.
    pub async fn passive(&mut self) -> TcpListener {
        self.expect("PASV").await;
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (p1, p2) = encode_port(port);
        self.reply(&format!("227 Entering Passive Mode (127,0,0,1,{},{})", p1, p2))
            .await;
        listener
    }

    /// Reads an expected PORT command and returns the advertised endpoint.
    pub async fn port(&mut self) -> SocketAddr {
        let line = self.read_command().await;
        let argument = line.strip_prefix("PORT ").expect("PORT command");
        let fields: Vec<u8> = argument.split(',').map(|f| f.parse().unwrap()).collect();
        let endpoint = DataEndpoint::from_tuple(fields.try_into().unwrap());
        self.reply("200 PORT command successful").await;
        endpoint.socket_addr()
    }

    /// Answers QUIT.
    pub async fn quit(&mut self) {
        self.expect("QUIT").await;
        self.reply("221 Goodbye").await;
    }
}

/// Starts a one-connection server that greets with 220 and then runs
/// `script`. Returns a client configuration pointing at it.
pub async fn spawn_server<F, Fut>(script: F) -> (ClientConfig, JoinHandle<()>)
where
    F: FnOnce(ServerConn) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut conn = ServerConn {
            reader: BufReader::new(stream),
        };
        conn.reply("220 Service ready").await;
        script(conn).await;
    });

    let config = ClientConfig {
        host: "127.0.0.1".to_string(),
        control_port: port,
        username: "anonymous".to_string(),
        password: "guest".to_string(),
        data_inactivity_timeout_ms: 300,
        accept_timeout_secs: 5,
        ..ClientConfig::default()
    };
    (config, handle)
}

/// A session whose active-mode address is the loopback interface.
pub fn session_for(config: ClientConfig) -> FtpSession {
    FtpSession::with_discovery(config, FixedAddrDiscovery(Ipv4Addr::LOCALHOST)).unwrap()
}

/// Connects and logs in as `anonymous` / `guest`.
pub async fn logged_in_session(config: ClientConfig) -> FtpSession {
    let mut session = session_for(config);
    let login = session.connect("anonymous", "guest").await.unwrap();
    assert!(login.is_logged_in());
    session
}
