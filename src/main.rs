//! RAX FTP Client - Entry Point
//!
//! Connects with the settings from `ftp-client.toml` / `FTP_CLIENT_*` and
//! runs one action:
//!
//! ```text
//! rax-ftp-client                     list the working directory
//! rax-ftp-client ls [PATH]           list PATH
//! rax-ftp-client get REMOTE LOCAL    download REMOTE into LOCAL
//! rax-ftp-client put LOCAL REMOTE    upload LOCAL to REMOTE
//! ```

use log::{error, info};
use std::process::ExitCode;
use tokio::fs::File;

use rax_ftp_client::utils::logging::setup_logging;
use rax_ftp_client::{ClientConfig, FtpClientError, FtpSession};

enum Action {
    List(String),
    Get { remote: String, local: String },
    Put { local: String, remote: String },
}

fn parse_action(args: &[String]) -> Option<Action> {
    match args {
        [] => Some(Action::List(String::new())),
        [cmd] if cmd == "ls" => Some(Action::List(String::new())),
        [cmd, path] if cmd == "ls" => Some(Action::List(path.clone())),
        [cmd, remote, local] if cmd == "get" => Some(Action::Get {
            remote: remote.clone(),
            local: local.clone(),
        }),
        [cmd, local, remote] if cmd == "put" => Some(Action::Put {
            local: local.clone(),
            remote: remote.clone(),
        }),
        _ => None,
    }
}

async fn run(config: ClientConfig, action: Action) -> Result<(), FtpClientError> {
    let username = config.username.clone();
    let password = config.password.clone();
    let mut session = FtpSession::new(config)?;

    let login = session.connect(&username, &password).await?;
    if !login.is_logged_in() {
        session.close().await?;
        return Ok(());
    }
    session.print_working_directory().await?;

    match action {
        Action::List(path) => {
            let (_, listing) = session.list_to_string(&path).await?;
            print!("{}", listing);
        }
        Action::Get { remote, local } => {
            let mut file = File::create(&local)
                .await
                .map_err(rax_ftp_client::error::TransferError::LocalIo)?;
            let result = session.retrieve(&remote, &mut file).await?;
            info!("{} -> {}: {}", remote, local, result.final_reply);
        }
        Action::Put { local, remote } => {
            let mut file = File::open(&local)
                .await
                .map_err(rax_ftp_client::error::TransferError::LocalIo)?;
            let result = session.store(&remote, &mut file).await?;
            info!("{} -> {}: {}", local, remote, result.final_reply);
        }
    }

    session.close().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(action) = parse_action(&args) else {
        eprintln!("usage: rax-ftp-client [ls [PATH] | get REMOTE LOCAL | put LOCAL REMOTE]");
        return ExitCode::from(2);
    };

    let config = match ClientConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Connecting to {}", config.control_socket());
    match run(config, action).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("FTP session failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
