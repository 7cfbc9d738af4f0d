mod common;

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use common::{logged_in_session, session_for, spawn_server};
use rax_ftp_client::FtpClientError;
use rax_ftp_client::control::{ChannelState, Command, ControlChannel, TransferType};
use rax_ftp_client::error::{ControlError, NegotiationError, TransferError};
use rax_ftp_client::transfer::{Completion, DataMode, TransferRequest, TransferVerb};

#[tokio::test]
async fn login_sends_user_then_pass() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;
        conn.quit().await;
    })
    .await;

    let mut session = session_for(config);
    let login = session.connect("anonymous", "guest").await.unwrap();
    assert_eq!(login.greeting.code(), 220);
    assert_eq!(login.user.code(), 331);
    assert_eq!(login.pass.as_ref().map(|r| r.code()), Some(230));
    assert!(session.state().is_logged_in());
    assert_eq!(session.state().username(), Some("anonymous"));

    assert_eq!(session.close().await.unwrap().code(), 221);
    assert!(!session.is_connected());
    server.await.unwrap();
}

#[tokio::test]
async fn login_skips_pass_when_user_is_enough() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.expect("USER anonymous").await;
        conn.reply("230 No password needed").await;
        conn.quit().await;
    })
    .await;

    let mut session = session_for(config);
    let login = session.connect("anonymous", "guest").await.unwrap();
    assert!(login.pass.is_none());
    assert!(login.is_logged_in());
    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn refused_login_is_reported_not_raised() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.expect("USER anonymous").await;
        conn.reply("331 Password required").await;
        conn.expect("PASS guest").await;
        conn.reply("530 Login incorrect").await;
        conn.quit().await;
    })
    .await;

    let mut session = session_for(config);
    let login = session.connect("anonymous", "guest").await.unwrap();
    assert!(!login.is_logged_in());
    assert!(!session.state().is_logged_in());
    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn passive_upload_sends_every_byte_and_prepares_next_connection() {
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let (config, server) = spawn_server(move |mut conn| async move {
        conn.login().await;

        let listener = conn.passive().await;
        conn.expect("STOR upload.bin").await;
        let (mut data, _) = listener.accept().await.unwrap();
        conn.reply("150 Opening data connection").await;
        let mut received = Vec::new();
        data.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, expected);
        conn.reply("226 Transfer complete").await;

        let _next = conn.passive().await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    let result = session.store("upload.bin", &mut payload.as_slice()).await.unwrap();

    assert_eq!(result.bytes, 10_000);
    assert_eq!(result.preliminary.code(), 150);
    assert_eq!(result.final_reply.code(), 226);
    assert!(result.is_success());
    assert!(result.completion.is_none());
    assert!(session.has_data_connection());

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn passive_upload_uses_connection_prepared_by_pasv() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;

        let listener = conn.passive().await;
        conn.expect("STOR notes.txt").await;
        let (mut data, _) = listener.accept().await.unwrap();
        conn.reply("150 Ok to send data").await;
        let mut received = String::new();
        data.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "hello");
        conn.reply("226 Transfer complete").await;

        let _next = conn.passive().await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    let endpoint = session.enter_passive_mode().await.unwrap();
    assert_eq!(endpoint.ip.to_string(), "127.0.0.1");
    assert!(session.has_data_connection());

    let result = session.store("notes.txt", &mut "hello".as_bytes()).await.unwrap();
    assert_eq!(result.bytes, 5);

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn active_upload_waits_for_server_connection() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;

        let target = conn.port().await;
        assert_eq!(target.ip().to_string(), "127.0.0.1");
        conn.expect("STOR active.txt").await;
        let mut data = TcpStream::connect(target).await.unwrap();
        conn.reply("150 Opening data connection").await;
        let mut received = Vec::new();
        data.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"active payload");
        conn.reply("226 Transfer complete").await;

        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    session.enter_active_mode();
    assert_eq!(session.mode(), DataMode::Active);

    let result = session
        .store("active.txt", &mut "active payload".as_bytes())
        .await
        .unwrap();
    assert_eq!(result.bytes, 14);
    assert!(result.is_success());
    assert!(!session.has_data_connection());

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn append_runs_in_the_mode_given_by_the_caller() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;

        let target = conn.port().await;
        conn.expect("APPE log.txt").await;
        let mut data = TcpStream::connect(target).await.unwrap();
        conn.reply("150 Appending").await;
        let mut received = Vec::new();
        data.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"line\n");
        conn.reply("226 Appended").await;

        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    assert_eq!(session.mode(), DataMode::Passive);

    let request = TransferRequest::new(TransferVerb::APPE, "log.txt");
    let result = session
        .upload(&request, DataMode::Active, &mut "line\n".as_bytes())
        .await
        .unwrap();
    assert!(result.is_success());
    assert_eq!(session.mode(), DataMode::Passive);

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn refused_upload_reports_final_reply() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;

        let _listener = conn.passive().await;
        conn.expect("STOR secret.txt").await;
        conn.reply("553 Permission denied").await;

        let _next = conn.passive().await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    let result = session.store("secret.txt", &mut "x".as_bytes()).await.unwrap();
    assert_eq!(result.final_reply.code(), 553);
    assert!(!result.is_success());

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn download_ends_when_server_closes_data_connection() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;

        let listener = conn.passive().await;
        conn.expect("RETR report.csv").await;
        let (mut data, _) = listener.accept().await.unwrap();
        conn.reply("150 Opening BINARY mode data connection").await;
        data.write_all(b"a,b,c\n1,2,3\n").await.unwrap();
        drop(data);
        conn.reply("226 Transfer complete").await;

        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    let mut sink = Vec::new();
    let result = session.retrieve("report.csv", &mut sink).await.unwrap();

    assert_eq!(sink, b"a,b,c\n1,2,3\n");
    assert_eq!(result.bytes, 12);
    assert_eq!(result.completion, Some(Completion::PeerClosed));
    assert!(result.is_success());

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn download_ends_after_inactivity_window() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;

        let listener = conn.passive().await;
        conn.expect("RETR stalled.bin").await;
        let (mut data, _) = listener.accept().await.unwrap();
        conn.reply("150 Opening data connection").await;
        data.write_all(b"partial").await.unwrap();
        conn.reply("226 Transfer complete").await;

        // The data connection stays open; the client gives up on its own.
        conn.quit().await;
        drop(data);
    })
    .await;

    let mut session = logged_in_session(config).await;
    let mut sink = Vec::new();
    let result = session.retrieve("stalled.bin", &mut sink).await.unwrap();

    assert_eq!(sink, b"partial");
    assert_eq!(result.completion, Some(Completion::InactivityTimeout));
    assert_eq!(result.final_reply.code(), 226);

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn list_collects_listing_and_renegotiates_passive() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;

        let listener = conn.passive().await;
        conn.expect("LIST /pub").await;
        let (mut data, _) = listener.accept().await.unwrap();
        conn.reply("150 Here comes the directory listing").await;
        data.write_all(b"-rw-r--r-- 1 ftp ftp 12 readme.txt\r\n")
            .await
            .unwrap();
        drop(data);
        conn.reply("226 Directory send OK").await;

        let _next = conn.passive().await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    let (result, listing) = session.list_to_string("/pub").await.unwrap();

    assert_eq!(listing, "-rw-r--r-- 1 ftp ftp 12 readme.txt\r\n");
    assert_eq!(result.final_reply.code(), 226);
    assert!(session.has_data_connection());

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn refused_rnfr_skips_rnto() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;
        conn.expect("RNFR missing.txt").await;
        conn.reply("550 No such file").await;
        // RNTO must not follow.
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    let result = session.rename("missing.txt", "other.txt").await.unwrap();
    assert_eq!(result.from_reply.code(), 550);
    assert!(result.to_reply.is_none());
    assert!(!result.is_success());

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn rename_sends_rnto_after_350() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;
        conn.expect("RNFR old.txt").await;
        conn.reply("350 Ready for RNTO").await;
        conn.expect("RNTO new.txt").await;
        conn.reply("250 Rename successful").await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    let result = session.rename("old.txt", "new.txt").await.unwrap();
    assert!(result.is_success());

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn noop_leaves_session_state_unchanged() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;
        for _ in 0..3 {
            conn.expect("NOOP").await;
            conn.reply("200 NOOP ok").await;
        }
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    let before = session.state().clone();
    for _ in 0..3 {
        assert_eq!(session.noop().await.unwrap().code(), 200);
    }
    assert_eq!(session.state(), &before);

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_pasv_reply_keeps_session_usable() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;
        conn.expect("PASV").await;
        conn.reply("227 Entering Passive Mode").await;
        conn.expect("TYPE I").await;
        conn.reply("200 Switching to Binary mode").await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    let err = session.enter_passive_mode().await.unwrap_err();
    assert!(matches!(
        err,
        FtpClientError::Negotiation(NegotiationError::MalformedPasvReply(_))
    ));
    assert!(!session.has_data_connection());

    assert_eq!(session.set_type(TransferType::Image).await.unwrap().code(), 200);
    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn abort_drops_prepared_data_connection() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;
        let _listener = conn.passive().await;
        conn.expect("ABOR").await;
        conn.reply("226 Abort successful").await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    session.enter_passive_mode().await.unwrap();
    assert!(session.has_data_connection());

    assert_eq!(session.abort().await.unwrap().code(), 226);
    assert!(!session.has_data_connection());

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn multi_line_feat_reply_is_read_whole() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;
        conn.expect("FEAT").await;
        conn.reply("211-Features:").await;
        conn.reply(" PASV").await;
        conn.reply(" UTF8").await;
        conn.reply("211 End").await;
        conn.expect("NOOP").await;
        conn.reply("200 NOOP ok").await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    let feat = session.feat().await.unwrap();
    assert_eq!(feat.code(), 211);
    assert_eq!(feat.lines().len(), 4);
    assert_eq!(feat.status_line(), "211 End");

    // The next reply belongs to the next command.
    assert_eq!(session.noop().await.unwrap().code(), 200);

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn directory_commands_track_working_path() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;
        conn.expect("PWD").await;
        conn.reply("257 \"/home/ftp\" is the current directory").await;
        conn.expect("CWD pub").await;
        conn.reply("250 Directory successfully changed").await;
        conn.expect("CWD missing").await;
        conn.reply("550 Failed to change directory").await;
        conn.expect("CDUP").await;
        conn.reply("250 Directory successfully changed").await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    session.print_working_directory().await.unwrap();
    assert_eq!(session.working_path(), "/home/ftp");

    session.change_directory("pub").await.unwrap();
    assert_eq!(session.working_path(), "/home/ftp/pub");

    let refused = session.change_directory("missing").await.unwrap();
    assert!(refused.is_negative());
    assert_eq!(session.working_path(), "/home/ftp/pub");

    session.change_to_parent().await.unwrap();
    assert_eq!(session.working_path(), "/home/ftp");

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn rein_returns_session_to_initial_state() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;
        conn.expect("CWD pub").await;
        conn.reply("250 Okay").await;
        conn.expect("REIN").await;
        conn.reply("220 Service ready for new user").await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    session.enter_active_mode();
    session.change_directory("pub").await.unwrap();

    session.rein().await.unwrap();
    assert!(!session.state().is_logged_in());
    assert_eq!(session.mode(), DataMode::Passive);
    assert_eq!(session.working_path(), "/");

    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn second_command_while_awaiting_reply_is_refused() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.expect("NOOP").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        conn.reply("200 NOOP ok").await;
    })
    .await;

    let (mut control, greeting) = ControlChannel::connect(&config.host, config.control_port)
        .await
        .unwrap();
    assert_eq!(greeting.code(), 220);

    control.send_command(&Command::NOOP).await.unwrap();
    assert_eq!(control.state(), ChannelState::AwaitingResponse);
    let err = control.send_command(&Command::NOOP).await.unwrap_err();
    assert!(matches!(err, ControlError::CommandOutstanding(_)));

    assert_eq!(control.read_reply().await.unwrap().code(), 200);
    assert_eq!(control.state(), ChannelState::Idle);
    server.await.unwrap();
}

#[tokio::test]
async fn active_accept_timeout_after_150_reads_final_reply() {
    let (mut config, server) = spawn_server(|mut conn| async move {
        conn.login().await;

        let _target = conn.port().await;
        conn.expect("STOR unreachable.txt").await;
        conn.reply("150 Opening data connection").await;
        // Never connects; gives up after the client's accept window.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        conn.reply("425 Can't open data connection").await;

        conn.expect("NOOP").await;
        conn.reply("200 NOOP ok").await;
        conn.quit().await;
    })
    .await;
    config.accept_timeout_secs = 1;

    let mut session = logged_in_session(config).await;
    session.enter_active_mode();

    let err = session
        .store("unreachable.txt", &mut "data".as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FtpClientError::Transfer(TransferError::Negotiation(NegotiationError::AcceptTimeout(_)))
    ));

    assert_eq!(session.noop().await.unwrap().code(), 200);
    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn active_upload_refused_with_425_keeps_channel_usable() {
    let (mut config, server) = spawn_server(|mut conn| async move {
        conn.login().await;

        let _target = conn.port().await;
        conn.expect("STOR refused.txt").await;
        conn.reply("425 Can't open data connection").await;

        conn.expect("NOOP").await;
        conn.reply("200 NOOP ok").await;
        conn.quit().await;
    })
    .await;
    config.accept_timeout_secs = 1;

    let mut session = logged_in_session(config).await;
    session.enter_active_mode();

    let err = session
        .store("refused.txt", &mut "data".as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FtpClientError::Transfer(TransferError::Negotiation(NegotiationError::AcceptTimeout(_)))
    ));

    assert_eq!(session.noop().await.unwrap().code(), 200);
    session.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_reply_returns_channel_to_idle() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.expect("NOOP").await;
        conn.reply("garbage without code").await;
        conn.expect("NOOP").await;
        conn.reply("200 NOOP ok").await;
    })
    .await;

    let (mut control, _) = ControlChannel::connect(&config.host, config.control_port)
        .await
        .unwrap();

    let err = control.execute(&Command::NOOP).await.unwrap_err();
    assert!(matches!(err, ControlError::MalformedReply(_)));
    assert_eq!(control.state(), ChannelState::Idle);

    assert_eq!(control.execute(&Command::NOOP).await.unwrap().code(), 200);
    server.await.unwrap();
}

#[tokio::test]
async fn cwd_to_parent_resolves_working_path() {
    let (config, server) = spawn_server(|mut conn| async move {
        conn.login().await;
        conn.expect("CWD /pub/docs").await;
        conn.reply("250 Okay").await;
        conn.expect("CWD ..").await;
        conn.reply("250 Okay").await;
        conn.expect("CWD ./incoming").await;
        conn.reply("250 Okay").await;
        conn.quit().await;
    })
    .await;

    let mut session = logged_in_session(config).await;
    session.change_directory("/pub/docs").await.unwrap();
    session.change_directory("..").await.unwrap();
    assert_eq!(session.working_path(), "/pub");
    session.change_directory("./incoming").await.unwrap();
    assert_eq!(session.working_path(), "/pub/incoming");

    session.close().await.unwrap();
    server.await.unwrap();
}
