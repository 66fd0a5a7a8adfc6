//! Line-delimited JSON over TCP.
//!
//! Each connection is served by its own task. Frames from one connection are
//! handled in order; the blocking admission wait runs on tokio's blocking
//! pool so it never stalls the reactor.

use crate::error::{ServerError, ServerResult};
use crate::protocol::Response;
use crate::server::{Session, VersionServer};
use parking_lot::Mutex;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Binds the configured address and serves until Ctrl-C.
pub async fn run(server: Arc<VersionServer>) -> ServerResult<()> {
    let listener = TcpListener::bind(server.config().bind_addr).await?;
    serve(server, listener, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
        }
    })
    .await
}

/// Accepts connections on `listener` until `shutdown` resolves.
pub async fn serve<F>(server: Arc<VersionServer>, listener: TcpListener, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()>,
{
    info!(addr = %listener.local_addr()?, "versionbase listening");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let server = Arc::clone(&server);
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(server, stream, peer).await {
                                warn!(%peer, error = %err, "connection failed");
                            }
                        });
                    }
                    Err(err) => error!(error = %err, "accept failed"),
                }
            }

            () = &mut shutdown => {
                info!("versionbase shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn handle_connection(
    server: Arc<VersionServer>,
    stream: TcpStream,
    peer: SocketAddr,
) -> ServerResult<()> {
    info!(%peer, "client connected");
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let session = Arc::new(Mutex::new(Session::new()));

    let outcome = serve_frames(&server, &mut reader, &mut writer, &session, peer).await;

    let _ = writer.shutdown().await;
    // still populated if a frame task failed
    let session = std::mem::take(&mut *session.lock());
    let cleanup = Arc::clone(&server);
    tokio::task::spawn_blocking(move || cleanup.end_session(session))
        .await
        .map_err(|err| ServerError::Internal(err.to_string()))?;
    info!(%peer, "client disconnected");
    outcome
}

async fn serve_frames<R, W>(
    server: &Arc<VersionServer>,
    reader: &mut R,
    writer: &mut W,
    session: &Arc<Mutex<Session>>,
    peer: SocketAddr,
) -> ServerResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let max_frame_len = server.config().max_frame_len;
    let close_on_error = server.config().close_on_error;

    loop {
        let mut frame = Vec::new();
        let read = (&mut *reader)
            .take(max_frame_len as u64 + 1)
            .read_until(b'\n', &mut frame)
            .await?;
        if read == 0 {
            return Ok(());
        }
        if frame.len() > max_frame_len && frame.last() != Some(&b'\n') {
            let err = ServerError::Protocol(format!("frame exceeds {max_frame_len} bytes"));
            write_response(writer, &Response::error("", &err)).await?;
            return Err(err);
        }
        if frame.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let handler = Arc::clone(server);
        let session = Arc::clone(session);
        let response = tokio::task::spawn_blocking(move || {
            handler.handle_frame(&frame, &mut session.lock())
        })
        .await
        .map_err(|err| ServerError::Internal(err.to_string()))?;

        write_response(writer, &response).await?;
        if !response.is_ok() && close_on_error {
            debug!(%peer, "closing connection after error response");
            return Ok(());
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &Response) -> ServerResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
