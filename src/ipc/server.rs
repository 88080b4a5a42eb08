//! IPC server implementation.

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

use super::types::RequestFrame;
use crate::bridge::{RequestEnvelope, ResponseEnvelope};

/// Trait for answering channel requests.
pub trait ChannelHandler: Send + Sync + 'static {
    /// Handles one request. Must always produce a response.
    fn handle(&self, request: RequestEnvelope) -> impl Future<Output = ResponseEnvelope> + Send;
}

/// Server that reads request frames line by line and writes one response
/// envelope per line.
///
/// Every frame is handled on its own task, so responses may be written out
/// of request order; the UI correlates them by id.
pub struct IpcServer<H: ChannelHandler> {
    handler: Arc<H>,
}

impl<H: ChannelHandler> IpcServer<H> {
    /// Creates a server dispatching to `handler`.
    pub const fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Runs the server over the process's stdin and stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or stdout cannot be written.
    pub async fn run_stdio(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.run(stdin, tokio::io::stdout()).await
    }

    /// Serves frames from `reader` until EOF, then waits for in-flight
    /// requests and for every response to be written. Reading also stops
    /// once the writer has failed.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the writer is closed.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!("IPC server starting, waiting for requests on stdin");

        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_responses(rx, writer));
        let mut in_flight = JoinSet::new();

        let mut lines = reader.lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read from stdin")?,
                () = tx.closed() => {
                    warn!("Response writer stopped, no longer reading requests");
                    break;
                }
            };
            let Some(line) = line else {
                info!("IPC server shutting down (stdin closed)");
                break;
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            trace!("Received: {}", line);

            match serde_json::from_str::<RequestFrame>(line) {
                Ok(frame) => {
                    let handler = self.handler.clone();
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        let response = handler.handle(frame.into_request()).await;
                        if let Err(unsent) = tx.send(response) {
                            warn!("Dropped response {}: writer stopped", unsent.0.id);
                        }
                    });
                }
                Err(e) => {
                    warn!("Malformed request frame: {e}");
                    let rejected = ResponseEnvelope::rejected(format!("Malformed request: {e}"));
                    if let Err(unsent) = tx.send(rejected) {
                        warn!("Dropped response {}: writer stopped", unsent.0.id);
                    }
                }
            }

            while let Some(finished) = in_flight.try_join_next() {
                if let Err(e) = finished {
                    error!("Request task failed: {e}");
                }
            }
        }

        while let Some(finished) = in_flight.join_next().await {
            if let Err(e) = finished {
                error!("Request task failed: {e}");
            }
        }
        drop(tx);

        writer_task.await.context("Response writer panicked")?
    }
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<ResponseEnvelope>,
    mut writer: W,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let response_json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode response {}: {e}", response.id);
                continue;
            }
        };
        trace!("Sending: {}", response_json);
        writer
            .write_all(response_json.as_bytes())
            .await
            .context("Failed to write to stdout")?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        debug!("Response {} written", response.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    struct EchoHandler;

    impl ChannelHandler for EchoHandler {
        async fn handle(&self, request: RequestEnvelope) -> ResponseEnvelope {
            match request.channel.as_str() {
                "echo" => ResponseEnvelope::success(&request, request.payload.clone()),
                "slow" => {
                    tokio::task::yield_now().await;
                    tokio::task::yield_now().await;
                    ResponseEnvelope::success(&request, json!("slow"))
                }
                other => ResponseEnvelope::failure(&request, format!("no channel {other}")),
            }
        }
    }

    async fn serve(input: &str) -> Result<Vec<Value>> {
        let server = IpcServer::new(Arc::new(EchoHandler));
        let (writer, mut output) = tokio::io::duplex(64 * 1024);

        server.run(input.as_bytes(), writer).await?;

        let mut raw = String::new();
        output.read_to_string(&mut raw).await?;
        raw.lines()
            .map(|line| serde_json::from_str(line).context("response is not JSON"))
            .collect()
    }

    fn by_id<'a>(responses: &'a [Value], id: &str) -> Option<&'a Value> {
        responses.iter().find(|r| r["id"] == id)
    }

    #[tokio::test]
    async fn test_every_frame_gets_one_response() -> Result<()> {
        let input = concat!(
            r#"{"id":"1","channel":"echo","data":{"n":1}}"#,
            "\n\n",
            r#"{"id":"2","channel":"nope"}"#,
            "\n",
            r#"{"channel":"echo","data":"anon"}"#,
            "\n"
        );

        let responses = serve(input).await?;

        assert_eq!(responses.len(), 3);
        assert_eq!(
            by_id(&responses, "1").map(|r| &r["data"]),
            Some(&json!({"n": 1}))
        );
        assert_eq!(
            by_id(&responses, "2").map(|r| &r["error"]),
            Some(&json!("no channel nope"))
        );
        let anon = responses
            .iter()
            .find(|r| r["data"] == "anon")
            .context("missing anonymous response")?;
        assert!(anon["id"].as_str().is_some_and(|id| !id.is_empty()));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_frame_is_answered() -> Result<()> {
        let responses = serve("{not json\n{\"id\":\"ok\",\"channel\":\"echo\"}\n").await?;

        assert_eq!(responses.len(), 2);
        let rejected = responses
            .iter()
            .find(|r| r["success"] == false)
            .context("missing rejection")?;
        assert!(
            rejected["error"]
                .as_str()
                .is_some_and(|e| e.starts_with("Malformed request"))
        );
        assert!(by_id(&responses, "ok").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_stops_reading_when_writer_fails() -> Result<()> {
        let server = IpcServer::new(Arc::new(EchoHandler));
        let (mut input, server_input) = tokio::io::duplex(1024);
        let (writer, output) = tokio::io::duplex(1024);
        drop(output);

        input
            .write_all(b"{\"id\":\"1\",\"channel\":\"echo\"}\n")
            .await?;

        // Input stays open; only the failed writer can end the loop.
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            server.run(tokio::io::BufReader::new(server_input), writer),
        )
        .await
        .context("server kept reading after the writer failed")?;

        assert!(result.is_err());
        drop(input);
        Ok(())
    }

    #[tokio::test]
    async fn test_in_flight_requests_finish_after_eof() -> Result<()> {
        let responses = serve(concat!(
            r#"{"id":"s","channel":"slow"}"#,
            "\n",
            r#"{"id":"e","channel":"echo","data":1}"#,
            "\n"
        ))
        .await?;

        assert_eq!(responses.len(), 2);
        assert_eq!(
            by_id(&responses, "s").map(|r| &r["data"]),
            Some(&json!("slow"))
        );
        Ok(())
    }
}
