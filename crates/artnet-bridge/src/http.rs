//! HTTP surface of the bridge.
//!
//! Endpoints:
//!   POST /                     — universe 0, starting at channel 1
//!   POST /:universe            — starting at channel 1
//!   POST /:universe/:channel
//!
//! Both parameterised routes also accept a trailing slash (`/2/`, `/4/12/`).
//!
//! The body is read as raw bytes rather than through `Json`, so a missing or
//! wrongly typed body gets the same 400 as any other malformed payload.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tracing::debug;

use crate::translator::{BridgeError, Delivery, Translator};
use crate::transport::DmxTransport;

pub fn build_router<T: DmxTransport>(translator: Arc<Translator<T>>) -> Router {
    Router::new()
        .route("/", post(post_default::<T>))
        .route("/:universe", post(post_universe::<T>))
        .route("/:universe/", post(post_universe::<T>))
        .route("/:universe/:channel", post(post_universe_channel::<T>))
        .route("/:universe/:channel/", post(post_universe_channel::<T>))
        .with_state(translator)
}

async fn post_default<T: DmxTransport>(
    State(translator): State<Arc<Translator<T>>>,
    body: Bytes,
) -> Response {
    let result = translator.translate(None, None, &body).await;
    respond(result, translator.verbose())
}

async fn post_universe<T: DmxTransport>(
    State(translator): State<Arc<Translator<T>>>,
    Path(universe): Path<String>,
    body: Bytes,
) -> Response {
    let result = translator.translate(Some(&universe), None, &body).await;
    respond(result, translator.verbose())
}

async fn post_universe_channel<T: DmxTransport>(
    State(translator): State<Arc<Translator<T>>>,
    Path((universe, channel)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let result = translator
        .translate(Some(&universe), Some(&channel), &body)
        .await;
    respond(result, translator.verbose())
}

/// Map a translation outcome to a response. Transport failure details are
/// only returned to the client in verbose mode; they are always logged.
fn respond(result: Result<Delivery, BridgeError>, verbose: bool) -> Response {
    match result {
        Ok(delivery) => {
            debug!(
                universe = delivery.universe,
                channel = delivery.channel,
                seq = delivery.sequence,
                count = delivery.value_count,
                "Request delivered"
            );
            (StatusCode::OK, "OK").into_response()
        }
        Err(BridgeError::Transport(_)) if !verbose => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
        Err(e) => (e.status(), e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use axum::body::to_bytes;
    use dmx_protocol::packets::ChannelWrite;

    use super::*;
    use crate::translator::tests::RecordingTransport;

    fn state(verbose: bool) -> (Arc<Translator<RecordingTransport>>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let translator = Arc::new(Translator::new(Arc::clone(&transport), verbose));
        (translator, transport)
    }

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_post_default_route() {
        let (translator, transport) = state(false);
        let resp = post_default(State(translator), Bytes::from_static(b"[255, 255, 255]")).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "OK");
        assert_eq!(
            transport.writes(),
            vec![ChannelWrite::new(0, 1, vec![255, 255, 255]).unwrap()]
        );
    }

    #[tokio::test]
    async fn test_post_universe_route() {
        let (translator, transport) = state(false);
        let resp = post_universe(
            State(translator),
            Path("2".to_string()),
            Bytes::from_static(b"[255,255,255]"),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(transport.writes()[0].universe, 2);
        assert_eq!(transport.writes()[0].channel, 1);
    }

    #[tokio::test]
    async fn test_post_universe_channel_route() {
        let (translator, transport) = state(false);
        let resp = post_universe_channel(
            State(translator),
            Path(("4".to_string(), "12".to_string())),
            Bytes::from_static(b"[0,0,0]"),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            transport.writes(),
            vec![ChannelWrite::new(4, 12, vec![0, 0, 0]).unwrap()]
        );
    }

    #[tokio::test]
    async fn test_bad_body_is_400_with_reason() {
        let (translator, transport) = state(false);
        let resp = post_default(State(translator), Bytes::from_static(b"not an array")).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("invalid JSON"));
        assert!(transport.writes().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_hides_detail_unless_verbose() {
        let (translator, transport) = state(false);
        transport.fail.store(true, Ordering::SeqCst);
        let resp = post_default(State(Arc::clone(&translator)), Bytes::from_static(b"[1]")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(resp).await, "Internal Server Error");

        let (translator, transport) = state(true);
        transport.fail.store(true, Ordering::SeqCst);
        let resp = post_default(State(Arc::clone(&translator)), Bytes::from_static(b"[1]")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(resp).await.contains("network is unreachable"));

        // The bridge keeps serving after a failed send
        transport.fail.store(false, Ordering::SeqCst);
        let resp = post_default(State(translator), Bytes::from_static(b"[1]")).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_router_serves_all_routes() {
        let (translator, transport) = state(false);
        let app = build_router(translator);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        for (path, body) in [("/", "[1,2,3]"), ("/0", "[1,2,3]"), ("/0/1", "[1,2,3]"), ("/4/12", "[0,0,0]")] {
            let status = raw_post(addr, path, body).await;
            assert_eq!(status, 200, "POST {path}");
        }
        for (path, body) in [("/2/", "[255,255,255]"), ("/4/12/", "[0,0,0]")] {
            let status = raw_post(addr, path, body).await;
            assert_eq!(status, 200, "POST {path}");
        }
        assert_eq!(raw_post(addr, "/", "not an array").await, 400);
        assert_eq!(raw_post(addr, "/x/1", "[1]").await, 400);

        let writes = transport.writes();
        assert_eq!(writes.len(), 6);
        assert_eq!(writes[0], writes[1]);
        assert_eq!(writes[1], writes[2]);
        assert_eq!(writes[3], ChannelWrite::new(4, 12, vec![0, 0, 0]).unwrap());
        assert_eq!(writes[4], ChannelWrite::new(2, 1, vec![255, 255, 255]).unwrap());
        assert_eq!(writes[5], writes[3]);
    }

    /// Minimal HTTP/1.1 client; returns the status code.
    async fn raw_post(addr: std::net::SocketAddr, path: &str, body: &str) -> u16 {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .unwrap()
    }
}
