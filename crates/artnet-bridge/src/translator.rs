//! HTTP request → ArtDmx packet translation.
//!
//! Every request is validated in full before the transport is touched, so a
//! rejected request never consumes a sequence number or sends a datagram.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use dmx_protocol::error::EncodingError;
use dmx_protocol::packets::{slots_from_ints, ChannelWrite};
use dmx_protocol::{DEFAULT_CHANNEL, DEFAULT_UNIVERSE, DMX_MAX_SLOTS};

use crate::transport::{DmxTransport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {param} {value:?}: {reason}")]
    BadAddressing {
        param: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("bad request body: {0}")]
    BadBody(String),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BridgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Encoding failures here always come from client-supplied values
            Self::Validation(_) | Self::Encoding(_) => StatusCode::BAD_REQUEST,
            Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// What went out on the wire for a successful request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub universe: u16,
    pub channel: u16,
    pub sequence: u8,
    pub value_count: usize,
}

pub struct Translator<T> {
    transport: Arc<T>,
    verbose: bool,
}

impl<T: DmxTransport> Translator<T> {
    pub fn new(transport: Arc<T>, verbose: bool) -> Self {
        Self { transport, verbose }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Validate one request and send it as exactly one ArtDmx packet.
    pub async fn translate(
        &self,
        universe: Option<&str>,
        channel: Option<&str>,
        body: &[u8],
    ) -> Result<Delivery, BridgeError> {
        let write = match parse_request(universe, channel, body) {
            Ok(write) => write,
            Err(e) => {
                if self.verbose {
                    info!(error = %e, body = %String::from_utf8_lossy(body), "Rejected request");
                } else {
                    debug!(error = %e, "Rejected request");
                }
                return Err(e);
            }
        };

        if self.verbose {
            info!(
                universe = write.universe,
                channel = write.channel,
                values = ?write.values,
                "Forwarding channel update"
            );
        } else {
            debug!(
                universe = write.universe,
                channel = write.channel,
                count = write.values.len(),
                "Forwarding channel update"
            );
        }

        match self.transport.send(&write).await {
            Ok(sequence) => Ok(Delivery {
                universe: write.universe,
                channel: write.channel,
                sequence,
                value_count: write.values.len(),
            }),
            Err(e) => {
                error!(
                    universe = write.universe,
                    channel = write.channel,
                    error = %e,
                    "Failed to send ArtDmx packet"
                );
                Err(e.into())
            }
        }
    }
}

/// Turn route parameters and a raw body into a validated write.
pub fn parse_request(
    universe: Option<&str>,
    channel: Option<&str>,
    body: &[u8],
) -> Result<ChannelWrite, BridgeError> {
    let universe = parse_universe(universe)?;
    let channel = parse_channel(channel)?;
    let values = slots_from_ints(&parse_body(body)?)?;
    Ok(ChannelWrite::new(universe, channel, values)?)
}

fn parse_universe(param: Option<&str>) -> Result<u16, ValidationError> {
    match param {
        None => Ok(DEFAULT_UNIVERSE),
        Some(raw) => raw.parse().map_err(|_| ValidationError::BadAddressing {
            param: "universe",
            value: raw.to_string(),
            reason: "expected an integer in 0..=65535",
        }),
    }
}

fn parse_channel(param: Option<&str>) -> Result<u16, ValidationError> {
    let Some(raw) = param else {
        return Ok(DEFAULT_CHANNEL);
    };

    let bad = |reason| ValidationError::BadAddressing {
        param: "channel",
        value: raw.to_string(),
        reason,
    };

    let channel: u16 = raw.parse().map_err(|_| bad("expected an integer"))?;
    if channel == 0 || channel as usize > DMX_MAX_SLOTS {
        return Err(bad("channels are numbered 1..=512"));
    }
    Ok(channel)
}

/// The body must be a non-empty JSON array of integers. Range checking is
/// left to [`slots_from_ints`] so the offending index is reported.
fn parse_body(body: &[u8]) -> Result<Vec<i128>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::BadBody("body is missing".into()));
    }

    let json: Value = serde_json::from_slice(body)
        .map_err(|e| ValidationError::BadBody(format!("invalid JSON: {e}")))?;

    let Value::Array(items) = json else {
        return Err(ValidationError::BadBody("expected a JSON array".into()));
    };
    if items.is_empty() {
        return Err(ValidationError::BadBody("array is empty".into()));
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            // Integers above i64::MAX only fit as u64
            item.as_i64()
                .map(i128::from)
                .or_else(|| item.as_u64().map(i128::from))
                .ok_or_else(|| ValidationError::BadBody(format!("element {i} is not an integer: {item}")))
        })
        .collect()
}
