//! Yellowstone gRPC stream transport
//!
//! The subscribe request is written once per stream, after it opens.
//! Stream completion is a normal end of the connection, not an error.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use yellowstone_grpc_client::{ClientTlsConfig, GeyserGrpcClient};
use yellowstone_grpc_proto::prelude::{
    subscribe_update::UpdateOneof, SubscribeRequest, SubscribeUpdate, SubscribeUpdateTransaction,
};

use super::{encode_stream_ping, encode_stream_request, ClosePolicy, SubscriptionSpec, Transport, TransportError};
use crate::normalizer::{RawEvent, StreamInstruction, StreamUpdate};

type RequestSink = Pin<Box<dyn Sink<SubscribeRequest, Error = TransportError> + Send>>;
type UpdateStream = Pin<Box<dyn Stream<Item = Result<SubscribeUpdate, TransportError>> + Send>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bidirectional Geyser subscription
pub struct GrpcTransport {
    endpoint: String,
    x_token: Option<SecretString>,
    spec: Arc<SubscriptionSpec>,
    sink: Option<RequestSink>,
    stream: Option<UpdateStream>,
}

impl GrpcTransport {
    pub fn new(
        endpoint: impl Into<String>,
        x_token: Option<SecretString>,
        spec: Arc<SubscriptionSpec>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            x_token,
            spec,
            sink: None,
            stream: None,
        }
    }
}

#[async_trait::async_trait]
impl Transport for GrpcTransport {
    fn name(&self) -> &'static str {
        "grpc"
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        let connect_err = |e: &dyn std::fmt::Display| TransportError::Connect(e.to_string());

        let mut builder = GeyserGrpcClient::build_from_shared(self.endpoint.clone())
            .map_err(|e| connect_err(&e))?
            .x_token(self.x_token.as_ref().map(|t| t.expose_secret().to_string()))
            .map_err(|e| connect_err(&e))?
            .connect_timeout(CONNECT_TIMEOUT);

        if self.endpoint.starts_with("https://") {
            builder = builder
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|e| connect_err(&e))?;
        }

        let mut client = builder.connect().await.map_err(|e| connect_err(&e))?;
        let (sink, stream) = client.subscribe().await.map_err(|e| connect_err(&e))?;

        let sink: RequestSink =
            Box::pin(sink.sink_map_err(|e| TransportError::Stream(e.to_string())));
        let stream: UpdateStream = Box::pin(
            stream.map(|item| item.map_err(|status| TransportError::Stream(status.to_string()))),
        );

        self.sink = Some(sink);
        self.stream = Some(stream);
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<(), TransportError> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| TransportError::Subscribe("stream not open".to_string()))?;

        sink.send(encode_stream_request(&self.spec))
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))?;

        tracing::debug!(
            filter = self.spec.filter_tag(),
            programs = self.spec.entries().len(),
            "Stream subscribe request sent"
        );
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<RawEvent>, TransportError> {
        loop {
            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| TransportError::Stream("stream not open".to_string()))?;

            let update = match stream.next().await {
                Some(Ok(update)) => update,
                Some(Err(e)) => return Err(e),
                None => return Ok(None),
            };

            match update.update_oneof {
                Some(UpdateOneof::Transaction(tx)) => {
                    match stream_update_from_proto(update.filters, tx) {
                        Some(parsed) => return Ok(Some(RawEvent::stream(parsed))),
                        None => tracing::debug!("Transaction update without message, skipping"),
                    }
                }
                Some(UpdateOneof::Ping(_)) => {
                    if let Some(sink) = self.sink.as_mut() {
                        sink.send(encode_stream_ping(1)).await?;
                    }
                }
                _ => {}
            }
        }
    }

    async fn close(&mut self) {
        self.stream = None;
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.close().await {
                tracing::debug!(error = %e, "Stream request sink close failed");
            }
        }
    }

    fn close_policy(&self) -> ClosePolicy {
        ClosePolicy::Terminate
    }
}

/// Flatten a Geyser transaction update into the fields the normalizer reads
pub fn stream_update_from_proto(
    filters: Vec<String>,
    update: SubscribeUpdateTransaction,
) -> Option<StreamUpdate> {
    let info = update.transaction?;
    let message = info.transaction.as_ref()?.message.as_ref()?;

    let signature = Signature::try_from(info.signature.as_slice())
        .map(|s| s.to_string())
        .unwrap_or_default();

    let account_keys: Vec<String> = message
        .account_keys
        .iter()
        .map(|key| {
            Pubkey::try_from(key.as_slice())
                .map(|k| k.to_string())
                .unwrap_or_default()
        })
        .collect();

    let instructions = message
        .instructions
        .iter()
        .filter_map(|ix| {
            account_keys
                .get(ix.program_id_index as usize)
                .map(|program_id| StreamInstruction {
                    program_id: program_id.clone(),
                    data: ix.data.clone(),
                })
        })
        .collect();

    let (log_messages, post_token_mints) = match info.meta {
        Some(meta) => (
            meta.log_messages,
            meta.post_token_balances.into_iter().map(|b| b.mint).collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    Some(StreamUpdate {
        filters,
        signature,
        slot: update.slot,
        log_messages,
        instructions,
        post_token_mints,
    })
}
