use std::time::Duration;

use async_trait::async_trait;
use futures::{sink::SinkExt, stream::StreamExt};
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use yellowstone_grpc_client::{ClientTlsConfig, GeyserGrpcClient, Interceptor};
use yellowstone_grpc_proto::prelude::{subscribe_update::UpdateOneof, SubscribeRequest, SubscribeRequestPing};
use zeroize::Zeroizing;

use super::envelope::FilteredEnvelope;
use super::error::StreamError;
use super::request::SubscriptionRequest;
use crate::config::StreamConfig;

const MAX_DECODING_MESSAGE_SIZE: usize = 1024 * 1024 * 1024;
const FORWARD_BUFFER: usize = 1024;

/// An open subscription. `None` means the remote closed the stream.
#[async_trait]
pub trait Subscription: Send {
    async fn next_message(&mut self) -> Option<Result<FilteredEnvelope, StreamError>>;
}

#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn subscribe(&self, request: &SubscriptionRequest) -> Result<Box<dyn Subscription>, StreamError>;
}

/// Yellowstone Geyser gRPC transaction source.
pub struct GeyserSource {
    endpoint: String,
    x_token: Option<Zeroizing<String>>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl GeyserSource {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            x_token: config.x_token.clone(),
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
        }
    }

    async fn connect(&self) -> Result<GeyserGrpcClient<impl Interceptor>, StreamError> {
        let token = self.x_token.as_ref().map(|token| token.to_string());
        GeyserGrpcClient::build_from_shared(self.endpoint.clone())
            .map_err(|e| StreamError::InvalidEndpoint(e.to_string()))?
            .x_token(token)
            .map_err(|e| StreamError::InvalidEndpoint(e.to_string()))?
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(|e| StreamError::ConnectError(e.to_string()))?
            .max_decoding_message_size(MAX_DECODING_MESSAGE_SIZE)
            .connect()
            .await
            .map_err(|e| StreamError::ConnectError(e.to_string()))
    }
}

fn pong() -> SubscribeRequest {
    SubscribeRequest {
        ping: Some(SubscribeRequestPing { id: 1 }),
        ..Default::default()
    }
}

#[async_trait]
impl TransactionSource for GeyserSource {
    async fn subscribe(&self, request: &SubscriptionRequest) -> Result<Box<dyn Subscription>, StreamError> {
        let mut client = self.connect().await?;
        match client.get_version().await {
            Ok(version) => info!("Geyser node version: {}", version.version),
            Err(e) => warn!("Failed to read Geyser node version: {}", e),
        }

        let request = request.to_proto();
        let (tx, rx) = mpsc::channel(FORWARD_BUFFER);
        let (ready_tx, ready_rx) = oneshot::channel();

        // The client lives in the task for as long as its stream does.
        tokio::spawn(async move {
            let (mut sink, mut stream) = match client.subscribe_with_request(Some(request)).await {
                Ok(pair) => {
                    let _ = ready_tx.send(Ok(()));
                    pair
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(StreamError::SubscribeError(e.to_string())));
                    return;
                }
            };

            loop {
                let message = tokio::select! {
                    _ = tx.closed() => break,
                    message = stream.next() => message,
                };
                let update = match message {
                    Some(Ok(update)) => update,
                    Some(Err(status)) => {
                        let _ = tx.send(Err(StreamError::TransportError(status.to_string()))).await;
                        break;
                    }
                    None => break,
                };

                if matches!(update.update_oneof, Some(UpdateOneof::Ping(_))) {
                    if let Err(e) = sink.send(pong()).await {
                        let _ = tx.send(Err(StreamError::TransportError(e.to_string()))).await;
                        break;
                    }
                } else if let Some(envelope) = FilteredEnvelope::from_update(update) {
                    if tx.send(Ok(envelope)).await.is_err() {
                        break;
                    }
                } else {
                    debug!("Ignoring non-transaction update");
                }
            }
        });

        ready_rx
            .await
            .map_err(|_| StreamError::SubscribeError("subscription task ended".to_string()))??;
        Ok(Box::new(GeyserSubscription { rx }))
    }
}

struct GeyserSubscription {
    rx: mpsc::Receiver<Result<FilteredEnvelope, StreamError>>,
}

#[async_trait]
impl Subscription for GeyserSubscription {
    async fn next_message(&mut self) -> Option<Result<FilteredEnvelope, StreamError>> {
        self.rx.recv().await
    }
}
