#![cfg(feature = "provider-zhinao")]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rprovider::adapters::zhinao::ZhinaoAdapter;
use rprovider::{
    AdapterError, AdapterErrorKind, AdapterFuture, ChannelConfig, ChatRequest, HttpTransport,
    ImageRequest, Message, ProviderAdapter, ProviderKind, RawByteStream, RequestInput,
};
use serde_json::{Value, json};

#[derive(Debug, Default)]
struct FakeTransport {
    response: Mutex<Option<Value>>,
    captured: Mutex<Vec<(String, HashMap<String, String>, Value)>>,
}

impl FakeTransport {
    fn with_response(response: Value) -> Self {
        Self {
            response: Mutex::new(Some(response)),
            ..Self::default()
        }
    }
}

impl HttpTransport for FakeTransport {
    fn post<'a>(
        &'a self,
        url: String,
        headers: HashMap<String, String>,
        body: Value,
    ) -> AdapterFuture<'a, Result<Value, AdapterError>> {
        Box::pin(async move {
            self.captured
                .lock()
                .expect("captured lock")
                .push((url, headers, body));

            self.response
                .lock()
                .expect("response lock")
                .take()
                .ok_or_else(|| AdapterError::transport("no canned response"))
        })
    }

    fn post_stream<'a>(
        &'a self,
        url: String,
        headers: HashMap<String, String>,
        body: Value,
    ) -> AdapterFuture<'a, Result<RawByteStream<'a>, AdapterError>> {
        Box::pin(async move {
            self.captured
                .lock()
                .expect("captured lock")
                .push((url, headers, body));
            Err(AdapterError::transport("streaming not exercised here"))
        })
    }
}

fn zhinao_channel() -> ChannelConfig {
    ChannelConfig::new("zhinao-main", ProviderKind::Zhinao, "https://api.360.example/v1")
        .with_secrets(vec!["zh-key".to_string()])
}

#[tokio::test]
async fn send_uses_bearer_auth_over_the_channel_endpoint() {
    let transport = Arc::new(FakeTransport::with_response(json!({
        "model": "360gpt-pro",
        "choices": [{
            "message": { "content": "zhinao reply" },
            "finish_reason": "stop"
        }]
    })));
    let adapter = ZhinaoAdapter::from_channel(transport.clone(), &zhinao_channel()).expect("build");
    assert_eq!(adapter.kind(), ProviderKind::Zhinao);

    let request = ChatRequest::from_messages("360gpt-pro", vec![Message::user("hi")]);
    let completion = adapter.send(request).await.expect("send");
    assert_eq!(completion.text, "zhinao reply");

    let captured = transport.captured.lock().expect("captured lock");
    let (url, headers, _) = &captured[0];
    assert_eq!(url, "https://api.360.example/v1/chat/completions");
    assert_eq!(headers.get("Authorization"), Some(&"Bearer zh-key".to_string()));
}

#[tokio::test]
async fn prompt_input_is_rejected_without_a_network_call() {
    let transport = Arc::new(FakeTransport::default());
    let adapter = ZhinaoAdapter::from_channel(transport.clone(), &zhinao_channel()).expect("build");

    let request = ChatRequest::new("360gpt-pro", RequestInput::Prompt("say hi".to_string()));
    let error = adapter.send(request).await.expect_err("prompt unsupported");
    assert_eq!(error.kind, AdapterErrorKind::InvalidRequest);
    assert_eq!(error.provider, Some(ProviderKind::Zhinao));
    assert!(transport.captured.lock().expect("captured lock").is_empty());
}

#[tokio::test]
async fn image_generation_reports_an_unsupported_capability() {
    let transport = Arc::new(FakeTransport::default());
    let adapter = ZhinaoAdapter::from_channel(transport, &zhinao_channel()).expect("build");

    let error = adapter
        .generate_image(ImageRequest::new("360gpt-pro", "a cat"))
        .await
        .expect_err("no image capability");
    assert_eq!(error.kind, AdapterErrorKind::Unsupported);
    assert_eq!(error.provider, Some(ProviderKind::Zhinao));
}

#[tokio::test]
async fn provider_errors_carry_the_zhinao_identity() {
    let transport = Arc::new(FakeTransport::with_response(json!({
        "error": { "message": "quota exhausted" }
    })));
    let adapter = ZhinaoAdapter::from_channel(transport, &zhinao_channel()).expect("build");

    let request = ChatRequest::from_messages("360gpt-pro", vec![Message::user("hi")]);
    let error = adapter.send(request).await.expect_err("provider error");
    assert_eq!(error.kind, AdapterErrorKind::Provider);
    assert_eq!(error.provider, Some(ProviderKind::Zhinao));
    assert_eq!(error.message, "quota exhausted");
}
