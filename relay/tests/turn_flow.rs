use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use relay::{
    AdapterErrorKind, AdapterRegistry, ChannelConfig, ChatErrorKind, Conversation,
    ConversationGateway, InMemoryGateway, ProviderKind, Role, TurnForm, TurnRunner, collect_text,
};
use rprovider::{AdapterError, AdapterFuture, HttpTransport, RawByteStream};
use serde_json::{Value, json};

const REPLY_TEXT: &str = "Hello world!";

/// Deterministic backend: the streamed deltas concatenate to exactly the
/// non-streaming reply text.
#[derive(Debug, Default)]
struct FixtureTransport {
    refuse_images: bool,
    requests: Mutex<Vec<(String, Value)>>,
}

impl FixtureTransport {
    fn refusing() -> Self {
        Self {
            refuse_images: true,
            ..Self::default()
        }
    }
}

impl HttpTransport for FixtureTransport {
    fn post<'a>(
        &'a self,
        url: String,
        _headers: HashMap<String, String>,
        body: Value,
    ) -> AdapterFuture<'a, Result<Value, AdapterError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .expect("requests lock")
                .push((url.clone(), body));

            if url.contains("images/generations") {
                if self.refuse_images {
                    return Ok(json!({
                        "error": { "message": "Your request was rejected by our safety system." }
                    }));
                }

                return Ok(json!({ "data": [{ "url": "https://cdn.example/cat.png" }] }));
            }

            Ok(json!({
                "model": "gpt-4o-mini",
                "choices": [{
                    "message": { "content": REPLY_TEXT },
                    "finish_reason": "stop"
                }]
            }))
        })
    }

    fn post_stream<'a>(
        &'a self,
        url: String,
        _headers: HashMap<String, String>,
        body: Value,
    ) -> AdapterFuture<'a, Result<RawByteStream<'a>, AdapterError>> {
        Box::pin(async move {
            self.requests
                .lock()
                .expect("requests lock")
                .push((url, body));

            let chunks = vec![
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hello \"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"world!\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
                "data: [DONE]\n\n",
            ];

            let owned: Vec<Result<Vec<u8>, AdapterError>> = chunks
                .into_iter()
                .map(|chunk| Ok(chunk.as_bytes().to_vec()))
                .collect();

            Ok(Box::pin(futures_util::stream::iter(owned)) as RawByteStream<'a>)
        })
    }
}

fn fixture_runner(transport: Arc<FixtureTransport>) -> (TurnRunner, Arc<InMemoryGateway>) {
    let channel = ChannelConfig::new("main", ProviderKind::OpenAi, "https://api.openai.com/v1")
        .with_secrets(vec!["sk-test".to_string()])
        .with_models(vec![
            "gpt-4o-mini".to_string(),
            "dall-e-3".to_string(),
            "dall-e-2".to_string(),
        ]);

    let registry = AdapterRegistry::new(transport).with_channel(channel);
    let gateway = Arc::new(InMemoryGateway::new());
    (TurnRunner::new(registry, gateway.clone()), gateway)
}

#[tokio::test]
async fn run_turn_records_both_sides_and_persists() {
    let transport = Arc::new(FixtureTransport::default());
    let (runner, gateway) = fixture_runner(transport.clone());

    let mut conversation = Conversation::for_user(runner.gateway(), 11)
        .await
        .expect("create");
    let completion = runner
        .run_turn(
            &mut conversation,
            &TurnForm::new("Explain TCP").with_model("gpt-4o-mini"),
        )
        .await
        .expect("turn");

    assert_eq!(completion.text, REPLY_TEXT);
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation.messages()[0].role, Role::User);
    assert_eq!(conversation.messages()[1].role, Role::Assistant);
    assert_eq!(conversation.messages()[1].text(), REPLY_TEXT);
    assert_eq!(conversation.name(), "Explain TCP");

    let stored = gateway
        .load_conversation(11, conversation.id())
        .await
        .expect("load")
        .expect("persisted");
    assert_eq!(stored.len(), 2);

    let requests = transport.requests.lock().expect("requests lock");
    assert_eq!(requests.len(), 1);
    let (url, body) = &requests[0];
    assert!(url.ends_with("chat/completions"));
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["stream"], false);
}

#[tokio::test]
async fn streamed_deltas_concatenate_to_the_send_reply() {
    let transport = Arc::new(FixtureTransport::default());
    let (runner, _gateway) = fixture_runner(transport);

    let mut conversation = Conversation::anonymous();
    let frames = runner
        .stream_turn(
            &mut conversation,
            &TurnForm::new("Explain TCP").with_model("gpt-4o-mini"),
        )
        .await
        .expect("stream");

    let streamed = collect_text(frames).await.expect("drain");
    assert_eq!(streamed, REPLY_TEXT);

    runner
        .record_reply(&mut conversation, streamed)
        .await
        .expect("record");
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation.latest_text(), REPLY_TEXT);
}

#[tokio::test]
async fn context_window_bounds_the_provider_request() {
    let transport = Arc::new(FixtureTransport::default());
    let (runner, _gateway) = fixture_runner(transport.clone());

    let mut conversation = Conversation::anonymous();
    for text in ["one", "two", "three"] {
        runner
            .run_turn(
                &mut conversation,
                &TurnForm::new(text).with_model("gpt-4o-mini").with_context(2),
            )
            .await
            .expect("turn");
    }

    let requests = transport.requests.lock().expect("requests lock");
    let (_, last_body) = requests.last().expect("at least one request");
    let sent = last_body["messages"].as_array().expect("messages array");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1]["content"][0]["text"], "three");
}

#[tokio::test]
async fn unknown_models_fail_resolution_as_configuration_errors() {
    let transport = Arc::new(FixtureTransport::default());
    let (runner, _gateway) = fixture_runner(transport);

    let mut conversation = Conversation::anonymous();
    let error = runner
        .run_turn(
            &mut conversation,
            &TurnForm::new("hi").with_model("unrouted-model"),
        )
        .await
        .expect_err("unrouted model");

    assert_eq!(error.kind, ChatErrorKind::Provider);
    assert!(error.message.contains("unrouted-model"));
}

#[tokio::test]
async fn image_turns_render_markdown_and_pick_size_by_tier() {
    let transport = Arc::new(FixtureTransport::default());
    let (runner, _gateway) = fixture_runner(transport.clone());

    let mut conversation = Conversation::anonymous();
    conversation.set_model("dall-e-3");
    let reply = runner
        .generate_image(&conversation, "a cat")
        .await
        .expect("image");
    assert_eq!(reply, "![image](https://cdn.example/cat.png)");

    conversation.set_model("dall-e-2");
    runner
        .generate_image(&conversation, "a cat")
        .await
        .expect("image");

    let requests = transport.requests.lock().expect("requests lock");
    assert_eq!(requests[0].1["size"], "1024x1024");
    assert_eq!(requests[1].1["size"], "512x512");
}

#[tokio::test]
async fn safety_refusals_surface_as_the_reply_text() {
    let transport = Arc::new(FixtureTransport::refusing());
    let (runner, _gateway) = fixture_runner(transport);

    let mut conversation = Conversation::anonymous();
    conversation.set_model("dall-e-3");

    let reply = runner
        .generate_image(&conversation, "something disallowed")
        .await
        .expect("refusal is a successful reply");
    assert!(reply.contains("safety"));
}

#[tokio::test]
async fn adapter_errors_keep_their_provider_identity() {
    #[derive(Debug)]
    struct FailingTransport;

    impl HttpTransport for FailingTransport {
        fn post<'a>(
            &'a self,
            _url: String,
            _headers: HashMap<String, String>,
            _body: Value,
        ) -> AdapterFuture<'a, Result<Value, AdapterError>> {
            Box::pin(async move { Err(AdapterError::transport("connection refused")) })
        }

        fn post_stream<'a>(
            &'a self,
            _url: String,
            _headers: HashMap<String, String>,
            _body: Value,
        ) -> AdapterFuture<'a, Result<RawByteStream<'a>, AdapterError>> {
            Box::pin(async move { Err(AdapterError::transport("connection refused")) })
        }
    }

    let channel = ChannelConfig::new("main", ProviderKind::OpenAi, "https://api.openai.com/v1")
        .with_secrets(vec!["sk-test".to_string()])
        .with_models(vec!["gpt-4o-mini".to_string()]);
    let registry = AdapterRegistry::new(Arc::new(FailingTransport)).with_channel(channel);
    let adapter = registry.resolve_model("gpt-4o-mini").expect("resolve");

    let request = rprovider::ChatRequest::from_messages(
        "gpt-4o-mini",
        vec![rprovider::Message::user("hi")],
    );
    let error = adapter.send(request).await.expect_err("transport failure");
    assert_eq!(error.kind, AdapterErrorKind::Transport);
    assert_eq!(error.provider, Some(ProviderKind::OpenAi));
}
