use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

pub const STUB_TOOL_CALL_ID: &str = "call_stub_1";

/// Words the stub embeddings endpoint turns into vector dimensions.
const KEYWORDS: &[&str] = &[
    "surveillance",
    "government",
    "dragon",
    "treasure",
    "wizard",
    "magic",
    "desert",
    "spice",
    "war",
    "love",
    "marriage",
];

#[derive(Debug, Clone)]
pub struct OpenAiStubConfig {
    pub chat: ChatBehavior,
    pub fail_embeddings: bool,
}

impl Default for OpenAiStubConfig {
    fn default() -> Self {
        Self {
            chat: ChatBehavior::LookupFirstTitle,
            fail_embeddings: false,
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum ChatBehavior {
    /// Round 1 requests the detail of the first title in the prompt context.
    LookupFirstTitle,
    /// Round 1 requests the detail of a fixed title.
    LookupTitle(String),
    /// Round 1 answers with text and no tool call.
    AnswerOnly,
    /// Every chat request fails with this status and error message.
    Fail { status: u16, message: String },
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct OpenAiStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl OpenAiStub {
    pub fn spawn(config: OpenAiStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start openai stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                let authorization = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Authorization"))
                    .map(|header| header.value.as_str().to_owned());

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }
                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };

                recorded.lock().expect("lock recorded requests").push(RecordedRequest {
                    path: path.clone(),
                    authorization,
                    body: parsed.clone(),
                });

                let (status, response_body) =
                    if request.method() != &tiny_http::Method::Post {
                        (404, json!({ "error": { "message": "not found" } }))
                    } else if path == "/v1/embeddings" {
                        embeddings_response(&parsed, config.fail_embeddings)
                    } else if path == "/v1/chat/completions" {
                        chat_response(&parsed, &config.chat)
                    } else {
                        (404, json!({ "error": { "message": "not found" } }))
                    };

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(response_body.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock recorded requests").clone()
    }

    pub fn chat_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|req| req.path == "/v1/chat/completions")
            .collect()
    }
}

impl Drop for OpenAiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn embeddings_response(body: &Value, fail: bool) -> (u16, Value) {
    if fail {
        return (
            503,
            json!({ "error": { "message": "embedding service unavailable" } }),
        );
    }
    let inputs = match body.get("input") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_owned)
            .collect::<Vec<_>>(),
        Some(Value::String(text)) => vec![text.clone()],
        _ => return (400, json!({ "error": { "message": "missing input" } })),
    };

    // Reverse order so clients have to sort by `index`.
    let data = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(index, text)| json!({ "object": "embedding", "index": index, "embedding": keyword_vector(text) }))
        .collect::<Vec<_>>();
    (200, json!({ "object": "list", "data": data }))
}

fn keyword_vector(text: &str) -> Vec<f32> {
    let text = text.to_lowercase();
    let mut vec = KEYWORDS
        .iter()
        .map(|keyword| if text.contains(keyword) { 1.0 } else { 0.0 })
        .collect::<Vec<f32>>();
    vec.push(0.1);
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    vec.iter().map(|v| v / norm).collect()
}

fn chat_response(body: &Value, behavior: &ChatBehavior) -> (u16, Value) {
    if let ChatBehavior::Fail { status, message } = behavior {
        return (*status, json!({ "error": { "message": message } }));
    }
    let Some(messages) = body.get("messages").and_then(|v| v.as_array()) else {
        return (400, json!({ "error": { "message": "missing messages" } }));
    };

    let has_tools = body.get("tools").is_some();
    let message = if has_tools {
        let title = match behavior {
            ChatBehavior::LookupFirstTitle => first_context_title(messages),
            ChatBehavior::LookupTitle(title) => Some(title.clone()),
            ChatBehavior::AnswerOnly | ChatBehavior::Fail { .. } => None,
        };
        match title {
            Some(title) => json!({
                "role": "assistant",
                "content": format!("I think you'll love {title}."),
                "tool_calls": [{
                    "id": STUB_TOOL_CALL_ID,
                    "type": "function",
                    "function": {
                        "name": "get_summary_by_title",
                        "arguments": json!({ "title": title }).to_string(),
                    }
                }]
            }),
            None => json!({
                "role": "assistant",
                "content": "Stub recommendation without tools.",
            }),
        }
    } else {
        let tool_result = messages
            .iter()
            .rev()
            .find(|m| m.get("role").and_then(|v| v.as_str()) == Some("tool"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or("nothing");
        json!({
            "role": "assistant",
            "content": format!("Final answer based on: {tool_result}"),
        })
    };

    (
        200,
        json!({
            "id": "chatcmpl_stub",
            "object": "chat.completion",
            "model": body.get("model").cloned().unwrap_or(Value::String("stub-model".to_owned())),
            "choices": [{ "index": 0, "message": message, "finish_reason": "stop" }]
        }),
    )
}

fn first_context_title(messages: &[Value]) -> Option<String> {
    let system = messages
        .iter()
        .find(|m| m.get("role").and_then(|v| v.as_str()) == Some("system"))?
        .get("content")?
        .as_str()?;
    let start = system.find("**")? + 2;
    let rest = &system[start..];
    let end = rest.find("**")?;
    Some(rest[..end].to_owned())
}
