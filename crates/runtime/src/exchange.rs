//! One chat exchange with a single round of tool delegation.
//!
//! The exchange moves through three states:
//!
//! ```text
//! AwaitingInitialResponse ──(no tool calls)──────────────────────► Done
//!          │
//!          └──(tool calls run on the host)──► AwaitingFollowUp ──► Done
//! ```
//!
//! Tool calls in the follow-up response are not executed.

use crate::model::{Backend, Message, ModelRequest, Role, ToolCall, ToolChoice, ToolSpec};
use crate::tools::{ToolArguments, ToolError, ToolHostClient, result_text, tool_specs};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Default fixed system turn.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. \
     Use the available tools when they help answer the user, and report their results faithfully.";

/// Who spoke a caller-supplied history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    System,
    User,
    Assistant,
}

impl From<HistoryRole> for Role {
    fn from(role: HistoryRole) -> Self {
        match role {
            HistoryRole::System => Role::System,
            HistoryRole::User => Role::User,
            HistoryRole::Assistant => Role::Assistant,
        }
    }
}

/// A prior turn re-submitted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub content: String,
}

/// One executed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: Value,
    pub result: String,
}

/// What the caller gets back from an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

enum State {
    AwaitingInitialResponse {
        messages: Vec<Message>,
    },
    AwaitingFollowUp {
        messages: Vec<Message>,
        records: Vec<ToolCallRecord>,
    },
    Done(ChatOutcome),
}

/// Runs chat exchanges against a backend and a tool host.
pub struct Exchange<'a, B, H> {
    backend: &'a B,
    host: &'a H,
    system_prompt: &'a str,
}

impl<'a, B: Backend, H: ToolHostClient> Exchange<'a, B, H> {
    pub fn new(backend: &'a B, host: &'a H) -> Self {
        Self {
            backend,
            host,
            system_prompt: DEFAULT_SYSTEM_PROMPT,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: &'a str) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    /// Answer `message` given the caller's `history`.
    pub async fn run(&self, message: &str, history: &[HistoryTurn]) -> Result<ChatOutcome> {
        let catalog = tool_specs(self.host.list_tools().await?);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt));
        messages.extend(
            history
                .iter()
                .map(|turn| Message::new(turn.role.into(), turn.content.as_str())),
        );
        messages.push(Message::user(message));

        let mut state = State::AwaitingInitialResponse { messages };
        loop {
            state = match state {
                State::AwaitingInitialResponse { messages } => {
                    self.initial(messages, &catalog).await?
                }
                State::AwaitingFollowUp { messages, records } => {
                    self.follow_up(messages, records).await?
                }
                State::Done(outcome) => return Ok(outcome),
            };
        }
    }

    async fn initial(&self, mut messages: Vec<Message>, catalog: &[ToolSpec]) -> Result<State> {
        let response = self
            .backend
            .call(ModelRequest {
                messages: &messages,
                tools: catalog,
                tool_choice: ToolChoice::Auto,
            })
            .await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "initial response"
        );

        let calls = response.message.tool_calls();
        if calls.is_empty() {
            debug!("model answered without tools");
            return Ok(State::Done(ChatOutcome {
                content: response.message.text(),
                tool_calls: Vec::new(),
            }));
        }

        info!(count = calls.len(), "model requested tool calls");
        messages.push(response.message);

        let mut records = Vec::with_capacity(calls.len());
        for call in calls {
            let arguments = check_call(&call, catalog)?;
            let recorded = arguments.clone().into_value();
            let result = self.host.call_tool(&call.name, arguments).await?;
            let text = result_text(&result);
            if result.is_error() {
                warn!(tool = %call.name, id = %call.id, "tool reported an error result");
            } else {
                debug!(tool = %call.name, id = %call.id, "tool call finished");
            }

            messages.push(Message::tool_result(&call.id, text.as_str()));
            records.push(ToolCallRecord {
                name: call.name,
                arguments: recorded,
                result: text,
            });
        }

        Ok(State::AwaitingFollowUp { messages, records })
    }

    async fn follow_up(&self, messages: Vec<Message>, records: Vec<ToolCallRecord>) -> Result<State> {
        let response = self
            .backend
            .call(ModelRequest {
                messages: &messages,
                tools: &[],
                tool_choice: ToolChoice::None,
            })
            .await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "follow-up response"
        );

        if response.message.has_tool_calls() {
            warn!(
                count = response.message.tool_calls().len(),
                "ignoring tool calls in follow-up response"
            );
        }

        Ok(State::Done(ChatOutcome {
            content: response.message.text(),
            tool_calls: records,
        }))
    }
}

/// Check a requested call against the catalog before it reaches the host.
fn check_call(call: &ToolCall, catalog: &[ToolSpec]) -> Result<ToolArguments> {
    let spec = catalog
        .iter()
        .find(|spec| spec.name == call.name)
        .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

    let arguments = ToolArguments::try_from(call.input.clone())?;
    mcp::schema::validate(&spec.schema, &arguments.clone().into_value())
        .map_err(ToolError::InvalidInput)?;
    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::model::{ModelError, ModelResponse, Part, Usage};
    use crate::tools::LocalToolHost;
    use mcp::CallToolResult;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that replays scripted replies and records every request.
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Message>>,
        requests: Mutex<Vec<(Vec<Message>, usize, ToolChoice)>>,
    }

    impl ScriptedBackend {
        fn new(replies: impl IntoIterator<Item = Message>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<(Vec<Message>, usize, ToolChoice)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Backend for ScriptedBackend {
        async fn call(
            &self,
            request: ModelRequest<'_>,
        ) -> std::result::Result<ModelResponse, ModelError> {
            self.requests.lock().unwrap().push((
                request.messages.to_vec(),
                request.tools.len(),
                request.tool_choice,
            ));
            let message = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ModelError::InvalidResponse("script exhausted".into()))?;
            Ok(ModelResponse {
                message,
                usage: Usage::default(),
            })
        }
    }

    /// Local catalog wrapped with a call counter.
    #[derive(Default)]
    struct CountingHost {
        inner: LocalToolHost,
        calls: AtomicUsize,
    }

    impl CountingHost {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ToolHostClient for CountingHost {
        async fn connect(&self) -> std::result::Result<(), ToolError> {
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            true
        }

        async fn list_tools(&self) -> std::result::Result<Vec<mcp::Tool>, ToolError> {
            self.inner.list_tools().await
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: ToolArguments,
        ) -> std::result::Result<CallToolResult, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.call_tool(name, arguments).await
        }
    }

    fn tool_request(id: &str, name: &str, input: Value) -> Message {
        Message {
            role: Role::Assistant,
            parts: vec![Part::ToolCall(ToolCall {
                id: id.into(),
                name: name.into(),
                input,
            })],
        }
    }

    #[tokio::test]
    async fn echo_round_trip_through_the_model() {
        let backend = ScriptedBackend::new([
            tool_request("call_1", "echo", json!({ "message": "hi" })),
            Message::assistant("The message was echoed: hi"),
        ]);
        let host = CountingHost::default();

        let outcome = Exchange::new(&backend, &host)
            .run("Please echo 'hi'", &[])
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "content": "The message was echoed: hi",
                "toolCalls": [{ "name": "echo", "arguments": { "message": "hi" }, "result": "Echo: hi" }]
            })
        );
        assert_eq!(host.calls(), 1);

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);

        let (first, tools, choice) = &requests[0];
        assert_eq!(*tools, 1);
        assert_eq!(*choice, ToolChoice::Auto);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].role, Role::System);
        assert_eq!(first[1].text(), "Please echo 'hi'");

        let (second, tools, choice) = &requests[1];
        assert_eq!(*tools, 0);
        assert_eq!(*choice, ToolChoice::None);
        assert_eq!(second.len(), 4);
        assert!(second[2].has_tool_calls());
        assert_eq!(
            second[3],
            Message::tool_result("call_1", "Echo: hi"),
            "tool turn answers the originating call"
        );
    }

    #[tokio::test]
    async fn plain_answer_never_touches_the_host() {
        let backend = ScriptedBackend::new([Message::assistant("Hello there")]);
        let host = CountingHost::default();

        let outcome = Exchange::new(&backend, &host).run("hello", &[]).await.unwrap();

        assert_eq!(outcome.content, "Hello there");
        assert!(outcome.tool_calls.is_empty());
        assert_eq!(host.calls(), 0);
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn history_sits_between_system_and_user_turns() {
        let backend = ScriptedBackend::new([Message::assistant("ok")]);
        let host = CountingHost::default();
        let history = [
            HistoryTurn {
                role: HistoryRole::User,
                content: "earlier question".into(),
            },
            HistoryTurn {
                role: HistoryRole::Assistant,
                content: "earlier answer".into(),
            },
        ];

        Exchange::new(&backend, &host)
            .with_system_prompt("be terse")
            .run("now", &history)
            .await
            .unwrap();

        let (messages, _, _) = &backend.requests()[0];
        let turns: Vec<_> = messages.iter().map(|m| (m.role, m.text())).collect();
        assert_eq!(
            turns,
            vec![
                (Role::System, "be terse".to_string()),
                (Role::User, "earlier question".to_string()),
                (Role::Assistant, "earlier answer".to_string()),
                (Role::User, "now".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn several_calls_run_in_order() {
        let mut request = tool_request("a", "echo", json!({ "message": "one" }));
        request.parts.push(Part::ToolCall(ToolCall {
            id: "b".into(),
            name: "echo".into(),
            input: json!({ "message": "two" }),
        }));
        let backend = ScriptedBackend::new([request, Message::assistant("done")]);
        let host = CountingHost::default();

        let outcome = Exchange::new(&backend, &host).run("twice", &[]).await.unwrap();

        let results: Vec<_> = outcome.tool_calls.iter().map(|r| r.result.as_str()).collect();
        assert_eq!(results, ["Echo: one", "Echo: two"]);
        assert_eq!(host.calls(), 2);
    }

    #[tokio::test]
    async fn follow_up_tool_calls_are_not_executed() {
        let backend = ScriptedBackend::new([
            tool_request("a", "echo", json!({ "message": "hi" })),
            tool_request("b", "echo", json!({ "message": "again" })),
        ]);
        let host = CountingHost::default();

        let outcome = Exchange::new(&backend, &host).run("loop?", &[]).await.unwrap();

        assert_eq!(host.calls(), 1);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.content, "");
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn malformed_arguments_fail_before_the_host() {
        let backend = ScriptedBackend::new([tool_request(
            "a",
            "echo",
            Value::String("{\"message\":".into()),
        )]);
        let host = CountingHost::default();

        let err = Exchange::new(&backend, &host).run("broken", &[]).await.unwrap_err();

        assert!(matches!(err, Error::Tool(ToolError::InvalidInput(_))), "{err}");
        assert_eq!(host.calls(), 0);
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn schema_violations_fail_before_the_host() {
        let backend = ScriptedBackend::new([tool_request("a", "echo", json!({ "text": "hi" }))]);
        let host = CountingHost::default();

        let err = Exchange::new(&backend, &host).run("x", &[]).await.unwrap_err();

        assert!(
            matches!(err, Error::Tool(ToolError::InvalidInput(ref m)) if m.contains("message")),
            "{err}"
        );
        assert_eq!(host.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_tool_fails_the_exchange() {
        let backend = ScriptedBackend::new([tool_request("a", "shout", json!({}))]);
        let host = CountingHost::default();

        let err = Exchange::new(&backend, &host).run("x", &[]).await.unwrap_err();

        assert_eq!(err.to_string(), "tool error: unknown tool: shout");
        assert_eq!(host.calls(), 0);
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let backend = ScriptedBackend::new(Vec::new());
        let host = CountingHost::default();

        let err = Exchange::new(&backend, &host).run("x", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Model(ModelError::InvalidResponse(_))));
    }

    #[test]
    fn history_rejects_tool_role() {
        let turn: HistoryTurn =
            serde_json::from_value(json!({ "role": "assistant", "content": "hi" })).unwrap();
        assert_eq!(turn.role, HistoryRole::Assistant);
        assert!(
            serde_json::from_value::<HistoryTurn>(json!({ "role": "tool", "content": "x" }))
                .is_err()
        );
    }
}
