//! The conversation loop: one user question in, one answer with
//! citations out.
//!
//! Each turn runs a bounded tool protocol. The LLM is offered the tool
//! definitions; if it stops to request tools, every requested call is
//! executed and its result appended, then the LLM is called again. After
//! [`MAX_TOOL_ROUNDS`] tool rounds a final call is made with no tools
//! offered, forcing a text answer. Tool execution failures are relayed to
//! the LLM as error-flagged tool results so the turn can still complete;
//! a failed generation call is fatal to the turn.

use anyhow::Result;
use std::sync::Arc;

use crate::llm::{ContentBlock, LlmClient, MessageParam};
use crate::models::ChatResponse;
use crate::session::SessionStore;
use crate::tools::ToolRegistry;

/// Tool rounds allowed per turn before the tool-less final call.
const MAX_TOOL_ROUNDS: usize = 2;

const SYSTEM_PROMPT: &str = "\
You are an AI assistant specialized in course materials and educational content, \
with a search tool for course information.

Tool usage:
- **search_course_content**: for questions about specific course content or detailed educational materials
- **get_course_outline**: for questions about a course's structure, its lesson list, or links
- You may chain tool calls across rounds when a question needs them, up to the round limit
- If a search yields no results, state that clearly without offering alternatives

Response protocol:
- **General knowledge questions**: answer from existing knowledge without searching
- **Course-specific questions**: search first, then answer
- **No meta-commentary**: no reasoning process, no mention of the search itself

All responses must be:
1. **Brief, concise and focused** - get to the point quickly
2. **Educational** - maintain instructional value
3. **Clear** - use accessible language
4. **Example-supported** - include relevant examples when they help
Provide only the direct answer to what was asked.";

/// Drives turns against one tool registry and one session store.
///
/// Citation state lives in the tools and is shared across sessions, so
/// turns on one engine must run one at a time; interleaved turns would
/// cross-attribute sources. The CLI holds a single engine and awaits
/// each turn before starting the next.
pub struct ChatEngine {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    sessions: Arc<SessionStore>,
}

impl ChatEngine {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>, sessions: Arc<SessionStore>) -> Self {
        Self { llm, tools, sessions }
    }

    /// Answer one user question. A missing session id starts a new
    /// session; the id in the response is always valid for the next turn.
    pub async fn ask(&self, question: &str, session_id: Option<&str>) -> Result<ChatResponse> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session(),
        };

        let system = match self.sessions.history(&session_id) {
            Some(history) => {
                format!("{SYSTEM_PROMPT}\n\nPrevious conversation:\n{history}")
            }
            None => SYSTEM_PROMPT.to_string(),
        };

        let mut messages = vec![MessageParam::user_text(question)];
        let definitions = self.tools.definitions();

        let mut reply = self.llm.generate(&system, &messages, &definitions).await?;

        let mut rounds = 0;
        while reply.wants_tools() && rounds < MAX_TOOL_ROUNDS {
            rounds += 1;

            let mut tool_results = Vec::new();
            for (id, name, input) in reply.tool_uses() {
                let (content, is_error) = match self.tools.execute(name, input).await {
                    Ok(output) => (output, false),
                    Err(e) => (format!("Error executing tool: {e}"), true),
                };
                tool_results.push(ContentBlock::ToolResult {
                    tool_use_id: id.to_string(),
                    content,
                    is_error,
                });
            }

            messages.push(MessageParam::assistant(reply.content.clone()));
            messages.push(MessageParam::user(tool_results));

            // Past the round limit, withhold the tools to force text.
            let tools_for_round: &[serde_json::Value] = if rounds < MAX_TOOL_ROUNDS {
                &definitions
            } else {
                &[]
            };
            reply = self.llm.generate(&system, &messages, tools_for_round).await?;
        }

        let answer = reply.text();
        let sources = self.tools.last_sources();
        self.tools.reset_sources();

        self.sessions.add_exchange(&session_id, question, &answer);

        Ok(ChatResponse {
            answer,
            sources,
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmReply;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Plays back a fixed script of replies and records every request.
    struct ScriptedLlm {
        replies: Mutex<Vec<LlmReply>>,
        calls: Mutex<Vec<(String, usize, usize)>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<LlmReply>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn text_reply(text: &str) -> LlmReply {
            serde_json::from_value(serde_json::json!({
                "stop_reason": "end_turn",
                "content": [{"type": "text", "text": text}]
            }))
            .unwrap()
        }

        fn tool_reply(name: &str, input: serde_json::Value) -> LlmReply {
            serde_json::from_value(serde_json::json!({
                "stop_reason": "tool_use",
                "content": [{"type": "tool_use", "id": "tu_1", "name": name, "input": input}]
            }))
            .unwrap()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(
            &self,
            system: &str,
            messages: &[MessageParam],
            tools: &[serde_json::Value],
        ) -> Result<LlmReply> {
            self.calls
                .lock()
                .unwrap()
                .push((system.to_string(), messages.len(), tools.len()));
            let mut replies = self.replies.lock().unwrap();
            anyhow::ensure!(!replies.is_empty(), "script exhausted");
            Ok(replies.remove(0))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl crate::tools::Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn definition(&self) -> serde_json::Value {
            serde_json::json!({"name": "broken", "description": "always fails",
                "input_schema": {"type": "object", "properties": {}}})
        }
        async fn execute(&self, _args: &serde_json::Value) -> Result<String> {
            anyhow::bail!("backend unavailable")
        }
    }

    fn engine(llm: ScriptedLlm, registry: ToolRegistry) -> ChatEngine {
        ChatEngine::new(
            Arc::new(llm),
            Arc::new(registry),
            Arc::new(SessionStore::new(2)),
        )
    }

    #[tokio::test]
    async fn direct_answer_skips_tools() {
        let llm = ScriptedLlm::new(vec![ScriptedLlm::text_reply("Paris.")]);
        let engine = engine(llm, ToolRegistry::new());

        let response = engine.ask("Capital of France?", None).await.unwrap();
        assert_eq!(response.answer, "Paris.");
        assert!(response.sources.is_empty());
        assert!(!response.session_id.is_empty());
    }

    #[tokio::test]
    async fn tool_failure_is_relayed_and_turn_completes() {
        let llm = ScriptedLlm::new(vec![
            ScriptedLlm::tool_reply("broken", serde_json::json!({})),
            ScriptedLlm::text_reply("The tool is unavailable right now."),
        ]);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool));
        let engine = engine(llm, registry);

        let response = engine.ask("Search for something", None).await.unwrap();
        assert_eq!(response.answer, "The tool is unavailable right now.");
    }

    #[tokio::test]
    async fn final_call_after_round_limit_offers_no_tools() {
        let llm = ScriptedLlm::new(vec![
            ScriptedLlm::tool_reply("broken", serde_json::json!({})),
            ScriptedLlm::tool_reply("broken", serde_json::json!({})),
            ScriptedLlm::text_reply("Done."),
        ]);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool));

        let llm = Arc::new(llm);
        let engine = ChatEngine::new(
            llm.clone(),
            Arc::new(registry),
            Arc::new(SessionStore::new(2)),
        );
        let response = engine.ask("q", None).await.unwrap();
        assert_eq!(response.answer, "Done.");

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].2 > 0);
        assert!(calls[1].2 > 0);
        // third call is the forced tool-less final call
        assert_eq!(calls[2].2, 0);
    }

    #[tokio::test]
    async fn llm_failure_is_fatal() {
        let llm = ScriptedLlm::new(vec![]); // script exhausted immediately
        let engine = engine(llm, ToolRegistry::new());
        assert!(engine.ask("q", None).await.is_err());
    }

    #[tokio::test]
    async fn history_is_threaded_into_the_system_prompt() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedLlm::text_reply("First answer."),
            ScriptedLlm::text_reply("Second answer."),
        ]));
        let engine = ChatEngine::new(
            llm.clone(),
            Arc::new(ToolRegistry::new()),
            Arc::new(SessionStore::new(2)),
        );

        let first = engine.ask("First question?", None).await.unwrap();
        engine
            .ask("Second question?", Some(&first.session_id))
            .await
            .unwrap();

        let calls = llm.calls.lock().unwrap();
        assert!(!calls[0].0.contains("Previous conversation:"));
        assert!(calls[1].0.contains("Previous conversation:"));
        assert!(calls[1].0.contains("User: First question?"));
        assert!(calls[1].0.contains("Assistant: First answer."));
    }

    #[tokio::test]
    async fn same_session_id_is_returned_for_follow_ups() {
        let llm = ScriptedLlm::new(vec![
            ScriptedLlm::text_reply("a"),
            ScriptedLlm::text_reply("b"),
        ]);
        let engine = engine(llm, ToolRegistry::new());

        let first = engine.ask("q1", None).await.unwrap();
        let second = engine.ask("q2", Some(&first.session_id)).await.unwrap();
        assert_eq!(first.session_id, second.session_id);
    }
}
