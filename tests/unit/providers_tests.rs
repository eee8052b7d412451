/*!
 * Tests for provider request builders and response parsing
 */

use rentura::providers::Provider;
use rentura::providers::anthropic::{Anthropic, AnthropicRequest, AnthropicResponse};
use rentura::providers::ollama::{parse_chat_response, ChatRequest, ChatResponse, Ollama};
use rentura::providers::openai::{OpenAI, OpenAIRequest, OpenAIResponse};

#[test]
fn test_openAIRequest_shouldSerializeSystemAndUserMessages() {
    let request = OpenAIRequest::new("gpt-4.1")
        .add_message("system", "Du bist Fachanwalt für Mietrecht.")
        .add_message("user", "Prüfe die Kaution.")
        .temperature(0.0);

    let json = serde_json::to_value(&request).unwrap();

    assert_eq!(json["model"], "gpt-4.1");
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][1]["content"], "Prüfe die Kaution.");
    assert_eq!(json["temperature"], 0.0);
    assert!(json.get("max_tokens").is_none());
}

#[test]
fn test_openAI_extractText_shouldUseFirstChoice() {
    let response: OpenAIResponse = serde_json::from_str(
        r#"{"choices":[{"message":{"role":"assistant","content":"Unwirksam."}},
                       {"message":{"role":"assistant","content":"Zweite"}}]}"#,
    )
    .unwrap();

    assert_eq!(OpenAI::extract_text(&response), "Unwirksam.");
}

#[test]
fn test_anthropicRequest_shouldCarrySystemPromptOutsideMessages() {
    let request = AnthropicRequest::new("claude-3-5-sonnet-latest", 1024)
        .system("Du bist Fachanwalt für Mietrecht.")
        .add_message("user", "Prüfe die Kaution.");

    let json = serde_json::to_value(&request).unwrap();

    assert_eq!(json["system"], "Du bist Fachanwalt für Mietrecht.");
    assert_eq!(json["messages"].as_array().unwrap().len(), 1);
}

#[test]
fn test_anthropic_extractText_shouldJoinTextBlocksOnly() {
    let response: AnthropicResponse = serde_json::from_str(
        r#"{"content":[{"type":"text","text":"Teil 1. "},{"type":"tool_use"},{"type":"text","text":"Teil 2."}]}"#,
    )
    .unwrap();

    assert_eq!(Anthropic::extract_text(&response), "Teil 1. Teil 2.");
}

#[test]
fn test_chatRequest_shouldDisableStreaming() {
    let request = ChatRequest::new("llama3.1").add_message("user", "Hallo").num_predict(256);

    let json = serde_json::to_value(&request).unwrap();

    assert_eq!(json["stream"], false);
    assert_eq!(json["options"]["num_predict"], 256);
}

#[test]
fn test_parseChatResponse_withStreamedLines_shouldConcatenateContent() {
    let body = concat!(
        r#"{"model":"llama3.1","message":{"role":"assistant","content":"Die Klausel "},"done":false}"#,
        "\n",
        r#"{"model":"llama3.1","message":{"role":"assistant","content":"ist unwirksam."},"done":true,"eval_count":7}"#,
    );

    let response: ChatResponse = parse_chat_response(body).unwrap();

    assert_eq!(Ollama::extract_text(&response), "Die Klausel ist unwirksam.");
    assert_eq!(response.eval_count, Some(7));
}

#[test]
fn test_parseChatResponse_withGarbage_shouldBeParseError() {
    assert!(parse_chat_response("<html>502</html>").is_err());
}
