use cheatguard_llm::ollama::OllamaClient;
use cheatguard_llm::openai::OpenAiClient;
use cheatguard_llm::traits::LlmClient;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn ollama_with_model(server: &MockServer, listed: &str) {
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "models": [{ "name": listed }] })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn ollama_chat_sends_a_single_user_message() {
    let server = MockServer::start().await;
    ollama_with_model(&server, "llama3.2:latest").await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "stream": false,
            "messages": [{ "role": "user", "content": "Say Ok" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "Ok" },
            "eval_count": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), "llama3.2".into())
        .await
        .unwrap();
    let reply = client.ask("Say Ok").await.unwrap();

    assert_eq!(reply, "Ok");
}

#[tokio::test]
async fn ollama_pulls_missing_models() {
    let server = MockServer::start().await;
    ollama_with_model(&server, "mistral:latest").await;
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .and(body_partial_json(json!({ "model": "llama3.2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    OllamaClient::new(server.uri(), "llama3.2".into())
        .await
        .unwrap();
}

#[tokio::test]
async fn ollama_reports_unreachable_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = OllamaClient::new(server.uri(), "llama3.2".into())
        .await
        .err()
        .expect("probe should fail");
    assert!(err.to_string().contains("ollama serve"));
}

#[tokio::test]
async fn ollama_chat_errors_surface_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = OllamaClient::unchecked(server.uri(), "llama3.2".into()).unwrap();
    let err = client.ask("hello").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn openai_reads_output_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "input": "Say Ok" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "output": [{
                "type": "message",
                "content": [{ "type": "output_text", "text": "Ok" }]
            }],
            "usage": { "output_tokens": 1 }
        })))
        .mount(&server)
        .await;

    let base = format!("{}/v1", server.uri());
    let client = OpenAiClient::new("sk-test".into(), "gpt-4o-mini".into(), Some(&base)).unwrap();
    let resp = client.generate("Say Ok", None, None, None).await.unwrap();

    assert_eq!(resp.text, "Ok");
    assert_eq!(resp.tokens_used, Some(1));
}
