use super::*;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn options() -> Vec<IngredientOption<'static>> {
    vec![
        IngredientOption {
            kind: IngredientKind::Mold,
            name: "Round Mold",
            description: None,
        },
        IngredientOption {
            kind: IngredientKind::Essence,
            name: "Lavender Oil",
            description: Some("calming"),
        },
    ]
}

#[test]
fn parse_suggestion_accepts_plain_and_fenced_json() {
    let raw = r#"{"mold":"Round Mold","color":"Ocean Blue","aroma":"Citrus","essences":["Lavender Oil","Mint Oil"],"explanation":"fresh"}"#;
    let fenced = format!("```json\n{raw}\n```");

    let plain = parse_suggestion(raw).expect("plain");
    assert_eq!(parse_suggestion(&fenced).expect("fenced"), plain);
    assert_eq!(plain.essences.len(), 2);
    assert_eq!(plain.picks().len(), 5);
}

#[test]
fn parse_suggestion_rejects_missing_fields() {
    assert!(matches!(
        parse_suggestion(r#"{"mold":"Round Mold"}"#),
        Err(InferenceError::Deserialize { .. })
    ));
}

#[test]
fn user_prompt_lists_every_option_with_kind() {
    let prompt = user_prompt("Soaps", &options(), "something relaxing");
    assert!(prompt.contains("Category: Soaps"));
    assert!(prompt.contains("- [mold] Round Mold"));
    assert!(prompt.contains("- [essence] Lavender Oil: calming"));
    assert!(prompt.ends_with("Client preferences: something relaxing"));
}

#[tokio::test]
async fn suggest_posts_chat_completion_and_parses_reply() {
    let server = MockServer::start().await;
    let reply = r#"{"mold":"Round Mold","color":"Ocean Blue","scent":"Citrus","essences":["Lavender Oil","Mint Oil"],"explanation":"bright and calm"}"#;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "test-model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(reply)))
        .expect(1)
        .mount(&server)
        .await;

    let client = InferenceClient::new(&server.uri(), Some("test-key"), "test-model", 5)
        .expect("client construction should not fail");
    let suggestion = client
        .suggest("Soaps", &options(), "relaxing")
        .await
        .expect("suggestion");

    assert_eq!(suggestion.aroma, "Citrus");
    assert_eq!(suggestion.explanation, "bright and calm");
}

#[tokio::test]
async fn suggest_surfaces_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = InferenceClient::new(&server.uri(), None, "test-model", 5).expect("client");
    let err = client
        .suggest("Soaps", &options(), "relaxing")
        .await
        .expect_err("should fail");
    assert!(matches!(err, InferenceError::Status(500)));
}

#[tokio::test]
async fn suggest_rejects_reply_without_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = InferenceClient::new(&server.uri(), None, "test-model", 5).expect("client");
    let err = client
        .suggest("Soaps", &options(), "relaxing")
        .await
        .expect_err("should fail");
    assert!(matches!(err, InferenceError::Malformed(_)));
}
