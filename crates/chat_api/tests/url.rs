use chat_api::normalize_chat_url;

#[test]
fn url_normalization_keeps_existing_completions_endpoint() {
    assert_eq!(
        normalize_chat_url("https://api.openai.com/v1/chat/completions"),
        "https://api.openai.com/v1/chat/completions"
    );
}

#[test]
fn url_normalization_appends_completions_to_versioned_base() {
    assert_eq!(
        normalize_chat_url("https://openrouter.ai/api/v1/"),
        "https://openrouter.ai/api/v1/chat/completions"
    );
}

#[test]
fn url_normalization_defaults_blank_input() {
    assert_eq!(
        normalize_chat_url("  "),
        "https://api.openai.com/v1/chat/completions"
    );
}
