use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use session_log::{
    counter_path, LlmRequestRecord, LlmResponseRecord, LogOutcome, SessionId, SessionLogger,
    ToolRequestRecord, ToolResponseRecord, TranscriptFormat,
};
use tempfile::TempDir;

fn file_logger(root: &Path) -> SessionLogger {
    SessionLogger::with_file_counter(root, TranscriptFormat::Raw)
}

/// Files below `dir`, relative to it, sorted.
fn tree(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in fs::read_dir(dir).expect("dir should be readable") {
            let path = entry.expect("entry should be readable").path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let relative = path.strip_prefix(base).expect("path under base");
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}

fn log_list_files_turn(logger: &mut SessionLogger) -> Vec<LogOutcome> {
    let mut outcomes = vec![logger.log_user_input("list files")];

    let request_payload = json!({
        "model": "gpt-5",
        "messages": [{"role": "user", "content": "list files"}],
    });
    let request = logger.log_llm_request(&LlmRequestRecord {
        model: "gpt-5",
        system_prompt: "You are a coding assistant.",
        payload: &request_payload,
    });
    let response_payload = json!({
        "role": "assistant",
        "tool_calls": [{"id": "call_1", "function": {"name": "shell", "arguments": "{\"command\":\"ls\"}"}}],
    });
    outcomes.push(request.outcome);
    outcomes.push(logger.log_llm_response(
        request.interaction,
        &LlmResponseRecord {
            text: None,
            payload: &response_payload,
        },
    ));

    let arguments = json!({"command": "ls"});
    let tool = logger.log_tool_request(&ToolRequestRecord {
        tool_name: "shell",
        arguments: &arguments,
        approval_mode: false,
        approved: true,
    });
    outcomes.push(tool.outcome);
    outcomes.push(logger.log_tool_response(
        tool.interaction,
        &ToolResponseRecord {
            output: "Cargo.toml\nsrc\n",
            error: None,
        },
    ));

    outcomes
}

#[test]
fn fresh_start_turn_produces_the_documented_layout() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut logger = file_logger(temp.path());

    let outcomes = log_list_files_turn(&mut logger);

    assert!(outcomes.iter().all(LogOutcome::is_logged), "{outcomes:?}");
    assert_eq!(
        tree(&temp.path().join("session_001")),
        vec![
            "001-user/001-request.txt",
            "002-llm/002-request.json",
            "002-llm/003-response.json",
            "003-tool/003-request.txt",
            "003-tool/004-response.txt",
        ]
    );
    assert_eq!(
        fs::read_to_string(counter_path(temp.path())).expect("counter file"),
        "1"
    );
}

#[test]
fn raw_payloads_are_stored_verbatim() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut logger = file_logger(temp.path());
    log_list_files_turn(&mut logger);
    let session = temp.path().join("session_001");

    assert_eq!(
        fs::read_to_string(session.join("001-user/001-request.txt")).expect("user input"),
        "list files"
    );
    let request: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(session.join("002-llm/002-request.json")).expect("llm request"),
    )
    .expect("llm request is JSON");
    assert_eq!(request["model"], "gpt-5");
    assert_eq!(
        fs::read_to_string(session.join("003-tool/003-request.txt")).expect("tool request"),
        "tool: shell\napproval_mode: false\napproved: true\n\nls"
    );
    assert_eq!(
        fs::read_to_string(session.join("003-tool/004-response.txt")).expect("tool response"),
        "Cargo.toml\nsrc\n"
    );
}

#[test]
fn sequential_runs_claim_consecutive_sessions() {
    let temp = tempfile::tempdir().expect("tempdir");

    let first = file_logger(temp.path());
    assert_eq!(first.session_id(), SessionId::new(1));
    drop(first);
    let second = file_logger(temp.path());

    assert_eq!(second.session_id(), SessionId::new(2));
    assert_eq!(second.session_dir(), temp.path().join("session_002"));
    assert!(second.counter_persisted());
}

#[test]
fn deleting_session_directories_keeps_the_counter() {
    let temp = tempfile::tempdir().expect("tempdir");
    drop(file_logger(temp.path()));
    drop(file_logger(temp.path()));
    fs::remove_dir_all(temp.path().join("session_001")).expect("remove session_001");
    fs::remove_dir_all(temp.path().join("session_002")).expect("remove session_002");

    let logger = file_logger(temp.path());

    assert_eq!(logger.session_id(), SessionId::new(3));
}

#[test]
fn deleting_only_the_counter_restarts_at_one() {
    let temp = tempfile::tempdir().expect("tempdir");
    drop(file_logger(temp.path()));
    drop(file_logger(temp.path()));
    fs::remove_file(counter_path(temp.path())).expect("remove counter");

    let logger = file_logger(temp.path());

    assert_eq!(logger.session_id(), SessionId::new(1));
}

#[test]
fn malformed_counter_counts_as_zero() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(counter_path(temp.path()), "not a number").expect("seed counter");

    let logger = file_logger(temp.path());

    assert_eq!(logger.session_id(), SessionId::new(1));
    assert_eq!(
        fs::read_to_string(counter_path(temp.path())).expect("counter file"),
        "1"
    );
}

#[test]
fn tool_response_write_failure_leaves_earlier_logs_intact() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut logger = file_logger(temp.path());
    let blocked: PathBuf = temp.path().join("session_001/003-tool/004-response.txt");
    fs::create_dir_all(&blocked).expect("blocking directory");

    let outcomes = log_list_files_turn(&mut logger);

    let (tool_response, earlier) = outcomes.split_last().expect("five outcomes");
    assert!(matches!(tool_response, LogOutcome::Failed(_)));
    assert!(earlier.iter().all(LogOutcome::is_logged), "{earlier:?}");
    let session = temp.path().join("session_001");
    assert!(session.join("001-user/001-request.txt").is_file());
    assert!(session.join("002-llm/002-request.json").is_file());
    assert!(session.join("002-llm/003-response.json").is_file());
    assert!(session.join("003-tool/003-request.txt").is_file());
}

#[test]
fn unusable_counter_file_degrades_to_in_memory_numbering() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(counter_path(temp.path())).expect("counter path is a directory");

    let mut logger = file_logger(temp.path());
    let first = logger.session_id();
    let second = logger.start_next_session();

    assert!(!logger.counter_persisted());
    assert_eq!(first, SessionId::new(1));
    assert_eq!(second, SessionId::new(2));
    assert!(logger.log_user_input("still logged").is_logged());
}

#[test]
fn interaction_numbers_strictly_increase() {
    let temp: TempDir = tempfile::tempdir().expect("tempdir");
    let mut logger = file_logger(temp.path());
    let payload = json!({});
    let mut numbers = Vec::new();

    for round in 0..4 {
        logger.log_user_input(&format!("prompt {round}"));
        numbers.push(logger.last_interaction());
        let request = logger.log_llm_request(&LlmRequestRecord {
            model: "gpt-5",
            system_prompt: "",
            payload: &payload,
        });
        numbers.push(request.interaction.number());
        logger.log_llm_response(
            request.interaction,
            &LlmResponseRecord {
                text: Some("done"),
                payload: &payload,
            },
        );
    }

    assert_eq!(numbers, (1..=8).collect::<Vec<u32>>());
}

#[test]
fn markdown_format_writes_md_documents() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut logger = SessionLogger::with_file_counter(temp.path(), TranscriptFormat::Markdown);

    log_list_files_turn(&mut logger);

    let session = temp.path().join("session_001");
    assert_eq!(
        tree(&session),
        vec![
            "001-user/001-request.md",
            "002-llm/002-request.md",
            "002-llm/003-response.md",
            "003-tool/003-request.md",
            "003-tool/004-response.md",
        ]
    );
    let request = fs::read_to_string(session.join("002-llm/002-request.md")).expect("llm request");
    assert!(request.starts_with("# LLM Request\n"));
    assert!(request.contains("**Model**: gpt-5"));
    assert!(request.contains("You are a coding assistant."));
}
