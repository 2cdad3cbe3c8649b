use gpt_magic::{
    cli::SYSTEM_PROMPT,
    config::Config,
    errors::MagicError,
    host::Host,
    magic::{load_extension, GptMagic, MagicRegistry},
    segment::Segment,
    sink::{NotebookSink, ShellSink},
};
use mockito::{Matcher, Server};
use serde_json::{json, Value};

const ARRAY_QUERY: &str = "please write a query that calculates the average from an array";

const REPLY: &str = "Sure, here's a JSON object with the requested information:\n\n```json\n{\n  \"explanation\": \"Averages an array.\"\n}\n``` \n\nAnd here's an example query that calculates the average of an array of numbers in JavaScript:\n\n```javascript\nconst arr = [1, 2, 3, 4, 5];\nconst avg = arr.reduce((a, b) => a + b, 0) / arr.length;\nconsole.log(avg);\n``` \n\nThis code logs the average value of the array to the console, which in this case is `3`.";

fn completion_body(content: &str) -> String {
    json!({
        "id": "chatcmpl-6zpVMsALkjdIDqULgEX2aj29ZjSpI",
        "object": "chat.completion",
        "created": 1680194012,
        "model": "gpt-3.5-turbo-0301",
        "usage": {"prompt_tokens": 101, "completion_tokens": 238, "total_tokens": 339},
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop",
            "index": 0
        }]
    })
    .to_string()
}

fn config(server: &Server) -> Config {
    Config::new("sk-test").with_api_base(&server.url())
}

fn kinds(segments: &[Segment]) -> Vec<&str> {
    segments.iter().map(Segment::kind).collect()
}

#[test]
fn sends_system_prompt_and_prefixed_query() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::Json(json!({
            "model": "gpt-3.5-turbo",
            "temperature": 0.0,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": format!("Now please  {}", ARRAY_QUERY)}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body(REPLY))
        .create();

    let mut magic = GptMagic::new(&config(&server));
    let mut sink = ShellSink::new(Vec::new());
    let outcome = magic.run(ARRAY_QUERY, None, &mut sink).unwrap();

    mock.assert();
    assert_eq!(
        kinds(&outcome.segments),
        vec!["markdown", "code", "markdown", "code", "markdown"]
    );

    let payloads = sink.take_payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].text, "{\n  \"explanation\": \"Averages an array.\"\n}");

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert!(out.starts_with("Sure, here's a JSON object with the requested information:\n"));
}

fn chat_body(temperature: f64, messages: Value) -> Matcher {
    Matcher::Json(json!({
        "model": "gpt-3.5-turbo",
        "temperature": temperature,
        "messages": messages,
    }))
}

#[test]
fn transcript_grows_only_with_chat_flag() {
    let mut server = Server::new();
    let first = server
        .mock("POST", "/v1/chat/completions")
        .match_body(chat_body(
            0.0,
            json!([
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": "Now please  first question"}
            ]),
        ))
        .with_status(200)
        .with_body(completion_body("```python\nprint(1)\n```"))
        .create();
    let continued = server
        .mock("POST", "/v1/chat/completions")
        .match_body(chat_body(
            0.5,
            json!([
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": "Now please  first question"},
                {"role": "assistant", "content": "```python\nprint(1)\n```"},
                {"role": "user", "content": "follow up"}
            ]),
        ))
        .with_status(200)
        .with_body(completion_body("```python\nprint(2)\n```"))
        .create();
    let restarted = server
        .mock("POST", "/v1/chat/completions")
        .match_body(chat_body(
            0.0,
            json!([
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": "Now please  follow up"}
            ]),
        ))
        .with_status(200)
        .with_body(completion_body("```python\nprint(3)\n```"))
        .create();

    let mut magic = GptMagic::new(&config(&server));
    let mut sink = ShellSink::new(Vec::new());

    magic.run("first question", None, &mut sink).unwrap();
    assert_eq!(magic.transcript().len(), 3);

    magic.run("-c -t 0.5 follow up", None, &mut sink).unwrap();
    assert_eq!(magic.transcript().len(), 5);

    magic.run("follow up", None, &mut sink).unwrap();
    assert_eq!(magic.transcript().len(), 3);
    assert_eq!(magic.transcript().messages()[0].content, SYSTEM_PROMPT);

    first.assert();
    continued.assert();
    restarted.assert();
    let texts: Vec<String> = sink.take_payloads().into_iter().map(|p| p.text).collect();
    assert_eq!(texts, vec!["print(1)", "print(2)", "print(3)"]);
}

#[test]
fn unauthorized_response_is_reported_and_transcript_kept() {
    let mut server = Server::new();
    let _hello = server
        .mock("POST", "/v1/chat/completions")
        .match_body(chat_body(
            0.0,
            json!([
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": "Now please  hello"}
            ]),
        ))
        .with_status(200)
        .with_body(completion_body("Hi."))
        .create();
    let _denied = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex("again".to_string()))
        .with_status(401)
        .with_body(r#"{"error": {"message": "Incorrect API key provided"}}"#)
        .create();

    let mut magic = GptMagic::new(&config(&server));
    let mut sink = ShellSink::new(Vec::new());
    magic.run("hello", None, &mut sink).unwrap();
    let before = magic.transcript().messages().to_vec();

    let err = magic.run("-c again", None, &mut sink).unwrap_err();
    assert!(matches!(err, MagicError::Api { status: 401, .. }));
    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("Incorrect API key"));
    assert_eq!(magic.transcript().messages(), before.as_slice());
    assert!(sink.take_payloads().is_empty());
}

#[test]
fn malformed_reply_inserts_nothing() {
    let mut server = Server::new();
    let _gateway = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create();

    let mut magic = GptMagic::new(&config(&server));
    let mut sink = ShellSink::new(Vec::new());
    let err = magic.run("anything", None, &mut sink).unwrap_err();
    assert!(matches!(err, MagicError::MalformedResponse(_)));
    assert!(magic.transcript().is_empty());
    assert!(sink.take_payloads().is_empty());
}

#[test]
fn out_of_range_temperature_never_reaches_the_api() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .expect(0)
        .create();

    let mut magic = GptMagic::new(&config(&server));
    let mut sink = ShellSink::new(Vec::new());
    let err = magic.run("-t 1.01 warm answer", None, &mut sink).unwrap_err();
    assert!(err.is_input_error());
    mock.assert();
}

#[test]
fn load_extension_checks_the_key() {
    let mut server = Server::new();
    let ok = server
        .mock("GET", "/v1/models")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_body(r#"{"data": []}"#)
        .create();

    let mut registry = MagicRegistry::new();
    load_extension(&mut registry, &config(&server), true).unwrap();
    ok.assert();
    assert!(registry.contains("gpt"));

    let mut server = Server::new();
    let _denied = server.mock("GET", "/v1/models").with_status(401).create();
    let mut registry = MagicRegistry::new();
    let err = load_extension(&mut registry, &config(&server), true).unwrap_err();
    assert!(matches!(err, MagicError::InvalidApiKey { status: 401 }));
    assert!(!registry.contains("gpt"));
}

#[test]
fn notebook_host_session() {
    let mut server = Server::new();
    let _reply = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(completion_body(
            "Plots a sine wave:\n```python\nimport numpy as np\n```\n",
        ))
        .create();

    let mut registry = MagicRegistry::new();
    load_extension(&mut registry, &config(&server), false).unwrap();
    let mut host = Host::new(registry, NotebookSink::new(Vec::new()));

    let input = "%%gpt -t 0.5\nplot a sine wave\n\n%gpt -t 9 bad\n";
    let mut err = Vec::new();
    let failures = host.process(input.as_bytes(), &mut err).unwrap();
    assert_eq!(failures, 1);
    assert!(String::from_utf8(err).unwrap().contains("Temperature"));

    let nb = host.notebook().to_ipynb();
    assert_eq!(nb["cells"][1]["source"], json!(["import numpy as np"]));
    assert_eq!(nb["cells"].as_array().unwrap().len(), 3);

    let (sink, _) = host.into_parts();
    let outputs: Vec<Value> = String::from_utf8(sink.into_inner())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(outputs[0]["data"]["text/markdown"], "Plots a sine wave:");
    assert!(outputs[1]["data"]["application/javascript"]
        .as_str()
        .unwrap()
        .contains("import numpy as np"));
}
