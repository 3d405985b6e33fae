use serde::Serialize;
use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("BRIEFLY_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }

    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    ok: bool,
    command: &'a str,
    data: T,
}

pub fn envelope<T: Serialize>(command: &str, data: T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&Envelope {
        ok: true,
        command,
        data,
    })?)
}

/// Print the JSON envelope for a finished command; human mode prints nothing
pub fn emit_success<T: Serialize>(mode: OutputMode, command: &str, data: T) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        println!("{}", envelope(command, data)?);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct FailureEnvelope<'a> {
    ok: bool,
    command: &'a str,
    error: String,
}

pub fn failure_envelope(command: &str, err: &anyhow::Error) -> String {
    let envelope = FailureEnvelope {
        ok: false,
        command,
        error: format!("{:#}", err),
    };
    serde_json::to_string_pretty(&envelope)
        .unwrap_or_else(|_| format!("{{\"ok\":false,\"command\":\"{}\"}}", command))
}
