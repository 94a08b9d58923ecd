//! Parsing of operator commands and button-tap payloads. Free-form strings
//! become enumerated values here; handlers never look at raw text again.

use crate::chat::PrincipalId;
use crate::session::MetaField;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { payload: Option<String> },
    Help,
    Ping,
    Post,
    Ddl(String),
    Mode,
    Cleanup,
    Logs,
    Merge,
    FeedOn,
    FeedOff,
    Unknown(String),
}

impl Command {
    pub fn parse(name: &str, arg: Option<&str>) -> Self {
        let arg = arg.map(str::trim).filter(|a| !a.is_empty());
        match name {
            "start" => Command::Start {
                payload: arg.map(str::to_string),
            },
            "help" => Command::Help,
            "ping" => Command::Ping,
            "post" => Command::Post,
            "ddl" => Command::Ddl(arg.unwrap_or_default().to_string()),
            "mode" => Command::Mode,
            "cleanup" => Command::Cleanup,
            "logs" => Command::Logs,
            "merge" => Command::Merge,
            "on" => Command::FeedOn,
            "off" => Command::FeedOff,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Button-tap action, parsed from `{action}_{principal_id}[_{extra}]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Merge,
    Extract,
    Screenshot,
    SetField(MetaField),
    CreatePost,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub action: Action,
    pub principal: PrincipalId,
    pub extra: Option<String>,
}

/// Parse a callback payload. The principal id is the rightmost all-digit
/// segment; action names may themselves contain underscores
/// (`create_post`, `set_cover_url`). Malformed payloads yield `None`.
pub fn parse_callback(data: &str) -> Option<CallbackPayload> {
    let segments: Vec<&str> = data.split('_').collect();
    let id_idx = segments
        .iter()
        .rposition(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))?;
    let principal: PrincipalId = segments[id_idx].parse().ok()?;

    let action_name = segments[..id_idx].join("_");
    let extra = if id_idx + 1 < segments.len() {
        Some(segments[id_idx + 1..].join("_"))
    } else {
        None
    };

    let action = match action_name.as_str() {
        "merge" => Action::Merge,
        "extract" => Action::Extract,
        "screenshot" => Action::Screenshot,
        "create_post" => Action::CreatePost,
        "cancel" => Action::Cancel,
        other => Action::SetField(MetaField::from_key(other.strip_prefix("set_")?)?),
    };

    Some(CallbackPayload {
        action,
        principal,
        extra,
    })
}

/// Clean an operator-typed output name: trim, drop container extensions,
/// and collapse the doubled `.mkv.mkv` some sources produce.
pub fn normalize_output_name(name: &str) -> String {
    let mut n = name.trim().to_string();
    loop {
        let lower = n.to_lowercase();
        let stripped = if lower.ends_with(".mkv") || lower.ends_with(".mp4") {
            n[..n.len() - 4].to_string()
        } else {
            break;
        };
        n = stripped;
    }
    n
}
