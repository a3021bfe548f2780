use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Named(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    SetUrl {
        url: String,
    },
    Discover,
    SelectModels(Selection),
    SelectPrompts(Selection),
    ManualPrompt(Option<String>),
    Generate,
    Cancel,
    /// `job_id` is filled in by the UI from the current selection.
    Evaluate {
        job_id: Option<String>,
        scores: [u8; 4],
        comments: String,
    },
    History {
        job_id: Option<String>,
    },
    /// Draft comment kept by the UI for key-driven evaluations.
    Comment(String),
    Help,
    Quit,
    Unknown(String),
}

pub const COMMAND_NAMES: [&str; 12] = [
    "url", "discover", "models", "prompts", "manual", "generate", "cancel", "eval", "history",
    "comment", "help", "quit",
];

pub const HELP_TEXT: &str = "commands: url <base> | discover | models <a,b>|all | prompts <a,b>|all | manual <text>|clear | generate | cancel | eval <color> <layout> <correct> <func> [comments] | comment <text> | history | help | quit";

fn parse_selection(args: &[&str]) -> Option<Selection> {
    let joined = args.join(" ");
    let joined = joined.trim();
    if joined.is_empty() {
        return None;
    }
    if joined.eq_ignore_ascii_case("all") {
        return Some(Selection::All);
    }
    let names: Vec<String> = joined
        .split(|c| c == ',' || c == ' ')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    Some(Selection::Named(names))
}

/// Everything after the first `n` whitespace-separated words, untouched.
fn rest_after(s: &str, n: usize) -> &str {
    let mut rest = s.trim_start();
    for _ in 0..n {
        rest = rest
            .find(char::is_whitespace)
            .map(|i| rest[i..].trim_start())
            .unwrap_or("");
    }
    rest
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "url" => match parts.get(1) {
                Some(url) => Ok(AppCommand::SetUrl {
                    url: url.to_string(),
                }),
                None => Ok(AppCommand::Unknown("usage: url <base_url>".to_string())),
            },
            "discover" => Ok(AppCommand::Discover),
            "models" | "model" => match parse_selection(&parts[1..]) {
                Some(sel) => Ok(AppCommand::SelectModels(sel)),
                None => Ok(AppCommand::Unknown("usage: models <a,b,...> | models all".to_string())),
            },
            "prompts" | "prompt" => match parse_selection(&parts[1..]) {
                Some(sel) => Ok(AppCommand::SelectPrompts(sel)),
                None => Ok(AppCommand::Unknown(
                    "usage: prompts <a,b,...> | prompts all".to_string(),
                )),
            },
            "manual" => {
                let text = rest_after(s, 1).trim();
                if text.is_empty() {
                    Ok(AppCommand::Unknown("usage: manual <text> | manual clear".to_string()))
                } else if text == "clear" {
                    Ok(AppCommand::ManualPrompt(None))
                } else {
                    Ok(AppCommand::ManualPrompt(Some(text.to_string())))
                }
            }
            "generate" | "gen" => Ok(AppCommand::Generate),
            "cancel" | "stop" => Ok(AppCommand::Cancel),
            "eval" => {
                let nums: Vec<u8> = parts[1..]
                    .iter()
                    .take(4)
                    .map_while(|p| p.parse::<u8>().ok())
                    .collect();
                if nums.len() < 4 {
                    return Ok(AppCommand::Unknown(
                        "usage: eval <color> <layout> <correct> <func> [comments]".to_string(),
                    ));
                }
                Ok(AppCommand::Evaluate {
                    job_id: None,
                    scores: [nums[0], nums[1], nums[2], nums[3]],
                    comments: rest_after(s, 5).trim().to_string(),
                })
            }
            "comment" => Ok(AppCommand::Comment(rest_after(s, 1).trim().to_string())),
            "history" => Ok(AppCommand::History { job_id: None }),
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("unknown command: {}", parts[0]))),
        }
    }
}
