//! Command-line parsing and dispatch onto `AdminApi`

use std::path::PathBuf;

use admin_client::{AdminApi, CurrentValidity, ValidityWindow, category_name};
use anyhow::Result;
use chrono::NaiveDate;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::Config;
use crate::error::Error;

pub const USAGE: &str = "\
usage: interview-admin [--config PATH] <command> [args...]

commands:
  login [username]
  logout
  status
  categories list | create <name> | update <id> <json> | delete <id>
  criteria   list | create <json> | update <id> <json> | delete <id>
  questions  list <category_id> | upload <category_id> <pdf> | update <id> <json> | delete <id>
  candidates list | get <id> | upload <sheet> | update <id> <json> | delete <id>
  validity   show | create <from> <to> | update <id> <from> <to>";

/// Parsed command line.
#[derive(Debug)]
pub struct Cli {
    pub config_path: Option<String>,
    pub command: Command,
}

#[derive(Debug, PartialEq)]
pub enum Command {
    Login { username: Option<String> },
    Logout,
    Status,

    ListCategories,
    CreateCategory { name: String },
    UpdateCategory { id: String, data: Value },
    DeleteCategory { id: String },

    ListCriteria,
    CreateCriteria { data: Value },
    UpdateCriteria { id: String, data: Value },
    DeleteCriteria { id: String },

    ListQuestions { category_id: String },
    UploadQuestions { category_id: String, pdf: PathBuf },
    UpdateQuestion { id: String, data: Value },
    DeleteQuestion { id: String },

    ListCandidates,
    GetCandidate { id: String },
    UploadCandidates { sheet: PathBuf },
    UpdateCandidate { id: String, data: Value },
    DeleteCandidate { id: String },

    ShowValidity,
    CreateValidity { window: ValidityWindow },
    UpdateValidity { id: String, window: ValidityWindow },
}

impl Cli {
    /// Parse arguments, excluding the program name.
    pub fn parse<I>(args: I) -> crate::error::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config_path = None;
        let mut rest = Vec::new();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--config" {
                config_path = Some(
                    args.next()
                        .ok_or_else(|| Error::Usage("--config requires a path".into()))?,
                );
            } else {
                rest.push(arg);
            }
        }

        let words: Vec<&str> = rest.iter().map(String::as_str).collect();
        let command = parse_command(&words)?;
        Ok(Self {
            config_path,
            command,
        })
    }
}

fn parse_command(words: &[&str]) -> crate::error::Result<Command> {
    use Command::*;

    let command = match words {
        ["login"] => Login { username: None },
        ["login", username] => Login {
            username: Some((*username).to_owned()),
        },
        ["logout"] => Logout,
        ["status"] => Status,

        ["categories", "list"] => ListCategories,
        ["categories", "create", name] => CreateCategory {
            name: (*name).to_owned(),
        },
        ["categories", "update", id, data] => UpdateCategory {
            id: (*id).to_owned(),
            data: parse_json(data)?,
        },
        ["categories", "delete", id] => DeleteCategory {
            id: (*id).to_owned(),
        },

        ["criteria", "list"] => ListCriteria,
        ["criteria", "create", data] => CreateCriteria {
            data: parse_json(data)?,
        },
        ["criteria", "update", id, data] => UpdateCriteria {
            id: (*id).to_owned(),
            data: parse_json(data)?,
        },
        ["criteria", "delete", id] => DeleteCriteria {
            id: (*id).to_owned(),
        },

        ["questions", "list", category_id] => ListQuestions {
            category_id: (*category_id).to_owned(),
        },
        ["questions", "upload", category_id, pdf] => UploadQuestions {
            category_id: (*category_id).to_owned(),
            pdf: PathBuf::from(*pdf),
        },
        ["questions", "update", id, data] => UpdateQuestion {
            id: (*id).to_owned(),
            data: parse_json(data)?,
        },
        ["questions", "delete", id] => DeleteQuestion {
            id: (*id).to_owned(),
        },

        ["candidates", "list"] => ListCandidates,
        ["candidates", "get", id] => GetCandidate {
            id: (*id).to_owned(),
        },
        ["candidates", "upload", sheet] => UploadCandidates {
            sheet: PathBuf::from(*sheet),
        },
        ["candidates", "update", id, data] => UpdateCandidate {
            id: (*id).to_owned(),
            data: parse_json(data)?,
        },
        ["candidates", "delete", id] => DeleteCandidate {
            id: (*id).to_owned(),
        },

        ["validity", "show"] => ShowValidity,
        ["validity", "create", from, to] => CreateValidity {
            window: parse_window(from, to)?,
        },
        ["validity", "update", id, from, to] => UpdateValidity {
            id: (*id).to_owned(),
            window: parse_window(from, to)?,
        },

        [] => return Err(Error::Usage("missing command".into())),
        other => return Err(Error::Usage(format!("unrecognized command: {}", other.join(" ")))),
    };
    Ok(command)
}

fn parse_json(raw: &str) -> crate::error::Result<Value> {
    serde_json::from_str(raw).map_err(|e| Error::InvalidJson(e.to_string()))
}

fn parse_window(from: &str, to: &str) -> crate::error::Result<ValidityWindow> {
    ValidityWindow::parse(from, to).map_err(|e| Error::Usage(e.to_string()))
}

/// Run a command and return the JSON to print.
pub async fn run(command: Command, api: &AdminApi, config: &Config) -> Result<Value> {
    debug!(?command, "running command");
    let client = api.client();

    let output = match command {
        Command::Login { username } => {
            let username = username
                .or_else(|| config.session.username.clone())
                .ok_or(Error::MissingUsername)?;
            let password = config
                .session
                .password
                .as_ref()
                .ok_or(Error::MissingPassword)?;
            let response = client.login(&username, password).await?;
            json!({ "logged_in": true, "username": username, "message": response.message })
        }
        Command::Logout => {
            client.logout().await?;
            json!({ "logged_in": false })
        }
        Command::Status => json!({
            "logged_in": client.is_logged_in().await,
            "base_url": client.base_url(),
            "token_path": config.token_path().display().to_string(),
            "cookie_path": config.cookie_path().display().to_string(),
        }),

        Command::ListCategories => categories_with_names(api.categories().await?),
        Command::CreateCategory { name } => api.create_category(&name).await?,
        Command::UpdateCategory { id, data } => api.update_category(&id, data).await?,
        Command::DeleteCategory { id } => api.delete_category(&id).await?,

        Command::ListCriteria => api.criteria().await?,
        Command::CreateCriteria { data } => api.create_criteria(data).await?,
        Command::UpdateCriteria { id, data } => api.update_criteria(&id, data).await?,
        Command::DeleteCriteria { id } => api.delete_criteria(&id).await?,

        Command::ListQuestions { category_id } => api.questions(&category_id).await?,
        Command::UploadQuestions { category_id, pdf } => {
            api.upload_questions(&category_id, &pdf).await?
        }
        Command::UpdateQuestion { id, data } => api.update_question(&id, data).await?,
        Command::DeleteQuestion { id } => api.delete_question(&id).await?,

        Command::ListCandidates => api.candidates().await?,
        Command::GetCandidate { id } => api.candidate(&id).await?,
        Command::UploadCandidates { sheet } => api.upload_candidates(&sheet).await?,
        Command::UpdateCandidate { id, data } => api.update_candidate(&id, data).await?,
        Command::DeleteCandidate { id } => api.delete_candidate(&id).await?,

        Command::ShowValidity => {
            let today = chrono::Local::now().date_naive();
            validity_report(api.validity().await?.as_ref(), today)
        }
        Command::CreateValidity { window } => api.create_validity(&window).await?,
        Command::UpdateValidity { id, window } => api.update_validity(&id, &window).await?,
    };
    Ok(output)
}

/// Flatten nested category names so every entry carries a plain string.
fn categories_with_names(body: Value) -> Value {
    match body {
        Value::Array(categories) => Value::Array(
            categories
                .into_iter()
                .map(|mut category| {
                    let name = category_name(&category);
                    if let Value::Object(ref mut fields) = category {
                        fields.insert("name".into(), Value::String(name));
                    }
                    category
                })
                .collect(),
        ),
        other => other,
    }
}

fn validity_report(current: Option<&CurrentValidity>, today: NaiveDate) -> Value {
    match current {
        Some(current) => {
            let status = if current.window.is_active_on(today) {
                "ACTIVE"
            } else {
                "INACTIVE"
            };
            json!({
                "id": current.id,
                "valid_from": current.window.valid_from.format("%Y-%m-%d").to_string(),
                "valid_to": current.window.valid_to.format("%Y-%m-%d").to_string(),
                "status": status,
            })
        }
        None => json!({ "status": "NOT SET" }),
    }
}
