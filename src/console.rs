//! Operator console: one command per line against a local hub.

use crate::error::AuthError;
use crate::hub::Hub;
use crate::identity::Permit;

pub const HELP: &str = "Commands:
  create <identity> <password>       create an identity in the authenticator
  passwd <identity> <password>       change a password (invalidates sessions)
  login <identity> <password>        create a session, prints the session key
  once <identity> <password>         once-off authentication, no session
  session <key>                      show the token behind a session key
  logout <key>                       erase a session
  permit <identity>                  show a permit (base64)
  setpermit <identity> <base64>      replace a permit
  permits                            list all permits
  identities                         list authenticator identities
  invalidate <identity>              invalidate every session of an identity
  stats                              show counters
  help                               show this help
  quit | exit                        leave the console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Output(String),
    Quit,
}

fn usage(text: &str) -> Result<Outcome, String> {
    Err(format!("usage: {}", text))
}

fn render(e: AuthError) -> String { e.to_string() }

/// Run one console line. Errors come back as printable text.
pub fn execute(hub: &Hub, line: &str) -> Result<Outcome, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(cmd) = parts.first() else { return Ok(Outcome::Output(String::new())); };
    let args = &parts[1..];
    match (cmd.to_ascii_lowercase().as_str(), args) {
        ("quit" | "exit", _) => Ok(Outcome::Quit),
        ("help", _) => Ok(Outcome::Output(HELP.to_string())),
        ("create", [identity, password]) => {
            hub.create_authenticator_identity(identity, password).map_err(render)?;
            Ok(Outcome::Output(format!("created {}", identity)))
        }
        ("create", _) => usage("create <identity> <password>"),
        ("passwd", [identity, password]) => {
            hub.set_password(identity, password).map_err(render)?;
            Ok(Outcome::Output(format!("password changed for {}", identity)))
        }
        ("passwd", _) => usage("passwd <identity> <password>"),
        ("login", [identity, password]) => {
            let (key, token) = hub.login(identity, password).map_err(render)?;
            Ok(Outcome::Output(format!("{} (expires {})", key, token.expires.to_rfc3339())))
        }
        ("login", _) => usage("login <identity> <password>"),
        ("once", [identity, password]) => {
            let token = hub.get_token_from_identity_password(identity, password).map_err(render)?;
            Ok(Outcome::Output(format!("{} permit={}", token.identity, token.permit.serialize())))
        }
        ("once", _) => usage("once <identity> <password>"),
        ("session", [key]) => {
            let token = hub.get_token_from_session(key).map_err(render)?;
            Ok(Outcome::Output(format!(
                "{} expires={} permit={}",
                token.identity,
                token.expires.to_rfc3339(),
                token.permit.serialize()
            )))
        }
        ("session", _) => usage("session <key>"),
        ("logout", [key]) => {
            hub.logout(key).map_err(render)?;
            Ok(Outcome::Output("logged out".to_string()))
        }
        ("logout", _) => usage("logout <key>"),
        ("permit", [identity]) => {
            let permit = hub.get_permit(identity).map_err(render)?;
            Ok(Outcome::Output(permit.serialize()))
        }
        ("permit", _) => usage("permit <identity>"),
        ("setpermit", [identity, encoded]) => {
            let permit = Permit::deserialize(encoded).map_err(|e| format!("invalid permit encoding: {}", e))?;
            hub.set_permit(identity, &permit).map_err(render)?;
            Ok(Outcome::Output(format!("permit set for {}", identity)))
        }
        ("setpermit", _) => usage("setpermit <identity> <base64>"),
        ("permits", []) => {
            let mut rows: Vec<String> = hub
                .get_permits()
                .map_err(render)?
                .into_iter()
                .map(|(identity, permit)| format!("{} {}", identity, permit.serialize()))
                .collect();
            rows.sort();
            Ok(Outcome::Output(rows.join("\n")))
        }
        ("permits", _) => usage("permits"),
        ("identities", []) => {
            let ids = hub.get_authenticator_identities().map_err(render)?;
            Ok(Outcome::Output(ids.join("\n")))
        }
        ("identities", _) => usage("identities"),
        ("invalidate", [identity]) => {
            hub.invalidate_sessions_for_identity(identity).map_err(render)?;
            Ok(Outcome::Output(format!("sessions invalidated for {}", identity)))
        }
        ("invalidate", _) => usage("invalidate <identity>"),
        ("stats", []) => {
            let snapshot = hub.stats().snapshot();
            let text = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
            Ok(Outcome::Output(text))
        }
        ("stats", _) => usage("stats"),
        (other, _) => Err(format!("unknown command '{}'; type 'help'", other)),
    }
}
