use crate::editor::{ConnectOutcome, TopologyEditor};
use crate::error::TopologyError;
use crate::ir::{Direction, PortId, Position, TerminalCategory, VlanList};
use crate::snap::{PortLayout, SnapDecision};
use crate::store::{CableConfig, EntityPatch, Handle, PortPatch, TerminalConfig};
use anyhow::{Context, Result, anyhow, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?P<key>[A-Za-z_]+)="(?P<kv>[^"]*)"|"(?P<quoted>[^"]*)"|(?P<bare>\S+)"#)
        .unwrap()
});
static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<key>[A-Za-z_]+)=(?P<value>.*)$").unwrap());

/// A user intent issued by the UI layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Intent {
    AddSwitch,
    AddFreeTerminal,
    AttachTerminal {
        switch: String,
        port: u8,
        #[serde(default)]
        config: TerminalConfig,
    },
    DetachTerminal {
        terminal: String,
    },
    DropTerminal {
        terminal: String,
        position: Position,
    },
    AddCable {
        source: String,
        source_port: u8,
        target: String,
        target_port: u8,
        #[serde(default)]
        config: CableConfig,
    },
    Connect {
        source: Handle,
        target: Handle,
    },
    UpdateEntity {
        id: String,
        patch: EntityPatch,
    },
    DeleteSwitch {
        id: String,
    },
    DeleteTerminal {
        id: String,
    },
    DeleteCable {
        id: String,
    },
    /// Deletes whatever entity carries `id`.
    Delete {
        id: String,
    },
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum Outcome {
    Created { id: String },
    Applied,
    Snapped { switch: String, port: u8 },
    Released,
    /// Nothing happened: a rejected connect gesture or an empty undo/redo
    /// stack.
    Ignored,
}

impl<L: PortLayout> TopologyEditor<L> {
    pub fn apply(&mut self, intent: &Intent) -> Result<Outcome, TopologyError> {
        let outcome = match intent {
            Intent::AddSwitch => Outcome::Created {
                id: self.add_switch(),
            },
            Intent::AddFreeTerminal => Outcome::Created {
                id: self.add_free_terminal(),
            },
            Intent::AttachTerminal {
                switch,
                port,
                config,
            } => Outcome::Created {
                id: self.attach_terminal(switch, *port, config)?,
            },
            Intent::DetachTerminal { terminal } => {
                self.detach_terminal(terminal)?;
                Outcome::Applied
            }
            Intent::DropTerminal { terminal, position } => {
                match self.drop_terminal(terminal, *position)? {
                    SnapDecision::Attach { switch, port, .. } => Outcome::Snapped {
                        switch,
                        port: port.number(),
                    },
                    SnapDecision::Release { .. } => Outcome::Released,
                }
            }
            Intent::AddCable {
                source,
                source_port,
                target,
                target_port,
                config,
            } => Outcome::Created {
                id: self.add_cable(source, *source_port, target, *target_port, config)?,
            },
            Intent::Connect { source, target } => match self.connect(source, target)? {
                ConnectOutcome::Connected(id) => Outcome::Created { id },
                ConnectOutcome::NoOp(_) => Outcome::Ignored,
            },
            Intent::UpdateEntity { id, patch } => {
                self.update_entity(id, patch)?;
                Outcome::Applied
            }
            Intent::DeleteSwitch { id } => {
                self.delete_switch(id)?;
                Outcome::Applied
            }
            Intent::DeleteTerminal { id } => {
                self.delete_terminal(id)?;
                Outcome::Applied
            }
            Intent::DeleteCable { id } => {
                self.delete_cable(id)?;
                Outcome::Applied
            }
            Intent::Delete { id } => {
                let topo = self.topology();
                let (is_switch, is_terminal, is_cable) = (
                    topo.switch(id).is_some(),
                    topo.terminal(id).is_some(),
                    topo.cable(id).is_some(),
                );
                if is_switch {
                    self.delete_switch(id)?;
                } else if is_terminal {
                    self.delete_terminal(id)?;
                } else if is_cable {
                    self.delete_cable(id)?;
                } else {
                    return Err(TopologyError::InvalidReference(format!("`{id}`")));
                }
                Outcome::Applied
            }
            Intent::Undo => {
                if self.undo() {
                    Outcome::Applied
                } else {
                    Outcome::Ignored
                }
            }
            Intent::Redo => {
                if self.redo() {
                    Outcome::Applied
                } else {
                    Outcome::Ignored
                }
            }
        };
        Ok(outcome)
    }
}

#[derive(Debug, Clone)]
pub struct ScriptLine {
    pub line: usize,
    pub text: String,
    pub intent: Intent,
}

#[derive(Debug, Default)]
struct Tokens {
    args: Vec<String>,
    options: HashMap<String, String>,
}

impl Tokens {
    fn arg(&self, idx: usize, name: &str) -> Result<&str> {
        self.args
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing <{name}>"))
    }

    fn parsed_arg<T>(&self, idx: usize, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.arg(idx, name)?;
        raw.parse::<T>()
            .map_err(|err| anyhow!("invalid <{name}> `{raw}`: {err}"))
    }

    fn option<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.options
            .get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|err| anyhow!("invalid {key}=`{raw}`: {err}"))
            })
            .transpose()
    }

    fn label(&self) -> Option<String> {
        self.options.get("label").cloned()
    }

    fn expect_args(&self, count: usize, usage: &str) -> Result<()> {
        if self.args.len() != count {
            bail!("expected `{usage}`");
        }
        Ok(())
    }

    fn reject_unknown(&self, allowed: &[&str]) -> Result<()> {
        if let Some(key) = self.options.keys().find(|key| !allowed.contains(&key.as_str())) {
            bail!("unknown option `{key}`");
        }
        Ok(())
    }
}

fn tokenize(line: &str) -> Tokens {
    let mut tokens = Tokens::default();
    for caps in TOKEN_RE.captures_iter(line) {
        if let (Some(key), Some(value)) = (caps.name("key"), caps.name("kv")) {
            tokens
                .options
                .insert(key.as_str().to_string(), value.as_str().to_string());
        } else if let Some(quoted) = caps.name("quoted") {
            tokens.args.push(quoted.as_str().to_string());
        } else if let Some(bare) = caps.name("bare") {
            match OPTION_RE.captures(bare.as_str()) {
                Some(opt) => {
                    tokens
                        .options
                        .insert(opt["key"].to_string(), opt["value"].to_string());
                }
                None => tokens.args.push(bare.as_str().to_string()),
            }
        }
    }
    tokens
}

fn port_handle(raw: &str) -> String {
    if raw.starts_with("p-") {
        raw.to_string()
    } else {
        format!("p-{raw}")
    }
}

/// Parses one script line. Blank lines and `#` comments yield `None`.
pub fn parse_intent(line: &str) -> Result<Option<Intent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let tokens = tokenize(rest);

    let intent = match command {
        "switch" => {
            tokens.expect_args(0, "switch")?;
            Intent::AddSwitch
        }
        "terminal" => {
            tokens.expect_args(0, "terminal")?;
            Intent::AddFreeTerminal
        }
        "attach" => {
            tokens.expect_args(2, "attach <switch> <port> [options]")?;
            tokens.reject_unknown(&["label", "category", "direction", "vlan", "terminal"])?;
            Intent::AttachTerminal {
                switch: tokens.arg(0, "switch")?.to_string(),
                port: tokens.parsed_arg(1, "port")?,
                config: TerminalConfig {
                    terminal: tokens.options.get("terminal").cloned(),
                    label: tokens.label(),
                    category: tokens.option::<TerminalCategory>("category")?,
                    direction: tokens.option::<Direction>("direction")?,
                    native_vlan: tokens.option::<u16>("vlan")?,
                },
            }
        }
        "detach" => {
            tokens.expect_args(1, "detach <terminal>")?;
            Intent::DetachTerminal {
                terminal: tokens.arg(0, "terminal")?.to_string(),
            }
        }
        "drop" => {
            tokens.expect_args(3, "drop <terminal> <x> <y>")?;
            Intent::DropTerminal {
                terminal: tokens.arg(0, "terminal")?.to_string(),
                position: Position::new(tokens.parsed_arg(1, "x")?, tokens.parsed_arg(2, "y")?)
                    .finite()?,
            }
        }
        "cable" => {
            tokens.expect_args(4, "cable <switch> <port> <switch> <port> [options]")?;
            tokens.reject_unknown(&["label", "direction"])?;
            Intent::AddCable {
                source: tokens.arg(0, "switch")?.to_string(),
                source_port: tokens.parsed_arg(1, "port")?,
                target: tokens.arg(2, "switch")?.to_string(),
                target_port: tokens.parsed_arg(3, "port")?,
                config: CableConfig {
                    label: tokens.label(),
                    direction: tokens.option::<Direction>("direction")?,
                },
            }
        }
        "connect" => {
            tokens.expect_args(4, "connect <node> <handle> <node> <handle>")?;
            Intent::Connect {
                source: Handle::new(tokens.arg(0, "node")?, port_handle(tokens.arg(1, "handle")?)),
                target: Handle::new(tokens.arg(2, "node")?, port_handle(tokens.arg(3, "handle")?)),
            }
        }
        "set" => {
            tokens.expect_args(1, "set <id> [options]")?;
            tokens.reject_unknown(&["label", "x", "y", "category", "direction"])?;
            let x = tokens.option::<f32>("x")?;
            let y = tokens.option::<f32>("y")?;
            let position = match (x, y) {
                (Some(x), Some(y)) => Some(Position::new(x, y).finite()?),
                (None, None) => None,
                _ => bail!("x and y must be given together"),
            };
            Intent::UpdateEntity {
                id: tokens.arg(0, "id")?.to_string(),
                patch: EntityPatch {
                    label: tokens.label(),
                    position,
                    category: tokens.option::<TerminalCategory>("category")?,
                    direction: tokens.option::<Direction>("direction")?,
                    ports: Vec::new(),
                },
            }
        }
        "port" => {
            tokens.expect_args(2, "port <switch> <port> [options]")?;
            tokens.reject_unknown(&["label", "pvid", "vlans"])?;
            let number: u8 = tokens.parsed_arg(1, "port")?;
            let port = PortId::try_from(number)?;
            Intent::UpdateEntity {
                id: tokens.arg(0, "switch")?.to_string(),
                patch: EntityPatch {
                    ports: vec![PortPatch {
                        port,
                        label: tokens.label(),
                        native_vlan: tokens.option::<u16>("pvid")?,
                        permitted_vlans: tokens.option::<VlanList>("vlans")?,
                    }],
                    ..EntityPatch::default()
                },
            }
        }
        "delete" => {
            tokens.expect_args(1, "delete <id>")?;
            Intent::Delete {
                id: tokens.arg(0, "id")?.to_string(),
            }
        }
        "undo" => {
            tokens.expect_args(0, "undo")?;
            Intent::Undo
        }
        "redo" => {
            tokens.expect_args(0, "redo")?;
            Intent::Redo
        }
        other => bail!("unknown command `{other}`"),
    };
    Ok(Some(intent))
}

pub fn parse_script(input: &str) -> Result<Vec<ScriptLine>> {
    let mut lines = Vec::new();
    for (idx, text) in input.lines().enumerate() {
        let line = idx + 1;
        if let Some(intent) =
            parse_intent(text).with_context(|| format!("line {line}: `{}`", text.trim()))?
        {
            lines.push(ScriptLine {
                line,
                text: text.trim().to_string(),
                intent,
            });
        }
    }
    Ok(lines)
}
