//! Operator command dispatch
//!
//! Connects parsed protocol lines to the engine, the variable table and
//! storage, and writes the reply text. Replies are one of:
//!
//! - `OK`
//! - `[<CATEGORY>] <LABEL>: <value>` for `GET`
//! - `<LABEL>,<value>` records for `EXPORT`, then `OK`
//! - a status line for `STATUS`
//! - `ERR <TOKEN>`

use core::fmt::Write;

use winder_protocol::{parse_line, Command, JogAxis, ParseError};

use crate::persist::{self, PersistError};
use crate::traits::{Axis, NvStorage};
use crate::vars::{Category, VarEntry, VarError, REGISTRY};
use crate::winder::{RequestError, Winder};

/// Errors that can occur while handling a command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    Parse(ParseError),
    Var(VarError),
    Request(RequestError),
    Persist(PersistError),
    /// Reply did not fit the output
    Overflow,
}

impl CommandError {
    pub fn as_token(&self) -> &'static str {
        match self {
            CommandError::Parse(e) => e.as_token(),
            CommandError::Var(e) => e.as_token(),
            CommandError::Request(e) => e.as_token(),
            CommandError::Persist(e) => e.as_token(),
            CommandError::Overflow => "OVERFLOW",
        }
    }
}

impl From<ParseError> for CommandError {
    fn from(e: ParseError) -> Self {
        CommandError::Parse(e)
    }
}

impl From<VarError> for CommandError {
    fn from(e: VarError) -> Self {
        CommandError::Var(e)
    }
}

impl From<RequestError> for CommandError {
    fn from(e: RequestError) -> Self {
        CommandError::Request(e)
    }
}

impl From<PersistError> for CommandError {
    fn from(e: PersistError) -> Self {
        CommandError::Persist(e)
    }
}

impl From<core::fmt::Error> for CommandError {
    fn from(_: core::fmt::Error) -> Self {
        CommandError::Overflow
    }
}

/// Parse and execute one line, writing the reply
///
/// Failures are answered with `ERR <TOKEN>` and also returned so the caller
/// can log them.
pub fn handle_line<S: NvStorage, W: Write>(
    winder: &mut Winder,
    storage: &mut S,
    line: &str,
    now_ms: u64,
    out: &mut W,
) -> Result<(), CommandError> {
    let result = parse_line(line)
        .map_err(CommandError::from)
        .and_then(|command| execute(winder, storage, command, now_ms, out));
    if let Err(e) = result {
        writeln!(out, "ERR {}", e.as_token())?;
    }
    result
}

/// Execute a parsed command, writing the reply on success
pub fn execute<S: NvStorage, W: Write>(
    winder: &mut Winder,
    storage: &mut S,
    command: Command<'_>,
    now_ms: u64,
    out: &mut W,
) -> Result<(), CommandError> {
    match command {
        Command::Set { label, value } | Command::Import { label, value } => {
            REGISTRY.set(winder, label, value)?;
        }
        Command::Get { label: Some(label) } => {
            let entry = REGISTRY.find(label)?;
            return write_entry(out, entry, winder);
        }
        Command::Get { label: None } => {
            for entry in REGISTRY.entries() {
                write_entry(out, entry, winder)?;
            }
            return Ok(());
        }
        Command::Start => winder.request_start()?,
        Command::Pause => winder.request_pause(),
        Command::Resume => winder.request_resume(),
        Command::Stop => winder.request_stop(),
        Command::Home => winder.request_home()?,
        Command::Reset => winder.request_reset()?,
        Command::Jog { axis, rpm } => {
            let axis = match axis {
                JogAxis::Winder => Axis::Winder,
                JogAxis::Traverse => Axis::Traverse,
            };
            winder.request_jog(axis, rpm, now_ms)?;
        }
        Command::JogPing => winder.jog_ping(now_ms),
        Command::MoveWinder { steps } => winder.request_move_winder(steps as i64)?,
        Command::MoveTraverse { mm } => winder.request_move_traverse(mm)?,
        Command::Status => {
            writeln!(out, "{}", winder.status())?;
            return Ok(());
        }
        Command::SaveConfig => {
            ensure_idle(winder)?;
            persist::save_machine(storage, winder)?;
        }
        Command::SavePreset { slot } => {
            ensure_idle(winder)?;
            persist::save_preset(storage, winder, slot)?;
        }
        Command::LoadPreset { slot } => {
            ensure_idle(winder)?;
            persist::load_preset(storage, winder, slot)?;
        }
        Command::Export => {
            for category in [Category::Machine, Category::Preset] {
                for entry in REGISTRY.persisted(category) {
                    writeln!(out, "{},{}", entry.label, entry.format(winder))?;
                }
            }
        }
    }
    writeln!(out, "OK")?;
    Ok(())
}

/// Storage access stalls the caller; only allowed with no motion pending
fn ensure_idle(winder: &Winder) -> Result<(), CommandError> {
    if winder.is_idle() {
        Ok(())
    } else {
        Err(RequestError::Busy.into())
    }
}

fn write_entry<W: Write>(
    out: &mut W,
    entry: &VarEntry<Winder>,
    winder: &Winder,
) -> Result<(), CommandError> {
    writeln!(
        out,
        "[{}] {}: {}",
        entry.category.name(),
        entry.label,
        entry.format(winder)
    )?;
    Ok(())
}
