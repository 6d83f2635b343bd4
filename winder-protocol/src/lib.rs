//! Operator Line Protocol
//!
//! This crate defines the text protocol spoken between an operator-facing
//! collaborator (serial terminal, Wi-Fi bridge, web UI) and the winder
//! controller. The protocol is line oriented and human readable so it can be
//! typed by hand into a terminal.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌─────────────────────────────┬────────────────────────────────┐
//! │ Request line                │ Reply                          │
//! ├─────────────────────────────┼────────────────────────────────┤
//! │ SET <LABEL>=<value>         │ OK | ERR <TOKEN>               │
//! │ GET <LABEL>                 │ [<CATEGORY>] <LABEL>: <value>  │
//! │ GET                         │ one line per variable          │
//! │ START|PAUSE|RESUME|STOP|... │ OK | ERR <TOKEN>               │
//! └─────────────────────────────┴────────────────────────────────┘
//! ```
//!
//! Lines are terminated by `\n` (a preceding `\r` is ignored). Labels are
//! case-sensitive and may contain spaces.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod command;
pub mod line;

pub use command::{parse_line, Command, JogAxis, ParseError};
pub use line::{Line, LineError, LineParser, MAX_LINE_LEN};
