//! Request lines understood by the controller
//!
//! Parsing borrows from the received line; nothing is copied.

/// Axis selector for jog commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JogAxis {
    /// Spindle (`JW`)
    Winder,
    /// Wire guide (`JT`)
    Traverse,
}

/// A parsed request line
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// `SET <LABEL>=<value>`
    Set { label: &'a str, value: &'a str },
    /// `GET <LABEL>`, or `GET` alone for a full dump
    Get { label: Option<&'a str> },
    /// `START`
    Start,
    /// `PAUSE`
    Pause,
    /// `RESUME`
    Resume,
    /// `STOP`
    Stop,
    /// `HOME`
    Home,
    /// `RESET` (acknowledge an error)
    Reset,
    /// `JW <rpm>` / `JT <rpm>`; the sign selects the direction
    Jog { axis: JogAxis, rpm: i32 },
    /// `JOG PING`
    JogPing,
    /// `MW <steps>` relative winder move
    MoveWinder { steps: i32 },
    /// `MT <mm>` absolute traverse move
    MoveTraverse { mm: f32 },
    /// `STATUS`
    Status,
    /// `SAVE CONFIG`
    SaveConfig,
    /// `SAVE <slot>`
    SavePreset { slot: u8 },
    /// `LOAD <slot>`
    LoadPreset { slot: u8 },
    /// `EXPORT`
    Export,
    /// `IMPORT <LABEL>,<value>`
    Import { label: &'a str, value: &'a str },
}

/// Errors that can occur while parsing a request line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Line was empty
    Empty,
    /// First word is not a known verb
    UnknownVerb,
    /// Verb requires an argument that is missing
    MissingArgument,
    /// Numeric argument did not parse
    InvalidNumber,
    /// `SET` without `=` or `IMPORT` without `,`
    MalformedAssignment,
}

impl ParseError {
    /// Reply token for this error
    pub fn as_token(&self) -> &'static str {
        match self {
            ParseError::Empty => "EMPTY",
            ParseError::UnknownVerb => "UNKNOWN_COMMAND",
            ParseError::MissingArgument => "MISSING_ARGUMENT",
            ParseError::InvalidNumber => "INVALID_NUMBER",
            ParseError::MalformedAssignment => "MALFORMED",
        }
    }
}

/// Parse one request line
pub fn parse_line(line: &str) -> Result<Command<'_>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let (verb, rest) = match line.split_once(' ') {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb {
        "SET" => {
            let (label, value) = split_pair(rest, '=')?;
            Ok(Command::Set { label, value })
        }
        "GET" => Ok(Command::Get {
            label: if rest.is_empty() { None } else { Some(rest) },
        }),
        "START" => Ok(Command::Start),
        "PAUSE" => Ok(Command::Pause),
        "RESUME" => Ok(Command::Resume),
        "STOP" => Ok(Command::Stop),
        "HOME" => Ok(Command::Home),
        "RESET" => Ok(Command::Reset),
        "STATUS" => Ok(Command::Status),
        "EXPORT" => Ok(Command::Export),
        "JOG" => match rest {
            "PING" => Ok(Command::JogPing),
            "" => Err(ParseError::MissingArgument),
            _ => Err(ParseError::UnknownVerb),
        },
        "JW" => Ok(Command::Jog {
            axis: JogAxis::Winder,
            rpm: parse_number(rest)?,
        }),
        "JT" => Ok(Command::Jog {
            axis: JogAxis::Traverse,
            rpm: parse_number(rest)?,
        }),
        "MW" => Ok(Command::MoveWinder {
            steps: parse_number(rest)?,
        }),
        "MT" => Ok(Command::MoveTraverse {
            mm: parse_finite(rest)?,
        }),
        "SAVE" => match rest {
            "" => Err(ParseError::MissingArgument),
            "CONFIG" => Ok(Command::SaveConfig),
            slot => Ok(Command::SavePreset {
                slot: parse_number(slot)?,
            }),
        },
        "LOAD" => Ok(Command::LoadPreset {
            slot: parse_number(rest)?,
        }),
        "IMPORT" => {
            let (label, value) = split_pair(rest, ',')?;
            Ok(Command::Import { label, value })
        }
        _ => Err(ParseError::UnknownVerb),
    }
}

fn split_pair(rest: &str, separator: char) -> Result<(&str, &str), ParseError> {
    if rest.is_empty() {
        return Err(ParseError::MissingArgument);
    }
    let (label, value) = rest
        .split_once(separator)
        .ok_or(ParseError::MalformedAssignment)?;
    let label = label.trim();
    if label.is_empty() {
        return Err(ParseError::MalformedAssignment);
    }
    Ok((label, value.trim()))
}

fn parse_number<T: core::str::FromStr>(text: &str) -> Result<T, ParseError> {
    if text.is_empty() {
        return Err(ParseError::MissingArgument);
    }
    text.parse().map_err(|_| ParseError::InvalidNumber)
}

/// `inf` and `NaN` parse as `f32` but are never a position
fn parse_finite(text: &str) -> Result<f32, ParseError> {
    let value: f32 = parse_number(text)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParseError::InvalidNumber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::format;

    #[test]
    fn test_set_with_spaces_in_label() {
        assert_eq!(
            parse_line("SET SCREW PITCH=1.25"),
            Ok(Command::Set {
                label: "SCREW PITCH",
                value: "1.25"
            })
        );
        assert_eq!(
            parse_line("SET NAME = Humbucker A "),
            Ok(Command::Set {
                label: "NAME",
                value: "Humbucker A"
            })
        );
    }

    #[test]
    fn test_set_malformed() {
        assert_eq!(parse_line("SET WIRE"), Err(ParseError::MalformedAssignment));
        assert_eq!(parse_line("SET =3"), Err(ParseError::MalformedAssignment));
        assert_eq!(parse_line("SET"), Err(ParseError::MissingArgument));
    }

    #[test]
    fn test_get_forms() {
        assert_eq!(parse_line("GET"), Ok(Command::Get { label: None }));
        assert_eq!(
            parse_line("GET IS HOMED"),
            Ok(Command::Get {
                label: Some("IS HOMED")
            })
        );
    }

    #[test]
    fn test_plain_verbs() {
        assert_eq!(parse_line("START"), Ok(Command::Start));
        assert_eq!(parse_line("PAUSE"), Ok(Command::Pause));
        assert_eq!(parse_line("RESUME"), Ok(Command::Resume));
        assert_eq!(parse_line("STOP"), Ok(Command::Stop));
        assert_eq!(parse_line("HOME"), Ok(Command::Home));
        assert_eq!(parse_line("RESET"), Ok(Command::Reset));
        assert_eq!(parse_line("STATUS"), Ok(Command::Status));
        assert_eq!(parse_line("EXPORT"), Ok(Command::Export));
        assert_eq!(parse_line("JOG PING"), Ok(Command::JogPing));
    }

    #[test]
    fn test_verbs_are_case_sensitive() {
        assert_eq!(parse_line("start"), Err(ParseError::UnknownVerb));
    }

    #[test]
    fn test_jog_and_moves() {
        assert_eq!(
            parse_line("JW -1000"),
            Ok(Command::Jog {
                axis: JogAxis::Winder,
                rpm: -1000
            })
        );
        assert_eq!(
            parse_line("JT 60"),
            Ok(Command::Jog {
                axis: JogAxis::Traverse,
                rpm: 60
            })
        );
        assert_eq!(parse_line("MW 3200"), Ok(Command::MoveWinder { steps: 3200 }));
        assert_eq!(parse_line("MT 2.5"), Ok(Command::MoveTraverse { mm: 2.5 }));
        assert_eq!(parse_line("JW fast"), Err(ParseError::InvalidNumber));
        assert_eq!(parse_line("MT"), Err(ParseError::MissingArgument));
    }

    #[test]
    fn test_move_traverse_rejects_non_finite() {
        for text in ["MT inf", "MT -inf", "MT NaN", "MT infinity"] {
            assert_eq!(parse_line(text), Err(ParseError::InvalidNumber), "{}", text);
        }
    }

    #[test]
    fn test_save_and_load() {
        assert_eq!(parse_line("SAVE CONFIG"), Ok(Command::SaveConfig));
        assert_eq!(parse_line("SAVE 4"), Ok(Command::SavePreset { slot: 4 }));
        assert_eq!(parse_line("LOAD 0"), Ok(Command::LoadPreset { slot: 0 }));
        assert_eq!(parse_line("SAVE"), Err(ParseError::MissingArgument));
        assert_eq!(parse_line("LOAD 300"), Err(ParseError::InvalidNumber));
    }

    #[test]
    fn test_import_record() {
        assert_eq!(
            parse_line("IMPORT COIL LENGTH,12.700"),
            Ok(Command::Import {
                label: "COIL LENGTH",
                value: "12.700"
            })
        );
        assert_eq!(parse_line("IMPORT WIRE"), Err(ParseError::MalformedAssignment));
    }

    #[test]
    fn test_empty_and_unknown() {
        assert_eq!(parse_line("   "), Err(ParseError::Empty));
        assert_eq!(parse_line("FLY"), Err(ParseError::UnknownVerb));
        assert_eq!(parse_line("JOG"), Err(ParseError::MissingArgument));
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(line in "\\PC{0,96}") {
            let _ = parse_line(&line);
        }

        #[test]
        fn prop_set_roundtrips_label_and_value(
            label in "[A-Z][A-Z ]{0,20}[A-Z]",
            value in "[0-9a-zA-Z.]{1,12}",
        ) {
            let line = format!("SET {}={}", label, value);
            prop_assert_eq!(
                parse_line(&line),
                Ok(Command::Set { label: label.as_str(), value: value.as_str() })
            );
        }
    }
}
