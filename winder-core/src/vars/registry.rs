//! Label-keyed typed access to struct fields
//!
//! Each entry binds an operator-facing label to a getter and an optional
//! setter over a host struct. Values cross the boundary as text, formatted
//! and parsed according to the entry's declared type. Entry order within a
//! category is the storage layout; see [`crate::persist`].

use core::fmt::Write;

use heapless::String;

/// Formatted value of a variable
pub type ValueText = String<48>;

/// Variable category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Category {
    /// Machine configuration, persisted as one block
    Machine,
    /// Active preset, persisted per slot
    Preset,
    /// Live engine state, never persisted
    Runtime,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Machine => "MACHINE",
            Category::Preset => "PRESET",
            Category::Runtime => "RUNTIME",
        }
    }

    /// Tag byte used in storage block headers
    pub fn code(self) -> u8 {
        match self {
            Category::Machine => 0,
            Category::Preset => 1,
            Category::Runtime => 2,
        }
    }

    pub fn is_persisted(self) -> bool {
        !matches!(self, Category::Runtime)
    }
}

/// Declared value type of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VarType {
    Int,
    Long,
    Float,
    Bool,
    Text,
}

/// Typed getter/setter pair
///
/// A missing setter makes the entry read-only.
pub enum Accessor<T: 'static> {
    Int {
        get: fn(&T) -> i32,
        set: Option<fn(&mut T, i32)>,
    },
    Long {
        get: fn(&T) -> i64,
        set: Option<fn(&mut T, i64)>,
    },
    Float {
        get: fn(&T) -> f32,
        set: Option<fn(&mut T, f32)>,
    },
    Bool {
        get: fn(&T) -> bool,
        set: Option<fn(&mut T, bool)>,
    },
    Text {
        get: fn(&T) -> &str,
        set: Option<fn(&mut T, &str)>,
        /// Longer values are truncated to this many bytes
        max_len: usize,
    },
}

/// A typed value read from or written to an entry
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VarValue<'a> {
    Int(i32),
    Long(i64),
    Float(f32),
    Bool(bool),
    Text(&'a str),
}

/// Errors that can occur with variable access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VarError {
    /// No entry with this label
    UnknownVariable,
    /// Value text does not parse as the entry's type
    InvalidValue,
    /// Entry has no setter
    ReadOnly,
}

impl VarError {
    pub fn as_token(&self) -> &'static str {
        match self {
            VarError::UnknownVariable => "UNKNOWN_VARIABLE",
            VarError::InvalidValue => "INVALID_VALUE",
            VarError::ReadOnly => "READ_ONLY",
        }
    }
}

/// One variable table entry
pub struct VarEntry<T: 'static> {
    pub label: &'static str,
    pub category: Category,
    pub access: Accessor<T>,
}

impl<T: 'static> VarEntry<T> {
    pub fn var_type(&self) -> VarType {
        match self.access {
            Accessor::Int { .. } => VarType::Int,
            Accessor::Long { .. } => VarType::Long,
            Accessor::Float { .. } => VarType::Float,
            Accessor::Bool { .. } => VarType::Bool,
            Accessor::Text { .. } => VarType::Text,
        }
    }

    pub fn is_writable(&self) -> bool {
        match &self.access {
            Accessor::Int { set, .. } => set.is_some(),
            Accessor::Long { set, .. } => set.is_some(),
            Accessor::Float { set, .. } => set.is_some(),
            Accessor::Bool { set, .. } => set.is_some(),
            Accessor::Text { set, .. } => set.is_some(),
        }
    }

    /// Read the current value
    pub fn value<'a>(&self, host: &'a T) -> VarValue<'a> {
        match &self.access {
            Accessor::Int { get, .. } => VarValue::Int(get(host)),
            Accessor::Long { get, .. } => VarValue::Long(get(host)),
            Accessor::Float { get, .. } => VarValue::Float(get(host)),
            Accessor::Bool { get, .. } => VarValue::Bool(get(host)),
            Accessor::Text { get, .. } => VarValue::Text(get(host)),
        }
    }

    /// Write a typed value
    ///
    /// The value's type must match the entry's declared type.
    pub fn store(&self, host: &mut T, value: VarValue<'_>) -> Result<(), VarError> {
        match (&self.access, value) {
            (Accessor::Int { set, .. }, VarValue::Int(v)) => {
                set.ok_or(VarError::ReadOnly)?(host, v)
            }
            (Accessor::Long { set, .. }, VarValue::Long(v)) => {
                set.ok_or(VarError::ReadOnly)?(host, v)
            }
            (Accessor::Float { set, .. }, VarValue::Float(v)) => {
                set.ok_or(VarError::ReadOnly)?(host, v)
            }
            (Accessor::Bool { set, .. }, VarValue::Bool(v)) => {
                set.ok_or(VarError::ReadOnly)?(host, v)
            }
            (Accessor::Text { set, max_len, .. }, VarValue::Text(v)) => {
                set.ok_or(VarError::ReadOnly)?(host, truncate(v, *max_len))
            }
            _ => return Err(VarError::InvalidValue),
        }
        Ok(())
    }

    /// Parse value text according to the declared type
    pub fn parse<'a>(&self, text: &'a str) -> Result<VarValue<'a>, VarError> {
        let text_trimmed = text.trim();
        let value = match self.access {
            Accessor::Int { .. } => VarValue::Int(
                text_trimmed
                    .parse()
                    .map_err(|_| VarError::InvalidValue)?,
            ),
            Accessor::Long { .. } => VarValue::Long(
                text_trimmed
                    .parse()
                    .map_err(|_| VarError::InvalidValue)?,
            ),
            Accessor::Float { .. } => {
                let v: f32 = text_trimmed
                    .parse()
                    .map_err(|_| VarError::InvalidValue)?;
                if !v.is_finite() {
                    return Err(VarError::InvalidValue);
                }
                VarValue::Float(v)
            }
            Accessor::Bool { .. } => VarValue::Bool(parse_bool(text_trimmed)?),
            Accessor::Text { .. } => VarValue::Text(text),
        };
        Ok(value)
    }

    /// Format the current value
    ///
    /// Floats use three decimals, bools `1`/`0`.
    pub fn format(&self, host: &T) -> ValueText {
        let mut out = ValueText::new();
        // Every formatted value fits; an overlong one is cut short
        let _ = match self.value(host) {
            VarValue::Int(v) => write!(out, "{}", v),
            VarValue::Long(v) => write!(out, "{}", v),
            VarValue::Float(v) => write!(out, "{:.3}", v),
            VarValue::Bool(v) => write!(out, "{}", if v { 1 } else { 0 }),
            VarValue::Text(v) => out.push_str(truncate(v, out.capacity())).map_err(|_| core::fmt::Error),
        };
        out
    }
}

/// Parse a boolean literal
///
/// Accepts `1/0`, `true/false`, `on/off`, `yes/no` in any case.
pub fn parse_bool(text: &str) -> Result<bool, VarError> {
    const TRUE: [&str; 4] = ["1", "true", "on", "yes"];
    const FALSE: [&str; 4] = ["0", "false", "off", "no"];

    if TRUE.iter().any(|t| text.eq_ignore_ascii_case(t)) {
        Ok(true)
    } else if FALSE.iter().any(|f| text.eq_ignore_ascii_case(f)) {
        Ok(false)
    } else {
        Err(VarError::InvalidValue)
    }
}

/// Cut `text` to at most `max_len` bytes on a char boundary
pub fn truncate(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Lookup table over a host struct
pub struct Registry<T: 'static> {
    entries: &'static [VarEntry<T>],
}

impl<T: 'static> Registry<T> {
    pub const fn new(entries: &'static [VarEntry<T>]) -> Self {
        Self { entries }
    }

    /// All entries in table order
    pub fn entries(&self) -> &'static [VarEntry<T>] {
        self.entries
    }

    /// Find an entry by exact label
    pub fn find(&self, label: &str) -> Result<&'static VarEntry<T>, VarError> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .ok_or(VarError::UnknownVariable)
    }

    /// Set a variable from text
    ///
    /// Nothing is written unless the label exists, the entry is writable and
    /// the text parses.
    pub fn set(&self, host: &mut T, label: &str, text: &str) -> Result<(), VarError> {
        let entry = self.find(label)?;
        if !entry.is_writable() {
            return Err(VarError::ReadOnly);
        }
        let value = entry.parse(text)?;
        entry.store(host, value)
    }

    /// Format a variable
    pub fn get(&self, host: &T, label: &str) -> Result<ValueText, VarError> {
        Ok(self.find(label)?.format(host))
    }

    /// Persisted entries of `category` in table order
    ///
    /// Yields nothing for `Runtime`.
    pub fn persisted(&self, category: Category) -> impl Iterator<Item = &'static VarEntry<T>> {
        self.entries
            .iter()
            .filter(move |entry| category.is_persisted() && entry.category == category)
    }

    /// Call `f` for each persisted entry of `category` in table order
    pub fn for_each_persisted(&self, category: Category, mut f: impl FnMut(&'static VarEntry<T>)) {
        for entry in self.persisted(category) {
            f(entry);
        }
    }
}
