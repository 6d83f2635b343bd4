//! Variable table
//!
//! Operator-visible settings and live values, addressed by label. The same
//! table drives `SET`/`GET`, bulk export/import, and the storage layout.

/// Read-write entry bound to a field of the host struct
macro_rules! field_var {
    ($host:ty, $kind:ident: $ty:ty, $label:literal, $cat:ident, $($path:ident).+) => {
        $crate::vars::VarEntry {
            label: $label,
            category: $crate::vars::Category::$cat,
            access: $crate::vars::Accessor::$kind {
                get: {
                    fn get(host: &$host) -> $ty {
                        host.$($path).+
                    }
                    get
                },
                set: Some({
                    fn set(host: &mut $host, value: $ty) {
                        host.$($path).+ = value;
                    }
                    set
                }),
            },
        }
    };
}

/// Read-write bounded text entry bound to a `heapless::String` field
macro_rules! text_var {
    ($host:ty, $label:literal, $cat:ident, $max:expr, $($path:ident).+) => {
        $crate::vars::VarEntry {
            label: $label,
            category: $crate::vars::Category::$cat,
            access: $crate::vars::Accessor::Text {
                get: {
                    fn get(host: &$host) -> &str {
                        host.$($path).+.as_str()
                    }
                    get
                },
                set: Some({
                    fn set(host: &mut $host, value: &str) {
                        host.$($path).+.clear();
                        // Already truncated to max_len by the registry
                        let _ = host.$($path).+.push_str(value);
                    }
                    set
                }),
                max_len: $max,
            },
        }
    };
}

/// Read-only runtime entry computed from the host
macro_rules! derived_var {
    ($host:ty, Text, $label:literal, |$h:ident| $body:expr) => {
        $crate::vars::VarEntry {
            label: $label,
            category: $crate::vars::Category::Runtime,
            access: $crate::vars::Accessor::Text {
                get: {
                    fn get($h: &$host) -> &str {
                        $body
                    }
                    get
                },
                set: None,
                max_len: 0,
            },
        }
    };
    ($host:ty, $kind:ident: $ty:ty, $label:literal, |$h:ident| $body:expr) => {
        $crate::vars::VarEntry {
            label: $label,
            category: $crate::vars::Category::Runtime,
            access: $crate::vars::Accessor::$kind {
                get: {
                    fn get($h: &$host) -> $ty {
                        $body
                    }
                    get
                },
                set: None,
            },
        }
    };
}

pub mod registry;
pub mod table;

pub use registry::*;
pub use table::REGISTRY;
