//! YAML 1.2 core schema tag resolution for plain scalars

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAP: &str = "!!map";
pub const SEQ: &str = "!!seq";
pub const STR: &str = "!!str";
pub const NULL: &str = "!!null";
pub const BOOL: &str = "!!bool";
pub const INT: &str = "!!int";
pub const FLOAT: &str = "!!float";

static NULL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(~|null|Null|NULL|)$").unwrap());

static BOOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(true|True|TRUE|false|False|FALSE)$").unwrap());

static INT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$").unwrap());

static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?|[-+]?\.(inf|Inf|INF)|\.(nan|NaN|NAN))$",
    )
    .unwrap()
});

/// Tag a plain (unquoted, untagged) scalar resolves to
pub fn resolve(plain: &str) -> &'static str {
    if NULL_RE.is_match(plain) {
        NULL
    } else if BOOL_RE.is_match(plain) {
        BOOL
    } else if INT_RE.is_match(plain) {
        INT
    } else if FLOAT_RE.is_match(plain) {
        FLOAT
    } else {
        STR
    }
}

/// Expand the `!!` shorthand of the core schema; other tags pass through
pub fn normalize(tag: &str) -> String {
    match tag {
        "!!str" | "!!int" | "!!float" | "!!bool" | "!!null" | "!!map" | "!!seq" => tag.to_string(),
        "tag:yaml.org,2002:str" => STR.to_string(),
        "tag:yaml.org,2002:int" => INT.to_string(),
        "tag:yaml.org,2002:float" => FLOAT.to_string(),
        "tag:yaml.org,2002:bool" => BOOL.to_string(),
        "tag:yaml.org,2002:null" => NULL.to_string(),
        other => other.to_string(),
    }
}
