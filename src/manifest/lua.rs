//! Compact Lua table literals for manifests consumed by game scripts.

use serde_json::{Number, Value};
use std::fmt::{self, Write};

macro_rules! proxy_display {
    ( $target: ty ) => {
        impl fmt::Display for $target {
            fn fmt(&self, output: &mut fmt::Formatter) -> fmt::Result {
                LuaFormat::fmt_lua(self, output)
            }
        }
    };
}

trait LuaFormat {
    fn fmt_lua(&self, output: &mut dyn Write) -> fmt::Result;
}

#[derive(Debug)]
enum Expression {
    String(String),
    Number(Number),
    Table(Table),
}

#[derive(Debug)]
enum Field {
    Named(String, Expression),
    Bracketed(String, Expression),
}

impl Field {
    fn keyed(key: &str, value: Expression) -> Self {
        if is_valid_identifier(key) {
            Self::Named(key.to_string(), value)
        } else {
            Self::Bracketed(key.to_string(), value)
        }
    }
}

#[derive(Debug)]
struct Table {
    fields: Vec<Field>,
}

proxy_display!(Table);
proxy_display!(Expression);

impl LuaFormat for Table {
    fn fmt_lua(&self, output: &mut dyn Write) -> fmt::Result {
        output.write_char('{')?;

        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                output.write_char(',')?;
            }

            match field {
                Field::Named(key, value) => {
                    write!(output, "{key}=")?;
                    value.fmt_lua(output)?;
                }
                Field::Bracketed(key, value) => {
                    output.write_char('[')?;
                    write_string(output, key)?;
                    output.write_str("]=")?;
                    value.fmt_lua(output)?;
                }
            }
        }

        output.write_char('}')
    }
}

impl LuaFormat for Expression {
    fn fmt_lua(&self, output: &mut dyn Write) -> fmt::Result {
        match self {
            Self::String(value) => write_string(output, value),
            Self::Number(value) => write!(output, "{value}"),
            Self::Table(value) => value.fmt_lua(output),
        }
    }
}

fn write_string(output: &mut dyn Write, value: &str) -> fmt::Result {
    output.write_char('"')?;
    for c in value.chars() {
        match c {
            '"' => output.write_str("\\\"")?,
            '\\' => output.write_str("\\\\")?,
            '\n' => output.write_str("\\n")?,
            '\r' => output.write_str("\\r")?,
            c => output.write_char(c)?,
        }
    }
    output.write_char('"')
}

/// Manifests only hold numbers, strings and nested objects; anything
/// else, `null` included, is left out of the table.
fn expression(value: &Value) -> Option<Expression> {
    let result = match value {
        Value::Null | Value::Bool(_) | Value::Array(_) => return None,
        Value::Number(value) => Expression::Number(value.clone()),
        Value::String(value) => Expression::String(value.clone()),
        Value::Object(map) => Expression::Table(Table {
            fields: map
                .iter()
                .filter_map(|(key, value)| Some(Field::keyed(key, expression(value)?)))
                .collect(),
        }),
    };

    Some(result)
}

/// Renders `value` as a Lua table literal. Top-level keys are always
/// written as `["key"]` since manifest keys are file names.
pub fn table_literal(value: &Value) -> String {
    match value {
        Value::Object(map) => Table {
            fields: map
                .iter()
                .filter_map(|(key, value)| {
                    Some(Field::Bracketed(key.clone(), expression(value)?))
                })
                .collect(),
        }
        .to_string(),
        other => expression(other)
            .map(|expression| expression.to_string())
            .unwrap_or_else(|| "nil".to_string()),
    }
}

fn is_valid_ident_char_start(value: char) -> bool {
    value.is_ascii_alphabetic() || value == '_'
}

fn is_valid_ident_char(value: char) -> bool {
    value.is_ascii_alphanumeric() || value == '_'
}

fn is_valid_identifier(value: &str) -> bool {
    let mut chars = value.chars();

    match chars.next() {
        Some(first) if is_valid_ident_char_start(first) => chars.all(is_valid_ident_char),
        _ => false,
    }
}
