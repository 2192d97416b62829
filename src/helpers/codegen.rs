use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::config::Location;
use crate::error::Result;
use crate::models::goals::MonthlyGoals;

pub const JS_MODULE_FILE: &str = "sheets_data.js";
pub const PY_MODULE_FILE: &str = "sheets_data.py";

/// One location's entry in a generated module; `None` when its read failed.
pub struct ModuleEntry<'a> {
    pub location: &'a Location,
    pub goals: Option<&'a MonthlyGoals>,
}

fn to_json_indented<T: Serialize>(value: &T, indent: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent));
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn js_key(name: &str) -> String {
    let is_ident = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        name.to_string()
    } else {
        serde_json::Value::String(name.to_string()).to_string()
    }
}

fn header(comment: &str, generated_at: &str, entries: &[ModuleEntry<'_>]) -> String {
    let mut out = format!("{comment} Auto-generated from Google Sheets on {generated_at}\n");
    for entry in entries {
        let _ = writeln!(
            out,
            "{comment} {}: {}",
            entry.location.label(),
            entry.location.spreadsheet_id
        );
    }
    out
}

pub fn render_js_module(generated_at: &str, entries: &[ModuleEntry<'_>]) -> Result<String> {
    let mut body = Vec::with_capacity(entries.len());
    for entry in entries {
        let value = match entry.goals {
            Some(goals) => to_json_indented(goals, b"  ")?,
            None => "null".to_string(),
        };
        body.push(format!("  {}: {}", js_key(&entry.location.name), value));
    }

    Ok(format!(
        "{}\nconst MONTHLY_GOALS = {{\n{}\n}};\n\nmodule.exports = {{ MONTHLY_GOALS }};\n",
        header("//", generated_at, entries),
        body.join(",\n")
    ))
}

pub fn render_python_module(generated_at: &str, entries: &[ModuleEntry<'_>]) -> Result<String> {
    let mut body = Vec::with_capacity(entries.len());
    for entry in entries {
        let value = match entry.goals {
            Some(goals) => to_json_indented(goals, b"    ")?.replace('"', "'"),
            None => "None".to_string(),
        };
        let key = python_str_body(&entry.location.name);
        body.push(format!("    '{key}': {value}"));
    }

    Ok(format!(
        "{}\nMONTHLY_GOALS = {{\n{}\n}}\n",
        header("#", generated_at, entries),
        body.join(",\n")
    ))
}

/// Escapes `s` for use inside a single-quoted Python literal.
fn python_str_body(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Writes both modules into `out_dir`, creating it if needed.
pub fn write_modules(
    out_dir: &Path,
    generated_at: &str,
    entries: &[ModuleEntry<'_>],
) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(out_dir)?;

    let js_path = out_dir.join(JS_MODULE_FILE);
    fs::write(&js_path, render_js_module(generated_at, entries)?)?;
    info!("Generated {}", js_path.display());

    let py_path = out_dir.join(PY_MODULE_FILE);
    fs::write(&py_path, render_python_module(generated_at, entries)?)?;
    info!("Generated {}", py_path.display());

    Ok((js_path, py_path))
}
