//! Class definition file parsing
//!
//! Definition files are line-oriented: an optional `namespace` header,
//! then class and interface declarations whose bodies hold fields
//! (`name: type`) and methods (`fn name(params)`). Attributes
//! (`@Name(key: value, ...)`) precede the declaration they target.
//! Line (`//`) and block (`/* */`) comments are stripped before parsing;
//! newlines inside block comments are kept so reported line numbers stay
//! accurate.
//!
//! Attribute arguments are named only. Values are JSON scalars or flat
//! arrays of them (nested arrays and objects are parse errors), so
//! `serde_json` does the value parsing and annotation types deserialize
//! from the resulting map without further conversion.

use classmap_core::{
    Attribute, ClassDecl, ClassKind, ClassName, Error, FieldDecl, MethodDecl, Result,
};
use std::path::Path;

/// Everything parsed out of one definition file
#[derive(Debug)]
pub struct ParsedFile {
    /// Namespace declared by the file header, if any
    pub namespace: Option<String>,
    /// Declarations in source order
    pub classes: Vec<ClassDecl>,
}

/// Parse one definition file
///
/// `path` is recorded as the source of every declaration and used in error
/// messages; callers pass the canonical path.
///
/// # Errors
///
/// Returns a parse error naming the path and line of the first problem
pub fn parse_definition(path: &Path, source: &str) -> Result<ParsedFile> {
    let cleaned = strip_comments(source.trim_start_matches('\u{feff}'));

    let mut namespace: Option<String> = None;
    let mut classes: Vec<ClassDecl> = Vec::new();
    let mut pending_attrs: Vec<Attribute> = Vec::new();
    let mut current: Option<ClassDecl> = None;
    let mut last_line = 0usize;

    for (idx, raw_line) in cleaned.lines().enumerate() {
        let line_no = idx + 1;
        last_line = line_no;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("namespace ") {
            if current.is_some() {
                return Err(Error::parse(
                    path,
                    line_no,
                    "`namespace` is not allowed inside a class body",
                ));
            }
            if namespace.is_some() {
                return Err(Error::parse(path, line_no, "`namespace` declared twice"));
            }
            if !classes.is_empty() {
                return Err(Error::parse(
                    path,
                    line_no,
                    "`namespace` must precede every declaration",
                ));
            }
            let ns = rest.trim();
            if ClassName::new(ns).is_err() {
                return Err(Error::parse(
                    path,
                    line_no,
                    format!("invalid namespace \"{ns}\""),
                ));
            }
            namespace = Some(ns.to_string());
            continue;
        }

        if line == "}" {
            let Some(class) = current.take() else {
                return Err(Error::parse(path, line_no, "unmatched `}`"));
            };
            if !pending_attrs.is_empty() {
                return Err(Error::parse(
                    path,
                    line_no,
                    "attributes must precede a field, method, or declaration",
                ));
            }
            classes.push(class);
            continue;
        }

        if let Some(rest) = line.strip_prefix('@') {
            let attribute =
                parse_attribute(rest).map_err(|msg| Error::parse(path, line_no, msg))?;
            pending_attrs.push(attribute);
            continue;
        }

        let declaration = match line.strip_prefix("class ") {
            Some(rest) => Some((ClassKind::Class, rest)),
            None => line
                .strip_prefix("interface ")
                .map(|rest| (ClassKind::Interface, rest)),
        };
        if let Some((kind, rest)) = declaration {
            if current.is_some() {
                return Err(Error::parse(
                    path,
                    line_no,
                    "class declarations cannot nest",
                ));
            }
            let Some(short) = rest.trim().strip_suffix('{') else {
                return Err(Error::parse(
                    path,
                    line_no,
                    "expected `{` at the end of the declaration line",
                ));
            };
            let short = short.trim();
            if !is_identifier(short) {
                return Err(Error::parse(
                    path,
                    line_no,
                    format!("invalid class name \"{short}\""),
                ));
            }
            let full = match &namespace {
                Some(ns) => format!("{ns}.{short}"),
                None => short.to_string(),
            };
            let name = ClassName::new(&full).map_err(|_| {
                Error::parse(path, line_no, format!("invalid class name \"{full}\""))
            })?;
            if classes.iter().any(|c| c.name == name) {
                return Err(Error::parse(
                    path,
                    line_no,
                    format!("class \"{name}\" declared twice"),
                ));
            }
            current = Some(ClassDecl {
                name,
                kind,
                source: path.to_path_buf(),
                attributes: std::mem::take(&mut pending_attrs),
                fields: Vec::new(),
                methods: Vec::new(),
            });
            continue;
        }

        let Some(class) = current.as_mut() else {
            return Err(Error::parse(
                path,
                line_no,
                format!("unexpected line outside a class body: \"{line}\""),
            ));
        };

        if let Some(rest) = line.strip_prefix("fn ") {
            let mut method =
                parse_method(rest).map_err(|msg| Error::parse(path, line_no, msg))?;
            if class.method(&method.name).is_some() {
                return Err(Error::parse(
                    path,
                    line_no,
                    format!("method \"{}\" declared twice", method.name),
                ));
            }
            method.attributes = std::mem::take(&mut pending_attrs);
            class.methods.push(method);
            continue;
        }

        let mut field = parse_field(line).map_err(|msg| Error::parse(path, line_no, msg))?;
        if class.field(&field.name).is_some() {
            return Err(Error::parse(
                path,
                line_no,
                format!("field \"{}\" declared twice", field.name),
            ));
        }
        field.attributes = std::mem::take(&mut pending_attrs);
        class.fields.push(field);
    }

    if let Some(class) = current {
        return Err(Error::parse(
            path,
            last_line.max(1),
            format!("unexpected end of file: class \"{}\" is unclosed", class.name),
        ));
    }
    if !pending_attrs.is_empty() {
        return Err(Error::parse(
            path,
            last_line.max(1),
            "attributes must precede a declaration",
        ));
    }

    Ok(ParsedFile { namespace, classes })
}

/// Parse the text after `@`: `Entity`, `Entity()`, or `Entity(key: value, ...)`
fn parse_attribute(rest: &str) -> std::result::Result<Attribute, String> {
    let (name, args_text) = match rest.find('(') {
        None => (rest.trim(), None),
        Some(open) => {
            let name = rest[..open].trim();
            let args = rest[open + 1..].trim_end();
            let Some(args) = args.strip_suffix(')') else {
                return Err("expected `)` to close attribute arguments".to_string());
            };
            (name, Some(args))
        }
    };
    if !is_identifier(name) {
        return Err(format!("invalid attribute name \"{name}\""));
    }

    let mut args = serde_json::Map::new();
    if let Some(text) = args_text {
        for piece in split_top_level(text, ',') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let Some((key, value_text)) = piece.split_once(':') else {
                return Err(format!(
                    "expected `key: value` in attribute arguments, got \"{piece}\""
                ));
            };
            let key = key.trim();
            if !is_identifier(key) {
                return Err(format!("invalid argument name \"{key}\""));
            }
            let value: serde_json::Value = serde_json::from_str(value_text.trim())
                .map_err(|e| format!("invalid value for argument \"{key}\": {e}"))?;
            if !is_flat_value(&value) {
                return Err(format!(
                    "argument \"{key}\" must be a JSON scalar or a flat array of scalars"
                ));
            }
            if args.insert(key.to_string(), value).is_some() {
                return Err(format!("argument \"{key}\" given twice"));
            }
        }
    }

    Ok(Attribute::new(name, args))
}

/// Parse the text after `fn `: `name(param, param)`
fn parse_method(rest: &str) -> std::result::Result<MethodDecl, String> {
    let Some(open) = rest.find('(') else {
        return Err("expected `(` after the method name".to_string());
    };
    let name = rest[..open].trim();
    if !is_identifier(name) {
        return Err(format!("invalid method name \"{name}\""));
    }
    let params_text = rest[open + 1..].trim_end();
    let Some(params_text) = params_text.strip_suffix(')') else {
        return Err("expected `)` to close the parameter list".to_string());
    };

    let mut params = Vec::new();
    for piece in params_text.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if !is_identifier(piece) {
            return Err(format!("invalid parameter name \"{piece}\""));
        }
        if params.iter().any(|p| p == piece) {
            return Err(format!("parameter \"{piece}\" declared twice"));
        }
        params.push(piece.to_string());
    }

    Ok(MethodDecl {
        name: name.to_string(),
        params,
        attributes: Vec::new(),
    })
}

/// Parse a field line: `name: type`
fn parse_field(line: &str) -> std::result::Result<FieldDecl, String> {
    let Some((name, type_name)) = line.split_once(':') else {
        return Err(format!(
            "expected a field (`name: type`), a method (`fn name(...)`), or `}}`, got \"{line}\""
        ));
    };
    let name = name.trim();
    let type_name = type_name.trim();
    if !is_identifier(name) {
        return Err(format!("invalid field name \"{name}\""));
    }
    if type_name.is_empty() || type_name.contains(char::is_whitespace) {
        return Err(format!("invalid field type \"{type_name}\""));
    }

    Ok(FieldDecl {
        name: name.to_string(),
        type_name: type_name.to_string(),
        attributes: Vec::new(),
    })
}

/// Whether a JSON value is a scalar or a flat array of scalars
fn is_flat_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(_) => false,
        serde_json::Value::Array(items) => {
            items.iter().all(|item| !item.is_array() && !item.is_object())
        }
        _ => true,
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split on `separator` at bracket depth zero, ignoring string contents
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                pieces.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&text[start..]);
    pieces
}

fn strip_comments(source: &str) -> String {
    let mut result = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if in_string {
            result.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' || ch == '\n' {
                // A newline ends string mode so an unterminated literal
                // still surfaces as a parse error on its own line
                in_string = false;
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
            result.push(ch);
            continue;
        }
        if ch == '/' {
            match chars.peek() {
                Some('/') => {
                    chars.next();
                    for next in chars.by_ref() {
                        if next == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for next in chars.by_ref() {
                        if next == '\n' {
                            // Keep line numbers stable across block comments
                            result.push('\n');
                        }
                        if prev == '*' && next == '/' {
                            break;
                        }
                        prev = next;
                    }
                    continue;
                }
                _ => {}
            }
        }
        result.push(ch);
    }

    result
}
