//! GraphQL schemas: SDL text, or an introspection result printed as SDL.

use super::{Normalize, Normalized, SpecDocument, SpecFormat};
use anyhow::{bail, Context, Result};
use docdrift_core::SignalKind;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

pub const INTROSPECTION_QUERY: &str = "query IntrospectionQuery { __schema { \
queryType { name } mutationType { name } subscriptionType { name } \
types { kind name \
fields(includeDeprecated: true) { name args { name type { ...TypeRef } defaultValue } type { ...TypeRef } } \
inputFields { name type { ...TypeRef } defaultValue } \
interfaces { ...TypeRef } \
enumValues(includeDeprecated: true) { name } \
possibleTypes { ...TypeRef } } } } \
fragment TypeRef on __Type { kind name ofType { kind name ofType { kind name ofType { kind name \
ofType { kind name ofType { kind name ofType { kind name ofType { kind name } } } } } } } }";

const BUILTIN_SCALARS: &[&str] = &["String", "Int", "Float", "Boolean", "ID"];

const DEFINITION_KEYWORDS: &[&str] = &[
    "schema",
    "scalar",
    "type",
    "interface",
    "union",
    "enum",
    "input",
    "directive",
    "extend",
];

const PUNCTUATORS: &[char] = &['{', '}', '(', ')', '[', ']', ':', '=', '!', '|', '@', '&', '$'];

pub struct GraphQl;

impl SpecFormat for GraphQl {
    fn key(&self) -> &'static str {
        "graphql"
    }

    fn signal_kind(&self) -> SignalKind {
        SignalKind::GraphqlDiff
    }

    fn normalize(&self, doc: &SpecDocument) -> Result<Normalize> {
        let text = doc.text()?;
        let normalized = if text.trim_start().starts_with('{') {
            normalize_sdl(&print_introspection(text)?)?
        } else {
            normalize_sdl(text)?
        };
        Ok(Normalize::Ready(normalized))
    }

    fn introspection_request(&self) -> Option<Value> {
        Some(serde_json::json!({ "query": INTROSPECTION_QUERY }))
    }

    fn from_introspection(&self, body: &str) -> Result<SpecDocument> {
        Ok(SpecDocument::Text(print_introspection(body)?))
    }
}

/// Canonical SDL: descriptions and comments dropped, whitespace collapsed, one
/// top-level definition per line in sorted order.
pub fn normalize_sdl(sdl: &str) -> Result<Normalized> {
    let tokens = tokenize(sdl)?;
    let definitions = split_definitions(&tokens)?;

    let mut fields = BTreeSet::new();
    let mut lines: Vec<String> = definitions
        .iter()
        .map(|def| {
            definition_fields(def, &mut fields);
            def.join(" ")
        })
        .collect();
    lines.sort();

    Ok(Normalized {
        canonical: lines.join("\n"),
        fields,
    })
}

fn tokenize(sdl: &str) -> Result<Vec<String>> {
    let chars: Vec<char> = sdl.chars().collect();
    let mut tokens: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c.is_whitespace() || c == ',' || c == '\u{feff}' {
            i += 1;
            continue;
        }
        if c == '"' {
            let (literal, next) = read_string(&chars, i)?;
            i = next;
            // Strings after `=` or `:` are values; anywhere else they are descriptions.
            if matches!(tokens.last().map(String::as_str), Some("=" | ":")) {
                tokens.push(literal);
            }
            continue;
        }
        if PUNCTUATORS.contains(&c) {
            tokens.push(c.to_string());
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && !is_separator(chars[i]) {
            i += 1;
        }
        tokens.push(chars[start..i].iter().collect());
    }
    Ok(tokens)
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '"' | '#') || PUNCTUATORS.contains(&c)
}

/// Read a `"..."` or `"""..."""` literal starting at `start`; returns it and the
/// index just past its end.
fn read_string(chars: &[char], start: usize) -> Result<(String, usize)> {
    const TRIPLE: [char; 3] = ['"', '"', '"'];

    if chars[start..].starts_with(&TRIPLE) {
        let mut j = start + 3;
        while j < chars.len() {
            if chars[j] == '\\' && chars[j + 1..].starts_with(&TRIPLE) {
                j += 4;
                continue;
            }
            if chars[j..].starts_with(&TRIPLE) {
                let end = j + 3;
                return Ok((chars[start..end].iter().collect(), end));
            }
            j += 1;
        }
        bail!("unterminated block string");
    }

    let mut j = start + 1;
    loop {
        match chars.get(j).copied() {
            None | Some('\n') => bail!("unterminated string"),
            Some('\\') => j += 2,
            Some('"') => break,
            Some(_) => j += 1,
        }
    }
    Ok((chars[start..=j].iter().collect(), j + 1))
}

fn split_definitions(tokens: &[String]) -> Result<Vec<Vec<&str>>> {
    let mut definitions = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut depth: i32 = 0;

    for token in tokens {
        let t = token.as_str();
        if current.is_empty() && !DEFINITION_KEYWORDS.contains(&t) {
            bail!("not a GraphQL schema: unexpected '{t}' at top level");
        }
        if depth == 0
            && !current.is_empty()
            && DEFINITION_KEYWORDS.contains(&t)
            && current.last() != Some(&"extend")
        {
            definitions.push(std::mem::take(&mut current));
        }
        match t {
            "{" | "(" => depth += 1,
            "}" | ")" => {
                depth -= 1;
                if depth < 0 {
                    bail!("unbalanced '{t}'");
                }
            }
            _ => {}
        }
        current.push(t);
    }
    if depth != 0 {
        bail!("unbalanced braces at end of schema");
    }
    if !current.is_empty() {
        definitions.push(current);
    }
    Ok(definitions)
}

/// `Type.member` for the fields of object, interface and input types and the
/// values of enums.
fn definition_fields(def: &[&str], out: &mut BTreeSet<String>) {
    let offset = usize::from(def.first() == Some(&"extend"));
    let (Some(kind), Some(name)) = (def.get(offset), def.get(offset + 1)) else {
        return;
    };
    if !matches!(*kind, "type" | "interface" | "input" | "enum") {
        return;
    }

    let mut depth = 0;
    let mut in_body = false;
    for (i, token) in def.iter().enumerate() {
        match *token {
            "{" => {
                if depth == 0 {
                    in_body = true;
                }
                depth += 1;
                continue;
            }
            "(" => {
                depth += 1;
                continue;
            }
            "}" | ")" => {
                depth -= 1;
                continue;
            }
            _ => {}
        }
        if !in_body || depth != 1 || !is_name(token) || (i > 0 && def[i - 1] == "@") {
            continue;
        }
        let member = *kind == "enum" || matches!(def.get(i + 1).copied(), Some(":" | "("));
        if member {
            out.insert(format!("{name}.{token}"));
        }
    }
}

fn is_name(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// --- introspection ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionSchema {
    query_type: Option<NamedRef>,
    mutation_type: Option<NamedRef>,
    subscription_type: Option<NamedRef>,
    types: Vec<FullType>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullType {
    kind: String,
    name: Option<String>,
    fields: Option<Vec<FieldDef>>,
    input_fields: Option<Vec<InputValue>>,
    interfaces: Option<Vec<TypeRef>>,
    enum_values: Option<Vec<NamedRef>>,
    possible_types: Option<Vec<TypeRef>>,
}

#[derive(Debug, Deserialize)]
struct FieldDef {
    name: String,
    #[serde(default)]
    args: Vec<InputValue>,
    #[serde(rename = "type")]
    ty: TypeRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputValue {
    name: String,
    #[serde(rename = "type")]
    ty: TypeRef,
    default_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeRef {
    kind: String,
    name: Option<String>,
    of_type: Option<Box<TypeRef>>,
}

impl TypeRef {
    fn render(&self) -> String {
        match (self.kind.as_str(), &self.of_type) {
            ("NON_NULL", Some(inner)) => format!("{}!", inner.render()),
            ("LIST", Some(inner)) => format!("[{}]", inner.render()),
            _ => self.name.clone().unwrap_or_default(),
        }
    }
}

/// Print an introspection response (`{"data": {"__schema": ...}}` or a bare
/// `{"__schema": ...}`) as SDL.
pub fn print_introspection(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body).context("introspection response is not JSON")?;
    let schema = value
        .get("data")
        .and_then(|d| d.get("__schema"))
        .or_else(|| value.get("__schema"));
    let Some(schema) = schema else {
        if let Some(errors) = value.get("errors") {
            bail!("introspection failed: {errors}");
        }
        bail!("introspection response has no __schema");
    };
    let schema: IntrospectionSchema =
        serde_json::from_value(schema.clone()).context("malformed __schema")?;

    let mut blocks = Vec::new();
    if let Some(block) = schema_block(&schema) {
        blocks.push(block);
    }
    for ty in &schema.types {
        let Some(name) = ty.name.as_deref() else {
            continue;
        };
        if name.starts_with("__") {
            continue;
        }
        if let Some(block) = print_type(name, ty) {
            blocks.push(block);
        }
    }
    Ok(blocks.join("\n\n") + "\n")
}

/// Only emitted when root operation types are not the conventional names.
fn schema_block(schema: &IntrospectionSchema) -> Option<String> {
    let roots = [
        ("query", &schema.query_type, "Query"),
        ("mutation", &schema.mutation_type, "Mutation"),
        ("subscription", &schema.subscription_type, "Subscription"),
    ];
    let conventional = roots
        .iter()
        .all(|(_, r, default)| r.as_ref().map_or(true, |r| r.name == *default));
    if conventional {
        return None;
    }
    let lines: Vec<String> = roots
        .iter()
        .filter_map(|(op, r, _)| r.as_ref().map(|r| format!("  {op}: {}", r.name)))
        .collect();
    Some(format!("schema {{\n{}\n}}", lines.join("\n")))
}

fn print_type(name: &str, ty: &FullType) -> Option<String> {
    match ty.kind.as_str() {
        "SCALAR" if BUILTIN_SCALARS.contains(&name) => None,
        "SCALAR" => Some(format!("scalar {name}")),
        "OBJECT" | "INTERFACE" => {
            let keyword = if ty.kind == "OBJECT" { "type" } else { "interface" };
            let implements = ty
                .interfaces
                .as_deref()
                .filter(|i| !i.is_empty())
                .map(|i| {
                    let names: Vec<String> = i.iter().map(TypeRef::render).collect();
                    format!(" implements {}", names.join(" & "))
                })
                .unwrap_or_default();
            let fields: Vec<String> = ty
                .fields
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|f| {
                    let args = if f.args.is_empty() {
                        String::new()
                    } else {
                        let rendered: Vec<String> = f.args.iter().map(render_input).collect();
                        format!("({})", rendered.join(", "))
                    };
                    format!("  {}{args}: {}", f.name, f.ty.render())
                })
                .collect();
            Some(format!("{keyword} {name}{implements} {{\n{}\n}}", fields.join("\n")))
        }
        "UNION" => {
            let members: Vec<String> = ty
                .possible_types
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(TypeRef::render)
                .collect();
            Some(format!("union {name} = {}", members.join(" | ")))
        }
        "ENUM" => {
            let values: Vec<String> = ty
                .enum_values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|v| format!("  {}", v.name))
                .collect();
            Some(format!("enum {name} {{\n{}\n}}", values.join("\n")))
        }
        "INPUT_OBJECT" => {
            let fields: Vec<String> = ty
                .input_fields
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|f| format!("  {}", render_input(f)))
                .collect();
            Some(format!("input {name} {{\n{}\n}}", fields.join("\n")))
        }
        _ => None,
    }
}

fn render_input(input: &InputValue) -> String {
    match &input.default_value {
        Some(default) => format!("{}: {} = {default}", input.name, input.ty.render()),
        None => format!("{}: {}", input.name, input.ty.render()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDL: &str = r#"
# Root query
type Query {
  "Look up a user"
  user(id: ID!): User
}

"""
A person.
"""
type User implements Node {
  id: ID!
  name: String @deprecated(reason: "use displayName")
  tags: [String!]!
}

enum Role { ADMIN USER }

input UserFilter {
  role: Role = ADMIN
  limit: Int = 10
}
"#;

    fn normalize(text: &str) -> Normalized {
        match GraphQl.normalize(&SpecDocument::Text(text.into())).unwrap() {
            Normalize::Ready(n) => n,
            Normalize::NotApplicable(r) => panic!("not applicable: {r}"),
        }
    }

    #[test]
    fn fields_and_enum_values_extracted() {
        let n = normalize(SDL);
        let fields: Vec<&str> = n.fields.iter().map(String::as_str).collect();
        assert_eq!(
            fields,
            vec![
                "Query.user",
                "Role.ADMIN",
                "Role.USER",
                "User.id",
                "User.name",
                "User.tags",
                "UserFilter.limit",
                "UserFilter.role",
            ]
        );
    }

    #[test]
    fn ordering_comments_and_descriptions_ignored() {
        let reordered = r#"
enum Role {
  ADMIN
  USER
}
input UserFilter { role: Role = ADMIN, limit: Int = 10 }
type User implements Node { id: ID! name: String @deprecated(reason: "use displayName") tags: [String!]! }
type Query { user(id: ID!): User }
"#;
        assert_eq!(normalize(SDL).canonical, normalize(reordered).canonical);
    }

    #[test]
    fn default_value_change_is_visible() {
        let changed = SDL.replace("limit: Int = 10", "limit: Int = 20");
        assert_ne!(normalize(SDL).canonical, normalize(&changed).canonical);
    }

    #[test]
    fn extend_stays_with_its_definition() {
        let n = normalize("type Query { a: Int }\nextend type Query { b: Int }");
        assert_eq!(n.canonical.lines().count(), 2);
        assert!(n.fields.contains("Query.b"));
    }

    #[test]
    fn unbalanced_schema_is_malformed() {
        assert!(GraphQl
            .normalize(&SpecDocument::Text("type Query { a: Int".into()))
            .is_err());
        assert!(GraphQl
            .normalize(&SpecDocument::Text("<html>oops</html>".into()))
            .is_err());
    }

    #[test]
    fn introspection_prints_equivalent_sdl() {
        let body = r#"{"data":{"__schema":{
            "queryType":{"name":"Query"},"mutationType":null,"subscriptionType":null,
            "types":[
              {"kind":"OBJECT","name":"Query","fields":[
                {"name":"user","args":[{"name":"id","type":{"kind":"NON_NULL","name":null,"ofType":{"kind":"SCALAR","name":"ID","ofType":null}},"defaultValue":null}],
                 "type":{"kind":"OBJECT","name":"User","ofType":null}}],
               "inputFields":null,"interfaces":[],"enumValues":null,"possibleTypes":null},
              {"kind":"OBJECT","name":"User","fields":[
                {"name":"id","args":[],"type":{"kind":"NON_NULL","name":null,"ofType":{"kind":"SCALAR","name":"ID","ofType":null}}},
                {"name":"tags","args":[],"type":{"kind":"NON_NULL","name":null,"ofType":{"kind":"LIST","name":null,"ofType":{"kind":"NON_NULL","name":null,"ofType":{"kind":"SCALAR","name":"String","ofType":null}}}}}],
               "inputFields":null,"interfaces":[],"enumValues":null,"possibleTypes":null},
              {"kind":"ENUM","name":"Role","fields":null,"inputFields":null,"interfaces":null,
               "enumValues":[{"name":"ADMIN"},{"name":"USER"}],"possibleTypes":null},
              {"kind":"SCALAR","name":"String","fields":null,"inputFields":null,"interfaces":null,"enumValues":null,"possibleTypes":null},
              {"kind":"OBJECT","name":"__Schema","fields":[],"inputFields":null,"interfaces":[],"enumValues":null,"possibleTypes":null}
            ]}}}"#;

        let doc = GraphQl.from_introspection(body).unwrap();
        let text = doc.text().unwrap().to_string();
        assert!(!text.contains("__Schema"));
        assert!(!text.contains("scalar String"));
        assert!(!text.starts_with("schema"));

        let sdl = "type Query { user(id: ID!): User }\n\
                   type User { id: ID! tags: [String!]! }\n\
                   enum Role { ADMIN USER }";
        assert_eq!(normalize(&text).canonical, normalize(sdl).canonical);
        // Published copies may also be stored as introspection JSON.
        assert_eq!(normalize(body).canonical, normalize(sdl).canonical);
    }

    #[test]
    fn introspection_errors_surface() {
        let err = print_introspection(r#"{"errors":[{"message":"introspection disabled"}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("introspection disabled"));
    }

    #[test]
    fn request_carries_query() {
        let req = GraphQl.introspection_request().unwrap();
        assert!(req["query"].as_str().unwrap().contains("__schema"));
    }
}
