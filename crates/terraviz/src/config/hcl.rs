//! Parser for the HCL-like configuration syntax:
//!
//! ```text
//! {
//!     "google_compute_address" {
//!         "grouped_by" = [values.project, values.region]
//!         "diagram_image" = "icons/address.png"
//!         "name" = "values.name"
//!     }
//! }
//! ```
//!
//! The outer braces are optional. Keys and block names may be quoted or bare,
//! `#` and `//` start comments outside of strings.

use indexmap::IndexMap;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_until, take_while, take_while1},
    character::complete::{anychar, char, multispace1},
    combinator::{cut, map, opt, recognize, value},
    error::{VerboseError, VerboseErrorKind, context},
    multi::many0,
    sequence::{delimited, preceded, terminated},
};

use super::{RawTypeConfig, TypeConfigTable};
use crate::error::TerravizError;

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

enum Value {
    Text(String),
    List(Vec<String>),
}

struct Setting {
    key: String,
    value: Value,
    /// Input length remaining where the setting starts; recovers its line.
    offset: usize,
}

struct Block {
    name: String,
    settings: Vec<Setting>,
}

fn syntax_error(line: usize, message: impl std::fmt::Display) -> TerravizError {
    TerravizError::Configuration(format!("line {line}: {message}"))
}

fn line_at(raw: &str, remaining: usize) -> usize {
    raw[..raw.len() - remaining].matches('\n').count() + 1
}

fn describe(rest: &str) -> String {
    match rest.split_whitespace().next() {
        Some(token) => format!("'{}'", token.chars().take(24).collect::<String>()),
        None => "end of input".into(),
    }
}

/// Maps a nom error to a configuration error on the line where parsing stopped.
fn to_configuration_error(raw: &str, err: VerboseError<&str>) -> TerravizError {
    let rest = err.errors.first().map(|(rest, _)| *rest).unwrap_or(raw);
    let expected = err.errors.iter().find_map(|(_, kind)| match kind {
        VerboseErrorKind::Context(label) => Some(*label),
        _ => None,
    });
    let found = describe(rest);
    let message = match expected {
        Some(label) => format!("expected {label}, found {found}"),
        None => format!("unexpected {found}"),
    };
    syntax_error(line_at(raw, rest.len()), message)
}

fn comment(input: &str) -> ParseResult<'_, ()> {
    value((), preceded(alt((tag("#"), tag("//"))), take_while(|c: char| c != '\n')))(input)
}

/// Whitespace and comments.
fn blank(input: &str) -> ParseResult<'_, ()> {
    value((), many0(alt((value((), multispace1), comment))))(input)
}

fn symbol<'a>(expected: char) -> impl FnMut(&'a str) -> ParseResult<'a, char> {
    preceded(blank, char(expected))
}

fn double_quoted(input: &str) -> ParseResult<'_, String> {
    let escape = alt((
        value("\n", char('n')),
        value("\t", char('t')),
        recognize(anychar),
    ));
    map(
        delimited(
            char('"'),
            opt(escaped_transform(is_not("\\\""), '\\', escape)),
            cut(context("closing '\"' (unterminated string)", char('"'))),
        ),
        Option::unwrap_or_default,
    )(input)
}

fn single_quoted(input: &str) -> ParseResult<'_, String> {
    map(
        preceded(
            char('\''),
            cut(context(
                "closing \"'\" (unterminated string)",
                terminated(take_until("'"), char('\'')),
            )),
        ),
        str::to_string,
    )(input)
}

fn bare(input: &str) -> ParseResult<'_, String> {
    map(
        take_while1(|c: char| !c.is_whitespace() && !"{}[]=,\"'#".contains(c)),
        str::to_string,
    )(input)
}

/// A quoted or bare word after any leading blanks.
fn word(input: &str) -> ParseResult<'_, String> {
    preceded(blank, alt((double_quoted, single_quoted, bare)))(input)
}

fn list(input: &str) -> ParseResult<'_, Vec<String>> {
    let (input, _) = symbol('[')(input)?;
    let (input, items) = many0(terminated(word, opt(symbol(','))))(input)?;
    let (input, _) = cut(context("closing ']' of list", symbol(']')))(input)?;
    let items = items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    Ok((input, items))
}

fn setting_value(input: &str) -> ParseResult<'_, Value> {
    alt((map(list, Value::List), map(word, Value::Text)))(input)
}

fn setting(input: &str) -> ParseResult<'_, Setting> {
    let (input, _) = blank(input)?;
    let offset = input.len();
    let (input, key) = word(input)?;
    let (input, _) = cut(context("'=' after setting name", symbol('=')))(input)?;
    let (input, value) = cut(context("a setting value", setting_value))(input)?;
    Ok((input, Setting { key, value, offset }))
}

fn block(input: &str) -> ParseResult<'_, Block> {
    let (input, name) = word(input)?;
    let (input, _) = cut(context("'{' after resource type name", symbol('{')))(input)?;
    let (input, settings) = many0(terminated(setting, opt(symbol(','))))(input)?;
    let (input, _) = cut(context("closing '}' of block", symbol('}')))(input)?;
    Ok((input, Block { name, settings }))
}

/// Blocks, optionally wrapped in one pair of outer braces.
fn document(input: &str) -> ParseResult<'_, Vec<Block>> {
    let (input, _) = blank(input)?;
    let (input, wrapped) = opt(char('{'))(input)?;
    let (input, blocks) = match wrapped {
        Some(_) => terminated(
            many0(block),
            cut(context("closing '}' of configuration", symbol('}'))),
        )(input)?,
        None => many0(block)(input)?,
    };
    let (input, _) = blank(input)?;
    Ok((input, blocks))
}

fn apply_setting(
    config: &mut RawTypeConfig,
    block: &str,
    key: &str,
    value: Value,
    line: usize,
) -> Result<(), TerravizError> {
    let text = |value: Value| match value {
        Value::Text(text) => Ok(text),
        Value::List(_) => Err(syntax_error(
            line,
            format!("\"{key}\" in \"{block}\" expects a single value, not a list"),
        )),
    };

    match key {
        "grouped_by" => {
            config.grouped_by = match value {
                Value::List(items) => items,
                Value::Text(item) => vec![item],
            };
        }
        "group_id" | "group_id_path" => config.group_id = Some(text(value)?),
        "anchor_id" | "anchor_id_path" => config.anchor_id = Some(text(value)?),
        "name" | "name_template" => config.name = Some(text(value)?),
        "diagram_image" | "icon" => config.diagram_image = Some(text(value)?),
        other => {
            tracing::debug!(block, setting = other, line, "ignoring unknown setting");
        }
    }
    Ok(())
}

/// Parses the HCL-like configuration syntax into the same table the JSON syntax produces.
pub fn parse_hcl_config(raw: &str) -> Result<TypeConfigTable, TerravizError> {
    let blocks = match document(raw) {
        Ok(("", blocks)) => blocks,
        Ok((rest, _)) => {
            return Err(syntax_error(
                line_at(raw, rest.len()),
                format!("unexpected {} after configuration", describe(rest)),
            ));
        }
        Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => {
            return Err(to_configuration_error(raw, err));
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(syntax_error(line_at(raw, 0), "incomplete configuration"));
        }
    };

    let mut entries = IndexMap::new();
    for block in blocks {
        let mut config = RawTypeConfig::default();
        for setting in block.settings {
            let line = line_at(raw, setting.offset);
            apply_setting(&mut config, &block.name, &setting.key, setting.value, line)?;
        }
        entries.insert(block.name, config);
    }
    TypeConfigTable::from_raw(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{AttributePath, LabelTemplate};

    #[test]
    fn parses_wrapped_document_with_comments() {
        let table = parse_hcl_config(
            r#"
            # top-level comment
            {
                "google_compute_address" {
                    "grouped_by" = [values.project, "values.region"] // trailing
                    "diagram_image" = "icons/address.png"
                    "name" = "values.name"
                }
            }
            "#,
        )
        .unwrap();

        let config = table.get("google_compute_address");
        assert_eq!(
            config.grouped_by,
            vec![
                AttributePath::parse("values.project"),
                AttributePath::parse("values.region")
            ]
        );
        assert_eq!(config.name_template, LabelTemplate::parse("values.name"));
        assert!(config.icon_path.is_some());
    }

    #[test]
    fn braces_inside_strings_do_not_close_blocks() {
        let table = parse_hcl_config(
            r#"
            "google_project_iam_member" {
                "name" = "${values.member}-${values.role}"
                "grouped_by" = [values.project]
            }
            "#,
        )
        .unwrap();
        let config = table.get("google_project_iam_member");
        assert_eq!(config.name_template.placeholders().count(), 2);
        assert_eq!(config.grouped_by.len(), 1);
    }

    #[test]
    fn bare_names_and_empty_lists_are_accepted() {
        let table = parse_hcl_config(
            r#"
            aws_instance {
                grouped_by = []
                anchor_id = values.id
            }
            "#,
        )
        .unwrap();
        let config = table.get("aws_instance");
        assert!(config.grouped_by.is_empty());
        assert_eq!(config.anchor_id_path, Some(AttributePath::parse("values.id")));
    }

    #[test]
    fn unknown_settings_are_ignored() {
        let table = parse_hcl_config(r#""a" { "color" = "blue" }"#).unwrap();
        assert_eq!(table.get("a").grouped_by.len(), 0);
        assert!(table.is_configured("a"));
    }

    #[test]
    fn missing_equals_reports_line() {
        let err = parse_hcl_config("\"a\" {\n  \"grouped_by\" [values.project]\n}").unwrap_err();
        assert!(matches!(err, TerravizError::Configuration(_)));
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn unterminated_block_is_rejected() {
        let err = parse_hcl_config("{ \"a\" { \"name\" = \"x\" }").unwrap_err();
        assert!(err.to_string().contains("closing"), "{err}");
    }

    #[test]
    fn list_for_scalar_setting_is_rejected() {
        let err = parse_hcl_config(r#""a" { "name" = [values.name] }"#).unwrap_err();
        assert!(err.to_string().contains("single value"), "{err}");
    }

    #[test]
    fn quoted_strings_handle_escapes_and_single_quotes() {
        let table = parse_hcl_config(
            "'gcp_disk' {\n  \"name\" = \"say \\\"hi\\\"\"\n  'anchor_id' = 'values.id'\n}",
        )
        .unwrap();
        let config = table.get("gcp_disk");
        assert_eq!(config.name_template, LabelTemplate::parse("say \"hi\""));
        assert_eq!(config.anchor_id_path, Some(AttributePath::parse("values.id")));
    }

    #[test]
    fn setting_errors_report_their_own_line() {
        let err = parse_hcl_config("\"a\" {\n  \"grouped_by\" = []\n  \"icon\" = [x]\n}").unwrap_err();
        assert!(err.to_string().starts_with("configuration error: line 3:"), "{err}");
    }

    #[test]
    fn trailing_input_is_rejected() {
        let err = parse_hcl_config("{ \"a\" { } }\n}").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
        assert!(err.to_string().contains("after configuration"), "{err}");
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let err = parse_hcl_config("\"a\" { \"name\" = \"oops }").unwrap_err();
        assert!(err.to_string().contains("unterminated string"), "{err}");
    }
}
