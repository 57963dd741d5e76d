//! Field annotation interpreter
//!
//! An annotation is a comma-separated list of directives:
//!
//! ```text
//! pk,autoincr
//! not_null,index=by_name
//! column=email_address,unique
//! fk=Person.Email ONUPDATE CASCADE ONDELETE SET NULL
//! ```

use thiserror::Error;

use crate::schema::{ColumnType, FieldTags, ForeignKeyDirective, IndexTag};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("unknown directive '{0}'")]
    UnknownDirective(String),

    #[error("directive '{0}' requires a value")]
    MissingValue(String),

    #[error("unknown column type '{0}'")]
    UnknownColumnType(String),

    #[error("field cannot be both null and not_null")]
    ConflictingNullability,

    #[error("primary key field cannot be null")]
    NullablePrimaryKey,

    #[error("invalid token in fk definition '{directive}': {token}")]
    UnknownToken { directive: String, token: String },

    #[error("fk definition has no target")]
    EmptyForeignKey,

    #[error("invalid fk target '{0}'")]
    InvalidTarget(String),

    #[error("{clause} in fk definition '{directive}' has no action")]
    EmptyAction { directive: String, clause: String },

    #[error("{clause} given twice in fk definition '{directive}'")]
    DuplicateClause { directive: String, clause: String },
}

const ON_UPDATE: &str = "ONUPDATE";
const ON_DELETE: &str = "ONDELETE";

/// Parse a raw annotation string
pub fn parse_tags(annotation: &str) -> Result<FieldTags, TagError> {
    let mut tags = FieldTags::default();

    for directive in annotation.split(',') {
        let directive = directive.trim();
        if directive.is_empty() {
            continue;
        }

        let (key, value) = match directive.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (directive, None),
        };

        match key {
            "primary_key" | "pk" => tags.primary_key = true,
            "auto_increment" | "autoincr" => tags.auto_increment = true,
            "null" => tags.nullable = true,
            "not_null" | "notnull" => tags.not_null = true,
            "index" | "unique" => tags.indexes.push(IndexTag {
                name: value.filter(|v| !v.is_empty()).map(str::to_string),
                unique: key == "unique",
            }),
            "column" => tags.column = Some(required(key, value)?.to_string()),
            "type" => {
                let raw = required(key, value)?;
                let column_type = raw
                    .parse::<ColumnType>()
                    .map_err(TagError::UnknownColumnType)?;
                tags.column_type = Some(column_type);
            }
            "empty" => tags.empty_value = Some(required(key, value)?.to_string()),
            "fk" => {
                let raw = required(key, value)?;
                tags.foreign_keys.push(parse_foreign_key(raw)?);
            }
            _ => return Err(TagError::UnknownDirective(directive.to_string())),
        }
    }

    if tags.nullable && tags.not_null {
        return Err(TagError::ConflictingNullability);
    }
    if tags.nullable && tags.is_primary_key() {
        return Err(TagError::NullablePrimaryKey);
    }

    Ok(tags)
}

fn required<'a>(key: &str, value: Option<&'a str>) -> Result<&'a str, TagError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TagError::MissingValue(key.to_string()))
}

/// Parse `<target>[.<field>] [ONUPDATE <action>] [ONDELETE <action>]`
pub fn parse_foreign_key(directive: &str) -> Result<ForeignKeyDirective, TagError> {
    let mut tokens = directive.split_whitespace().peekable();
    let target = tokens.next().ok_or(TagError::EmptyForeignKey)?;

    let (target_type, target_field) = match target.split_once('.') {
        Some((ty, field)) => {
            if ty.is_empty() || field.is_empty() || field.contains('.') {
                return Err(TagError::InvalidTarget(target.to_string()));
            }
            (ty.to_string(), Some(field.to_string()))
        }
        None => (target.to_string(), None),
    };

    let mut on_update: Option<String> = None;
    let mut on_delete: Option<String> = None;

    while let Some(token) = tokens.next() {
        let clause = token.to_ascii_uppercase();
        let slot = match clause.as_str() {
            ON_UPDATE => &mut on_update,
            ON_DELETE => &mut on_delete,
            _ => {
                return Err(TagError::UnknownToken {
                    directive: directive.to_string(),
                    token: token.to_string(),
                })
            }
        };
        if slot.is_some() {
            return Err(TagError::DuplicateClause {
                directive: directive.to_string(),
                clause,
            });
        }

        let mut words = Vec::new();
        while let Some(word) = tokens.peek() {
            if is_clause_keyword(word) {
                break;
            }
            words.push(word.to_ascii_uppercase());
            tokens.next();
        }
        if words.is_empty() {
            return Err(TagError::EmptyAction {
                directive: directive.to_string(),
                clause,
            });
        }
        *slot = Some(words.join(" "));
    }

    Ok(ForeignKeyDirective {
        raw: directive.to_string(),
        target_type,
        target_field,
        on_update,
        on_delete,
    })
}

fn is_clause_keyword(token: &str) -> bool {
    token.eq_ignore_ascii_case(ON_UPDATE) || token.eq_ignore_ascii_case(ON_DELETE)
}
