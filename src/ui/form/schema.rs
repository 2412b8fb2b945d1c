//! Declarative form schemas
//!
//! A `FormSchema` is a list of `FieldDescriptor`s plus cross-field rules.
//! Schemas are checked once at construction; after that every validation
//! call can assume the rules are internally consistent.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Field name to value; also the shape of a wizard Draft
pub type Values = serde_json::Map<String, Value>;

/// Field name to error message; an absent field is valid
pub type ValidationErrors = BTreeMap<String, String>;

/// Element type of a `List` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListItemKind {
    Text,
    Integer,
}

/// Kind-specific constraints of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text {
        min_len: Option<usize>,
        max_len: Option<usize>,
        pattern: Option<String>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
        integer: bool,
    },
    Boolean,
    Select {
        options: Vec<String>,
    },
    List {
        item: ListItemKind,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
}

impl FieldKind {
    /// The value an untouched field starts with
    fn empty_value(&self) -> Value {
        match self {
            FieldKind::Text { .. } => Value::String(String::new()),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::List { .. } => Value::Array(Vec::new()),
            FieldKind::Number { .. } | FieldKind::Select { .. } => Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub kind: FieldKind,
    pub default: Option<Value>,
    pub help: Option<String>,
}

impl FieldDescriptor {
    fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            required: false,
            kind,
            default: None,
            help: None,
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Text {
                min_len: None,
                max_len: None,
                pattern: None,
            },
        )
    }

    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Number {
                min: None,
                max: None,
                integer: false,
            },
        )
    }

    pub fn integer(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Number {
                min: None,
                max: None,
                integer: true,
            },
        )
    }

    pub fn boolean(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Boolean)
    }

    pub fn select<I, S>(name: impl Into<String>, label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            label,
            FieldKind::Select {
                options: options.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn list(name: impl Into<String>, label: impl Into<String>, item: ListItemKind) -> Self {
        Self::new(
            name,
            label,
            FieldKind::List {
                item,
                min_items: None,
                max_items: None,
            },
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark required only when `required` is true (for provider-driven schemas)
    pub fn required_when(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Minimum length for text, minimum count for lists, minimum for numbers
    pub fn min(mut self, min: f64) -> Self {
        match &mut self.kind {
            FieldKind::Text { min_len, .. } => *min_len = Some(min as usize),
            FieldKind::List { min_items, .. } => *min_items = Some(min as usize),
            FieldKind::Number { min: m, .. } => *m = Some(min),
            FieldKind::Boolean | FieldKind::Select { .. } => {}
        }
        self
    }

    /// Maximum length for text, maximum count for lists, maximum for numbers
    pub fn max(mut self, max: f64) -> Self {
        match &mut self.kind {
            FieldKind::Text { max_len, .. } => *max_len = Some(max as usize),
            FieldKind::List { max_items, .. } => *max_items = Some(max as usize),
            FieldKind::Number { max: m, .. } => *m = Some(max),
            FieldKind::Boolean | FieldKind::Select { .. } => {}
        }
        self
    }

    pub fn pattern(mut self, regex: impl Into<String>) -> Self {
        if let FieldKind::Text { pattern, .. } = &mut self.kind {
            *pattern = Some(regex.into());
        }
        self
    }

    /// Value the field starts with when no initial value is supplied
    pub fn initial_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.empty_value())
    }
}

/// Predicate used by `CrossFieldRule::Custom`: `Some(message)` means invalid
pub type RuleCheck = Arc<dyn Fn(&Values) -> Option<String> + Send + Sync>;

/// Validation that depends on more than one field
#[derive(Clone)]
pub enum CrossFieldRule {
    /// `field` is required when `when` equals `equals`
    RequiredIf {
        field: String,
        when: String,
        equals: Value,
    },
    /// `field` is required unless `when` equals `equals`
    RequiredUnless {
        field: String,
        when: String,
        equals: Value,
    },
    /// Arbitrary check; the error attaches to `field`
    Custom {
        field: String,
        reads: Vec<String>,
        check: RuleCheck,
    },
}

impl CrossFieldRule {
    pub fn required_if(field: impl Into<String>, when: impl Into<String>, equals: Value) -> Self {
        CrossFieldRule::RequiredIf {
            field: field.into(),
            when: when.into(),
            equals,
        }
    }

    pub fn required_unless(
        field: impl Into<String>,
        when: impl Into<String>,
        equals: Value,
    ) -> Self {
        CrossFieldRule::RequiredUnless {
            field: field.into(),
            when: when.into(),
            equals,
        }
    }

    pub fn custom<F>(field: impl Into<String>, reads: &[&str], check: F) -> Self
    where
        F: Fn(&Values) -> Option<String> + Send + Sync + 'static,
    {
        CrossFieldRule::Custom {
            field: field.into(),
            reads: reads.iter().map(|s| (*s).to_string()).collect(),
            check: Arc::new(check),
        }
    }

    /// Field the error is reported on
    pub fn target(&self) -> &str {
        match self {
            CrossFieldRule::RequiredIf { field, .. }
            | CrossFieldRule::RequiredUnless { field, .. }
            | CrossFieldRule::Custom { field, .. } => field,
        }
    }

    /// Every field whose change can flip this rule
    pub fn reads(&self) -> Vec<&str> {
        match self {
            CrossFieldRule::RequiredIf { field, when, .. }
            | CrossFieldRule::RequiredUnless { field, when, .. } => vec![field, when],
            CrossFieldRule::Custom { field, reads, .. } => {
                let mut all: Vec<&str> = vec![field];
                all.extend(reads.iter().map(String::as_str));
                all
            }
        }
    }
}

impl fmt::Debug for CrossFieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossFieldRule::RequiredIf {
                field,
                when,
                equals,
            } => f
                .debug_struct("RequiredIf")
                .field("field", field)
                .field("when", when)
                .field("equals", equals)
                .finish(),
            CrossFieldRule::RequiredUnless {
                field,
                when,
                equals,
            } => f
                .debug_struct("RequiredUnless")
                .field("field", field)
                .field("when", when)
                .field("equals", equals)
                .finish(),
            CrossFieldRule::Custom { field, reads, .. } => f
                .debug_struct("Custom")
                .field("field", field)
                .field("reads", reads)
                .finish_non_exhaustive(),
        }
    }
}

/// Inconsistent schema definitions, caught at construction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("field name must not be empty")]
    EmptyName,
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
    #[error("select field '{0}' has no options")]
    EmptyOptions(String),
    #[error("field '{0}' has a minimum greater than its maximum")]
    InvertedBounds(String),
    #[error("field '{field}' has an invalid pattern: {message}")]
    InvalidPattern { field: String, message: String },
    #[error("rule on '{rule_field}' references unknown field '{unknown}'")]
    UnknownRuleField { rule_field: String, unknown: String },
    #[error("default for field '{field}' is invalid: {message}")]
    InvalidDefault { field: String, message: String },
}

#[derive(Debug, Clone)]
pub struct FormSchema {
    fields: Vec<FieldDescriptor>,
    rules: Vec<CrossFieldRule>,
    patterns: HashMap<String, Regex>,
}

impl FormSchema {
    /// Build a schema, rejecting any internally inconsistent definition
    pub fn new(fields: Vec<FieldDescriptor>, rules: Vec<CrossFieldRule>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        let mut patterns = HashMap::new();

        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            match &field.kind {
                FieldKind::Select { options } if options.is_empty() => {
                    return Err(SchemaError::EmptyOptions(field.name.clone()));
                }
                FieldKind::Text {
                    min_len: Some(lo),
                    max_len: Some(hi),
                    ..
                }
                | FieldKind::List {
                    min_items: Some(lo),
                    max_items: Some(hi),
                    ..
                } if lo > hi => {
                    return Err(SchemaError::InvertedBounds(field.name.clone()));
                }
                FieldKind::Number {
                    min: Some(lo),
                    max: Some(hi),
                    ..
                } if lo > hi => {
                    return Err(SchemaError::InvertedBounds(field.name.clone()));
                }
                _ => {}
            }
            if let FieldKind::Text {
                pattern: Some(pattern),
                ..
            } = &field.kind
            {
                let regex = Regex::new(pattern).map_err(|e| SchemaError::InvalidPattern {
                    field: field.name.clone(),
                    message: e.to_string(),
                })?;
                patterns.insert(field.name.clone(), regex);
            }
        }

        for rule in &rules {
            for name in rule.reads() {
                if !seen.contains(name) {
                    return Err(SchemaError::UnknownRuleField {
                        rule_field: rule.target().to_string(),
                        unknown: name.to_string(),
                    });
                }
            }
        }

        let schema = Self {
            fields,
            rules,
            patterns,
        };

        for field in &schema.fields {
            if let Some(default) = &field.default {
                if let Some(message) = schema.check_value(field, default, false) {
                    return Err(SchemaError::InvalidDefault {
                        field: field.name.clone(),
                        message,
                    });
                }
            }
        }

        Ok(schema)
    }

    /// A schema with no fields (summary and confirmation steps)
    pub fn empty() -> Self {
        Self {
            fields: Vec::new(),
            rules: Vec::new(),
            patterns: HashMap::new(),
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Initial values for every field
    pub fn defaults(&self) -> Values {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.initial_value()))
            .collect()
    }

    /// Rule targets that must be re-checked when `name` changes
    pub fn dependents_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.reads().contains(&name))
            .map(CrossFieldRule::target)
    }

    /// Validate a single field against its own rules and every cross-field
    /// rule that targets it. Returns the first error.
    pub fn validate_field(&self, name: &str, values: &Values) -> Option<String> {
        let field = self.field(name)?;
        let value = values.get(name).unwrap_or(&Value::Null);

        if let Some(message) = self.check_value(field, value, field.required) {
            return Some(message);
        }

        self.rules
            .iter()
            .filter(|rule| rule.target() == name)
            .find_map(|rule| self.check_rule(rule, field, values))
    }

    /// Validate every field
    pub fn validate(&self, values: &Values) -> ValidationErrors {
        self.fields
            .iter()
            .filter_map(|f| {
                self.validate_field(&f.name, values)
                    .map(|msg| (f.name.clone(), msg))
            })
            .collect()
    }

    fn check_rule(
        &self,
        rule: &CrossFieldRule,
        field: &FieldDescriptor,
        values: &Values,
    ) -> Option<String> {
        let value = values.get(&field.name).unwrap_or(&Value::Null);
        match rule {
            CrossFieldRule::RequiredIf { when, equals, .. } => {
                let triggered = values.get(when).unwrap_or(&Value::Null) == equals;
                (triggered && is_blank(value)).then(|| format!("{} is required", field.label))
            }
            CrossFieldRule::RequiredUnless { when, equals, .. } => {
                let exempt = values.get(when).unwrap_or(&Value::Null) == equals;
                (!exempt && is_blank(value)).then(|| format!("{} is required", field.label))
            }
            CrossFieldRule::Custom { check, .. } => check(values),
        }
    }

    fn check_value(&self, field: &FieldDescriptor, value: &Value, required: bool) -> Option<String> {
        let label = &field.label;

        if is_blank(value) {
            // Booleans are never blank: `false` is an answer
            return (required && !matches!(field.kind, FieldKind::Boolean))
                .then(|| format!("{label} is required"));
        }

        match &field.kind {
            FieldKind::Text {
                min_len, max_len, ..
            } => {
                let Some(text) = value.as_str() else {
                    return Some(format!("{label} must be text"));
                };
                let len = text.chars().count();
                if let Some(min) = min_len {
                    if len < *min {
                        return Some(format!("{label} must be at least {min} characters"));
                    }
                }
                if let Some(max) = max_len {
                    if len > *max {
                        return Some(format!("{label} must be at most {max} characters"));
                    }
                }
                if let Some(regex) = self.patterns.get(&field.name) {
                    if !regex.is_match(text) {
                        return Some(format!("{label} has an invalid format"));
                    }
                }
                None
            }
            FieldKind::Number { min, max, integer } => {
                let Some(number) = value.as_f64() else {
                    return Some(format!("{label} must be a number"));
                };
                if *integer && number.fract() != 0.0 {
                    return Some(format!("{label} must be a whole number"));
                }
                if let Some(min) = min {
                    if number < *min {
                        return Some(format!("{label} must be at least {min}"));
                    }
                }
                if let Some(max) = max {
                    if number > *max {
                        return Some(format!("{label} must be at most {max}"));
                    }
                }
                None
            }
            FieldKind::Boolean => {
                (!value.is_boolean()).then(|| format!("{label} must be true or false"))
            }
            FieldKind::Select { options } => {
                let valid = value
                    .as_str()
                    .is_some_and(|s| options.iter().any(|o| o == s));
                (!valid).then(|| format!("{label} must be one of: {}", options.join(", ")))
            }
            FieldKind::List {
                item,
                min_items,
                max_items,
            } => {
                let Some(items) = value.as_array() else {
                    return Some(format!("{label} must be a list"));
                };
                let well_typed = items.iter().all(|v| match item {
                    ListItemKind::Text => v.as_str().is_some_and(|s| !s.trim().is_empty()),
                    ListItemKind::Integer => v.as_i64().is_some(),
                });
                if !well_typed {
                    return Some(match item {
                        ListItemKind::Text => format!("{label} entries must be non-empty text"),
                        ListItemKind::Integer => format!("{label} entries must be whole numbers"),
                    });
                }
                if let Some(min) = min_items {
                    if items.len() < *min {
                        return Some(format!("{label} must have at least {min} entries"));
                    }
                }
                if let Some(max) = max_items {
                    if items.len() > *max {
                        return Some(format!("{label} must have at most {max} entries"));
                    }
                }
                None
            }
        }
    }
}

/// Null, whitespace-only strings, and empty lists count as "no answer"
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
