//! Query documents.
//!
//! A `QueryDocument` is the structural form of a query: an optional operation
//! name, variable definitions, and a tree of fields. Documents compare by
//! content. Their printed form (`Display`) is query-language text and is used
//! as the document component of request deduplication keys.
//!
//! # Example
//!
//! ```rust
//! use weft_core::{Argument, Field, QueryDocument, VariableDefinition, Variables};
//!
//! let doc = QueryDocument::query("GetUser")
//!     .variable(VariableDefinition::new("id", "ID!"))
//!     .field(
//!         Field::new("user")
//!             .arg("id", Argument::variable("id"))
//!             .select([Field::new("id"), Field::new("name")]),
//!     );
//!
//! assert_eq!(
//!     doc.to_string(),
//!     "query GetUser($id: ID!) { user(id: $id) { id name } }"
//! );
//! assert!(doc.validate_variables(&Variables::new()).is_err());
//! ```

use crate::error::{Error, Result};
use crate::variables::Variables;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use serde_json::{Map, Value};

/// An argument passed to a field.
#[derive(Clone, Debug, PartialEq)]
pub enum Argument {
    /// Inline literal
    Literal(Value),
    /// Reference to an operation variable
    Variable(String),
}

impl Argument {
    /// Creates a literal argument.
    pub fn literal(value: impl Into<Value>) -> Self {
        Argument::Literal(value.into())
    }

    /// Creates a variable reference.
    pub fn variable(name: impl Into<String>) -> Self {
        Argument::Variable(name.into())
    }

    /// Resolves the argument against variables. Unset variables resolve to `None`.
    pub fn resolve(&self, variables: &Variables) -> Option<Value> {
        match self {
            Argument::Literal(value) => Some(value.clone()),
            Argument::Variable(name) => variables.get(name).cloned(),
        }
    }
}

/// A variable declared by an operation.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDefinition {
    /// Variable name without the `$` sigil
    pub name: String,
    /// Declared type, e.g. `ID!` or `[String]`
    pub type_name: String,
    /// Default used when the variable is not supplied
    pub default_value: Option<Value>,
}

impl VariableDefinition {
    /// Creates a definition without a default value.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default_value: None,
        }
    }

    /// Sets the default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// A variable is required when its type is non-null and it has no default.
    pub fn is_required(&self) -> bool {
        self.type_name.ends_with('!') && self.default_value.is_none()
    }
}

/// A requested field, possibly with a nested selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    alias: Option<String>,
    arguments: Vec<(String, Argument)>,
    selection: Option<Vec<Field>>,
}

impl Field {
    /// Creates a leaf field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: Vec::new(),
            selection: None,
        }
    }

    /// Sets the response alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Adds an argument.
    pub fn arg(mut self, name: impl Into<String>, argument: Argument) -> Self {
        self.arguments.push((name.into(), argument));
        self
    }

    /// Sets the nested selection, turning this into an object field.
    pub fn select(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.selection = Some(fields.into_iter().collect());
        self
    }

    /// Returns the schema field name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the key this field occupies in result data.
    #[inline]
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Returns the arguments in declaration order.
    #[inline]
    pub fn arguments(&self) -> &[(String, Argument)] {
        &self.arguments
    }

    /// Returns the nested selection, if any.
    #[inline]
    pub fn selection(&self) -> Option<&[Field]> {
        self.selection.as_deref()
    }

    /// Returns true if the field has no nested selection.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.selection.is_none()
    }

    /// Returns the name under which the field is stored in a normalized record.
    ///
    /// Fields without arguments are stored under their name. Otherwise the
    /// resolved arguments are appended as canonical JSON with sorted keys, e.g.
    /// `user({"id":"1"})`. Arguments whose variable is unset are omitted.
    pub fn store_field_name(&self, variables: &Variables) -> String {
        if self.arguments.is_empty() {
            return self.name.clone();
        }
        let resolved: BTreeMap<&str, Value> = self
            .arguments
            .iter()
            .filter_map(|(name, arg)| arg.resolve(variables).map(|v| (name.as_str(), v)))
            .collect();
        let args: Map<String, Value> = resolved
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        format!("{}({})", self.name, Value::Object(args))
    }
}

/// A query operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryDocument {
    operation_name: Option<String>,
    variables: Vec<VariableDefinition>,
    selection: Vec<Field>,
}

impl QueryDocument {
    /// Creates a named query.
    pub fn query(name: impl Into<String>) -> Self {
        Self {
            operation_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Creates an anonymous query.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Declares a variable.
    pub fn variable(mut self, definition: VariableDefinition) -> Self {
        self.variables.push(definition);
        self
    }

    /// Adds a root field.
    pub fn field(mut self, field: Field) -> Self {
        self.selection.push(field);
        self
    }

    /// Returns the operation name, if any.
    #[inline]
    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Returns the declared variables.
    #[inline]
    pub fn variable_definitions(&self) -> &[VariableDefinition] {
        &self.variables
    }

    /// Returns the root selection.
    #[inline]
    pub fn selection(&self) -> &[Field] {
        &self.selection
    }

    /// Returns the names of required variables absent from `variables`.
    pub fn missing_variables(&self, variables: &Variables) -> Vec<String> {
        self.variables
            .iter()
            .filter(|def| def.is_required())
            .filter(|def| variables.get(&def.name).map_or(true, Value::is_null))
            .map(|def| def.name.clone())
            .collect()
    }

    /// Fails with `Error::MissingVariables` when required variables are absent.
    pub fn validate_variables(&self, variables: &Variables) -> Result<()> {
        let missing = self.missing_variables(variables);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::missing_variables(
                self.operation_name().unwrap_or("<anonymous>"),
                missing,
            ))
        }
    }

    /// Returns `variables` with declared defaults filled in for unset names.
    pub fn with_defaults(&self, variables: &Variables) -> Variables {
        let mut resolved = variables.clone();
        for def in &self.variables {
            if let Some(default) = &def.default_value {
                if !resolved.contains(&def.name) {
                    resolved.insert(def.name.clone(), default.clone());
                }
            }
        }
        resolved
    }
}

impl fmt::Display for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query")?;
        if let Some(name) = &self.operation_name {
            write!(f, " {}", name)?;
        }
        if !self.variables.is_empty() {
            write!(f, "(")?;
            for (i, def) in self.variables.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "${}: {}", def.name, def.type_name)?;
                if let Some(default) = &def.default_value {
                    write!(f, " = ")?;
                    write_literal(f, default)?;
                }
            }
            write!(f, ")")?;
        }
        write!(f, " ")?;
        write_selection(f, &self.selection)
    }
}

fn write_selection(f: &mut fmt::Formatter<'_>, fields: &[Field]) -> fmt::Result {
    write!(f, "{{")?;
    for field in fields {
        write!(f, " ")?;
        if let Some(alias) = &field.alias {
            write!(f, "{}: ", alias)?;
        }
        write!(f, "{}", field.name)?;
        if !field.arguments.is_empty() {
            write!(f, "(")?;
            for (i, (name, arg)) in field.arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: ", name)?;
                match arg {
                    Argument::Literal(value) => write_literal(f, value)?,
                    Argument::Variable(var) => write!(f, "${}", var)?,
                }
            }
            write!(f, ")")?;
        }
        if let Some(selection) = &field.selection {
            write!(f, " ")?;
            write_selection(f, selection)?;
        }
    }
    write!(f, " }}")
}

/// Writes a value as a query-language literal (unquoted object keys).
fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Array(items) => {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_literal(f, item)?;
            }
            write!(f, "]")
        }
        Value::Object(map) => {
            write!(f, "{{")?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: ", key)?;
                write_literal(f, item)?;
            }
            write!(f, "}}")
        }
        other => write!(f, "{}", other),
    }
}
