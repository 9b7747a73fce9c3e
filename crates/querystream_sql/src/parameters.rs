//! Parameter binders turning constants into driver specific placeholders.

use std::fmt;

use querystream::ScalarValue;
use serde::Serialize;

/// A value bound to a placeholder in command text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundParameter {
    /// Placeholder name as it appears in the text, e.g. `@p0` or `$1`.
    pub name: String,
    pub value: ScalarValue,
}

/// Collects parameters for a single command.
///
/// Binders that support named parameters may hand out the same name when
/// the same value is defined more than once.
pub trait ParameterBinder: fmt::Debug + Send {
    /// Define a parameter for `value`, returning the placeholder to use in
    /// the command text.
    fn define_parameter(&mut self, value: &ScalarValue) -> String;

    /// Parameters defined so far, in the order they must be bound.
    fn parameters(&self) -> &[BoundParameter];

    fn into_parameters(self: Box<Self>) -> Vec<BoundParameter>;
}

/// Anonymous `?` placeholders bound by position.
#[derive(Debug, Default)]
pub struct PositionalBinder {
    params: Vec<BoundParameter>,
}

impl PositionalBinder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParameterBinder for PositionalBinder {
    fn define_parameter(&mut self, value: &ScalarValue) -> String {
        // Positional placeholders can't be reused, every occurrence binds.
        self.params.push(BoundParameter {
            name: "?".to_string(),
            value: value.clone(),
        });
        "?".to_string()
    }

    fn parameters(&self) -> &[BoundParameter] {
        &self.params
    }

    fn into_parameters(self: Box<Self>) -> Vec<BoundParameter> {
        self.params
    }
}

/// Named placeholders built from a prefix and a counter, e.g. `@p0`.
#[derive(Debug)]
pub struct NamedBinder {
    prefix: String,
    params: Vec<BoundParameter>,
}

impl NamedBinder {
    pub fn new(prefix: impl Into<String>) -> Self {
        NamedBinder {
            prefix: prefix.into(),
            params: Vec::new(),
        }
    }
}

impl Default for NamedBinder {
    fn default() -> Self {
        Self::new("@p")
    }
}

impl ParameterBinder for NamedBinder {
    fn define_parameter(&mut self, value: &ScalarValue) -> String {
        if let Some(existing) = find_equal(&self.params, value) {
            return existing.name.clone();
        }
        let name = format!("{}{}", self.prefix, self.params.len());
        self.params.push(BoundParameter {
            name: name.clone(),
            value: value.clone(),
        });
        name
    }

    fn parameters(&self) -> &[BoundParameter] {
        &self.params
    }

    fn into_parameters(self: Box<Self>) -> Vec<BoundParameter> {
        self.params
    }
}

/// One-based numbered placeholders, e.g. `$1`.
#[derive(Debug, Default)]
pub struct NumberedBinder {
    params: Vec<BoundParameter>,
}

impl NumberedBinder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParameterBinder for NumberedBinder {
    fn define_parameter(&mut self, value: &ScalarValue) -> String {
        if let Some(existing) = find_equal(&self.params, value) {
            return existing.name.clone();
        }
        let name = format!("${}", self.params.len() + 1);
        self.params.push(BoundParameter {
            name: name.clone(),
            value: value.clone(),
        });
        name
    }

    fn parameters(&self) -> &[BoundParameter] {
        &self.params
    }

    fn into_parameters(self: Box<Self>) -> Vec<BoundParameter> {
        self.params
    }
}

/// Nulls are never coalesced.
fn find_equal<'a>(
    params: &'a [BoundParameter],
    value: &ScalarValue,
) -> Option<&'a BoundParameter> {
    if value.is_null() {
        return None;
    }
    params.iter().find(|p| &p.value == value)
}
