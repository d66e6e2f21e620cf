//! Structural validation for typed request bodies.
//!
//! [`Validate`] is implemented by hand or with `#[derive(Validate)]` from
//! `switchyard-macros`. The derive expands to calls into [`rules`], so the
//! functions there define what each `#[validate(...)]` attribute means.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path to the field, e.g. `items[2].sku`.
    pub field: String,
    /// Machine-readable rule name.
    pub code: &'static str,
    /// Human-readable explanation.
    pub message: String,
}

/// Every rule violation found while validating a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a violation.
    pub fn push(&mut self, field: impl Into<String>, code: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field: field.into(),
            code,
            message: message.into(),
        });
    }

    /// Merges violations from a nested value, prefixing their paths with `prefix`.
    pub fn merge_nested(&mut self, prefix: &str, nested: ValidationErrors) {
        for mut error in nested.fields {
            error.field = if error.field.is_empty() {
                prefix.to_string()
            } else if error.field.starts_with('[') || prefix.is_empty() {
                format!("{prefix}{}", error.field)
            } else {
                format!("{prefix}.{}", error.field)
            };
            self.fields.push(error);
        }
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed:")?;
        for (i, e) in self.fields.iter().enumerate() {
            let sep = if i == 0 { " " } else { "; " };
            write!(f, "{sep}{} {}", e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Field-level validation declared alongside a type.
pub trait Validate {
    /// Checks every declared rule and reports all violations at once.
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (i, item) in self.iter().enumerate() {
            if let Err(nested) = item.validate() {
                errors.merge_nested(&format!("[{i}]"), nested);
            }
        }
        errors.into_result()
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Some(inner) => inner.validate(),
            None => Ok(()),
        }
    }
}

impl<T: Validate + ?Sized> Validate for Box<T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        (**self).validate()
    }
}

impl Validate for serde_json::Value {}

/// Rule implementations targeted by `#[derive(Validate)]`.
pub mod rules {
    use super::*;

    /// Values with a measurable length. `None` means the value is absent.
    pub trait Length {
        fn length(&self) -> Option<usize>;
    }

    impl Length for str {
        fn length(&self) -> Option<usize> {
            Some(self.chars().count())
        }
    }

    impl Length for String {
        fn length(&self) -> Option<usize> {
            Some(self.chars().count())
        }
    }

    impl<T> Length for [T] {
        fn length(&self) -> Option<usize> {
            Some(self.len())
        }
    }

    impl<T> Length for Vec<T> {
        fn length(&self) -> Option<usize> {
            Some(self.len())
        }
    }

    impl<K, V> Length for BTreeMap<K, V> {
        fn length(&self) -> Option<usize> {
            Some(self.len())
        }
    }

    impl<K, V, S> Length for HashMap<K, V, S> {
        fn length(&self) -> Option<usize> {
            Some(self.len())
        }
    }

    impl<T: Length> Length for Option<T> {
        fn length(&self) -> Option<usize> {
            self.as_ref().and_then(Length::length)
        }
    }

    impl<T: Length + ?Sized> Length for &T {
        fn length(&self) -> Option<usize> {
            (**self).length()
        }
    }

    /// Numeric values comparable against range bounds.
    pub trait Numeric {
        fn as_f64(&self) -> Option<f64>;
    }

    macro_rules! impl_numeric {
        ($($ty:ty),*) => {
            $(
                impl Numeric for $ty {
                    fn as_f64(&self) -> Option<f64> {
                        Some(*self as f64)
                    }
                }
            )*
        };
    }

    impl_numeric!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

    impl<T: Numeric> Numeric for Option<T> {
        fn as_f64(&self) -> Option<f64> {
            self.as_ref().and_then(Numeric::as_f64)
        }
    }

    /// Values that read as text, for `one_of`.
    pub trait Text {
        fn text(&self) -> Option<&str>;
    }

    impl Text for str {
        fn text(&self) -> Option<&str> {
            Some(self)
        }
    }

    impl Text for String {
        fn text(&self) -> Option<&str> {
            Some(self)
        }
    }

    impl<T: Text> Text for Option<T> {
        fn text(&self) -> Option<&str> {
            self.as_ref().and_then(Text::text)
        }
    }

    /// Fails on empty or absent values.
    pub fn non_empty<T: Length + ?Sized>(errors: &mut ValidationErrors, field: &str, value: &T) {
        if value.length().is_none_or(|n| n == 0) {
            errors.push(field, "non_empty", "must not be empty");
        }
    }

    /// Bounds the length of present values; absent values pass.
    pub fn length<T: Length + ?Sized>(
        errors: &mut ValidationErrors,
        field: &str,
        value: &T,
        min: Option<usize>,
        max: Option<usize>,
    ) {
        let Some(n) = value.length() else { return };
        if let Some(min) = min.filter(|m| n < *m) {
            errors.push(field, "length", format!("length must be at least {min}"));
        } else if let Some(max) = max.filter(|m| n > *m) {
            errors.push(field, "length", format!("length must be at most {max}"));
        }
    }

    /// Bounds present numeric values; absent values pass.
    pub fn range<T: Numeric + ?Sized>(
        errors: &mut ValidationErrors,
        field: &str,
        value: &T,
        min: Option<f64>,
        max: Option<f64>,
    ) {
        let Some(v) = value.as_f64() else { return };
        if let Some(min) = min.filter(|m| v < *m) {
            errors.push(field, "range", format!("must be at least {min}"));
        } else if let Some(max) = max.filter(|m| v > *m) {
            errors.push(field, "range", format!("must be at most {max}"));
        }
    }

    /// Restricts present text values to a fixed set.
    pub fn one_of<T: Text + ?Sized>(
        errors: &mut ValidationErrors,
        field: &str,
        value: &T,
        allowed: &[&str],
    ) {
        let Some(text) = value.text() else { return };
        if !allowed.contains(&text) {
            errors.push(
                field,
                "one_of",
                format!("must be one of: {}", allowed.join(", ")),
            );
        }
    }

    /// Validates a nested value and prefixes its violations with `field`.
    pub fn nested<T: Validate + ?Sized>(errors: &mut ValidationErrors, field: &str, value: &T) {
        if let Err(inner) = value.validate() {
            errors.merge_nested(field, inner);
        }
    }

    /// Runs a user-supplied check returning a message on failure.
    pub fn custom<T: ?Sized>(
        errors: &mut ValidationErrors,
        field: &str,
        value: &T,
        check: impl FnOnce(&T) -> Result<(), String>,
    ) {
        if let Err(message) = check(value) {
            errors.push(field, "custom", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::rules::*;
    use super::*;

    struct Line {
        sku: String,
        qty: u32,
    }

    impl Validate for Line {
        fn validate(&self) -> Result<(), ValidationErrors> {
            let mut errors = ValidationErrors::new();
            non_empty(&mut errors, "sku", &self.sku);
            range(&mut errors, "qty", &self.qty, Some(1.0), Some(99.0));
            errors.into_result()
        }
    }

    #[test]
    fn nested_paths_include_indexes() {
        let lines = vec![
            Line {
                sku: "A-1".into(),
                qty: 2,
            },
            Line {
                sku: String::new(),
                qty: 0,
            },
        ];
        let mut errors = ValidationErrors::new();
        nested(&mut errors, "lines", &lines);

        let fields: Vec<_> = errors.fields().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["lines[1].sku", "lines[1].qty"]);
        assert_eq!(errors.fields()[1].message, "must be at least 1");
    }

    #[test]
    fn absent_optionals_skip_bound_rules_but_fail_non_empty() {
        let note: Option<String> = None;
        let mut errors = ValidationErrors::new();
        length(&mut errors, "note", &note, Some(3), None);
        one_of(&mut errors, "note", &note, &["a"]);
        assert!(errors.is_empty());

        non_empty(&mut errors, "note", &note);
        assert_eq!(errors.fields()[0].code, "non_empty");
    }

    #[test]
    fn one_of_lists_allowed_values() {
        let mut errors = ValidationErrors::new();
        one_of(&mut errors, "status", "lost", &["pending", "shipped"]);
        assert_eq!(errors.fields()[0].message, "must be one of: pending, shipped");
        assert_eq!(
            errors.to_string(),
            "validation failed: status must be one of: pending, shipped"
        );
    }

    #[test]
    fn length_counts_characters() {
        let mut errors = ValidationErrors::new();
        length(&mut errors, "name", "héllo", None, Some(5));
        assert!(errors.is_empty());
        length(&mut errors, "name", "héllo!", None, Some(5));
        assert_eq!(errors.fields()[0].message, "length must be at most 5");
    }
}
