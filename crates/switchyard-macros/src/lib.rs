//! Procedural macros for Switchyard.
//!
//! This crate provides:
//!
//! - `#[derive(Validate)]` - Generates `switchyard_core::Validate` from
//!   per-field `#[validate(...)]` rules
//!
//! # Validate Derive Macro
//!
//! ```rust,ignore
//! use serde::Deserialize;
//! use switchyard_macros::Validate;
//!
//! #[derive(Deserialize, Validate)]
//! #[serde(rename_all = "camelCase")]
//! pub struct CreateOrder {
//!     #[validate(non_empty, length(max = 64))]
//!     pub customer_id: String,
//!     #[validate(length(min = 1), nested)]
//!     pub lines: Vec<OrderLine>,
//!     #[validate(one_of("standard", "express"))]
//!     pub shipping: String,
//! }
//!
//! #[derive(Deserialize, Validate)]
//! pub struct OrderLine {
//!     #[validate(non_empty)]
//!     pub sku: String,
//!     #[validate(range(min = 1, max = 99))]
//!     pub quantity: u32,
//!     #[validate(custom = "check_note")]
//!     pub note: Option<String>,
//! }
//!
//! fn check_note(note: &Option<String>) -> Result<(), String> {
//!     match note {
//!         Some(n) if n.contains('<') => Err("must not contain markup".into()),
//!         _ => Ok(()),
//!     }
//! }
//! ```
//!
//! A failing `CreateOrder` reports paths such as `customerId` or
//! `lines[0].quantity`.

mod validate;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `switchyard_core::Validate`.
///
/// See the [crate documentation](crate) for the supported rules. Fields
/// without `#[validate(...)]` are not checked.
#[proc_macro_derive(Validate, attributes(validate))]
pub fn derive_validate(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match validate::derive_validate(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
