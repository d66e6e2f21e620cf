//! `#[derive(Validate)]` implementation.
//!
//! # Field attributes `#[validate(...)]`
//!
//! | Rule | Example | Expands to |
//! |------|---------|------------|
//! | `non_empty` | `#[validate(non_empty)]` | `rules::non_empty` |
//! | `length` | `#[validate(length(min = 1, max = 64))]` | `rules::length` |
//! | `range` | `#[validate(range(min = 0, max = 99.5))]` | `rules::range` |
//! | `one_of` | `#[validate(one_of("a", "b"))]` | `rules::one_of` |
//! | `nested` | `#[validate(nested)]` | `rules::nested` |
//! | `custom` | `#[validate(custom = "path::to::check")]` | `rules::custom` |
//!
//! Several rules may be combined in one attribute or spread across several.
//! They run in declaration order and every violation is reported.
//!
//! # Container attributes `#[validate(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `crate` | Path to `switchyard_core` when it is re-exported, e.g. `"::switchyard::core"` |
//!
//! Field names in reports follow `#[serde(rename = "...")]` and
//! `#[serde(rename_all = "...")]` so they match the wire format.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Data, DeriveInput, Expr, ExprPath, Fields, LitInt, LitStr, Member, Path, Token};

// ============================================================================
// Attribute structures
// ============================================================================

enum Rule {
    NonEmpty,
    Length {
        min: Option<LitInt>,
        max: Option<LitInt>,
    },
    Range {
        min: Option<Expr>,
        max: Option<Expr>,
    },
    OneOf(Vec<LitStr>),
    Nested,
    Custom(ExprPath),
}

struct FieldRules {
    member: Member,
    wire_name: String,
    rules: Vec<Rule>,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_validate(input: &DeriveInput) -> syn::Result<TokenStream> {
    let krate = parse_crate_path(&input.attrs)?;
    let rename_all = parse_rename_all(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        Data::Enum(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Validate can only be derived for structs",
            ));
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Validate cannot be derived for unions",
            ));
        }
    };

    let mut checks = Vec::new();
    for field in collect_fields(fields, rename_all.as_deref())? {
        for rule in &field.rules {
            checks.push(expand_rule(&krate, &field, rule));
        }
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let errors_ident = if checks.is_empty() {
        quote!(_errors)
    } else {
        quote!(errors)
    };

    Ok(quote! {
        impl #impl_generics #krate::Validate for #name #ty_generics #where_clause {
            fn validate(&self) -> ::core::result::Result<(), #krate::ValidationErrors> {
                #[allow(unused_mut)]
                let mut #errors_ident = #krate::ValidationErrors::new();
                #(#checks)*
                #errors_ident.into_result()
            }
        }
    })
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_crate_path(attrs: &[Attribute]) -> syn::Result<Path> {
    let mut krate: Option<Path> = None;

    for attr in attrs {
        if !attr.path().is_ident("validate") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let lit: LitStr = meta.value()?.parse()?;
                krate = Some(lit.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported container attribute, expected `crate`"))
            }
        })?;
    }

    Ok(krate.unwrap_or_else(|| syn::parse_quote!(::switchyard_core)))
}

fn parse_rename_all(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename_all = None;

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        // Other serde keys are skipped, including ones with values or lists.
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let lit: LitStr = meta.value()?.parse()?;
                rename_all = Some(lit.value());
            } else {
                skip_meta(&meta)?;
            }
            Ok(())
        })?;
    }

    Ok(rename_all)
}

fn parse_serde_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                rename = Some(lit.value());
            } else {
                skip_meta(&meta)?;
            }
            Ok(())
        })?;
    }

    Ok(rename)
}

/// Consumes `= value` or `(...)` after a key we do not interpret.
fn skip_meta(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta(&inner))?;
    }
    Ok(())
}

fn parse_field_rules(attrs: &[Attribute]) -> syn::Result<Vec<Rule>> {
    let mut rules = Vec::new();

    for attr in attrs {
        if !attr.path().is_ident("validate") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("non_empty") {
                rules.push(Rule::NonEmpty);
            } else if meta.path.is_ident("nested") {
                rules.push(Rule::Nested);
            } else if meta.path.is_ident("length") {
                let (mut min, mut max) = (None, None);
                meta.parse_nested_meta(|bound| {
                    if bound.path.is_ident("min") {
                        min = Some(bound.value()?.parse::<LitInt>()?);
                    } else if bound.path.is_ident("max") {
                        max = Some(bound.value()?.parse::<LitInt>()?);
                    } else {
                        return Err(bound.error("expected `min` or `max`"));
                    }
                    Ok(())
                })?;
                if min.is_none() && max.is_none() {
                    return Err(meta.error("`length` needs `min`, `max` or both"));
                }
                rules.push(Rule::Length { min, max });
            } else if meta.path.is_ident("range") {
                let (mut min, mut max) = (None, None);
                meta.parse_nested_meta(|bound| {
                    if bound.path.is_ident("min") {
                        min = Some(bound.value()?.parse::<Expr>()?);
                    } else if bound.path.is_ident("max") {
                        max = Some(bound.value()?.parse::<Expr>()?);
                    } else {
                        return Err(bound.error("expected `min` or `max`"));
                    }
                    Ok(())
                })?;
                if min.is_none() && max.is_none() {
                    return Err(meta.error("`range` needs `min`, `max` or both"));
                }
                rules.push(Rule::Range { min, max });
            } else if meta.path.is_ident("one_of") {
                let content;
                syn::parenthesized!(content in meta.input);
                let values = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
                if values.is_empty() {
                    return Err(meta.error("`one_of` needs at least one value"));
                }
                rules.push(Rule::OneOf(values.into_iter().collect()));
            } else if meta.path.is_ident("custom") {
                let lit: LitStr = meta.value()?.parse()?;
                rules.push(Rule::Custom(lit.parse()?));
            } else {
                return Err(meta.error(
                    "unknown rule, expected one of `non_empty`, `length`, `range`, `one_of`, `nested`, `custom`",
                ));
            }
            Ok(())
        })?;
    }

    Ok(rules)
}

fn collect_fields(fields: &Fields, rename_all: Option<&str>) -> syn::Result<Vec<FieldRules>> {
    let mut out = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let rules = parse_field_rules(&field.attrs)?;
        if rules.is_empty() {
            continue;
        }

        let (member, wire_name) = match &field.ident {
            Some(ident) => {
                let raw = ident.to_string();
                let raw = raw.strip_prefix("r#").unwrap_or(&raw).to_string();
                let wire = match parse_serde_rename(&field.attrs)? {
                    Some(rename) => rename,
                    None => apply_rename_all(&raw, rename_all, field.span())?,
                };
                (Member::Named(ident.clone()), wire)
            }
            None => (Member::Unnamed(index.into()), index.to_string()),
        };

        out.push(FieldRules {
            member,
            wire_name,
            rules,
        });
    }

    Ok(out)
}

fn apply_rename_all(name: &str, rule: Option<&str>, span: Span) -> syn::Result<String> {
    let words: Vec<&str> = name.split('_').filter(|w| !w.is_empty()).collect();
    let capitalize = |w: &str| {
        let mut chars = w.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        }
    };

    Ok(match rule {
        None | Some("snake_case") => name.to_string(),
        Some("lowercase") => name.replace('_', ""),
        Some("UPPERCASE") => name.replace('_', "").to_uppercase(),
        Some("SCREAMING_SNAKE_CASE") => name.to_uppercase(),
        Some("kebab-case") => name.replace('_', "-"),
        Some("SCREAMING-KEBAB-CASE") => name.replace('_', "-").to_uppercase(),
        Some("PascalCase") => words.iter().map(|w| capitalize(w)).collect(),
        Some("camelCase") => words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.to_string() } else { capitalize(w) })
            .collect(),
        Some(other) => {
            return Err(syn::Error::new(
                span,
                format!("unsupported serde rename_all rule `{other}`"),
            ));
        }
    })
}

// ============================================================================
// Code generation
// ============================================================================

fn expand_rule(krate: &Path, field: &FieldRules, rule: &Rule) -> TokenStream {
    let member = &field.member;
    let name = &field.wire_name;
    let rules = quote!(#krate::rules);

    match rule {
        Rule::NonEmpty => quote! {
            #rules::non_empty(&mut errors, #name, &self.#member);
        },
        Rule::Length { min, max } => {
            let min = option_tokens(min.as_ref().map(|m| quote!(#m)));
            let max = option_tokens(max.as_ref().map(|m| quote!(#m)));
            quote! {
                #rules::length(&mut errors, #name, &self.#member, #min, #max);
            }
        }
        Rule::Range { min, max } => {
            let min = option_tokens(min.as_ref().map(|m| quote!((#m) as f64)));
            let max = option_tokens(max.as_ref().map(|m| quote!((#m) as f64)));
            quote! {
                #rules::range(&mut errors, #name, &self.#member, #min, #max);
            }
        }
        Rule::OneOf(values) => quote! {
            #rules::one_of(&mut errors, #name, &self.#member, &[#(#values),*]);
        },
        Rule::Nested => quote! {
            #rules::nested(&mut errors, #name, &self.#member);
        },
        Rule::Custom(path) => quote! {
            #rules::custom(&mut errors, #name, &self.#member, #path);
        },
    }
}

fn option_tokens(value: Option<TokenStream>) -> TokenStream {
    match value {
        Some(v) => quote!(::core::option::Option::Some(#v)),
        None => quote!(::core::option::Option::None),
    }
}
