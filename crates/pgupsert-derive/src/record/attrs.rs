//! Attribute parsing for the Record derive macro.

use syn::{DeriveInput, Result};

use crate::sql_ident::{parse_column, parse_column_list};

#[derive(Default)]
pub(super) struct StructAttrs {
    pub(super) conflict_keys: Vec<String>,
    pub(super) skip_columns: Vec<String>,
}

struct StructAttrList {
    conflict_keys: Option<Vec<String>>,
    skip_columns: Option<Vec<String>>,
}

impl syn::parse::Parse for StructAttrList {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut conflict_keys: Option<Vec<String>> = None;
        let mut skip_columns: Option<Vec<String>> = None;

        loop {
            if input.is_empty() {
                break;
            }

            let ident: syn::Ident = input.parse()?;
            let key = ident.to_string();

            let _: syn::Token![=] = input.parse()?;
            let value: syn::LitStr = input.parse()?;

            match key.as_str() {
                "conflict_keys" => {
                    conflict_keys = Some(parse_column_list(&value, "conflict_keys")?);
                }
                "skip_columns" => {
                    skip_columns = Some(parse_column_list(&value, "skip_columns")?);
                }
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown struct attribute `{key}`"),
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(Self {
            conflict_keys,
            skip_columns,
        })
    }
}

#[derive(Default)]
pub(super) struct FieldAttrs {
    pub(super) column: Option<String>,
    pub(super) key: bool,
    pub(super) skip: bool,
    pub(super) flatten: bool,
}

impl syn::parse::Parse for FieldAttrs {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attrs = FieldAttrs::default();

        loop {
            if input.is_empty() {
                break;
            }

            let ident: syn::Ident = input.parse()?;
            let key = ident.to_string();

            match key.as_str() {
                "key" | "id" => attrs.key = true,
                "skip" => attrs.skip = true,
                "flatten" => attrs.flatten = true,
                "column" => {
                    let _: syn::Token![=] = input.parse()?;
                    let value: syn::LitStr = input.parse()?;
                    attrs.column = Some(parse_column(&value, "column")?);
                }
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown field attribute `{key}`"),
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attrs)
    }
}

pub(super) fn get_struct_attrs(input: &DeriveInput) -> Result<StructAttrs> {
    let mut merged = StructAttrs::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }

        if let syn::Meta::List(meta_list) = &attr.meta {
            let parsed = syn::parse2::<StructAttrList>(meta_list.tokens.clone())?;
            if let Some(keys) = parsed.conflict_keys {
                merged.conflict_keys = keys;
            }
            if let Some(skips) = parsed.skip_columns {
                merged.skip_columns = skips;
            }
        }
    }

    Ok(merged)
}

pub(super) fn get_field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut merged = FieldAttrs::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }

        if let syn::Meta::List(meta_list) = &attr.meta {
            let parsed = syn::parse2::<FieldAttrs>(meta_list.tokens.clone())?;
            merged.key |= parsed.key;
            merged.skip |= parsed.skip;
            merged.flatten |= parsed.flatten;
            if parsed.column.is_some() {
                merged.column = parsed.column;
            }
        }
    }

    if merged.flatten && (merged.key || merged.column.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "#[orm(flatten)] cannot be combined with `key` or `column`",
        ));
    }

    Ok(merged)
}
