//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

mod attrs;

use attrs::{get_field_attrs, get_struct_attrs};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let struct_attrs = get_struct_attrs(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut field_metas: Vec<TokenStream> = Vec::new();
    let mut value_pushes: Vec<TokenStream> = Vec::new();

    for field in fields.iter() {
        let Some(field_ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let field_attrs = get_field_attrs(field)?;

        if field_attrs.skip {
            continue;
        }

        // Private fields never become columns, so a marker on one would be lost.
        if matches!(field.vis, syn::Visibility::Inherited) {
            if field_attrs.key || field_attrs.flatten || field_attrs.column.is_some() {
                return Err(syn::Error::new_spanned(
                    field_ident,
                    format!(
                        "field `{}` is private and will not be persisted; make it `pub` or remove its #[orm(...)] marker",
                        field_ident.unraw()
                    ),
                ));
            }
            continue;
        }

        let field_name = field_ident.unraw().to_string();
        let ty = &field.ty;

        if field_attrs.flatten {
            field_metas.push(quote! {
                pgupsert::FieldMeta::flatten(#field_name, <#ty as pgupsert::Record>::shape())
            });
            value_pushes.push(quote! {
                values.extend(pgupsert::Record::values(&self.#field_ident));
            });
            continue;
        }

        let column = match &field_attrs.column {
            Some(column) => quote! { ::core::option::Option::Some(#column) },
            None => quote! { ::core::option::Option::None },
        };
        let key = field_attrs.key;
        field_metas.push(quote! {
            pgupsert::FieldMeta::column(#field_name, #column, #key)
        });
        value_pushes.push(quote! {
            values.push(&self.#field_ident as &(dyn pgupsert::ToSql + Sync));
        });
    }

    let policy_method = policy_method(&struct_attrs.conflict_keys, &struct_attrs.skip_columns);

    Ok(quote! {
        impl #impl_generics pgupsert::Record for #name #ty_generics #where_clause {
            fn shape() -> pgupsert::RecordShape {
                pgupsert::RecordShape::record(
                    ::std::any::type_name::<Self>(),
                    ::std::vec![#(#field_metas),*],
                )
            }

            #policy_method

            fn values(&self) -> ::std::vec::Vec<&(dyn pgupsert::ToSql + Sync)> {
                #[allow(unused_mut)]
                let mut values: ::std::vec::Vec<&(dyn pgupsert::ToSql + Sync)> =
                    ::std::vec::Vec::new();
                #(#value_pushes)*
                values
            }
        }
    })
}

fn policy_method(conflict_keys: &[String], skip_columns: &[String]) -> TokenStream {
    if conflict_keys.is_empty() && skip_columns.is_empty() {
        return quote! {};
    }

    let with_keys = if conflict_keys.is_empty() {
        quote! {}
    } else {
        quote! { .conflict_keys([#(#conflict_keys),*]) }
    };
    let with_skips = if skip_columns.is_empty() {
        quote! {}
    } else {
        quote! { .skip_columns([#(#skip_columns),*]) }
    };

    quote! {
        fn upsert_policy() -> pgupsert::UpsertPolicy {
            pgupsert::UpsertPolicy::new() #with_keys #with_skips
        }
    }
}
