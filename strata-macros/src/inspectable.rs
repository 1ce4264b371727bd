// Accessor table generation for #[derive(Inspectable)]

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Token};

/// Serde attributes relevant to the serialized shape of a field
#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    flatten: bool,
}

fn skip_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: TokenStream = content.parse()?;
    }
    Ok(())
}

fn parse_field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();

    for attr in &field.attrs {
        if attr.path().is_ident("serde") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                    let name: LitStr = meta.value()?.parse()?;
                    attrs.rename = Some(name.value());
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                    attrs.skip = true;
                } else if meta.path.is_ident("flatten") {
                    attrs.flatten = true;
                } else {
                    skip_value(&meta)?;
                }
                Ok(())
            })?;
        } else if attr.path().is_ident("strata") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    attrs.skip = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported strata attribute, expected `skip`"))
                }
            })?;
        }
    }

    Ok(attrs)
}

fn parse_rename_all(input: &DeriveInput) -> syn::Result<Option<String>> {
    let mut rule = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rule = Some(value.value());
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(rule)
}

/// Apply a serde `rename_all` rule to a snake_case field name
fn apply_rename_rule(rule: &str, field: &str) -> Option<String> {
    let words: Vec<&str> = field.split('_').filter(|w| !w.is_empty()).collect();
    let capitalize = |w: &str| {
        let mut chars = w.chars();
        chars.next().map(|c| c.to_uppercase().chain(chars).collect::<String>()).unwrap_or_default()
    };

    let renamed = match rule {
        "lowercase" => field.to_lowercase(),
        "UPPERCASE" => field.to_uppercase(),
        "snake_case" => field.to_string(),
        "SCREAMING_SNAKE_CASE" => field.to_uppercase(),
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.replace('_', "-").to_uppercase(),
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        "camelCase" => words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.to_string() } else { capitalize(w) })
            .collect(),
        _ => return None,
    };
    Some(renamed)
}

pub fn derive_inspectable(input: TokenStream) -> TokenStream {
    match expand(input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: TokenStream) -> syn::Result<TokenStream> {
    let input = syn::parse2::<DeriveInput>(input)?;
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    struct_name,
                    "Inspectable can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "Inspectable can only be derived for structs",
            ))
        }
    };

    let rename_all = parse_rename_all(&input)?;
    if let Some(rule) = &rename_all {
        if apply_rename_rule(rule, "field").is_none() {
            return Err(syn::Error::new_spanned(struct_name, format!("unknown rename_all rule '{}'", rule)));
        }
    }

    let mut names = Vec::new();
    let mut arms = Vec::new();
    let mut flattened = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(field)?;
        if attrs.skip {
            continue;
        }
        if attrs.flatten {
            flattened.push(ident.clone());
            continue;
        }

        let raw = ident.to_string();
        let raw = raw.strip_prefix("r#").unwrap_or(&raw).to_string();
        let name = match (&attrs.rename, &rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => apply_rename_rule(rule, &raw).unwrap_or(raw),
            (None, None) => raw,
        };

        arms.push(quote! {
            #name => strata_core::serde_json::to_value(&self.#ident).ok(),
        });
        names.push(name);
    }

    Ok(quote! {
        impl #impl_generics strata_core::inspect::Inspectable for #struct_name #ty_generics #where_clause {
            fn field_names(&self) -> Vec<&'static str> {
                #[allow(unused_mut)]
                let mut names: Vec<&'static str> = vec![#(#names),*];
                #(
                    names.extend(strata_core::inspect::Inspectable::field_names(&self.#flattened));
                )*
                names
            }

            fn get_field_value(&self, field_name: &str) -> Option<strata_core::serde_json::Value> {
                match field_name {
                    #(#arms)*
                    _ => {
                        #(
                            if let Some(value) = strata_core::inspect::Inspectable::get_field_value(&self.#flattened, field_name) {
                                return Some(value);
                            }
                        )*
                        None
                    }
                }
            }
        }
    })
}
