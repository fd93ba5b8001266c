use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

/// Derives `argbind::Choice` for a fieldless enum.
///
/// Each variant's command-line value defaults to its lowercased name and can
/// be overridden with `#[choice(value = "...")]`.
///
/// # Usage
///
/// ```ignore
/// #[derive(Choice)]
/// enum Color {
///     Red,
///     #[choice(value = "dark-blue")]
///     Blue,
/// }
/// ```
///
/// This will generate:
///
/// ```ignore
/// impl ::argbind::Choice for Color {
///     fn enum_type() -> ::argbind::EnumType { /* Red => "red", Blue => "dark-blue" */ }
///     fn name(&self) -> &'static str { /* "Red" | "Blue" */ }
///     fn value(&self) -> &'static str { /* "red" | "dark-blue" */ }
///     fn from_value(value: &str) -> Option<Self> { /* reverse lookup */ }
/// }
/// ```
#[proc_macro_derive(Choice, attributes(choice))]
pub fn derive_choice(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let enum_name = &input.ident;
    let type_name = enum_name.to_string();

    let variants = match &input.data {
        Data::Enum(data) => data
            .variants
            .iter()
            .map(|variant| {
                if !matches!(variant.fields, Fields::Unit) {
                    panic!(
                        "Choice variants cannot carry fields; {}::{} is not a unit variant",
                        enum_name, variant.ident
                    );
                }
                let name = variant.ident.to_string();
                let value = extract_value(&variant.attrs).unwrap_or_else(|| name.to_lowercase());
                (&variant.ident, name, value)
            })
            .collect::<Vec<_>>(),
        _ => panic!("Choice can only be derived for enums"),
    };

    let members = variants.iter().map(|(_, name, value)| {
        quote! { ::argbind::EnumMember::new(#name, #value) }
    });
    let name_arms = variants.iter().map(|(ident, name, _)| {
        quote! { #enum_name::#ident => #name, }
    });
    let value_arms = variants.iter().map(|(ident, _, value)| {
        quote! { #enum_name::#ident => #value, }
    });
    let from_arms = variants.iter().map(|(ident, _, value)| {
        quote! { #value => ::std::option::Option::Some(#enum_name::#ident), }
    });

    let expanded = quote! {
        impl ::argbind::Choice for #enum_name {
            fn enum_type() -> ::argbind::EnumType {
                ::argbind::EnumType::new(#type_name, ::std::vec![#(#members),*])
            }

            fn name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }

            fn value(&self) -> &'static str {
                match self {
                    #(#value_arms)*
                }
            }

            fn from_value(value: &str) -> ::std::option::Option<Self> {
                match value {
                    #(#from_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Extract the value from #[choice(value = "...")]
fn extract_value(attrs: &[syn::Attribute]) -> Option<String> {
    for attr in attrs {
        if attr.path().is_ident("choice") {
            if let Ok(meta_list) = attr.meta.require_list() {
                let parsed: Result<syn::MetaNameValue, _> = syn::parse2(meta_list.tokens.clone());

                if let Ok(nv) = parsed {
                    if nv.path.is_ident("value") {
                        if let syn::Expr::Lit(syn::ExprLit {
                            lit: syn::Lit::Str(lit),
                            ..
                        }) = nv.value
                        {
                            return Some(LitStr::value(&lit));
                        }
                    }
                    panic!("Expected #[choice(value = \"...\")]");
                }
            }
        }
    }
    None
}
