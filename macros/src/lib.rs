//! Derive macros for Optimistic Rust
//!
//! # Available Macros
//!
//! - `#[derive(Command)]` - Implements `optimistic_core::Command` for a command enum
//!
//! # Example
//!
//! ```ignore
//! use optimistic_macros::Command;
//!
//! #[derive(Command, Clone, Debug)]
//! #[command(response = TodoResponse)]
//! enum TodoCommand {
//!     LoadTodos,
//!     InsertTodo { text: String },
//!     #[command(kind = "TOGGLE_COMPLETED")]
//!     Toggle(i64),
//! }
//!
//! assert_eq!(TodoCommand::LoadTodos.kind(), "LOAD_TODOS");
//! assert_eq!(TodoCommand::KINDS, &["LOAD_TODOS", "INSERT_TODO", "TOGGLE_COMPLETED"]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Type, parse_macro_input};

/// Derive macro for command enums
///
/// Implements `optimistic_core::Command`:
/// - `type Response` comes from the enum-level `#[command(response = Type)]`,
///   or `()` when omitted
/// - `kind()` returns the variant's kind, which is the variant name in
///   `SCREAMING_SNAKE_CASE` unless overridden with `#[command(kind = "...")]`
///
/// Also generates an associated `KINDS` constant listing every kind in
/// declaration order, which is handy when building a registry.
///
/// # Attributes
///
/// - `#[command(response = Type)]` - On the enum: the success response type
/// - `#[command(kind = "NAME")]` - On a variant: explicit kind string
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - An attribute key is unknown
/// - Two variants end up with the same kind
///
/// # Example
///
/// ```ignore
/// #[derive(Command, Clone, Debug)]
/// #[command(response = u64)]
/// enum OrderCommand {
///     PlaceOrder { items: Vec<String> },
///     #[command(kind = "CANCEL")]
///     CancelOrder(u64),
/// }
///
/// assert_eq!(OrderCommand::CancelOrder(7).kind(), "CANCEL");
/// ```
#[proc_macro_derive(Command, attributes(command))]
pub fn derive_command(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_command(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_command(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(Command)] can only be used on enums",
        ));
    };

    let response = enum_response(&input.attrs)?;

    let mut kinds: Vec<LitStr> = Vec::with_capacity(data_enum.variants.len());
    let mut kind_arms = Vec::with_capacity(data_enum.variants.len());

    for variant in &data_enum.variants {
        let variant_name = &variant.ident;
        let kind = match variant_kind(&variant.attrs)? {
            Some(kind) => kind,
            None => LitStr::new(
                &screaming_snake_case(&variant_name.to_string()),
                variant_name.span(),
            ),
        };

        if kinds.iter().any(|seen| seen.value() == kind.value()) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("Duplicate command kind \"{}\"", kind.value()),
            ));
        }

        let pattern = match &variant.fields {
            Fields::Named(_) => quote! { Self::#variant_name { .. } },
            Fields::Unnamed(_) => quote! { Self::#variant_name(..) },
            Fields::Unit => quote! { Self::#variant_name },
        };
        kind_arms.push(quote! { #pattern => #kind, });
        kinds.push(kind);
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // An uninhabited enum has no arms; match on the dereferenced value instead
    let kind_body = if kind_arms.is_empty() {
        quote! { match *self {} }
    } else {
        quote! {
            match self {
                #(#kind_arms)*
            }
        }
    };

    Ok(quote! {
        impl #impl_generics ::optimistic_core::Command for #name #ty_generics #where_clause {
            type Response = #response;

            fn kind(&self) -> &'static str {
                #kind_body
            }
        }

        impl #impl_generics #name #ty_generics #where_clause {
            /// Every command kind, in declaration order
            pub const KINDS: &'static [&'static str] = &[#(#kinds),*];
        }
    })
}

/// `#[command(response = Type)]` on the enum, defaulting to `()`
fn enum_response(attrs: &[Attribute]) -> syn::Result<Type> {
    let mut response: Option<Type> = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("command")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("response") {
                response = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `response = Type`"))
            }
        })?;
    }

    Ok(response.unwrap_or_else(|| syn::parse_quote!(())))
}

/// `#[command(kind = "...")]` on a variant
fn variant_kind(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    let mut kind: Option<LitStr> = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("command")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("kind") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(syn::Error::new(value.span(), "command kind cannot be empty"));
                }
                kind = Some(value);
                Ok(())
            } else {
                Err(meta.error("expected `kind = \"NAME\"`"))
            }
        })?;
    }

    Ok(kind)
}

/// `InsertTodo` -> `INSERT_TODO`, `HTTPRequest` -> `HTTP_REQUEST`
fn screaming_snake_case(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_uppercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::screaming_snake_case;

    #[test]
    fn converts_variant_names() {
        assert_eq!(screaming_snake_case("LoadTodos"), "LOAD_TODOS");
        assert_eq!(screaming_snake_case("ToggleErrorMode"), "TOGGLE_ERROR_MODE");
        assert_eq!(screaming_snake_case("Clear"), "CLEAR");
        assert_eq!(screaming_snake_case("HTTPRequest"), "HTTP_REQUEST");
        assert_eq!(screaming_snake_case("Step2Done"), "STEP2_DONE");
    }
}
