use proc_macro2::{TokenStream as TokenStream2, TokenTree};
use quote::quote;
use syn::{
    Ident, LitStr, Token,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    token::Comma,
};

/// One annotation declaration as written in source.
/// Parses: `Name`, `Name(arg, ...)` or `"dotted.name"(arg, ...)`
pub struct Declaration {
    pub name: String,
    pub arguments: Vec<TokenStream2>,
}

impl Parse for Declaration {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let name = if input.peek(LitStr) {
            input.parse::<LitStr>()?.value()
        } else {
            let mut segments = vec![input.parse::<Ident>()?.to_string()];
            while input.peek(Token![::]) {
                input.parse::<Token![::]>()?;
                segments.push(input.parse::<Ident>()?.to_string());
            }
            segments.join("::")
        };

        let mut arguments = Vec::new();
        if input.peek(syn::token::Paren) {
            let content;
            syn::parenthesized!(content in input);
            arguments = split_arguments(content.parse()?);
        }

        Ok(Self { name, arguments })
    }
}

impl Declaration {
    /// Expression building the runtime `AnnotationDeclaration`.
    /// Each argument is handed to `json!`, so JSON-style object and array
    /// literals work next to plain Rust expressions.
    pub fn to_tokens(&self) -> TokenStream2 {
        let name = &self.name;
        let arguments = &self.arguments;
        quote! {
            ::spindle_core::annotation::AnnotationDeclaration::new(
                #name,
                ::std::vec![ #( ::spindle_core::json!(#arguments) ),* ],
            )
        }
    }
}

/// Comma separated declarations, as found in `#[annotated(...)]` and
/// `#[annotate(...)]`.
pub struct Declarations(pub Vec<Declaration>);

impl Parse for Declarations {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let parsed = Punctuated::<Declaration, Comma>::parse_terminated(input)?;
        Ok(Self(parsed.into_iter().collect()))
    }
}

// Groups are single token trees, so a top-level comma always separates
// arguments.
fn split_arguments(tokens: TokenStream2) -> Vec<TokenStream2> {
    let mut arguments = Vec::new();
    let mut current = TokenStream2::new();

    for tree in tokens {
        match &tree {
            TokenTree::Punct(punct) if punct.as_char() == ',' => {
                arguments.push(std::mem::take(&mut current));
            }
            _ => current.extend(std::iter::once(tree)),
        }
    }
    if !current.is_empty() {
        arguments.push(current);
    }

    arguments
}
