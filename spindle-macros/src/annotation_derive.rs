use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Options read from `#[annotation(...)]` on the deriving type.
#[derive(Default)]
struct AnnotationOptions {
    wireable: bool,
}

fn parse_options(input: &DeriveInput) -> syn::Result<AnnotationOptions> {
    let mut options = AnnotationOptions::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("annotation") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("wireable") {
                options.wireable = true;
                Ok(())
            } else {
                Err(meta.error("unsupported annotation option, expected `wireable`"))
            }
        })?;
    }
    Ok(options)
}

pub fn annotation_derive(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let ident = &input.ident;

    let has_name_field = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields
                .named
                .iter()
                .any(|field| field.ident.as_ref().is_some_and(|i| i == "name")),
            _ => false,
        },
        _ => false,
    };
    if !has_name_field {
        return syn::Error::new_spanned(ident, "#[derive(Annotation)] needs a struct with a `name: String` field")
            .to_compile_error()
            .into();
    }

    let options = match parse_options(&input) {
        Ok(options) => options,
        Err(err) => return err.to_compile_error().into(),
    };

    let wireable = options.wireable.then(|| {
        quote! {
            fn as_wireable(&self) -> ::std::option::Option<&dyn ::spindle_core::annotation::Wireable> {
                ::std::option::Option::Some(self)
            }
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::spindle_core::annotation::Annotation for #ident #ty_generics #where_clause {
            fn name(&self) -> &str {
                &self.name
            }

            fn set_name(&mut self, name: ::std::string::String) {
                self.name = name;
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            #wireable
        }
    };

    TokenStream::from(expanded)
}
