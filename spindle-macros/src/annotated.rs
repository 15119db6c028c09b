use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, FnArg, ImplItem, ImplItemFn, ItemImpl, Type, parse_macro_input, parse_quote};

use crate::declaration::{Declaration, Declarations};

const HELPER: &str = "annotate";

/// How a method can be bound as an emitter observer.
enum ObserverShape {
    Blocking,
    Suspending,
}

/// `fn(&self, &mut Event) -> R` or its async counterpart, nothing else.
fn observer_shape(method: &ImplItemFn) -> Option<ObserverShape> {
    let sig = &method.sig;
    if sig.generics.type_params().next().is_some() || sig.inputs.len() != 2 {
        return None;
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => return None,
    }
    match inputs.next() {
        Some(FnArg::Typed(arg)) if is_mut_event(&arg.ty) => {}
        _ => return None,
    }

    Some(if sig.asyncness.is_some() {
        ObserverShape::Suspending
    } else {
        ObserverShape::Blocking
    })
}

fn is_mut_event(ty: &Type) -> bool {
    if let Type::Reference(reference) = ty {
        if reference.mutability.is_none() {
            return false;
        }
        if let Type::Path(path) = reference.elem.as_ref() {
            if let Some(segment) = path.path.segments.last() {
                return segment.ident == "Event";
            }
        }
    }
    false
}

/// Collect `#[annotate(...)]` declarations and strip them from the method.
fn take_declarations(attrs: &mut Vec<Attribute>) -> syn::Result<Vec<Declaration>> {
    let mut declarations = Vec::new();
    let mut kept = Vec::with_capacity(attrs.len());

    for attr in attrs.drain(..) {
        if attr.path().is_ident(HELPER) {
            let Declarations(parsed) = attr.parse_args()?;
            declarations.extend(parsed);
        } else {
            kept.push(attr);
        }
    }

    *attrs = kept;
    Ok(declarations)
}

fn bind_arm(method: &ImplItemFn, shape: ObserverShape) -> TokenStream2 {
    let ident = &method.sig.ident;
    let name = ident.to_string();

    match shape {
        ObserverShape::Blocking => quote! {
            #name => {
                let weak = ::std::sync::Arc::downgrade(this);
                ::std::option::Option::Some(::spindle_core::__private::Callback::new(move |event| {
                    match weak.upgrade() {
                        ::std::option::Option::Some(this) => {
                            ::spindle_core::__private::IntoObserverResult::into_observer_result(this.#ident(event))
                        }
                        ::std::option::Option::None => ::std::result::Result::Ok(::std::option::Option::None),
                    }
                }))
            }
        },
        ObserverShape::Suspending => quote! {
            #name => {
                let weak = ::std::sync::Arc::downgrade(this);
                ::std::option::Option::Some(::spindle_core::__private::Callback::suspending(move |event| {
                    let weak = weak.clone();
                    ::std::boxed::Box::pin(async move {
                        match weak.upgrade() {
                            ::std::option::Option::Some(this) => {
                                ::spindle_core::__private::IntoObserverResult::into_observer_result(this.#ident(event).await)
                            }
                            ::std::option::Option::None => ::std::result::Result::Ok(::std::option::Option::None),
                        }
                    })
                }))
            }
        },
    }
}

pub fn annotated_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let Declarations(class_declarations) = parse_macro_input!(attr as Declarations);
    let mut input = parse_macro_input!(item as ItemImpl);

    if let Some((_, path, _)) = &input.trait_ {
        return syn::Error::new_spanned(path, "#[annotated] must be placed on an inherent impl block")
            .to_compile_error()
            .into();
    }

    let mut methods: Vec<TokenStream2> = Vec::new();
    let mut bindings: Vec<TokenStream2> = Vec::new();

    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            let declarations = match take_declarations(&mut method.attrs) {
                Ok(declarations) => declarations,
                Err(err) => return err.to_compile_error().into(),
            };

            let name = method.sig.ident.to_string();
            let annotations = declarations.iter().map(Declaration::to_tokens);
            methods.push(quote! {
                ::spindle_core::annotation::MethodMetadata::new(#name)
                    #( .with_annotation(#annotations) )*
            });

            if let Some(shape) = observer_shape(method) {
                bindings.push(bind_arm(method, shape));
            }
        }
    }

    let self_ty = &input.self_ty;
    let class_annotations = class_declarations.iter().map(Declaration::to_tokens);

    let mut generics = input.generics.clone();
    generics
        .make_where_clause()
        .predicates
        .push(parse_quote!(#self_ty: ::core::marker::Send + ::core::marker::Sync + 'static));
    let (impl_generics, _, where_clause) = generics.split_for_impl();

    let expanded = quote! {
        #input

        impl #impl_generics ::spindle_core::annotation::Annotated for #self_ty #where_clause {
            fn class_metadata() -> ::spindle_core::annotation::ClassMetadata {
                ::spindle_core::annotation::ClassMetadata::new(::std::any::type_name::<Self>())
                    #( .with_annotation(#class_annotations) )*
                    #( .with_method(#methods) )*
            }

            #[allow(unused_variables)]
            fn bind_method(
                this: &::std::sync::Arc<Self>,
                method: &str,
            ) -> ::std::option::Option<::spindle_core::__private::Callback> {
                match method {
                    #(#bindings)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    };

    TokenStream::from(expanded)
}
