extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::spanned::Spanned;

/// Derives `transmap::Mapped` for a struct with named fields.
///
/// Mapped fields must have type `Option<transmap::Value>` and carry one or more
/// `#[map(..)]` attributes:
///
///   - `#[map(simple = "externalKey")]`
///   - `#[map(transform = "externalKey", to = <fn>, from = <fn>)]`, where each
///     `<fn>` is either a path to a `fn(Value) -> Value` (bound at compile time),
///     or a string literal naming a function in the registry's function table
///
/// The internal key of a field is its name, with any `r#` prefix removed.
///
/// Fields without `#[map]` are left out of the mapping and are initialized with
/// `Default::default()` on deserialization.
#[proc_macro_derive(Mapped, attributes(map))]
pub fn mapped_derive(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as syn::DeriveInput);

    impl_mapped(&ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

enum FnRef {
    Path(syn::Expr),
    Name(syn::LitStr),
}

enum Declaration {
    Simple {
        external: syn::LitStr,
    },
    Transform {
        external: syn::LitStr,
        to: FnRef,
        from: FnRef,
    },
}

struct MappedField<'a> {
    ident: &'a syn::Ident,
    declarations: Vec<Declaration>,
}

fn parse_fn_ref(expr: syn::Expr) -> FnRef {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(name),
            ..
        }) => FnRef::Name(name),
        other => FnRef::Path(other),
    }
}

fn parse_declaration(attr: &syn::Attribute) -> syn::Result<Declaration> {
    let mut simple = None;
    let mut transform = None;
    let mut to = None;
    let mut from = None;

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("simple") {
            simple = Some(meta.value()?.parse::<syn::LitStr>()?);
        } else if meta.path.is_ident("transform") {
            transform = Some(meta.value()?.parse::<syn::LitStr>()?);
        } else if meta.path.is_ident("to") {
            to = Some(parse_fn_ref(meta.value()?.parse::<syn::Expr>()?));
        } else if meta.path.is_ident("from") {
            from = Some(parse_fn_ref(meta.value()?.parse::<syn::Expr>()?));
        } else {
            return Err(meta.error("expected `simple`, `transform`, `to`, or `from`"));
        }
        Ok(())
    })?;

    match (simple, transform, to, from) {
        (Some(external), None, None, None) => Ok(Declaration::Simple { external }),
        (None, Some(external), Some(to), Some(from)) => Ok(Declaration::Transform {
            external,
            to,
            from,
        }),
        (None, Some(_), _, _) => Err(syn::Error::new(
            attr.span(),
            "transform mapping requires both `to` and `from`",
        )),
        (Some(_), Some(_), _, _) => Err(syn::Error::new(
            attr.span(),
            "`simple` and `transform` must be declared in separate `#[map]` attributes",
        )),
        _ => Err(syn::Error::new(
            attr.span(),
            "expected `#[map(simple = ..)]` or `#[map(transform = .., to = .., from = ..)]`",
        )),
    }
}

fn fn_ref_tokens(f: &FnRef) -> TokenStream2 {
    match f {
        FnRef::Path(path) => quote! {
            ::transmap::Transform::Resolved(#path as ::transmap::TransformFn)
        },
        FnRef::Name(name) => quote! {
            ::transmap::Transform::from(#name)
        },
    }
}

fn impl_mapped(ast: &syn::DeriveInput) -> syn::Result<TokenStream2> {
    let named = match &ast.data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(syn::FieldsNamed { named, .. }),
            ..
        }) => named,
        _ => {
            return Err(syn::Error::new(
                ast.ident.span(),
                "Derive macro `Mapped` is only implemented for structs with named fields",
            ))
        }
    };

    let mut mapped = Vec::new();
    let mut unmapped = Vec::new();
    for field in named {
        let ident = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new(field.span(), "expected a named field")
        })?;
        let declarations = field
            .attrs
            .iter()
            .filter(|attr| attr.path().is_ident("map"))
            .map(parse_declaration)
            .collect::<syn::Result<Vec<_>>>()?;
        if declarations.is_empty() {
            unmapped.push(ident);
        } else {
            mapped.push(MappedField {
                ident,
                declarations,
            });
        }
    }

    let mut simple_pairs = Vec::new();
    let mut transforms = Vec::new();
    for field in &mapped {
        let key = field.ident.unraw().to_string();
        for decl in &field.declarations {
            match decl {
                Declaration::Simple { external } => {
                    simple_pairs.push(quote! { (#key, #external) });
                }
                Declaration::Transform { external, to, from } => {
                    let to = fn_ref_tokens(to);
                    let from = fn_ref_tokens(from);
                    transforms.push(quote! {
                        registry.transform_map(#key, #external, #to, #from);
                    });
                }
            }
        }
    }
    let simple_decl = if simple_pairs.is_empty() {
        quote! {}
    } else {
        quote! { registry.simple_map([#( #simple_pairs ),*]); }
    };

    let ident: Vec<&syn::Ident> = mapped.iter().map(|f| f.ident).collect();
    let key: Vec<String> = ident.iter().map(|i| i.unraw().to_string()).collect();

    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::transmap::Mapped for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn declare(registry: &mut ::transmap::MappingRegistry) {
                #simple_decl
                #( #transforms )*
            }

            fn has_attribute(key: &str) -> bool {
                match key {
                    #( #key => true, )*
                    _ => false,
                }
            }

            #[allow(unused_mut, unused_variables)]
            fn from_attributes(mut attributes: ::transmap::Attributes) -> Self {
                Self {
                    #( #ident: attributes.remove(#key), )*
                    #( #unmapped: ::core::default::Default::default(), )*
                }
            }

            fn attribute(&self, key: &str) -> ::core::option::Option<&::transmap::Value> {
                match key {
                    #( #key => self.#ident.as_ref(), )*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_attribute(&mut self, key: &str, value: ::transmap::Value) -> bool {
                match key {
                    #( #key => {
                        self.#ident = ::core::option::Option::Some(value);
                        true
                    } )*
                    _ => {
                        let _ = value;
                        false
                    }
                }
            }
        }
    })
}
