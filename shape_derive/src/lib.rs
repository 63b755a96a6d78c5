//! Derive macro for the `canopy::TreeCodec` trait
//!
//! `#[derive(TreeCodec)]` inspects a type definition at compile time,
//! classifies its shape, and generates an `assemble` implementation built
//! from the runtime's `ProductBuilder`/`SumBuilder`/`singleton` combinators:
//!
//! - a struct with named fields becomes a product whose field plan follows
//!   declaration order;
//! - an enum becomes a closed sum with one arm per variant (named-field or
//!   unit), tagged by variant name;
//! - a unit struct becomes a singleton.
//!
//! Field and variant behavior is adjusted through the `#[tree(...)]`
//! attribute namespace: `rename = "key"` overrides the serialized key or
//! tag, `default` (optionally `default = "path::to::fn"`) marks a field as
//! defaultable, and `variadic` marks the trailing `Vec` field as the
//! variable-arity tail. Defaultable fields must implement `PartialEq`, as
//! the generated writer compares against the default to decide omission.
//!
//! Shapes the object format cannot name round-trip — tuple structs, tuple
//! variants, unions, generic types — are rejected here with an error naming
//! the remedy, as are `#[non_exhaustive]` and zero-variant enums (the latter
//! two surface as `DeriveError`s at assembly time so registration sites can
//! observe them).
//!
//! This crate is only relevant within the context of the `canopy` library
//! and offers no standalone functionality.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Data, DataEnum, DataStruct, DeriveInput, Fields, FieldsNamed, Ident, Type,
};

#[proc_macro_derive(TreeCodec, attributes(tree))]
pub fn tree_codec_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    expand(&ast)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &ast.generics,
            "`TreeCodec` cannot be derived for generic types; implement the trait by hand",
        ));
    }
    let name = &ast.ident;
    let (knot, body) = match &ast.data {
        Data::Struct(data) => expand_struct(name, data)?,
        Data::Enum(data) => expand_enum(ast, name, data)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "`TreeCodec` cannot be derived for unions: their alternatives are not \
                 exhaustively enumerable",
            ))
        }
    };
    Ok(quote! {
        impl ::canopy::TreeCodec for #name {
            fn assemble(
                #knot: &mut ::canopy::Knot,
            ) -> ::canopy::DeriveResult<::canopy::Converter<Self>> {
                #body
            }
        }
    })
}

/// One entry of a product's field plan, as seen at expansion time.
struct FieldPlan {
    ident: Ident,
    /// Type to resolve through the knot: the declared type, or the element
    /// type for a variadic field.
    resolve_ty: Type,
    key: String,
    default: Option<DefaultSource>,
    variadic: bool,
}

enum DefaultSource {
    /// `#[tree(default)]`: the type's `Default` impl.
    Std,
    /// `#[tree(default = "path")]`: a nullary function.
    Func(syn::Path),
}

struct FieldAttrs {
    rename: Option<String>,
    default: Option<DefaultSource>,
    variadic: bool,
}

fn field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs {
        rename: None,
        default: None,
        variadic: false,
    };
    for attr in &field.attrs {
        if !attr.path().is_ident("tree") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: syn::LitStr = meta
                    .value()?
                    .parse()
                    .map_err(|_| meta.error("`rename` takes a literal string argument"))?;
                out.rename = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("default") {
                if meta.input.peek(syn::Token![=]) {
                    let lit: syn::LitStr = meta.value()?.parse().map_err(|_| {
                        meta.error("`default` takes a literal string naming a nullary function")
                    })?;
                    out.default = Some(DefaultSource::Func(lit.parse()?));
                } else {
                    out.default = Some(DefaultSource::Std);
                }
                Ok(())
            } else if meta.path.is_ident("variadic") {
                out.variadic = true;
                Ok(())
            } else {
                Err(meta.error("unrecognized `tree` attribute"))
            }
        })?;
    }
    Ok(out)
}

fn variant_tag(variant: &syn::Variant) -> syn::Result<String> {
    let mut tag = variant.ident.to_string();
    for attr in &variant.attrs {
        if !attr.path().is_ident("tree") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: syn::LitStr = meta
                    .value()?
                    .parse()
                    .map_err(|_| meta.error("`rename` takes a literal string argument"))?;
                tag = lit.value();
                Ok(())
            } else {
                Err(meta.error("only `rename` applies to a variant"))
            }
        })?;
    }
    Ok(tag)
}

/// Extracts `E` from a `Vec<E>` field type, for variadic fields.
fn vec_element(ty: &Type) -> Option<Type> {
    let path = match ty {
        Type::Path(tp) if tp.qself.is_none() => &tp.path,
        _ => return None,
    };
    let seg = path.segments.last()?;
    if seg.ident != "Vec" {
        return None;
    }
    match &seg.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(syn::GenericArgument::Type(inner)) => Some(inner.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn field_plans(fields: &FieldsNamed) -> syn::Result<Vec<FieldPlan>> {
    let total = fields.named.len();
    let mut plans = Vec::with_capacity(total);
    for (i, field) in fields.named.iter().enumerate() {
        let attrs = field_attrs(field)?;
        let ident = field
            .ident
            .clone()
            .unwrap_or_else(|| unreachable!("named field without identifier"));
        let resolve_ty = if attrs.variadic {
            if i + 1 != total {
                return Err(syn::Error::new_spanned(
                    field,
                    "a variadic field must be the last field",
                ));
            }
            vec_element(&field.ty).ok_or_else(|| {
                syn::Error::new_spanned(
                    &field.ty,
                    "a variadic field must have type `Vec<..>`",
                )
            })?
        } else {
            field.ty.clone()
        };
        plans.push(FieldPlan {
            key: attrs.rename.unwrap_or_else(|| ident.to_string()),
            ident,
            resolve_ty,
            default: attrs.default,
            variadic: attrs.variadic,
        });
    }
    Ok(plans)
}

/// The `FieldMeta` expression describing one plan entry.
fn meta_tokens(plan: &FieldPlan) -> TokenStream2 {
    let original = plan.ident.to_string();
    let mut tokens = quote! { ::canopy::FieldMeta::new(#original) };
    if plan.key != original {
        let key = &plan.key;
        tokens = quote! { #tokens.rename(#key) };
    }
    if plan.default.is_some() {
        tokens = quote! { #tokens.with_default() };
    }
    if plan.variadic {
        tokens = quote! { #tokens.variadic() };
    }
    tokens
}

/// The default-value expression for a plan entry, if it has one.
fn default_tokens(plan: &FieldPlan) -> Option<TokenStream2> {
    let ty = &plan.resolve_ty;
    match &plan.default {
        None => None,
        Some(DefaultSource::Std) => {
            Some(quote! { <#ty as ::core::default::Default>::default() })
        }
        Some(DefaultSource::Func(path)) => Some(quote! { #path() }),
    }
}

/// The read-side extraction expression for one field, against the converter
/// named by `conv`.
fn read_tokens(plan: &FieldPlan, conv: &Ident) -> TokenStream2 {
    let key = &plan.key;
    match (plan.variadic, default_tokens(plan)) {
        (true, Some(_)) => quote! { __fields.variadic_or_empty(#key, &#conv)? },
        (true, None) => quote! { __fields.variadic(#key, &#conv)? },
        (false, Some(default)) => {
            quote! { __fields.defaulted(#key, &#conv, || #default)? }
        }
        (false, None) => quote! { __fields.required(#key, &#conv)? },
    }
}

/// The write-side emission statement for one field. `access` must evaluate
/// to a place of the field's declared type; `by_ref` selects between
/// `&access` (struct deconstruction) and `access` already being a reference
/// (match-arm binding).
fn write_tokens(plan: &FieldPlan, conv: &Ident, access: &TokenStream2, by_ref: bool) -> TokenStream2 {
    let key = &plan.key;
    let borrowed = if by_ref {
        quote! { #access }
    } else {
        quote! { &#access }
    };
    let deref = if by_ref {
        quote! { *#access }
    } else {
        quote! { #access }
    };
    if plan.variadic {
        let emit = quote! { __rec.put(#key, ::canopy::write_seq(#borrowed, &#conv)); };
        if plan.default.is_some() {
            quote! { if !#access.is_empty() { #emit } }
        } else {
            emit
        }
    } else if let Some(default) = default_tokens(plan) {
        let ty = &plan.resolve_ty;
        quote! {
            {
                let __default: #ty = #default;
                if #deref != __default {
                    __rec.put(#key, #conv.write(#borrowed));
                }
            }
        }
    } else {
        quote! { __rec.put(#key, #conv.write(#borrowed)); }
    }
}

fn expand_struct(name: &Ident, data: &DataStruct) -> syn::Result<(Ident, TokenStream2)> {
    let ty_str = name.to_string();
    match &data.fields {
        Fields::Unit => Ok((
            format_ident!("_knot"),
            quote! {
                ::core::result::Result::Ok(::canopy::singleton(|| Self))
            },
        )),
        Fields::Unnamed(_) => Err(syn::Error::new_spanned(
            name,
            "`TreeCodec` cannot be derived for tuple structs: serialized keys require named \
             fields",
        )),
        Fields::Named(fields) => {
            let plans = field_plans(fields)?;
            if plans.is_empty() {
                // Zero-field product: the empty object in both directions.
                return Ok((
                    format_ident!("_knot"),
                    quote! {
                        ::canopy::ProductBuilder::new(#ty_str)
                            .construct(|_| ::core::result::Result::Ok(Self {}))
                            .deconstruct(|_, _| {})
                            .finish()
                    },
                ));
            }
            let knot = format_ident!("__knot");
            let convs: Vec<Ident> = (0..plans.len())
                .map(|i| format_ident!("__conv_{}", i))
                .collect();
            let readers: Vec<Ident> = (0..plans.len())
                .map(|i| format_ident!("__read_{}", i))
                .collect();
            let resolve_tys: Vec<&Type> = plans.iter().map(|p| &p.resolve_ty).collect();
            let metas: Vec<TokenStream2> = plans.iter().map(meta_tokens).collect();
            let field_idents: Vec<&Ident> = plans.iter().map(|p| &p.ident).collect();
            let read_exprs: Vec<TokenStream2> = plans
                .iter()
                .zip(&readers)
                .map(|(plan, conv)| read_tokens(plan, conv))
                .collect();
            let write_stmts: Vec<TokenStream2> = plans
                .iter()
                .zip(&convs)
                .map(|(plan, conv)| {
                    let ident = &plan.ident;
                    let access = quote! { __value.#ident };
                    write_tokens(plan, conv, &access, false)
                })
                .collect();
            Ok((
                knot.clone(),
                quote! {
                    #( let #convs = #knot.resolve::<#resolve_tys>()?; )*
                    #( let #readers = #convs.clone(); )*
                    ::canopy::ProductBuilder::new(#ty_str)
                        #( .field(#metas) )*
                        .construct(move |__fields| {
                            ::core::result::Result::Ok(Self {
                                #( #field_idents: #read_exprs, )*
                            })
                        })
                        .deconstruct(move |__value, __rec| {
                            #( #write_stmts )*
                        })
                        .finish()
                },
            ))
        }
    }
}

fn expand_enum(
    ast: &DeriveInput,
    name: &Ident,
    data: &DataEnum,
) -> syn::Result<(Ident, TokenStream2)> {
    let ty_str = name.to_string();
    if ast
        .attrs
        .iter()
        .any(|attr| attr.path().is_ident("non_exhaustive"))
    {
        return Ok((
            format_ident!("_knot"),
            quote! {
                ::core::result::Result::Err(::canopy::DeriveError::NotSealed { ty: #ty_str })
            },
        ));
    }
    if data.variants.is_empty() {
        return Ok((
            format_ident!("_knot"),
            quote! {
                ::core::result::Result::Err(::canopy::DeriveError::NoVariants { ty: #ty_str })
            },
        ));
    }

    let knot = format_ident!("__knot");
    let mut resolves = Vec::new();
    let mut arms = Vec::new();
    let mut arm_idents = Vec::new();
    let mut select_arms = Vec::new();
    let mut any_fields = false;

    for (vi, variant) in data.variants.iter().enumerate() {
        let vident = &variant.ident;
        let tag = variant_tag(variant)?;
        let arm_ident = format_ident!("__arm_{}", vi);
        match &variant.fields {
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    vident,
                    "`TreeCodec` cannot be derived for tuple variants: serialized keys require \
                     named fields",
                ))
            }
            Fields::Unit => {
                arms.push(quote! {
                    let #arm_ident = ::canopy::VariantArm::new(
                        #tag,
                        ::std::vec::Vec::new(),
                        move |_| ::core::result::Result::Ok(Self::#vident),
                    );
                });
                select_arms.push(quote! {
                    Self::#vident => #vi,
                });
            }
            Fields::Named(fields) => {
                let plans = field_plans(fields)?;
                any_fields = any_fields || !plans.is_empty();
                let convs: Vec<Ident> = (0..plans.len())
                    .map(|fi| format_ident!("__conv_{}_{}", vi, fi))
                    .collect();
                let readers: Vec<Ident> = (0..plans.len())
                    .map(|fi| format_ident!("__read_{}_{}", vi, fi))
                    .collect();
                let resolve_tys: Vec<&Type> = plans.iter().map(|p| &p.resolve_ty).collect();
                resolves.push(quote! {
                    #( let #convs = #knot.resolve::<#resolve_tys>()?; )*
                });
                let metas: Vec<TokenStream2> = plans.iter().map(meta_tokens).collect();
                let field_idents: Vec<&Ident> = plans.iter().map(|p| &p.ident).collect();
                let read_exprs: Vec<TokenStream2> = plans
                    .iter()
                    .zip(&readers)
                    .map(|(plan, conv)| read_tokens(plan, conv))
                    .collect();
                let fields_param = if plans.is_empty() {
                    quote! { _ }
                } else {
                    quote! { __fields }
                };
                arms.push(quote! {
                    let #arm_ident = {
                        #( let #readers = #convs.clone(); )*
                        ::canopy::VariantArm::new(
                            #tag,
                            ::std::vec![ #( #metas ),* ],
                            move |#fields_param| {
                                ::core::result::Result::Ok(Self::#vident {
                                    #( #field_idents: #read_exprs, )*
                                })
                            },
                        )
                    };
                });
                let write_stmts: Vec<TokenStream2> = plans
                    .iter()
                    .zip(&convs)
                    .map(|(plan, conv)| {
                        let ident = &plan.ident;
                        let access = quote! { #ident };
                        write_tokens(plan, conv, &access, true)
                    })
                    .collect();
                select_arms.push(quote! {
                    Self::#vident { #( #field_idents ),* } => {
                        #( #write_stmts )*
                        #vi
                    }
                });
            }
        }
        arm_idents.push(arm_ident);
    }

    let knot = if any_fields {
        knot
    } else {
        format_ident!("_knot")
    };
    // Resolve statements reference the parameter by its final name, and the
    // record parameter is anonymous when no arm emits fields.
    let resolves: Vec<TokenStream2> = if any_fields { resolves } else { Vec::new() };
    let rec_param = if any_fields {
        quote! { __rec }
    } else {
        quote! { _ }
    };
    Ok((
        knot,
        quote! {
            #( #resolves )*
            #( #arms )*
            ::canopy::SumBuilder::new(#ty_str)
                #( .variant(#arm_idents) )*
                .select(move |__value, #rec_param| match __value {
                    #( #select_arms )*
                })
                .finish()
        },
    ))
}
