//! Derive macros for polyform-serializer.
//!
//! - `Reflect` — reflectable aggregates (structs with named fields);
//!   supports `#[reflect(base)]` on a leading field to flatten a parent's
//!   members in front, and `#[reflect(initialize = "method")]` to bind the
//!   post-load hook to an inherent method returning `Result<()>`.
//! - `Variant` — data-carrying enums, archived as a tag plus the active
//!   alternative.
//! - `Enumerated` — C-like enums, archived as their canonical name in the
//!   text formats and their declaration ordinal in the byte stream.
//! - `Polymorphic` — the type-identity and downcast plumbing used by the
//!   registries and erased handles.

use proc_macro::TokenStream;
use proc_macro2::Literal;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr};

/// Whether a field carries the given `#[reflect(...)]` marker.
fn has_field_marker(field: &syn::Field, marker: &str) -> bool {
    field.attrs.iter().any(|attr| {
        if !attr.path().is_ident("reflect") {
            return false;
        }
        let mut found = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(marker) {
                found = true;
            }
            Ok(())
        });
        found
    })
}

fn is_base_field(field: &syn::Field) -> bool {
    has_field_marker(field, "base")
}

/// `#[reflect(skip)]` fields are not archived; they keep their default
/// value until the initialize hook recomputes them.
fn is_skip_field(field: &syn::Field) -> bool {
    has_field_marker(field, "skip")
}

/// Parse the struct-level `#[reflect(initialize = "method")]` attribute.
fn initialize_hook(input: &DeriveInput) -> Result<Option<Ident>, syn::Error> {
    let mut hook = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("reflect") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("initialize") {
                let literal: LitStr = meta.value()?.parse()?;
                hook = Some(format_ident!("{}", literal.value()));
                Ok(())
            } else {
                Err(meta.error("unsupported reflect attribute; expected `initialize`"))
            }
        })?;
    }
    Ok(hook)
}

#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident.clone();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().cloned().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return syn::Error::new_spanned(
                    name,
                    "Reflect requires named fields; tuple structs have no member names",
                )
                .to_compile_error()
                .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(
                name,
                "Reflect only supports structs; use Variant or Enumerated for enums",
            )
            .to_compile_error()
            .into()
        }
    };

    let hook = match initialize_hook(&input) {
        Ok(hook) => hook,
        Err(error) => return error.to_compile_error().into(),
    };

    // A flattened parent must come first so its members lead the descriptor.
    for (index, field) in fields.iter().enumerate() {
        if is_base_field(field) && index != 0 {
            return syn::Error::new_spanned(
                &field.ident,
                "#[reflect(base)] is only valid on the first field",
            )
            .to_compile_error()
            .into();
        }
    }

    let mut descriptor_stmts = Vec::new();
    let mut save_stmts = Vec::new();
    let mut load_stmts = Vec::new();

    for field in &fields {
        if is_skip_field(field) {
            continue;
        }
        let ident = field.ident.clone().expect("named field");
        let ty = &field.ty;
        let member_name = ident.to_string();

        if is_base_field(field) {
            descriptor_stmts.push(quote! {
                members.extend(
                    <#ty as ::polyform_serializer::Reflect>::descriptor().into_members(),
                );
            });
            save_stmts.push(quote! {
                ::polyform_serializer::Reflect::save_members(&self.#ident, node, depth)?;
            });
            load_stmts.push(quote! {
                ::polyform_serializer::Reflect::load_members(&mut self.#ident, node, depth)?;
            });
        } else {
            descriptor_stmts.push(quote! {
                members.push(::polyform_serializer::MemberEntry::new(
                    #member_name,
                    ::core::any::type_name::<#ty>(),
                ));
            });
            save_stmts.push(quote! {
                ::polyform_serializer::Save::save(
                    &self.#ident,
                    ::polyform_serializer::ArchiveNode::named(node, #member_name)?,
                    depth,
                )?;
            });
            load_stmts.push(quote! {
                self.#ident = ::polyform_serializer::Load::load(
                    ::polyform_serializer::ArchiveNode::named(node, #member_name)?,
                    depth,
                )?;
            });
        }
    }

    if save_stmts.is_empty() {
        // keep the generated member walkers warning-free for empty types
        save_stmts.push(quote! { let _ = (&node, &depth); });
        load_stmts.push(quote! { let _ = (&node, &depth); });
    }

    let initialize_impl = hook.map(|method| {
        quote! {
            fn initialize(&mut self) -> ::polyform_serializer::Result<()> {
                self.#method()
            }
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::polyform_serializer::Reflect for #name #ty_generics #where_clause {
            fn descriptor() -> ::polyform_serializer::Descriptor {
                let mut members = ::std::vec::Vec::new();
                #(#descriptor_stmts)*
                ::polyform_serializer::Descriptor::new(members)
            }

            fn save_members<__A: ::polyform_serializer::ArchiveNode>(
                &self,
                node: &mut __A,
                depth: ::polyform_serializer::Depth,
            ) -> ::polyform_serializer::Result<()> {
                #(#save_stmts)*
                Ok(())
            }

            fn load_members<__A: ::polyform_serializer::ArchiveNode>(
                &mut self,
                node: &mut __A,
                depth: ::polyform_serializer::Depth,
            ) -> ::polyform_serializer::Result<()> {
                #(#load_stmts)*
                Ok(())
            }

            #initialize_impl
        }

        impl #impl_generics ::polyform_serializer::Save for #name #ty_generics #where_clause {
            fn save<__A: ::polyform_serializer::ArchiveNode>(
                &self,
                node: &mut __A,
                depth: ::polyform_serializer::Depth,
            ) -> ::polyform_serializer::Result<()> {
                ::polyform_serializer::reflect::save_aggregate(self, node, depth)
            }
        }

        impl #impl_generics ::polyform_serializer::Load for #name #ty_generics #where_clause {
            fn load<__A: ::polyform_serializer::ArchiveNode>(
                node: &mut __A,
                depth: ::polyform_serializer::Depth,
            ) -> ::polyform_serializer::Result<Self> {
                ::polyform_serializer::reflect::load_aggregate(node, depth)
            }
        }
    };
    expanded.into()
}

#[proc_macro_derive(Variant)]
pub fn derive_variant(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident.clone();

    let variants = match &input.data {
        Data::Enum(data) => data.variants.iter().cloned().collect::<Vec<_>>(),
        _ => {
            return syn::Error::new_spanned(name, "Variant only supports enums")
                .to_compile_error()
                .into()
        }
    };
    if variants.is_empty() {
        return syn::Error::new_spanned(name, "Variant requires at least one alternative")
            .to_compile_error()
            .into();
    }
    if variants.len() > 255 {
        return syn::Error::new_spanned(name, "Variant supports at most 255 alternatives")
            .to_compile_error()
            .into();
    }
    let arity = variants.len();

    let mut save_arms = Vec::new();
    let mut load_arms = Vec::new();

    for (index, variant) in variants.iter().enumerate() {
        let ident = &variant.ident;
        let tag = Literal::u8_suffixed(index as u8);

        match &variant.fields {
            Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                save_arms.push(quote! {
                    Self::#ident(value) => {
                        ::polyform_serializer::ArchiveNode::put_tag(
                            node,
                            ::polyform_serializer::INDEX_NAME,
                            #tag,
                        )?;
                        ::polyform_serializer::Save::save(
                            value,
                            ::polyform_serializer::ArchiveNode::named(
                                node,
                                ::polyform_serializer::VALUE_NAME,
                            )?,
                            depth,
                        )
                    }
                });
                load_arms.push(quote! {
                    #tag => Ok(Self::#ident(::polyform_serializer::Load::load(
                        ::polyform_serializer::ArchiveNode::named(
                            node,
                            ::polyform_serializer::VALUE_NAME,
                        )?,
                        depth,
                    )?)),
                });
            }
            Fields::Unit => {
                save_arms.push(quote! {
                    Self::#ident => {
                        ::polyform_serializer::ArchiveNode::put_tag(
                            node,
                            ::polyform_serializer::INDEX_NAME,
                            #tag,
                        )?;
                        ::polyform_serializer::Save::save(
                            &(),
                            ::polyform_serializer::ArchiveNode::named(
                                node,
                                ::polyform_serializer::VALUE_NAME,
                            )?,
                            depth,
                        )
                    }
                });
                load_arms.push(quote! {
                    #tag => {
                        let _: () = ::polyform_serializer::Load::load(
                            ::polyform_serializer::ArchiveNode::named(
                                node,
                                ::polyform_serializer::VALUE_NAME,
                            )?,
                            depth,
                        )?;
                        Ok(Self::#ident)
                    }
                });
            }
            _ => {
                return syn::Error::new_spanned(
                    ident,
                    "Variant alternatives must hold exactly one unnamed value (or none); \
                     wrap several fields in a struct",
                )
                .to_compile_error()
                .into()
            }
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::polyform_serializer::Save for #name #ty_generics #where_clause {
            fn save<__A: ::polyform_serializer::ArchiveNode>(
                &self,
                node: &mut __A,
                depth: ::polyform_serializer::Depth,
            ) -> ::polyform_serializer::Result<()> {
                let depth = depth.descend()?;
                match self {
                    #(#save_arms)*
                }
            }
        }

        impl #impl_generics ::polyform_serializer::Load for #name #ty_generics #where_clause {
            fn load<__A: ::polyform_serializer::ArchiveNode>(
                node: &mut __A,
                depth: ::polyform_serializer::Depth,
            ) -> ::polyform_serializer::Result<Self> {
                let depth = depth.descend()?;
                let tag = ::polyform_serializer::ArchiveNode::take_tag(
                    node,
                    ::polyform_serializer::INDEX_NAME,
                )?;
                match tag {
                    #(#load_arms)*
                    out_of_range => Err(::polyform_serializer::ArchiveError::InvalidIndex {
                        tag: out_of_range,
                        arity: #arity,
                    }),
                }
            }
        }
    };
    expanded.into()
}

#[proc_macro_derive(Enumerated)]
pub fn derive_enumerated(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident.clone();

    let variants = match &input.data {
        Data::Enum(data) => data.variants.iter().cloned().collect::<Vec<_>>(),
        _ => {
            return syn::Error::new_spanned(name, "Enumerated only supports enums")
                .to_compile_error()
                .into()
        }
    };
    if variants.is_empty() {
        return syn::Error::new_spanned(name, "Enumerated requires at least one value")
            .to_compile_error()
            .into();
    }

    let mut save_arms = Vec::new();
    let mut name_arms = Vec::new();
    let mut ordinal_arms = Vec::new();

    for (index, variant) in variants.iter().enumerate() {
        let ident = &variant.ident;
        if !matches!(variant.fields, Fields::Unit) {
            return syn::Error::new_spanned(
                ident,
                "Enumerated values cannot carry data; use Variant instead",
            )
            .to_compile_error()
            .into();
        }
        let variant_name = ident.to_string();
        let ordinal = Literal::u32_suffixed(index as u32);
        let ordinal_u64 = Literal::u64_suffixed(index as u64);

        save_arms.push(quote! {
            Self::#ident => ::polyform_serializer::Scalar::Enum {
                name: #variant_name,
                ordinal: #ordinal,
            },
        });
        name_arms.push(quote! { #variant_name => Ok(Self::#ident), });
        ordinal_arms.push(quote! { #ordinal_u64 => Ok(Self::#ident), });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::polyform_serializer::Save for #name #ty_generics #where_clause {
            fn save<__A: ::polyform_serializer::ArchiveNode>(
                &self,
                node: &mut __A,
                _depth: ::polyform_serializer::Depth,
            ) -> ::polyform_serializer::Result<()> {
                let scalar = match self {
                    #(#save_arms)*
                };
                ::polyform_serializer::ArchiveNode::put_scalar(node, scalar)
            }
        }

        impl #impl_generics ::polyform_serializer::Load for #name #ty_generics #where_clause {
            fn load<__A: ::polyform_serializer::ArchiveNode>(
                node: &mut __A,
                _depth: ::polyform_serializer::Depth,
            ) -> ::polyform_serializer::Result<Self> {
                match ::polyform_serializer::ArchiveNode::take_scalar(
                    node,
                    ::polyform_serializer::ScalarKind::Enum,
                )? {
                    ::polyform_serializer::Scalar::Str(text) => match text.as_str() {
                        #(#name_arms)*
                        unknown => Err(::polyform_serializer::ArchiveError::Decode(
                            ::std::format!(
                                "unknown {} value {unknown:?}",
                                ::core::any::type_name::<Self>(),
                            ),
                        )),
                    },
                    ::polyform_serializer::Scalar::U64(ordinal) => match ordinal {
                        #(#ordinal_arms)*
                        unknown => Err(::polyform_serializer::ArchiveError::Decode(
                            ::std::format!(
                                "ordinal {unknown} out of range for {}",
                                ::core::any::type_name::<Self>(),
                            ),
                        )),
                    },
                    other => Err(::polyform_serializer::ArchiveError::Decode(
                        ::std::format!("unexpected enumeration payload {other:?}"),
                    )),
                }
            }
        }
    };
    expanded.into()
}

#[proc_macro_derive(Polymorphic)]
pub fn derive_polymorphic(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident.clone();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::polyform_serializer::Polymorphic for #name #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                ::core::any::type_name::<Self>()
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn into_any(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::sync::Arc<dyn ::core::any::Any + Send + Sync> {
                self
            }
        }
    };
    expanded.into()
}
