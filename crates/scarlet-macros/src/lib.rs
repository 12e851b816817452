use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, parse_quote, Data, DeriveInput, Fields, Ident, Index, Member, Type,
    WherePredicate,
};

/// How a derive treats one field.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Plain,
    /// Installed by the node and ignored by `element_eq`.
    Dynamic,
    Attribute,
    Skip,
}

/// How `ElementEq` compares the whole value.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Fields,
    PartialEq,
    Pod,
}

struct FieldInfo {
    member: Member,
    ty: Type,
    kind: FieldKind,
}

fn last_ident(ty: &Type) -> Option<&Ident> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last().map(|segment| &segment.ident),
        Type::Group(group) => last_ident(&group.elem),
        Type::Paren(paren) => last_ident(&paren.elem),
        _ => None,
    }
}

/// Classifies a field by the last segment of its type path unless a
/// `#[scarlet(..)]` attribute says otherwise.
fn field_kind(field: &syn::Field) -> syn::Result<FieldKind> {
    let mut kind = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("scarlet") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let explicit = if meta.path.is_ident("dynamic") {
                FieldKind::Dynamic
            } else if meta.path.is_ident("attribute") {
                FieldKind::Attribute
            } else if meta.path.is_ident("skip") {
                FieldKind::Skip
            } else {
                return Err(meta.error("expected `dynamic`, `attribute` or `skip`"));
            };
            kind = Some(explicit);
            Ok(())
        })?;
    }
    if let Some(kind) = kind {
        return Ok(kind);
    }
    let inferred = match last_ident(&field.ty).map(|ident| ident.to_string()).as_deref() {
        Some("State") | Some("Environment") => FieldKind::Dynamic,
        Some("Attribute") | Some("AppendAttribute") => FieldKind::Attribute,
        _ => FieldKind::Plain,
    };
    Ok(inferred)
}

fn comparison(input: &DeriveInput) -> syn::Result<Comparison> {
    let mut comparison = Comparison::Fields;
    for attr in &input.attrs {
        if !attr.path().is_ident("scarlet") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("partial_eq") {
                comparison = Comparison::PartialEq;
            } else if meta.path.is_ident("pod") {
                comparison = Comparison::Pod;
            } else {
                return Err(meta.error("expected `partial_eq` or `pod`"));
            }
            Ok(())
        })?;
    }
    Ok(comparison)
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<FieldInfo>> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let member = match &field.ident {
                Some(ident) => Member::Named(ident.clone()),
                None => Member::Unnamed(Index {
                    index: index as u32,
                    span: Span::call_site(),
                }),
            };
            Ok(FieldInfo {
                member,
                ty: field.ty.clone(),
                kind: field_kind(field)?,
            })
        })
        .collect()
}

fn struct_fields(input: &DeriveInput, derive: &str) -> syn::Result<Vec<FieldInfo>> {
    match &input.data {
        Data::Struct(data) => collect_fields(&data.fields),
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

/// `left OP right` for every compared field, `true` when there is none.
fn chain(
    fields: &[FieldInfo],
    left: impl Fn(&FieldInfo) -> TokenStream2,
    right: impl Fn(&FieldInfo) -> TokenStream2,
    method: &Ident,
    include: impl Fn(FieldKind) -> bool,
) -> TokenStream2 {
    let comparisons: Vec<_> = fields
        .iter()
        .filter(|field| include(field.kind))
        .map(|field| {
            let left = left(field);
            let right = right(field);
            quote! { ::scarlet_core::equality::ElementEq::#method(#left, #right) }
        })
        .collect();
    if comparisons.is_empty() {
        quote! { true }
    } else {
        quote! { #(#comparisons)&&* }
    }
}

fn compared_by_any_eq(kind: FieldKind) -> bool {
    kind != FieldKind::Skip
}

fn compared_by_element_eq(kind: FieldKind) -> bool {
    kind != FieldKind::Skip && kind != FieldKind::Dynamic
}

fn struct_bodies(fields: &[FieldInfo]) -> (TokenStream2, TokenStream2) {
    let left = |field: &FieldInfo| {
        let member = &field.member;
        quote! { &self.#member }
    };
    let right = |field: &FieldInfo| {
        let member = &field.member;
        quote! { &other.#member }
    };
    let any_eq = chain(
        fields,
        left,
        right,
        &format_ident!("any_eq"),
        compared_by_any_eq,
    );
    let element_eq = chain(
        fields,
        left,
        right,
        &format_ident!("element_eq"),
        compared_by_element_eq,
    );
    (any_eq, element_eq)
}

fn binding(prefix: &str, member: &Member) -> Ident {
    match member {
        Member::Named(ident) => format_ident!("{}_{}", prefix, ident),
        Member::Unnamed(index) => format_ident!("{}_{}", prefix, index.index),
    }
}

fn variant_pattern(
    enum_name: &Ident,
    variant: &Ident,
    fields: &Fields,
    infos: &[FieldInfo],
    prefix: &str,
) -> TokenStream2 {
    let bindings = infos.iter().map(|field| binding(prefix, &field.member));
    match fields {
        Fields::Named(_) => {
            let members = infos.iter().map(|field| &field.member);
            quote! { #enum_name::#variant { #(#members: #bindings),* } }
        }
        Fields::Unnamed(_) => quote! { #enum_name::#variant ( #(#bindings),* ) },
        Fields::Unit => quote! { #enum_name::#variant },
    }
}

fn enum_bodies(input: &DeriveInput, data: &syn::DataEnum) -> syn::Result<(TokenStream2, TokenStream2)> {
    let name = &input.ident;
    let mut any_arms = Vec::new();
    let mut element_arms = Vec::new();
    for variant in &data.variants {
        let infos = collect_fields(&variant.fields)?;
        let left = variant_pattern(name, &variant.ident, &variant.fields, &infos, "a");
        let right = variant_pattern(name, &variant.ident, &variant.fields, &infos, "b");
        let a = |field: &FieldInfo| {
            let ident = binding("a", &field.member);
            quote! { #ident }
        };
        let b = |field: &FieldInfo| {
            let ident = binding("b", &field.member);
            quote! { #ident }
        };
        let any_eq = chain(&infos, a, b, &format_ident!("any_eq"), compared_by_any_eq);
        let element_eq = chain(
            &infos,
            a,
            b,
            &format_ident!("element_eq"),
            compared_by_element_eq,
        );
        any_arms.push(quote! { (#left, #right) => #any_eq, });
        element_arms.push(quote! { (#left, #right) => #element_eq, });
    }
    let fallback = if data.variants.len() > 1 {
        quote! { _ => false, }
    } else {
        quote! {}
    };
    let any_eq = quote! {
        match (self, other) {
            #(#any_arms)*
            #fallback
        }
    };
    let element_eq = quote! {
        match (self, other) {
            #(#element_arms)*
            #fallback
        }
    };
    Ok((any_eq, element_eq))
}

fn expand_element_eq(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let comparison = comparison(&input)?;

    let (any_eq, element_eq) = match comparison {
        Comparison::PartialEq => (quote! { self == other }, quote! { self == other }),
        Comparison::Pod => (
            quote! { ::scarlet_core::equality::pod_eq(self, other) },
            quote! { ::scarlet_core::equality::pod_eq(self, other) },
        ),
        Comparison::Fields => match &input.data {
            Data::Struct(data) => struct_bodies(&collect_fields(&data.fields)?),
            Data::Enum(data) => {
                if data.variants.is_empty() {
                    (quote! { match *self {} }, quote! { match *self {} })
                } else {
                    enum_bodies(&input, data)?
                }
            }
            Data::Union(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "ElementEq cannot be derived for unions",
                ))
            }
        },
    };

    let mut generics = input.generics.clone();
    if comparison == Comparison::Fields {
        let predicates: Vec<WherePredicate> = input
            .generics
            .type_params()
            .map(|param| {
                let ident = &param.ident;
                parse_quote! { #ident: ::scarlet_core::equality::ElementEq }
            })
            .collect();
        generics.make_where_clause().predicates.extend(predicates);
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::scarlet_core::equality::ElementEq for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn any_eq(&self, other: &Self) -> bool {
                #any_eq
            }

            #[allow(unused_variables)]
            fn element_eq(&self, other: &Self) -> bool {
                #element_eq
            }
        }
    })
}

fn expand_element_fields(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let fields = struct_fields(&input, "ElementFields")?;

    let attributes: Vec<_> = fields
        .iter()
        .filter(|field| field.kind == FieldKind::Attribute)
        .collect();
    let dynamics: Vec<_> = fields
        .iter()
        .filter(|field| field.kind == FieldKind::Dynamic)
        .collect();

    let attribute_members = attributes.iter().map(|field| &field.member);
    let dynamic_members: Vec<_> = dynamics.iter().map(|field| &field.member).collect();
    let dynamic_types: Vec<_> = dynamics.iter().map(|field| &field.ty).collect();

    let mut generics = input.generics.clone();
    {
        let where_clause = generics.make_where_clause();
        for field in &attributes {
            let ty = &field.ty;
            where_clause
                .predicates
                .push(parse_quote! { #ty: ::scarlet_core::attributes::AttributeField });
        }
        for ty in &dynamic_types {
            where_clause
                .predicates
                .push(parse_quote! { #ty: ::scarlet_core::properties::DynamicProperty });
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::scarlet_core::properties::ElementFields for #name #ty_generics #where_clause {
            fn collect_attributes(
                &self,
                attributes: &mut ::std::vec::Vec<::std::rc::Rc<dyn ::scarlet_core::attributes::AttributeSetter>>,
            ) {
                let _ = &attributes;
                #(::scarlet_core::attributes::AttributeField::collect(&self.#attribute_members, attributes);)*
            }

            fn install_dynamic_properties(
                &mut self,
                installed: &Self,
                installer: &::scarlet_core::properties::Installer<'_>,
            ) {
                let _ = (&installed, &installer);
                #(::scarlet_core::properties::DynamicProperty::install(&mut self.#dynamic_members, &installed.#dynamic_members, installer);)*
            }

            fn environment_keys(keys: &mut ::std::vec::Vec<::std::any::TypeId>) {
                let _ = &keys;
                #(<#dynamic_types as ::scarlet_core::properties::DynamicProperty>::environment_keys(keys);)*
            }
        }
    })
}

/// Derives `ElementEq`.
///
/// Fields are compared with `any_eq` and, for `element_eq`, every field
/// except dynamic properties (`State`, `Environment`, or `#[scarlet(dynamic)]`).
/// `#[scarlet(partial_eq)]` on the type compares with `==` instead and
/// `#[scarlet(pod)]` compares the raw bytes of a `bytemuck::NoUninit` type.
#[proc_macro_derive(ElementEq, attributes(scarlet))]
pub fn derive_element_eq(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_element_eq(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives `ElementFields`: attribute fields are collected, dynamic
/// properties installed and their environment keys reported.
#[proc_macro_derive(ElementFields, attributes(scarlet))]
pub fn derive_element_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_element_fields(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
