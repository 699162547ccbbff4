use darling::{
    ast::{Data, Fields, Style},
    FromDeriveInput, FromField, FromVariant,
};
use proc_macro2::{TokenStream, TokenTree};
use quote::{format_ident, quote, ToTokens as _};
use syn::{ext::IdentExt as _, parse_quote, Error, Generics, Ident, Index, Path, Type};

/// Options for `#[derive(Fixture)]`.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(fixture), supports(struct_any, enum_any))]
pub struct FixtureInput {
    ident: Ident,
    generics: Generics,
    data: Data<VariantInput, FieldInput>,

    /// Members are replaced by reconstruction.
    #[darling(default)]
    immutable: bool,

    /// Zero-argument sample factory, preferred over every other path.
    #[darling(default)]
    sample: Option<Path>,

    /// Register `Default::default` as the parameterless path.
    #[darling(default)]
    default: bool,

    /// Custom constructor declarations, replacing the memberwise one.
    #[darling(default)]
    constructors: Option<Path>,
}

#[derive(Debug, FromField)]
#[darling(attributes(fixture))]
struct FieldInput {
    ident: Option<Ident>,
    ty: Type,

    /// Filled with `Default::default()` instead of being synthesized.
    #[darling(default)]
    skip: bool,
}

#[derive(Debug, FromVariant)]
#[darling(attributes(fixture))]
struct VariantInput {
    ident: Ident,
    fields: Fields<FieldInput>,

    /// Never built.
    #[darling(default)]
    skip: bool,
}

/// A field as seen by generated code.
struct Member<'a> {
    field: &'a FieldInput,
    /// Name used for constructor parameters and `Members`.
    name: String,
    /// Local binding in patterns.
    binding: Ident,
    /// Accessor on `self` for struct fields.
    access: TokenStream,
}

fn members(fields: &Fields<FieldInput>) -> Vec<Member<'_>> {
    fields
        .iter()
        .enumerate()
        .map(|(i, field)| match &field.ident {
            Some(ident) => Member {
                field,
                name: ident.unraw().to_string(),
                binding: format_ident!("__{}", ident.unraw()),
                access: quote!(#ident),
            },
            None => {
                let index = Index::from(i);
                Member {
                    field,
                    name: format!("_{i}"),
                    binding: format_ident!("__{}", i),
                    access: quote!(#index),
                }
            }
        })
        .collect()
}

pub fn generate_fixture(input: FixtureInput) -> Result<TokenStream, Error> {
    match &input.data {
        Data::Struct(fields) => generate_struct(&input, fields),
        Data::Enum(variants) if variants.iter().all(|v| v.fields.is_unit()) => {
            generate_enumeration(&input, variants)
        }
        Data::Enum(variants) => generate_enum(&input, variants),
    }
}

/// Add `Fixture` bounds for type parameters and for field types when the
/// type is generic.
///
/// Field types that name the deriving type itself are left out. A bound
/// like `Vec<Tree<T>>: Fixture` would require the impl being declared and
/// never resolve.
fn bounded_generics<'a>(
    ident: &Ident,
    generics: &Generics,
    fields: impl Iterator<Item = &'a FieldInput>,
) -> Generics {
    let mut generics = generics.clone();
    if generics.type_params().next().is_none() {
        return generics;
    }
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::fixture_flow::Fixture));
    }
    let where_clause = generics.make_where_clause();
    for field in fields {
        let ty = &field.ty;
        if mentions(ty.to_token_stream(), ident) {
            continue;
        }
        if field.skip {
            where_clause
                .predicates
                .push(parse_quote!(#ty: ::core::default::Default));
        } else {
            where_clause
                .predicates
                .push(parse_quote!(#ty: ::fixture_flow::Fixture));
        }
    }
    generics
}

fn mentions(tokens: TokenStream, ident: &Ident) -> bool {
    tokens.into_iter().any(|tree| match tree {
        TokenTree::Ident(name) => name == *ident || name == "Self",
        TokenTree::Group(group) => mentions(group.stream(), ident),
        _ => false,
    })
}

/// The `Fixture` impl shared by structs and data enums.
fn composite_fixture_impl(ident: &Ident, generics: &Generics) -> TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    quote! {
        impl #impl_generics ::fixture_flow::Fixture for #ident #ty_generics #where_clause {
            fn descriptor() -> ::fixture_flow::TypeDescriptor {
                ::fixture_flow::TypeDescriptor::composite::<Self>()
            }

            fn synthesize(
                ctx: &mut ::fixture_flow::GenerationContext<'_>,
            ) -> ::core::result::Result<Self, ::fixture_flow::FixtureError> {
                ctx.compose::<Self>()
            }

            fn fallback(
                ctx: &mut ::fixture_flow::GenerationContext<'_>,
            ) -> ::core::option::Option<Self> {
                ctx.compose_fallback::<Self>()
            }
        }
    }
}

/// Parameters, the arguments binding and the initializer list of a
/// memberwise constructor.
fn memberwise(members: &[Member<'_>]) -> (Vec<TokenStream>, Ident, Vec<TokenStream>) {
    let params = members
        .iter()
        .filter(|m| !m.field.skip)
        .map(|m| {
            let ty = &m.field.ty;
            let name = &m.name;
            quote!(::fixture_flow::Parameter::of::<#ty>(#name))
        })
        .collect::<Vec<_>>();
    let args = if params.is_empty() {
        format_ident!("_args")
    } else {
        format_ident!("args")
    };
    let inits = members
        .iter()
        .map(|m| {
            let access = &m.access;
            let ty = &m.field.ty;
            if m.field.skip {
                quote!(#access: ::core::default::Default::default())
            } else {
                quote!(#access: #args.take::<#ty>()?)
            }
        })
        .collect();
    (params, args, inits)
}

fn declared_paths(input: &FixtureInput, memberwise: TokenStream) -> TokenStream {
    let sample = input.sample.as_ref().map(|path| {
        quote! {
            table.add(::fixture_flow::Constructor::sample("sample", #path));
        }
    });
    let declared = match &input.constructors {
        Some(path) => quote!(#path(table);),
        None => memberwise,
    };
    let default = input.default.then(|| {
        quote! {
            table.add(::fixture_flow::Constructor::parameterless(
                "default",
                <Self as ::core::default::Default>::default,
            ));
        }
    });
    quote! {
        #sample
        #declared
        #default
    }
}

fn generate_struct(input: &FixtureInput, fields: &Fields<FieldInput>) -> Result<TokenStream, Error> {
    let ident = &input.ident;
    let generics = bounded_generics(ident, &input.generics, fields.iter());
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let members = members(fields);
    let (params, args, inits) = memberwise(&members);
    let name = ident.unraw().to_string();
    let memberwise = quote! {
        table.add(::fixture_flow::Constructor::new(
            #name,
            ::std::vec![#(#params),*],
            |#args: &mut ::fixture_flow::Arguments| {
                ::core::result::Result::Ok(Self { #(#inits),* })
            },
        ));
    };
    let paths = declared_paths(input, memberwise);

    let kept: Vec<&Member<'_>> = members.iter().filter(|m| !m.field.skip).collect();
    let into_members = if kept.is_empty() {
        quote!(::fixture_flow::Members::new())
    } else {
        let count = kept.len();
        let pushes = kept.iter().map(|m| {
            let name = &m.name;
            let access = &m.access;
            quote!(members.push(#name, self.#access);)
        });
        quote! {
            let mut members = ::fixture_flow::Members::with_capacity(#count);
            #(#pushes)*
            members
        }
    };

    let immutable = input.immutable;
    let fixture_impl = composite_fixture_impl(ident, &generics);

    Ok(quote! {
        #fixture_impl

        impl #impl_generics ::fixture_flow::Composite for #ident #ty_generics #where_clause {
            const IMMUTABLE: bool = #immutable;

            fn constructors(table: &mut ::fixture_flow::ConstructorTable<Self>) {
                #paths
            }

            fn into_members(self) -> ::fixture_flow::Members {
                #into_members
            }
        }
    })
}

fn generate_enum(input: &FixtureInput, variants: &[VariantInput]) -> Result<TokenStream, Error> {
    let ident = &input.ident;
    let generics = bounded_generics(
        ident,
        &input.generics,
        variants.iter().filter(|v| !v.skip).flat_map(|v| v.fields.iter()),
    );
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut constructors = Vec::new();
    let mut arms = Vec::new();
    let mut has_members = false;
    for variant in variants {
        let variant_ident = &variant.ident;
        let name = variant_ident.unraw().to_string();
        if variant.skip {
            arms.push(quote!(Self::#variant_ident { .. } => {}));
            continue;
        }

        let members = members(&variant.fields);
        let (params, args, inits) = memberwise(&members);
        constructors.push(match variant.fields.style {
            Style::Unit => quote! {
                table.add(::fixture_flow::Constructor::parameterless(
                    #name,
                    || Self::#variant_ident,
                ));
            },
            Style::Tuple | Style::Struct => quote! {
                table.add(::fixture_flow::Constructor::new(
                    #name,
                    ::std::vec![#(#params),*],
                    |#args: &mut ::fixture_flow::Arguments| {
                        ::core::result::Result::Ok(Self::#variant_ident { #(#inits),* })
                    },
                ));
            },
        });

        let kept: Vec<&Member<'_>> = members.iter().filter(|m| !m.field.skip).collect();
        has_members |= !kept.is_empty();
        let bindings = kept.iter().map(|m| {
            let access = &m.access;
            let binding = &m.binding;
            quote!(#access: #binding)
        });
        let pushes = kept.iter().map(|m| {
            let name = &m.name;
            let binding = &m.binding;
            quote!(members.push(#name, #binding);)
        });
        arms.push(quote! {
            Self::#variant_ident { #(#bindings,)* .. } => {
                #(#pushes)*
            }
        });
    }

    let paths = declared_paths(input, quote!(#(#constructors)*));
    let into_members = if has_members {
        quote! {
            let mut members = ::fixture_flow::Members::new();
            match self {
                #(#arms)*
            }
            members
        }
    } else {
        quote!(::fixture_flow::Members::new())
    };
    let immutable = input.immutable;
    let fixture_impl = composite_fixture_impl(ident, &generics);

    Ok(quote! {
        #fixture_impl

        impl #impl_generics ::fixture_flow::Composite for #ident #ty_generics #where_clause {
            const IMMUTABLE: bool = #immutable;

            fn constructors(table: &mut ::fixture_flow::ConstructorTable<Self>) {
                #paths
            }

            fn into_members(self) -> ::fixture_flow::Members {
                #into_members
            }
        }
    })
}

fn generate_enumeration(
    input: &FixtureInput,
    variants: &[VariantInput],
) -> Result<TokenStream, Error> {
    if input.immutable || input.sample.is_some() || input.default || input.constructors.is_some()
    {
        return Err(Error::new(
            input.ident.span(),
            "`immutable`, `sample`, `default` and `constructors` apply to structs and enums with data",
        ));
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let picked: Vec<&Ident> = variants
        .iter()
        .filter(|v| !v.skip)
        .map(|v| &v.ident)
        .collect();
    let count = picked.len();
    let arms = picked.iter().enumerate().map(|(index, variant)| {
        quote!(#index => ::core::option::Option::Some(Self::#variant),)
    });

    Ok(quote! {
        impl #impl_generics ::fixture_flow::Fixture for #ident #ty_generics #where_clause {
            fn descriptor() -> ::fixture_flow::TypeDescriptor {
                ::fixture_flow::TypeDescriptor::enumeration::<Self>()
            }

            fn synthesize(
                ctx: &mut ::fixture_flow::GenerationContext<'_>,
            ) -> ::core::result::Result<Self, ::fixture_flow::FixtureError> {
                ctx.pick_variant::<Self>()
            }

            fn fallback(
                ctx: &mut ::fixture_flow::GenerationContext<'_>,
            ) -> ::core::option::Option<Self> {
                ctx.pick_variant::<Self>().ok()
            }
        }

        impl #impl_generics ::fixture_flow::Enumeration for #ident #ty_generics #where_clause {
            const VARIANT_COUNT: usize = #count;

            fn variant(index: usize) -> ::core::option::Option<Self> {
                match index {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}
