// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Procedural macros for step implementation types
//!
//! This crate provides macros to declare step arguments and entry points
//! without runtime reflection:
//! - `#[derive(StepArguments)]` - typed argument schema, setter map, ambient
//!   injection and the type-level `#[step(..)]` marker
//! - `#[step_methods]` - turns the `#[step]` methods of an impl block into
//!   invokable method entries
//!
//! Generated code refers to `::stepkit_runtime`, so users depend on that
//! crate rather than on this one.

use darling::{FromDeriveInput, FromField, FromMeta};
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, ImplItem, ItemImpl, Type, parse_macro_input};

// ============================================================================
// Shared attribute shapes
// ============================================================================

/// `#[step(name = .., display_name = .., description = ..)]`
#[derive(Debug, Default, FromMeta)]
struct MarkerArgs {
    #[darling(default)]
    name: Option<String>,
    #[darling(default)]
    display_name: Option<String>,
    #[darling(default)]
    description: Option<String>,
}

impl MarkerArgs {
    fn to_tokens(&self) -> proc_macro2::TokenStream {
        let name = option_to_tokens(&self.name);
        let display_name = option_to_tokens(&self.display_name);
        let description = option_to_tokens(&self.description);
        quote! {
            ::stepkit_runtime::stepkit_dsl::StepMarker {
                name: #name,
                display_name: #display_name,
                description: #description,
            }
        }
    }
}

/// `#[arg(..)]` on a step method parameter
#[derive(Debug, Default, FromMeta)]
struct ParamArgs {
    #[darling(default)]
    name: Option<String>,
    #[darling(default)]
    display_name: Option<String>,
    #[darling(default)]
    description: Option<String>,
    #[darling(default)]
    default: Option<String>,
}

fn argument_spec(
    name: &str,
    type_name: &str,
    display_name: &Option<String>,
    description: &Option<String>,
    default: &Option<String>,
) -> proc_macro2::TokenStream {
    let display_name = option_to_tokens(display_name);
    let description = option_to_tokens(description);
    let default = option_to_tokens(default);
    quote! {
        ::stepkit_runtime::stepkit_dsl::ArgumentSpec {
            name: #name,
            type_name: #type_name,
            display_name: #display_name,
            description: #description,
            default_value: #default,
        }
    }
}

/// Parses a bare `#[attr]` or `#[attr(..)]` into darling args
fn parse_attr<T: FromMeta + Default>(attr: &syn::Attribute) -> darling::Result<T> {
    match &attr.meta {
        syn::Meta::Path(_) => Ok(T::default()),
        syn::Meta::List(list) => {
            let nested = darling::ast::NestedMeta::parse_meta_list(list.tokens.clone())?;
            T::from_list(&nested)
        }
        syn::Meta::NameValue(_) => {
            Err(darling::Error::unsupported_format("name-value").with_span(attr))
        }
    }
}

fn into_syn_error(e: darling::Error) -> syn::Error {
    syn::Error::new(e.span(), e.to_string())
}

// ============================================================================
// StepArguments Derive Macro
// ============================================================================

/// Field attributes for StepArguments derive
#[derive(Debug, FromField)]
#[darling(attributes(arg))]
struct ArgFieldArgs {
    ident: Option<syn::Ident>,
    ty: syn::Type,
    /// Binding name, defaults to the field name
    #[darling(default)]
    name: Option<String>,
    #[darling(default)]
    display_name: Option<String>,
    #[darling(default)]
    description: Option<String>,
    /// Presentation default (JSON text or a bare string)
    #[darling(default)]
    default: Option<String>,
    /// Not an argument at all
    #[darling(default)]
    skip: bool,
    /// Embedded holder whose arguments are inherited
    #[darling(default)]
    flatten: bool,
    /// Ambient field filled from the invocation context
    #[darling(default)]
    inject: bool,
}

/// Container attributes for StepArguments derive
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(step), supports(struct_named))]
struct StepArgumentsInput {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<(), ArgFieldArgs>,
    #[darling(default)]
    name: Option<String>,
    #[darling(default)]
    display_name: Option<String>,
    #[darling(default)]
    description: Option<String>,
}

/// Derive macro for argument holders and implementation types
///
/// Every named field becomes a bindable argument unless it is marked
/// `skip`, `flatten` or `inject`. The struct must also implement `Default`.
///
/// # Example
/// ```ignore
/// #[derive(Default, StepArguments)]
/// #[step(display_name = "Hello", description = "Greets someone")]
/// pub struct HelloFunction {
///     #[arg(display_name = "Name", description = "Who to greet")]
///     pub name: Option<String>,
///     #[arg(inject)]
///     pub logger: Logger,
/// }
/// ```
#[proc_macro_derive(StepArguments, attributes(step, arg))]
pub fn derive_step_arguments(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let args = match StepArgumentsInput::from_derive_input(&input) {
        Ok(v) => v,
        Err(e) => return TokenStream::from(e.write_errors()),
    };

    if !args.generics.params.is_empty() {
        return TokenStream::from(
            syn::Error::new_spanned(&args.generics, "StepArguments cannot be derived for generic types")
                .to_compile_error(),
        );
    }

    let struct_name = &args.ident;
    let fields = match args.data {
        darling::ast::Data::Struct(fields) => fields.fields,
        _ => {
            return TokenStream::from(
                quote! { compile_error!("StepArguments can only be derived for structs"); },
            );
        }
    };

    let mut setters = Vec::new();
    let mut describes = Vec::new();
    let mut specs = Vec::new();
    let mut injections = Vec::new();
    let mut flattened = Vec::new();

    for field in &fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;

        if field.inject {
            let injection = match ident.to_string().as_str() {
                "logger" => quote! {
                    self.#ident = ::std::convert::Into::into(context.logger().clone());
                },
                "current_dir" => quote! {
                    self.#ident = ::std::convert::Into::into(context.current_dir().to_path_buf());
                },
                _ => {
                    return TokenStream::from(
                        syn::Error::new_spanned(
                            ident,
                            "#[arg(inject)] supports fields named `logger` or `current_dir`",
                        )
                        .to_compile_error(),
                    );
                }
            };
            injections.push(injection);
            continue;
        }

        if field.flatten {
            flattened.push((ident.clone(), ty.clone()));
            continue;
        }

        if field.skip {
            continue;
        }

        let binding = field.name.clone().unwrap_or_else(|| ident.to_string());
        let type_str = type_to_string(ty);

        setters.push(quote! {
            #binding => ::stepkit_runtime::object::assign(&mut self.#ident, #binding, #type_str, value),
        });
        describes.push(quote! {
            values.insert(
                ::std::string::String::from(#binding),
                ::stepkit_runtime::object::describe_value(&self.#ident),
            );
        });
        specs.push(argument_spec(
            &binding,
            &type_str,
            &field.display_name,
            &field.description,
            &field.default,
        ));
    }

    let flat_idents: Vec<_> = flattened.iter().map(|(ident, _)| ident).collect();
    let flat_types: Vec<_> = flattened.iter().map(|(_, ty)| ty).collect();

    let marker = MarkerArgs {
        name: args.name,
        display_name: args.display_name,
        description: args.description,
    }
    .to_tokens();

    let expanded = quote! {
        const _: () = {
            impl ::stepkit_runtime::StepObject for #struct_name {
                fn set_property(
                    &mut self,
                    name: &str,
                    value: ::stepkit_runtime::__private::serde_json::Value,
                ) -> ::std::result::Result<(), ::stepkit_runtime::PropertyError> {
                    match name {
                        #(#setters)*
                        _ => {
                            #(
                                let value = match ::stepkit_runtime::StepObject::set_property(&mut self.#flat_idents, name, value) {
                                    ::std::result::Result::Err(::stepkit_runtime::PropertyError::Unknown { value, .. }) => value,
                                    other => return other,
                                };
                            )*
                            ::std::result::Result::Err(::stepkit_runtime::PropertyError::Unknown {
                                name: ::std::string::String::from(name),
                                value,
                            })
                        }
                    }
                }

                fn describe(&self) -> ::stepkit_runtime::Arguments {
                    #[allow(unused_mut)]
                    let mut values = ::stepkit_runtime::Arguments::new();
                    #(#describes)*
                    #(
                        for (key, value) in ::stepkit_runtime::StepObject::describe(&self.#flat_idents) {
                            values.entry(key).or_insert(value);
                        }
                    )*
                    values
                }

                fn inject_context(&mut self, context: &::stepkit_runtime::InvocationContext) {
                    let _ = context;
                    #(#injections)*
                    #(
                        ::stepkit_runtime::StepObject::inject_context(&mut self.#flat_idents, context);
                    )*
                }

                fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                    self
                }

                fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                    self
                }
            }

            impl ::stepkit_runtime::StepArguments for #struct_name {
                const TYPE_NAME: &'static str = concat!(module_path!(), "::", stringify!(#struct_name));

                fn marker() -> ::stepkit_runtime::stepkit_dsl::StepMarker {
                    #marker
                }

                fn arguments() -> ::std::vec::Vec<::stepkit_runtime::stepkit_dsl::ArgumentSpec> {
                    #[allow(unused_mut)]
                    let mut arguments = ::std::vec![#(#specs),*];
                    #(
                        for spec in <#flat_types as ::stepkit_runtime::StepArguments>::arguments() {
                            if !arguments.iter().any(|a: &::stepkit_runtime::stepkit_dsl::ArgumentSpec| a.name == spec.name) {
                                arguments.push(spec);
                            }
                        }
                    )*
                    arguments
                }
            }

            impl ::stepkit_runtime::ContextArgument for #struct_name {
                fn parameter() -> ::stepkit_runtime::ContextParameter {
                    ::stepkit_runtime::ContextParameter::Object {
                        type_name: <Self as ::stepkit_runtime::StepArguments>::TYPE_NAME,
                        arguments: <Self as ::stepkit_runtime::StepArguments>::arguments,
                        construct: <Self as ::stepkit_runtime::StepArguments>::construct,
                    }
                }

                fn from_bound(bound: ::stepkit_runtime::BoundContext) -> ::std::option::Option<Self> {
                    match bound {
                        ::stepkit_runtime::BoundContext::Object(holder) => holder
                            .into_any()
                            .downcast::<Self>()
                            .ok()
                            .map(|holder| *holder),
                        ::stepkit_runtime::BoundContext::Map(_) => ::std::option::Option::None,
                    }
                }
            }
        };
    };

    TokenStream::from(expanded)
}

// ============================================================================
// Step Methods Attribute Macro
// ============================================================================

/// Attribute macro exposing the `#[step]` methods of an impl block
///
/// Each `pub fn` carrying `#[step(..)]` becomes a method entry keyed by the
/// marker `name` or the method name. Parameters are bound by name (or
/// `#[arg(name = ..)]`) and must be owned types. Methods may return a plain
/// value or a `Result` whose error converts into `anyhow::Error`.
///
/// # Example
/// ```ignore
/// #[step_methods]
/// impl Functions {
///     #[step(display_name = "Cheese")]
///     pub fn cheese(&self, name: String, #[arg(display_name = "Amount")] amount: i32) -> String {
///         format!("Hello {} #{}", name, amount)
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn step_methods(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return TokenStream::from(
            syn::Error::new(
                proc_macro2::Span::call_site(),
                "#[step_methods] takes no arguments",
            )
            .to_compile_error(),
        );
    }

    let mut item_impl = parse_macro_input!(item as ItemImpl);
    match expand_step_methods(&mut item_impl) {
        Ok(generated) => TokenStream::from(quote! {
            #item_impl
            #generated
        }),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}

fn expand_step_methods(item_impl: &mut ItemImpl) -> syn::Result<proc_macro2::TokenStream> {
    if !item_impl.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item_impl.generics,
            "#[step_methods] cannot be used on generic impl blocks",
        ));
    }
    if let Some((_, path, _)) = &item_impl.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[step_methods] must be used on an inherent impl block",
        ));
    }

    let self_ty = item_impl.self_ty.clone();
    let mut adapters = Vec::new();
    let mut entries = Vec::new();

    for item in item_impl.items.iter_mut() {
        let ImplItem::Fn(method) = item else {
            continue;
        };

        let Some(position) = method.attrs.iter().position(|a| a.path().is_ident("step")) else {
            continue;
        };
        let step_attr = method.attrs.remove(position);
        let marker: MarkerArgs = parse_attr(&step_attr).map_err(into_syn_error)?;

        if !matches!(method.vis, syn::Visibility::Public(_)) {
            return Err(syn::Error::new_spanned(
                &method.sig.ident,
                "#[step] methods must be `pub`",
            ));
        }
        if method.sig.asyncness.is_some() || !method.sig.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &method.sig,
                "#[step] methods must be synchronous and non-generic",
            ));
        }

        let method_ident = method.sig.ident.clone();
        let method_name = method_ident.to_string();
        let adapter_ident = format_ident!("__stepkit_invoke_{}", method_ident);
        let describe_ident = format_ident!("__stepkit_describe_{}", method_ident);

        let mut has_receiver = false;
        let mut bindings = Vec::new();
        let mut checks = Vec::new();
        let mut params = Vec::new();
        let mut specs = Vec::new();

        for input in method.sig.inputs.iter_mut() {
            match input {
                syn::FnArg::Receiver(r) => {
                    if r.reference.is_none() {
                        return Err(syn::Error::new_spanned(
                            r,
                            "#[step] methods take `&self` or `&mut self`",
                        ));
                    }
                    has_receiver = true;
                }
                syn::FnArg::Typed(pat_type) => {
                    let arg_attr = pat_type
                        .attrs
                        .iter()
                        .position(|a| a.path().is_ident("arg"))
                        .map(|i| pat_type.attrs.remove(i));
                    let param: ParamArgs = match &arg_attr {
                        Some(a) => parse_attr(a).map_err(into_syn_error)?,
                        None => ParamArgs::default(),
                    };

                    let syn::Pat::Ident(pat_ident) = &*pat_type.pat else {
                        return Err(syn::Error::new_spanned(
                            &pat_type.pat,
                            "#[step] method parameters must be plain identifiers",
                        ));
                    };
                    if matches!(&*pat_type.ty, Type::Reference(_)) {
                        return Err(syn::Error::new_spanned(
                            &pat_type.ty,
                            "#[step] method parameters must be owned types",
                        ));
                    }

                    let ident = pat_ident.ident.clone();
                    let ty = (*pat_type.ty).clone();
                    let binding = param.name.clone().unwrap_or_else(|| ident.to_string());
                    let type_str = type_to_string(&ty);

                    bindings.push(quote! {
                        let #ident: #ty = ::stepkit_runtime::object::bind_parameter::<#ty>(
                            arguments,
                            #binding,
                            #type_str,
                            <#self_ty as ::stepkit_runtime::StepArguments>::TYPE_NAME,
                        )?;
                    });
                    checks.push(quote! {
                        if let ::std::option::Option::Some(value) = ::stepkit_runtime::object::check_parameter::<#ty>(
                            arguments,
                            #binding,
                            #type_str,
                            <#self_ty as ::stepkit_runtime::StepArguments>::TYPE_NAME,
                        )? {
                            values.insert(::std::string::String::from(#binding), value);
                        }
                    });
                    params.push(ident);
                    specs.push(argument_spec(
                        &binding,
                        &type_str,
                        &param.display_name,
                        &param.description,
                        &param.default,
                    ));
                }
            }
        }

        let call = if has_receiver {
            quote! {
                let target = ::stepkit_runtime::object::downcast_target::<#self_ty>(target)?;
                let output = target.#method_ident(#(#params),*);
            }
        } else {
            quote! {
                let _ = target;
                let output = <#self_ty>::#method_ident(#(#params),*);
            }
        };

        let returns_result = returns_result(&method.sig.output);
        let unwrap_result = if returns_result {
            quote! {
                let output = output.map_err(|e| {
                    ::stepkit_runtime::EntryPointError::Failed(::stepkit_runtime::__private::anyhow::anyhow!(e))
                })?;
            }
        } else {
            quote! {}
        };

        adapters.push(quote! {
            fn #adapter_ident(
                target: &mut dyn ::stepkit_runtime::StepObject,
                arguments: &::stepkit_runtime::Arguments,
            ) -> ::std::result::Result<::stepkit_runtime::__private::serde_json::Value, ::stepkit_runtime::EntryPointError> {
                #(#bindings)*
                #call
                #unwrap_result
                ::stepkit_runtime::object::to_output(output)
            }

            fn #describe_ident(
                arguments: &::stepkit_runtime::Arguments,
            ) -> ::std::result::Result<::stepkit_runtime::Arguments, ::stepkit_runtime::BindingError> {
                #[allow(unused_mut)]
                let mut values = ::stepkit_runtime::Arguments::new();
                #(#checks)*
                let _ = arguments;
                ::std::result::Result::Ok(values)
            }
        });

        let return_type = return_type_string(&method.sig.output);
        let marker = marker.to_tokens();
        entries.push(quote! {
            ::stepkit_runtime::MethodEntry {
                method_name: #method_name,
                marker: #marker,
                parameters: ::std::vec![#(#specs),*],
                return_type: #return_type,
                invoke: #adapter_ident,
                describe: #describe_ident,
            }
        });
    }

    Ok(quote! {
        const _: () = {
            #(#adapters)*

            impl ::stepkit_runtime::StepMethods for #self_ty {
                fn step_methods() -> ::std::vec::Vec<::stepkit_runtime::MethodEntry> {
                    ::std::vec![#(#entries),*]
                }
            }
        };
    })
}

// ============================================================================
// Type helpers
// ============================================================================

/// Convert Option<String> to tokens
fn option_to_tokens(opt: &Option<String>) -> proc_macro2::TokenStream {
    match opt {
        Some(s) => quote! { ::std::option::Option::Some(#s) },
        None => quote! { ::std::option::Option::None },
    }
}

/// Whether the method returns `Result<..>`
fn returns_result(output: &syn::ReturnType) -> bool {
    if let syn::ReturnType::Type(_, ty) = output
        && let Type::Path(type_path) = &**ty
        && let Some(segment) = type_path.path.segments.last()
    {
        return segment.ident == "Result";
    }
    false
}

/// Declared result type of a step method: the Ok type of a `Result`, the
/// returned type otherwise, `()` without a return type
fn return_type_string(output: &syn::ReturnType) -> String {
    let syn::ReturnType::Type(_, ty) = output else {
        return "()".to_string();
    };
    if let Type::Path(type_path) = &**ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == "Result"
        && let syn::PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(syn::GenericArgument::Type(inner_ty)) = args.args.first()
    {
        return type_to_string(inner_ty);
    }
    type_to_string(ty)
}

/// Convert a Type to a string representation
fn type_to_string(ty: &Type) -> String {
    match ty {
        Type::Path(type_path) => {
            let segments: Vec<String> = type_path
                .path
                .segments
                .iter()
                .map(|s| {
                    let ident = s.ident.to_string();
                    if let syn::PathArguments::AngleBracketed(args) = &s.arguments {
                        let inner: Vec<String> = args
                            .args
                            .iter()
                            .filter_map(|arg| {
                                if let syn::GenericArgument::Type(inner_ty) = arg {
                                    Some(type_to_string(inner_ty))
                                } else {
                                    None
                                }
                            })
                            .collect();
                        if !inner.is_empty() {
                            format!("{}<{}>", ident, inner.join(", "))
                        } else {
                            ident
                        }
                    } else {
                        ident
                    }
                })
                .collect();
            segments.join("::")
        }
        Type::Tuple(tuple) if tuple.elems.is_empty() => "()".to_string(),
        Type::Reference(reference) => format!("&{}", type_to_string(&reference.elem)),
        Type::Paren(paren) => type_to_string(&paren.elem),
        other => quote!(#other).to_string(),
    }
}
