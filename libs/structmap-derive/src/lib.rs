use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Fields, GenericParam, LitStr};

/// Derive macro for record field descriptors.
///
/// Generates `structmap::Record` and `structmap::Reflect` for the annotated
/// struct, so that a `Mapper` can flatten it into a `Mapping` and populate
/// it back from one.
///
/// The struct must implement `Default` (fresh instances are allocated
/// zero-valued before their fields are populated).
///
/// # Example
///
/// ```ignore
/// #[derive(Record, Default)]
/// pub struct Person {
///     #[structmap(embed)]
///     pub ident: Ident,
///
///     #[structmap(rename = "Name")]
///     pub name: String,
///
///     pub spouse: Option<Rc<RefCell<Person>>>,
///
///     #[structmap(skip)]
///     cached_len: usize,
/// }
/// ```
///
/// Field attributes:
/// - `rename = "..."`: key used in the mapping instead of the field ident.
/// - `embed`: promote the nested record's fields into the parent namespace.
/// - `skip`: the field takes part in neither direction.
///
/// Private fields participate like public ones: the generated code lives
/// next to the struct and reads its fields directly.
#[proc_macro_derive(Record, attributes(structmap))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

/// Parsed `#[structmap(...)]` options of one field.
#[derive(Default)]
struct FieldOptions {
    rename: Option<String>,
    embed: bool,
    skip: bool,
}

fn field_options(field: &syn::Field) -> Result<FieldOptions, syn::Error> {
    let mut options = FieldOptions::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("structmap") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                options.rename = Some(value.value());
            } else if meta.path.is_ident("embed") {
                options.embed = true;
            } else if meta.path.is_ident("skip") {
                options.skip = true;
            } else {
                return Err(meta.error("unknown structmap attribute (expected rename, embed or skip)"));
            }
            Ok(())
        })?;
    }
    if options.embed && options.rename.is_some() {
        return Err(syn::Error::new_spanned(
            field,
            "`embed` promotes the nested fields; `rename` has no effect on it",
        ));
    }
    Ok(options)
}

fn derive_impl(mut input: DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = input.ident.clone();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.clone(),
            _ => {
                return Err(syn::Error::new_spanned(
                    &name,
                    "Record only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(&name, "Record only supports structs")),
    };

    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "Record types must be 'static (borrowed fields cannot be reconstructed)",
        ));
    }

    for param in input.generics.params.iter_mut() {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(::structmap::Reflect));
            ty.bounds.push(parse_quote!(::std::default::Default));
        }
    }
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut field_tokens = Vec::new();
    let mut field_mut_tokens = Vec::new();

    for field in &fields {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let options = field_options(field)?;
        if options.skip {
            continue;
        }

        let key = options.rename.unwrap_or_else(|| ident.to_string());
        let embedded = options.embed;

        field_tokens.push(quote! {
            ::structmap::Field {
                name: #key,
                embedded: #embedded,
                value: &self.#ident,
            }
        });
        field_mut_tokens.push(quote! {
            ::structmap::FieldMut {
                name: #key,
                embedded: #embedded,
                value: &mut self.#ident,
            }
        });
    }

    let expanded = quote! {
        impl #impl_generics ::structmap::Record for #name #ty_generics #where_clause {
            fn fields(&self) -> ::std::vec::Vec<::structmap::Field<'_>> {
                ::std::vec![
                    #(#field_tokens),*
                ]
            }

            fn fields_mut(&mut self) -> ::std::vec::Vec<::structmap::FieldMut<'_>> {
                ::std::vec![
                    #(#field_mut_tokens),*
                ]
            }
        }

        impl #impl_generics ::structmap::Reflect for #name #ty_generics #where_clause {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_record(&self) -> ::std::option::Option<&dyn ::structmap::Record> {
                ::std::option::Option::Some(self)
            }

            fn as_record_mut(&mut self) -> ::std::option::Option<&mut dyn ::structmap::Record> {
                ::std::option::Option::Some(self)
            }

            fn flatten_value(
                &self,
                __cx: &mut ::structmap::Flattener<'_>,
            ) -> ::structmap::Result<::structmap::Value> {
                __cx.flatten_record(self).map(::structmap::Value::Map)
            }

            fn assign(
                &mut self,
                __source: &::structmap::Value,
                __cx: &mut ::structmap::Reconstructor<'_>,
            ) -> ::std::result::Result<(), ::structmap::Mismatch> {
                __cx.populate(self, __source)
            }
        }
    };

    Ok(TokenStream::from(expanded))
}
