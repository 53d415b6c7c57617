use proc_macro2::TokenStream;
use proc_macro_error::{abort, abort_call_site, ResultExt};
use quote::{quote, ToTokens};
use syn::ext::IdentExt;
use syn::{parse_quote, Attribute, Data, DeriveInput, Fields, Ident, Lit, Meta, NestedMeta};

const ATTR_NAME: &str = "reflect";

#[derive(Debug)]
pub struct Derive {
  ident: Ident,
  name: String,
  generics: syn::Generics,
  data: TypeData,
}

impl Derive {
  pub fn from_derive_input(input: &DeriveInput) -> Self {
    let attrs = ReflectAttrs::from_attrs(&input.attrs);
    if attrs.skip {
      abort_call_site!("`skip` is only supported on fields and variants.");
    }

    let data = match input.data {
      Data::Struct(ref data) => TypeData::Struct(match data.fields {
        Fields::Named(ref fields) => fields
          .named
          .iter()
          .enumerate()
          .filter_map(|(index, field)| {
            let ident = match field.ident {
              Some(ref ident) => ident.clone(),
              None => abort!(field, "Only support named fields."),
            };
            let attrs = ReflectAttrs::from_attrs(&field.attrs);
            if attrs.skip {
              return None;
            }
            Some(StructField {
              name: attrs.name.unwrap_or_else(|| ident.unraw().to_string()),
              ident,
              index,
              ty: field.ty.clone(),
            })
          })
          .collect(),
        _ => abort!(data.fields, "Only support named fields."),
      }),
      Data::Enum(ref data) => {
        if data.variants.is_empty() {
          abort_call_site!("Cannot reflect an enum without variants.");
        }
        TypeData::Enum(
          data
            .variants
            .iter()
            .filter_map(|v| {
              if let Fields::Unit = v.fields {
                let attrs = ReflectAttrs::from_attrs(&v.attrs);
                if attrs.skip {
                  return None;
                }
                Some(EnumVariant {
                  name: attrs.name.unwrap_or_else(|| v.ident.unraw().to_string()),
                  ident: v.ident.clone(),
                })
              } else {
                abort!(v, "Only support unit variant.")
              }
            })
            .collect(),
        )
      }
      _ => {
        abort_call_site!("Only support struct and enum.");
      }
    };

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
      param.bounds.push(parse_quote!(::automapper::Reflect));
    }

    Self {
      name: attrs.name.unwrap_or_else(|| input.ident.unraw().to_string()),
      ident: input.ident.clone(),
      generics,
      data,
    }
  }

  fn get_struct_tokens(&self, fields: &[StructField]) -> TokenStream {
    let name = &self.name;
    let items: Vec<_> = fields
      .iter()
      .map(|field| {
        let StructField {
          ref name,
          ref ident,
          index,
          ref ty,
        } = *field;
        quote! {
          ::automapper::FieldInfo::new::<#ty>(
            #name,
            #index,
            |v: &dyn ::core::any::Any| {
              v.downcast_ref::<Self>().map(|o| &o.#ident as &dyn ::core::any::Any)
            },
            |v: &mut dyn ::core::any::Any| {
              v.downcast_mut::<Self>().map(|o| &mut o.#ident as &mut dyn ::core::any::Any)
            },
          )
        }
      })
      .collect();

    quote! {
      ::automapper::TypeInfo::structure::<Self>(#name, ::std::vec![
        #(#items),*
      ])
    }
  }

  fn get_enum_tokens(&self, variants: &[EnumVariant]) -> TokenStream {
    let name = &self.name;
    let names: Vec<_> = variants.iter().map(|v| &v.name).collect();
    let idents: Vec<_> = variants.iter().map(|v| &v.ident).collect();

    quote! {
      ::automapper::TypeInfo::enumeration::<Self>(
        #name,
        &[#(#names),*],
        |v: &dyn ::core::any::Any| match v.downcast_ref::<Self>() {
          #(::core::option::Option::Some(Self::#idents) => ::core::option::Option::Some(#names),)*
          _ => ::core::option::Option::None,
        },
        |v: &mut dyn ::core::any::Any, variant: &str| match (v.downcast_mut::<Self>(), variant) {
          #((::core::option::Option::Some(slot), #names) => {
            *slot = Self::#idents;
            true
          })*
          _ => false,
        },
      )
    }
  }
}

impl ToTokens for Derive {
  fn to_tokens(&self, tokens: &mut TokenStream) {
    let self_ident = &self.ident;
    let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();
    let body = match self.data {
      TypeData::Struct(ref fields) => self.get_struct_tokens(fields),
      TypeData::Enum(ref variants) => self.get_enum_tokens(variants),
    };

    tokens.extend(quote! {
      impl #impl_generics ::automapper::Reflect for #self_ident #ty_generics #where_clause {
        fn type_info() -> ::automapper::TypeInfo {
          #body
        }
      }
    });
  }
}

#[derive(Debug)]
enum TypeData {
  Struct(Vec<StructField>),
  Enum(Vec<EnumVariant>),
}

#[derive(Debug)]
struct StructField {
  name: String,
  ident: Ident,
  index: usize,
  ty: syn::Type,
}

#[derive(Debug)]
struct EnumVariant {
  name: String,
  ident: Ident,
}

#[derive(Debug, Default)]
struct ReflectAttrs {
  name: Option<String>,
  skip: bool,
}

impl ReflectAttrs {
  // #[reflect(name = "..")]
  // #[reflect(skip)]
  fn from_attrs(attrs: &[Attribute]) -> Self {
    let mut parsed = Self::default();
    for attr in attrs.iter().filter(|attr| attr.path.is_ident(ATTR_NAME)) {
      let list = match attr.parse_meta().unwrap_or_abort() {
        Meta::List(list) => list,
        meta => abort!(meta, "Expected `#[reflect(...)]`."),
      };
      for nested in list.nested.iter() {
        match *nested {
          NestedMeta::Meta(Meta::Path(ref path)) if path.is_ident("skip") => parsed.skip = true,
          NestedMeta::Meta(Meta::NameValue(ref v)) if v.path.is_ident("name") => match v.lit {
            Lit::Str(ref lit) => parsed.name = Some(lit.value()),
            _ => abort!(v.lit, "Expected a string literal."),
          },
          _ => abort!(nested, "Unknown option."),
        }
      }
    }
    parsed
  }
}

#[test]
fn test_struct_fields() {
  let input: DeriveInput = parse_quote! {
    #[reflect(name = "Order")]
    struct OrderRow<T> {
      id: i32,
      #[reflect(skip)]
      cache: T,
      #[reflect(name = "total")]
      sum: i64,
      r#type: String,
    }
  };
  let derive = Derive::from_derive_input(&input);
  assert_eq!(derive.name, "Order");
  assert_eq!(derive.generics.type_params().next().unwrap().bounds.len(), 1);

  let fields = match derive.data {
    TypeData::Struct(ref fields) => fields,
    _ => panic!("expected a struct"),
  };
  let names: Vec<_> = fields.iter().map(|f| (f.name.as_str(), f.index)).collect();
  assert_eq!(names, vec![("id", 0), ("total", 2), ("type", 3)]);
}

#[test]
fn test_enum_variants() {
  let input: DeriveInput = parse_quote! {
    enum Status {
      Open,
      #[reflect(name = "closed")]
      Done,
      #[reflect(skip)]
      Unknown,
    }
  };
  let derive = Derive::from_derive_input(&input);
  let names: Vec<_> = match derive.data {
    TypeData::Enum(ref variants) => variants.iter().map(|v| v.name.as_str()).collect(),
    _ => panic!("expected an enum"),
  };
  assert_eq!(names, vec!["Open", "closed"]);
  assert!(derive.to_token_stream().to_string().contains("enumeration"));
}
