extern crate proc_macro;

use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod derive;

use derive::Derive;

/// Derives `automapper::Reflect` for a struct with named fields or an enum
/// with unit variants.
///
/// `#[reflect(name = "...")]` renames the type, a field or a variant.
/// `#[reflect(skip)]` hides a field or variant from the mapper.
#[proc_macro_derive(Reflect, attributes(reflect))]
#[proc_macro_error::proc_macro_error]
pub fn derive_reflect(tokens: proc_macro::TokenStream) -> proc_macro::TokenStream {
  let input = parse_macro_input!(tokens as DeriveInput);
  let derive: Derive = Derive::from_derive_input(&input);
  let tokens = quote!(#derive);
  tokens.into()
}
