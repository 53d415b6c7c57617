//! # automapper
//!
//! A library to map values of one struct onto another by field name. A
//! destination field named `customer_name` is read from `customer.name` when
//! the source has no field of that exact name.
//!
//! # Example
//! ```
//!   use automapper::{AutoProvider, Reflect, Registry};
//!
//!   #[derive(Clone, Default, Reflect)]
//!   struct Customer {
//!     name: String,
//!   }
//!
//!   #[derive(Clone, Default, Reflect)]
//!   struct Order {
//!     id: i32,
//!     customer: Option<Customer>,
//!     transaction: String,
//!   }
//!
//!   #[derive(Clone, Debug, Default, PartialEq, Reflect)]
//!   struct OrderDto {
//!     id: i64,
//!     customer_name: String,
//!     transaction: u32,
//!     note: String,
//!   }
//!
//!   let mut provider = AutoProvider::new();
//!   provider.add::<OrderDto, Order>().ignore("note");
//!   let registry = Registry::builder().provider(provider).build().unwrap();
//!
//!   let order = Order {
//!     id: 7,
//!     customer: Some(Customer { name: "Ada".to_string() }),
//!     transaction: "1024".to_string(),
//!   };
//!   let mut dto = OrderDto::default();
//!   registry.map(&mut dto, &order).unwrap();
//!
//!   assert_eq!(dto, OrderDto {
//!     id: 7,
//!     customer_name: "Ada".to_string(),
//!     transaction: 1024,
//!     note: String::new(),
//!   });
//! ```

extern crate self as automapper;

mod accessor;
mod auto;
mod convert;
mod error;
mod mapper;
pub mod naming;
mod options;
mod reflect;
mod registry;
mod resolve;

pub use crate::accessor::Accessor;
pub use crate::auto::{AutoProvider, StructMapper};
pub use crate::convert::{
  unsupported, Converter, ConverterFactory, ConverterFactoryExt, DefaultConverterFactory, OrElse,
};
pub use crate::error::{Error, Result};
pub use crate::mapper::{Context, FnMapper, Mapper, NoContext, Provider, StaticProvider};
pub use crate::naming::{Exact, NamingConvention, PascalCase, Possibility, SnakeCase};
pub use crate::options::{ConversionPolicy, FieldOptions, StructOptions};
pub use crate::reflect::{EnumInfo, FieldInfo, IntInfo, Kind, PointerInfo, Reflect, Scalar, TypeInfo};
pub use crate::registry::{DuplicatePolicy, Registry, RegistryBuilder};
pub use crate::resolve::find_accessor;
pub use automapper_codegen::Reflect;
