use crate::error::{Error, Result};
use crate::reflect::{FieldInfo, TypeInfo};
use std::any::Any;
use std::fmt;

/// A read path from a value to one of its (possibly nested) fields.
#[derive(Clone)]
pub enum Accessor {
  /// Reads `field` from an instance of `input`, which may be a pointer to
  /// the struct owning the field.
  Field { input: TypeInfo, field: FieldInfo },
  /// Pipes the value read by the first accessor into the second.
  Pair(Box<Accessor>, Box<Accessor>),
}

impl Accessor {
  pub fn field(input: TypeInfo, field: FieldInfo) -> Self {
    Accessor::Field { input, field }
  }

  pub fn pair(first: Accessor, second: Accessor) -> Self {
    Accessor::Pair(Box::new(first), Box::new(second))
  }

  /// Resolves a dotted field path such as `customer.address.city`.
  pub fn from_path(src: &TypeInfo, path: &str) -> Result<Self> {
    let unresolved = || Error::UnresolvedPath {
      ty: src.display_name(),
      path: path.to_string(),
    };

    let mut accessor: Option<Accessor> = None;
    let mut input = src.clone();
    for name in path.split('.') {
      let field = input
        .unwrap_pointers()
        .field(name)
        .cloned()
        .ok_or_else(unresolved)?;
      let next_input = field.ty();
      let next = Accessor::field(input, field);
      accessor = Some(match accessor {
        Some(prev) => Accessor::pair(prev, next),
        None => next,
      });
      input = next_input;
    }
    accessor.ok_or_else(unresolved)
  }

  /// Dotted path of the fields this accessor reads.
  pub fn name(&self) -> String {
    match self {
      Accessor::Field { field, .. } => field.name().to_string(),
      Accessor::Pair(first, second) => format!("{}.{}", first.name(), second.name()),
    }
  }

  pub fn input(&self) -> &TypeInfo {
    match self {
      Accessor::Field { input, .. } => input,
      Accessor::Pair(first, _) => first.input(),
    }
  }

  pub fn output(&self) -> TypeInfo {
    match self {
      Accessor::Field { field, .. } => field.ty(),
      Accessor::Pair(_, second) => second.output(),
    }
  }

  /// Reads the value, or `None` when a pointer along the way is null.
  pub fn value_from<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
    match self {
      Accessor::Field { input, field } => {
        let (owner, _) = input.deref_value(value)?;
        field.get(owner)
      }
      Accessor::Pair(first, second) => second.value_from(first.value_from(value)?),
    }
  }
}

impl fmt::Debug for Accessor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Accessor")
      .field("path", &self.name())
      .field("input", &self.input().name())
      .field("output", &self.output().name())
      .finish()
  }
}

#[cfg(test)]
mod fixtures {
  use crate::Reflect;

  #[derive(Debug, Clone, Default, Reflect)]
  pub struct Address {
    pub city: String,
  }

  #[derive(Debug, Clone, Default, Reflect)]
  pub struct Customer {
    pub name: String,
    pub address: Option<Address>,
  }

  #[derive(Debug, Clone, Default, Reflect)]
  pub struct Order {
    pub id: i32,
    pub customer: Option<Box<Customer>>,
  }
}

#[test]
fn test_from_path() {
  use fixtures::*;

  let accessor = Accessor::from_path(&TypeInfo::of::<Order>(), "customer.address.city").unwrap();
  assert_eq!(accessor.name(), "customer.address.city");
  assert!(accessor.input().is::<Order>());
  assert!(accessor.output().is::<String>());

  let order = Order {
    id: 1,
    customer: Some(Box::new(Customer {
      name: "Blockus".to_string(),
      address: Some(Address {
        city: "Oslo".to_string(),
      }),
    })),
  };
  let value = accessor.value_from(&order).unwrap();
  assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("Oslo"));
}

#[test]
fn test_null_intermediate() {
  use fixtures::*;

  let accessor = Accessor::from_path(&TypeInfo::of::<Order>(), "customer.name").unwrap();
  let order = Order {
    id: 1,
    customer: None,
  };
  assert!(accessor.value_from(&order).is_none());
}

#[test]
fn test_unresolved_path() {
  use fixtures::*;

  let err = Accessor::from_path(&TypeInfo::of::<Order>(), "customer.email").unwrap_err();
  assert_eq!(err.to_string(), "path `customer.email` cannot be resolved on `Order`");
}
