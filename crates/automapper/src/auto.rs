//! Automatic struct mappers.

use crate::accessor::Accessor;
use crate::convert::{unsupported, Converter, ConverterFactory, DefaultConverterFactory};
use crate::error::{Error, Result};
use crate::mapper::{Context, Mapper, NoContext, Provider};
use crate::naming::{NamingConvention, SnakeCase};
use crate::options::{ConversionPolicy, StructOptions};
use crate::reflect::{FieldInfo, Kind, Reflect, TypeInfo};
use crate::resolve::find_accessor;
use log::{debug, trace, warn};
use std::any::Any;
use std::sync::Arc;

/// Builds mappers from [`StructOptions`], resolving every field that has no
/// explicit override by name.
pub struct AutoProvider {
  naming: Arc<dyn NamingConvention>,
  factory: Arc<dyn ConverterFactory>,
  policy: ConversionPolicy,
  structs: Vec<StructOptions>,
}

impl Default for AutoProvider {
  fn default() -> Self {
    Self {
      naming: Arc::new(SnakeCase),
      factory: Arc::new(DefaultConverterFactory),
      policy: ConversionPolicy::default(),
      structs: Vec::new(),
    }
  }
}

impl AutoProvider {
  pub fn new() -> Self {
    Self::default()
  }

  /// Convention for every struct that does not set its own.
  pub fn naming<N: NamingConvention + 'static>(&mut self, naming: N) -> &mut Self {
    self.naming = Arc::new(naming);
    self
  }

  pub fn converter_factory<C: ConverterFactory + 'static>(&mut self, factory: C) -> &mut Self {
    self.factory = Arc::new(factory);
    self
  }

  pub fn policy(&mut self, policy: ConversionPolicy) -> &mut Self {
    self.policy = policy;
    self
  }

  /// Declares a mapping into `D` from `S` and returns its options.
  pub fn add<D: Reflect, S: Reflect>(&mut self) -> &mut StructOptions {
    self.add_options(StructOptions::new::<D, S>())
  }

  pub fn add_options(&mut self, options: StructOptions) -> &mut StructOptions {
    let index = self.structs.len();
    self.structs.push(options);
    &mut self.structs[index]
  }
}

impl Provider for AutoProvider {
  fn mappers(&self) -> Result<Vec<Arc<dyn Mapper>>> {
    self
      .structs
      .iter()
      .map(|options| {
        let mapper = build_struct_mapper(options, &self.naming, &self.factory, self.policy)?;
        Ok(Arc::new(mapper) as Arc<dyn Mapper>)
      })
      .collect()
  }
}

impl StructOptions {
  /// Builds the mapper with the crate defaults for anything left unset.
  pub fn build(&self) -> Result<StructMapper> {
    let naming: Arc<dyn NamingConvention> = Arc::new(SnakeCase);
    let factory: Arc<dyn ConverterFactory> = Arc::new(DefaultConverterFactory);
    build_struct_mapper(self, &naming, &factory, ConversionPolicy::default())
  }
}

fn build_struct_mapper(
  options: &StructOptions,
  naming: &Arc<dyn NamingConvention>,
  factory: &Arc<dyn ConverterFactory>,
  policy: ConversionPolicy,
) -> Result<StructMapper> {
  let dst = &options.dst;
  let src = &options.src;
  let naming = options.naming.as_ref().unwrap_or(naming);
  let factory = options.factory.as_ref().unwrap_or(factory);
  let policy = options.policy.unwrap_or(policy);

  let fields = match dst.kind() {
    Kind::Struct(fields) => fields,
    _ => return Err(unsupported(dst, src)),
  };

  for (name, _) in &options.fields {
    if dst.field(name).is_none() {
      return Err(Error::UnknownField {
        ty: dst.display_name(),
        field: name.clone(),
      });
    }
  }

  let mut steps = Vec::with_capacity(fields.len());
  for field in fields {
    let dst_path = format!("{}.{}", dst, field.name());
    let overrides = options.field_options(field.name());

    if overrides.map_or(false, |o| o.ignore) {
      debug!("{} is ignored", dst_path);
      continue;
    }

    if let Some(mapper) = overrides.and_then(|o| o.mapper.as_ref()) {
      if mapper.dst().id() != field.type_id() {
        return Err(Error::FieldTypeMismatch {
          field: dst_path,
          expected: mapper.dst().display_name(),
          actual: field.ty().display_name(),
        });
      }
      if mapper.src() != src {
        return Err(Error::SourceTypeMismatch {
          field: dst_path,
          expected: mapper.src().display_name(),
          actual: src.display_name(),
        });
      }
      debug!("{} is mapped by a custom mapper", dst_path);
      steps.push(FieldStep {
        field: field.clone(),
        src_path: format!("{}.(custom function)", src),
        dst_path,
        action: Action::Custom(mapper.clone()),
      });
      continue;
    }

    let accessor = match overrides.and_then(|o| o.path.as_ref()) {
      Some(path) => Accessor::from_path(src, path)?,
      None => {
        let naming = overrides.and_then(|o| o.naming.as_ref()).unwrap_or(naming);
        match find_accessor(&**naming, field.name(), src) {
          Some(accessor) => accessor,
          None => {
            debug!("{} has no counterpart on {}", dst_path, src);
            continue;
          }
        }
      }
    };

    let src_path = format!("{}.{}", src, accessor.name());
    let field_ty = field.ty();
    let output = accessor.output();
    let converter = match overrides.and_then(|o| o.converter.clone()) {
      Some(converter) => Some(converter),
      None => match factory.converter_for(&field_ty, &output) {
        Ok(converter) => converter,
        Err(err) => match policy {
          ConversionPolicy::Strict => return Err(Error::field(dst_path, src_path, err)),
          ConversionPolicy::Lenient => {
            warn!("skipping {} from {}: {}", dst_path, src_path, err);
            continue;
          }
        },
      },
    };

    trace!(
      "{} <- {} ({})",
      dst_path,
      src_path,
      if converter.is_some() { "converted" } else { "assigned" }
    );
    steps.push(FieldStep {
      field: field.clone(),
      dst_path,
      src_path,
      action: Action::Auto {
        accessor,
        field_ty,
        output,
        converter,
      },
    });
  }

  debug!("built mapper {} -> {} with {} field(s)", src, dst, steps.len());
  Ok(StructMapper {
    dst: dst.clone(),
    src: src.clone(),
    steps,
  })
}

/// An immutable mapper from one struct into another, applying its fields in
/// declaration order.
///
/// The source may also be given as an `Option` or `Box` of the declared
/// source type. An empty `Option` leaves the destination untouched.
pub struct StructMapper {
  dst: TypeInfo,
  src: TypeInfo,
  steps: Vec<FieldStep>,
}

struct FieldStep {
  field: FieldInfo,
  dst_path: String,
  src_path: String,
  action: Action,
}

enum Action {
  Custom(Arc<dyn Mapper>),
  Auto {
    accessor: Accessor,
    field_ty: TypeInfo,
    output: TypeInfo,
    converter: Option<Arc<dyn Converter>>,
  },
}

impl StructMapper {
  /// Names of the destination fields this mapper writes, in order.
  pub fn mapped_fields(&self) -> impl Iterator<Item = &str> + '_ {
    self.steps.iter().map(|step| step.field.name())
  }

  pub fn map_into<D: Any, S: Any>(&self, dst: &mut D, src: &S) -> Result<()> {
    self.map(&NoContext, dst, src)
  }
}

impl Mapper for StructMapper {
  fn dst(&self) -> &TypeInfo {
    &self.dst
  }

  fn src(&self) -> &TypeInfo {
    &self.src
  }

  fn map(&self, ctx: &dyn Context, dst: &mut dyn Any, src: &dyn Any) -> Result<()> {
    if (*dst).type_id() != self.dst.id() {
      return Err(Error::TypeMismatch {
        expected: self.dst.display_name(),
      });
    }
    let src = if (*src).type_id() == self.src.id() {
      src
    } else {
      match self.src.pointee(src) {
        Some(Some(inner)) => inner,
        Some(None) => {
          trace!("null {} source, nothing to map", self.src);
          return Ok(());
        }
        None => {
          return Err(Error::TypeMismatch {
            expected: self.src.display_name(),
          })
        }
      }
    };

    for step in &self.steps {
      step
        .apply(ctx, &mut *dst, src)
        .map_err(|err| Error::field(step.dst_path.clone(), step.src_path.clone(), err))?;
    }
    Ok(())
  }
}

impl FieldStep {
  fn apply(&self, ctx: &dyn Context, dst: &mut dyn Any, src: &dyn Any) -> Result<()> {
    let slot = self.field.get_mut(dst).ok_or_else(|| Error::TypeMismatch {
      expected: self.dst_path.clone().into(),
    })?;

    match self.action {
      Action::Custom(ref mapper) => mapper.map(ctx, slot, src),
      Action::Auto {
        ref accessor,
        ref field_ty,
        ref output,
        ref converter,
      } => {
        let value = match accessor.value_from(src) {
          Some(value) => value,
          None => return Ok(()),
        };
        let (value, value_ty) = match output.deref_value(value) {
          Some(found) => found,
          None => return Ok(()),
        };
        let (slot, leaf_ty) = field_ty.settle(slot);
        match converter {
          Some(converter) => converter.convert(slot, value),
          None => {
            if leaf_ty.assign(slot, value) {
              Ok(())
            } else {
              Err(unsupported(&leaf_ty, &value_ty))
            }
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod fixtures {
  use crate::Reflect;

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct Customer {
    pub name: String,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct Order {
    pub id: i32,
    pub customer: Option<Box<Customer>>,
    pub transaction: String,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct OrderDto {
    pub id: i32,
    pub customer_name: String,
    pub transaction: i32,
    pub note: String,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct Tagged {
    pub id: i64,
    pub transaction: Vec<i32>,
  }

  pub fn order() -> Order {
    Order {
      id: 10,
      customer: Some(Box::new(Customer {
        name: "Blockus".to_string(),
      })),
      transaction: "42".to_string(),
    }
  }
}

#[cfg(test)]
use crate::options::FieldOptions;

#[test]
fn test_struct_to_struct() {
  use fixtures::*;

  let mapper = StructOptions::new::<OrderDto, Order>().build().unwrap();
  assert_eq!(
    mapper.mapped_fields().collect::<Vec<_>>(),
    vec!["id", "customer_name", "transaction"]
  );

  let mut dst = OrderDto::default();
  mapper.map_into(&mut dst, &order()).unwrap();
  assert_eq!(
    dst,
    OrderDto {
      id: 10,
      customer_name: "Blockus".to_string(),
      transaction: 42,
      note: String::new(),
    }
  );
}

#[test]
fn test_null_customer_is_skipped() {
  use fixtures::*;

  let mapper = StructOptions::new::<OrderDto, Order>().build().unwrap();
  let mut src = order();
  src.customer = None;
  let mut dst = OrderDto::default();
  mapper.map_into(&mut dst, &src).unwrap();
  assert_eq!(dst.customer_name, "");
  assert_eq!(dst.id, 10);
}

#[test]
fn test_conversion_error_names_field() {
  use fixtures::*;

  let mapper = StructOptions::new::<OrderDto, Order>().build().unwrap();
  let mut src = order();
  src.transaction = "forty-two".to_string();
  let mut dst = OrderDto::default();
  let err = mapper.map_into(&mut dst, &src).unwrap_err();
  match err {
    Error::Field { ref dst, ref src, ref source } => {
      assert_eq!(dst, "OrderDto.transaction");
      assert_eq!(src, "Order.transaction");
      assert!(matches!(**source, Error::ParseInt(_)));
    }
    other => panic!("unexpected error {:?}", other),
  }
  // fields before the failing one were already written
  assert_eq!(dst.id, 10);
}

#[test]
fn test_strict_rejects_unsupported() {
  use fixtures::*;

  let err = StructOptions::new::<Tagged, Order>().build().err().unwrap();
  assert_eq!(
    err.to_string(),
    r#"mapping field "Tagged.transaction" from "Order.transaction": cannot convert from String to Vec<i32>"#
  );
}

#[test]
fn test_lenient_skips_unsupported() {
  use fixtures::*;

  let mapper = StructOptions::new::<Tagged, Order>()
    .policy(ConversionPolicy::Lenient)
    .build()
    .unwrap();
  assert_eq!(mapper.mapped_fields().collect::<Vec<_>>(), vec!["id"]);

  let mut dst = Tagged::default();
  mapper.map_into(&mut dst, &order()).unwrap();
  assert_eq!(dst.id, 10);
  assert!(dst.transaction.is_empty());
}

#[test]
fn test_ignore_suppresses_unsupported() {
  use fixtures::*;

  let mapper = StructOptions::new::<Tagged, Order>()
    .ignore("transaction")
    .build()
    .unwrap();
  assert_eq!(mapper.mapped_fields().collect::<Vec<_>>(), vec!["id"]);
}

#[test]
fn test_override_wins() {
  use fixtures::*;

  let mapper = StructOptions::new::<OrderDto, Order>()
    .field(
      "customer_name",
      FieldOptions::new().map_with(|_, dst: &mut String, src: &Order| {
        *dst = format!("#{}", src.id);
        Ok(())
      }),
    )
    .build()
    .unwrap();
  let mut dst = OrderDto::default();
  mapper.map_into(&mut dst, &order()).unwrap();
  assert_eq!(dst.customer_name, "#10");
}

#[test]
fn test_unknown_override() {
  use fixtures::*;

  let err = StructOptions::new::<OrderDto, Order>()
    .ignore("missing")
    .build()
    .err()
    .unwrap();
  assert_eq!(err.to_string(), "field `missing` does not exist on `OrderDto`");
}

#[test]
fn test_override_type_mismatch() {
  use fixtures::*;

  let err = StructOptions::new::<OrderDto, Order>()
    .field(
      "id",
      FieldOptions::new().map_with(|_, dst: &mut String, _: &Order| {
        dst.clear();
        Ok(())
      }),
    )
    .build()
    .err()
    .unwrap();
  assert!(matches!(err, Error::FieldTypeMismatch { .. }));

  let err = StructOptions::new::<OrderDto, Order>()
    .field(
      "id",
      FieldOptions::new().map_with(|_, dst: &mut i32, src: &Customer| {
        *dst = src.name.len() as i32;
        Ok(())
      }),
    )
    .build()
    .err()
    .unwrap();
  assert!(matches!(err, Error::SourceTypeMismatch { .. }));
}

#[test]
fn test_wrong_instance() {
  use fixtures::*;

  let mapper = StructOptions::new::<OrderDto, Order>().build().unwrap();
  let mut dst = OrderDto::default();
  let err = mapper.map_into(&mut dst, &Customer::default()).unwrap_err();
  assert_eq!(err.to_string(), "expected an instance of Order");
}

#[test]
fn test_pointer_source() {
  use fixtures::*;

  let mapper = StructOptions::new::<OrderDto, Order>().build().unwrap();
  let expected = OrderDto {
    id: 10,
    customer_name: "Blockus".to_string(),
    transaction: 42,
    note: String::new(),
  };

  let mut dst = OrderDto::default();
  mapper.map_into(&mut dst, &Box::new(order())).unwrap();
  assert_eq!(dst, expected);

  let mut dst = OrderDto::default();
  mapper.map_into(&mut dst, &Some(order())).unwrap();
  assert_eq!(dst, expected);

  let mut dst = OrderDto {
    note: "kept".to_string(),
    ..OrderDto::default()
  };
  mapper.map_into(&mut dst, &None::<Order>).unwrap();
  assert_eq!(dst.note, "kept");
  assert_eq!(dst.id, 0);

  let err = mapper.map_into(&mut dst, &Some(Customer::default())).unwrap_err();
  assert_eq!(err.to_string(), "expected an instance of Order");
}

#[test]
fn test_ignore_beats_custom_mapper() {
  use fixtures::*;

  let mapper = StructOptions::new::<OrderDto, Order>()
    .field(
      "customer_name",
      FieldOptions::new().ignore().map_with(|_, dst: &mut String, src: &Order| {
        *dst = format!("#{}", src.id);
        Ok(())
      }),
    )
    .build()
    .unwrap();
  assert_eq!(mapper.mapped_fields().collect::<Vec<_>>(), vec!["id", "transaction"]);

  let mut dst = OrderDto::default();
  mapper.map_into(&mut dst, &order()).unwrap();
  assert_eq!(dst.customer_name, "");
}
