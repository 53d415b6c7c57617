use crate::convert::{Converter, ConverterFactory};
use crate::error::Result;
use crate::mapper::{Context, FnMapper, Mapper};
use crate::naming::NamingConvention;
use crate::reflect::{Reflect, TypeInfo};
use std::sync::Arc;

/// What to do with a field whose types the converter factory cannot bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPolicy {
  /// Fail the mapper build, naming the field.
  Strict,
  /// Leave the field unmapped.
  Lenient,
}

impl Default for ConversionPolicy {
  fn default() -> Self {
    ConversionPolicy::Strict
  }
}

/// Overrides for a single destination field.
#[derive(Clone, Default)]
pub struct FieldOptions {
  pub(crate) ignore: bool,
  pub(crate) path: Option<String>,
  pub(crate) converter: Option<Arc<dyn Converter>>,
  pub(crate) mapper: Option<Arc<dyn Mapper>>,
  pub(crate) naming: Option<Arc<dyn NamingConvention>>,
}

impl FieldOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Never write this field.
  pub fn ignore(mut self) -> Self {
    self.ignore = true;
    self
  }

  /// Read the field from a dotted source path instead of resolving it by name.
  pub fn from_path(mut self, path: impl Into<String>) -> Self {
    self.path = Some(path.into());
    self
  }

  pub fn converter<C: Converter + 'static>(mut self, converter: C) -> Self {
    self.converter = Some(Arc::new(converter));
    self
  }

  pub fn naming<N: NamingConvention + 'static>(mut self, naming: N) -> Self {
    self.naming = Some(Arc::new(naming));
    self
  }

  /// Map the field with a mapper that receives the field and the whole
  /// source value.
  pub fn mapper<M: Mapper + 'static>(mut self, mapper: M) -> Self {
    self.mapper = Some(Arc::new(mapper));
    self
  }

  pub fn map_with<F, S, M>(self, func: M) -> Self
  where
    F: Reflect,
    S: Reflect,
    M: Fn(&dyn Context, &mut F, &S) -> Result<()> + Send + Sync + 'static,
  {
    self.mapper(FnMapper::new(func))
  }
}

/// How one destination struct is mapped from one source struct.
#[derive(Clone)]
pub struct StructOptions {
  pub(crate) dst: TypeInfo,
  pub(crate) src: TypeInfo,
  pub(crate) naming: Option<Arc<dyn NamingConvention>>,
  pub(crate) factory: Option<Arc<dyn ConverterFactory>>,
  pub(crate) policy: Option<ConversionPolicy>,
  pub(crate) fields: Vec<(String, FieldOptions)>,
}

impl StructOptions {
  /// Pointer types on either side are mapped through their pointee.
  pub fn new<D: Reflect, S: Reflect>() -> Self {
    Self::for_types(D::type_info(), S::type_info())
  }

  pub fn for_types(dst: TypeInfo, src: TypeInfo) -> Self {
    Self {
      dst: dst.unwrap_pointers(),
      src: src.unwrap_pointers(),
      naming: None,
      factory: None,
      policy: None,
      fields: Vec::new(),
    }
  }

  pub fn dst(&self) -> &TypeInfo {
    &self.dst
  }

  pub fn src(&self) -> &TypeInfo {
    &self.src
  }

  pub fn naming<N: NamingConvention + 'static>(&mut self, naming: N) -> &mut Self {
    self.naming = Some(Arc::new(naming));
    self
  }

  pub fn converter_factory<C: ConverterFactory + 'static>(&mut self, factory: C) -> &mut Self {
    self.factory = Some(Arc::new(factory));
    self
  }

  pub fn policy(&mut self, policy: ConversionPolicy) -> &mut Self {
    self.policy = Some(policy);
    self
  }

  /// Replaces any options previously given for `name`.
  pub fn field(&mut self, name: impl Into<String>, options: FieldOptions) -> &mut Self {
    let name = name.into();
    match self.fields.iter_mut().find(|(n, _)| *n == name) {
      Some((_, existing)) => *existing = options,
      None => self.fields.push((name, options)),
    }
    self
  }

  pub fn ignore(&mut self, name: impl Into<String>) -> &mut Self {
    self.field(name, FieldOptions::new().ignore())
  }

  pub(crate) fn field_options(&self, name: &str) -> Option<&FieldOptions> {
    self
      .fields
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, options)| options)
  }
}

#[test]
fn test_field_replaces() {
  let mut options = StructOptions::new::<Option<i32>, Box<String>>();
  assert!(options.dst().is::<i32>());
  assert!(options.src().is::<String>());

  options
    .field("a", FieldOptions::new().from_path("x"))
    .field("a", FieldOptions::new().ignore());
  assert_eq!(options.fields.len(), 1);
  let a = options.field_options("a").unwrap();
  assert!(a.ignore);
  assert!(a.path.is_none());
}
