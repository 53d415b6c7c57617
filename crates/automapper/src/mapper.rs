use crate::error::{Error, Result};
use crate::reflect::{Reflect, TypeInfo};
use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

/// Lets a running mapper delegate nested values to other mappers.
pub trait Context {
  fn map_dyn(&self, dst: &mut dyn Any, src: &dyn Any) -> Result<()>;
  fn has_mapper(&self, dst: TypeId, src: TypeId) -> bool;
}

impl<'a> dyn Context + 'a {
  /// Maps with the mapper for `D` and `S`. A missing mapper is reported with
  /// the Rust names of both types.
  pub fn map<D: Any, S: Any>(&self, dst: &mut D, src: &S) -> Result<()> {
    if !self.has_mapper(TypeId::of::<D>(), TypeId::of::<S>()) {
      return Err(Error::NoMapperFound {
        src: type_name::<S>().into(),
        dst: type_name::<D>().into(),
      });
    }
    self.map_dyn(dst, src)
  }
}

/// A context with no mappers, for running a mapper on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContext;

impl Context for NoContext {
  fn map_dyn(&self, dst: &mut dyn Any, src: &dyn Any) -> Result<()> {
    Err(Error::NoMapperFound {
      src: format!("{:?}", (*src).type_id()).into(),
      dst: format!("{:?}", (*dst).type_id()).into(),
    })
  }

  fn has_mapper(&self, _: TypeId, _: TypeId) -> bool {
    false
  }
}

/// Maps an instance of [`Mapper::src`] into an instance of [`Mapper::dst`].
pub trait Mapper: Send + Sync {
  fn dst(&self) -> &TypeInfo;
  fn src(&self) -> &TypeInfo;
  fn map(&self, ctx: &dyn Context, dst: &mut dyn Any, src: &dyn Any) -> Result<()>;
}

pub(crate) type MapFn = dyn Fn(&dyn Context, &mut dyn Any, &dyn Any) -> Result<()> + Send + Sync;

/// A [`Mapper`] backed by a typed closure.
///
/// ```
/// use automapper::{FnMapper, Mapper, NoContext};
///
/// let mapper = FnMapper::new(|_, dst: &mut i64, src: &String| {
///   *dst = src.len() as i64;
///   Ok(())
/// });
///
/// let mut len = 0i64;
/// mapper.map(&NoContext, &mut len, &"four".to_string()).unwrap();
/// assert_eq!(len, 4);
/// ```
pub struct FnMapper {
  dst: TypeInfo,
  src: TypeInfo,
  func: Arc<MapFn>,
}

impl FnMapper {
  pub fn new<D, S, F>(func: F) -> Self
  where
    D: Reflect,
    S: Reflect,
    F: Fn(&dyn Context, &mut D, &S) -> Result<()> + Send + Sync + 'static,
  {
    let dst = D::type_info();
    let src = S::type_info();
    let (dst_name, src_name) = (dst.display_name(), src.display_name());
    let func = move |ctx: &dyn Context, dst: &mut dyn Any, src: &dyn Any| -> Result<()> {
      let dst = dst.downcast_mut::<D>().ok_or_else(|| Error::TypeMismatch {
        expected: dst_name.clone(),
      })?;
      let src = src.downcast_ref::<S>().ok_or_else(|| Error::TypeMismatch {
        expected: src_name.clone(),
      })?;
      func(ctx, dst, src)
    };
    Self {
      dst,
      src,
      func: Arc::new(func),
    }
  }
}

impl Mapper for FnMapper {
  fn dst(&self) -> &TypeInfo {
    &self.dst
  }

  fn src(&self) -> &TypeInfo {
    &self.src
  }

  fn map(&self, ctx: &dyn Context, dst: &mut dyn Any, src: &dyn Any) -> Result<()> {
    (self.func)(ctx, dst, src)
  }
}

pub trait Provider {
  fn mappers(&self) -> Result<Vec<Arc<dyn Mapper>>>;
}

/// Holds mappers that were built by hand.
#[derive(Default)]
pub struct StaticProvider {
  mappers: Vec<Arc<dyn Mapper>>,
}

impl StaticProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add<M: Mapper + 'static>(&mut self, mapper: M) -> &mut Self {
    self.mappers.push(Arc::new(mapper));
    self
  }

  pub fn add_fn<D, S, F>(&mut self, func: F) -> &mut Self
  where
    D: Reflect,
    S: Reflect,
    F: Fn(&dyn Context, &mut D, &S) -> Result<()> + Send + Sync + 'static,
  {
    self.add(FnMapper::new(func))
  }

  pub fn len(&self) -> usize {
    self.mappers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.mappers.is_empty()
  }
}

impl Provider for StaticProvider {
  fn mappers(&self) -> Result<Vec<Arc<dyn Mapper>>> {
    Ok(self.mappers.clone())
  }
}

#[test]
fn test_fn_mapper() {
  let mapper = FnMapper::new(|_, dst: &mut i32, src: &String| {
    *dst = src.parse().map_err(Error::custom)?;
    Ok(())
  });
  assert!(mapper.dst().is::<i32>());
  assert!(mapper.src().is::<String>());

  let mut i = 0;
  mapper.map(&NoContext, &mut i, &"42".to_string()).unwrap();
  assert_eq!(i, 42);

  let err = mapper.map(&NoContext, &mut i, &"x".to_string()).unwrap_err();
  assert_eq!(err.to_string(), "invalid digit found in string");
}

#[test]
fn test_fn_mapper_type_mismatch() {
  let mapper = FnMapper::new(|_, dst: &mut i32, src: &i32| {
    *dst = *src;
    Ok(())
  });
  let mut s = String::new();
  let err = mapper.map(&NoContext, &mut s, &1i32).unwrap_err();
  assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn test_static_provider() {
  let mut provider = StaticProvider::new();
  provider
    .add_fn(|_, dst: &mut i64, src: &i32| {
      *dst = i64::from(*src);
      Ok(())
    })
    .add_fn(|_, dst: &mut String, src: &i32| {
      *dst = src.to_string();
      Ok(())
    });
  assert_eq!(provider.len(), 2);
  let mappers = provider.mappers().unwrap();
  assert!(mappers[1].dst().is::<String>());
}

#[test]
fn test_no_context_names_types() {
  let ctx: &dyn Context = &NoContext;
  let mut n = 0i64;
  let err = ctx.map(&mut n, &"x".to_string()).unwrap_err();
  assert!(err.is_no_mapper_found());
  let msg = err.to_string();
  assert!(msg.starts_with("no mapper found from "), "{}", msg);
  assert!(msg.contains("String") && msg.ends_with(" to i64"), "{}", msg);
}
