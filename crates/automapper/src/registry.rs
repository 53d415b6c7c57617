//! Dispatch by runtime type pair.

use crate::error::{Error, Result};
use crate::mapper::{Context, Mapper, Provider, StaticProvider};
use crate::reflect::{Reflect, TypeInfo};
use log::{debug, warn};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What the builder does when two providers register the same pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
  /// Fail with [`Error::DuplicateMapper`].
  Reject,
  /// Keep the mapper registered last.
  Replace,
}

impl Default for DuplicatePolicy {
  fn default() -> Self {
    DuplicatePolicy::Reject
  }
}

#[derive(Default)]
pub struct RegistryBuilder {
  mappers: StaticProvider,
  providers: Vec<Box<dyn Provider>>,
  duplicates: DuplicatePolicy,
}

impl RegistryBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn provider<P: Provider + 'static>(mut self, provider: P) -> Self {
    self.providers.push(Box::new(provider));
    self
  }

  /// Registers a single mapper ahead of every provider.
  pub fn mapper<M: Mapper + 'static>(mut self, mapper: M) -> Self {
    self.mappers.add(mapper);
    self
  }

  pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
    self.duplicates = policy;
    self
  }

  pub fn build(self) -> Result<Registry> {
    let mut mappers = HashMap::new();
    register(&mut mappers, &self.mappers, self.duplicates)?;
    for provider in &self.providers {
      register(&mut mappers, &**provider, self.duplicates)?;
    }
    debug!("registry built with {} mapper(s)", mappers.len());
    Ok(Registry { mappers })
  }
}

fn register(
  mappers: &mut HashMap<(TypeId, TypeId), Arc<dyn Mapper>>,
  provider: &dyn Provider,
  duplicates: DuplicatePolicy,
) -> Result<()> {
  for mapper in provider.mappers()? {
    let key = (mapper.src().id(), mapper.dst().id());
    if let Some(existing) = mappers.get(&key) {
      match duplicates {
        DuplicatePolicy::Reject => {
          return Err(Error::DuplicateMapper {
            src: existing.src().display_name(),
            dst: existing.dst().display_name(),
          });
        }
        DuplicatePolicy::Replace => {
          warn!("replacing mapper from {} to {}", existing.src(), existing.dst());
        }
      }
    }
    mappers.insert(key, mapper);
  }
  Ok(())
}

/// An immutable set of mappers keyed by `(source type, destination type)`.
///
/// The registry is also a [`Context`], so a mapper it runs can hand nested
/// values back to it.
pub struct Registry {
  mappers: HashMap<(TypeId, TypeId), Arc<dyn Mapper>>,
}

impl Registry {
  pub fn builder() -> RegistryBuilder {
    RegistryBuilder::new()
  }

  pub fn len(&self) -> usize {
    self.mappers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.mappers.is_empty()
  }

  pub fn contains<D: Any, S: Any>(&self) -> bool {
    self.mappers.contains_key(&(TypeId::of::<S>(), TypeId::of::<D>()))
  }

  fn lookup(&self, src: TypeId, dst: TypeId) -> Option<&Arc<dyn Mapper>> {
    self.mappers.get(&(src, dst))
  }

  /// Maps `src` into `dst` with the mapper registered for the pair.
  ///
  /// When nothing is registered for `S` itself and `S` is a pointer type,
  /// the mapper for its pointee is used instead. A null pointer then leaves
  /// `dst` untouched.
  pub fn map<D: Reflect, S: Reflect>(&self, dst: &mut D, src: &S) -> Result<()> {
    let dst_id = TypeId::of::<D>();
    if let Some(mapper) = self.lookup(TypeId::of::<S>(), dst_id) {
      return mapper.map(self, dst, src);
    }

    let src_ty = S::type_info();
    if src_ty.is_pointer() {
      let elem = src_ty.unwrap_pointers();
      if let Some(mapper) = self.lookup(elem.id(), dst_id) {
        return match src_ty.deref_value(src) {
          Some((value, _)) => mapper.map(self, dst, value),
          None => Ok(()),
        };
      }
    }

    Err(Error::NoMapperFound {
      src: src_ty.display_name(),
      dst: D::type_info().display_name(),
    })
  }
}

impl Context for Registry {
  fn map_dyn(&self, dst: &mut dyn Any, src: &dyn Any) -> Result<()> {
    match self.lookup((*src).type_id(), (*dst).type_id()) {
      Some(mapper) => mapper.map(self, dst, src),
      None => Err(Error::NoMapperFound {
        src: format!("{:?}", (*src).type_id()).into(),
        dst: format!("{:?}", (*dst).type_id()).into(),
      }),
    }
  }

  fn has_mapper(&self, dst: TypeId, src: TypeId) -> bool {
    self.lookup(src, dst).is_some()
  }
}

impl fmt::Debug for Registry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let pairs: Vec<_> = self.mappers.values().map(|m| Pair(m.src(), m.dst())).collect();
    f.debug_struct("Registry").field("mappers", &pairs).finish()
  }
}

struct Pair<'a>(&'a TypeInfo, &'a TypeInfo);

impl fmt::Debug for Pair<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} -> {}", self.0, self.1)
  }
}

#[cfg(test)]
fn len_mapper(_: &dyn Context, dst: &mut i64, src: &String) -> Result<()> {
  *dst = src.len() as i64;
  Ok(())
}

#[test]
fn test_map_exact() {
  let registry = Registry::builder().mapper(crate::FnMapper::new(len_mapper)).build().unwrap();
  assert_eq!(registry.len(), 1);
  assert!(registry.contains::<i64, String>());
  assert!(!registry.contains::<String, i64>());

  let mut n = 0i64;
  registry.map(&mut n, &"hello".to_string()).unwrap();
  assert_eq!(n, 5);
}

#[test]
fn test_map_through_pointer_source() {
  let registry = Registry::builder().mapper(crate::FnMapper::new(len_mapper)).build().unwrap();

  let mut n = 0i64;
  registry.map(&mut n, &Some(Box::new("abc".to_string()))).unwrap();
  assert_eq!(n, 3);

  let mut n = 9i64;
  let none: Option<String> = None;
  registry.map(&mut n, &none).unwrap();
  assert_eq!(n, 9);
}

#[test]
fn test_no_mapper_found() {
  let registry = Registry::builder().build().unwrap();
  assert!(registry.is_empty());
  let mut s = String::new();
  let err = registry.map(&mut s, &1i32).unwrap_err();
  assert!(err.is_no_mapper_found());
  assert_eq!(err.to_string(), "no mapper found from i32 to String");
}

#[test]
fn test_context_names_missing_pair() {
  let registry = Registry::builder().mapper(crate::FnMapper::new(len_mapper)).build().unwrap();
  let ctx: &dyn Context = &registry;

  let mut n = 0i64;
  ctx.map(&mut n, &"four".to_string()).unwrap();
  assert_eq!(n, 4);

  let mut s = String::new();
  let err = ctx.map(&mut s, &1i32).unwrap_err();
  assert!(err.is_no_mapper_found());
  assert!(err.to_string().starts_with("no mapper found from i32 to "));
  assert!(err.to_string().contains("String"));
}

#[test]
fn test_duplicates() {
  let mut first = StaticProvider::new();
  first.add_fn(len_mapper);
  let mut second = StaticProvider::new();
  second.add_fn(|_, dst: &mut i64, _: &String| {
    *dst = -1;
    Ok(())
  });

  let err = Registry::builder()
    .provider(first)
    .provider(second)
    .build()
    .unwrap_err();
  assert_eq!(err.to_string(), "mapper already exists from String to i64");

  let mut first = StaticProvider::new();
  first.add_fn(len_mapper);
  let mut second = StaticProvider::new();
  second.add_fn(|_, dst: &mut i64, _: &String| {
    *dst = -1;
    Ok(())
  });
  let registry = Registry::builder()
    .provider(first)
    .provider(second)
    .duplicates(DuplicatePolicy::Replace)
    .build()
    .unwrap();
  let mut n = 0i64;
  registry.map(&mut n, &"x".to_string()).unwrap();
  assert_eq!(n, -1);
}
