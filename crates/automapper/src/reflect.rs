//! Type descriptors.
//!
//! A [`TypeInfo`] is the structural view of a type that the mapping engine
//! resolves against: its fields, whether it is an indirection to another type,
//! and type-erased functions to read and write values of it. Descriptors for
//! user structs and unit enums are generated with `#[derive(Reflect)]`.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::convert::{TryFrom, TryInto};
use std::fmt;

/// A type that can describe its own shape.
///
/// Values are copied with [`Clone`] when a destination field is directly
/// assignable from its source.
pub trait Reflect: Any + Clone + Send + Sync {
  fn type_info() -> TypeInfo;
}

type AssignFn = fn(&mut dyn Any, &dyn Any) -> bool;
type PointeeFn = fn(&dyn Any) -> Option<Option<&dyn Any>>;

#[derive(Clone)]
pub struct TypeInfo {
  id: TypeId,
  name: Cow<'static, str>,
  kind: Kind,
  assign: AssignFn,
  pointee: PointeeFn,
}

impl TypeInfo {
  pub fn of<T: Reflect>() -> Self {
    T::type_info()
  }

  pub fn new<T: Reflect>(name: impl Into<Cow<'static, str>>, kind: Kind) -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: name.into(),
      kind,
      assign: assign::<T>,
      pointee: pointee::<T>,
    }
  }

  pub fn structure<T: Reflect>(name: &'static str, fields: Vec<FieldInfo>) -> Self {
    Self::new::<T>(name, Kind::Struct(fields))
  }

  pub fn enumeration<T: Reflect>(
    name: &'static str,
    variants: &'static [&'static str],
    get: fn(&dyn Any) -> Option<&'static str>,
    set: fn(&mut dyn Any, &str) -> bool,
  ) -> Self {
    Self::new::<T>(name, Kind::Enum(EnumInfo { variants, get, set }))
  }

  /// A leaf type that can only be copied as a whole.
  pub fn opaque<T: Reflect>(name: &'static str) -> Self {
    Self::new::<T>(name, Kind::Opaque)
  }

  pub fn id(&self) -> TypeId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub(crate) fn display_name(&self) -> Cow<'static, str> {
    self.name.clone()
  }

  pub fn kind(&self) -> &Kind {
    &self.kind
  }

  pub fn is<T: 'static>(&self) -> bool {
    self.id == TypeId::of::<T>()
  }

  pub fn is_pointer(&self) -> bool {
    matches!(self.kind, Kind::Pointer(_))
  }

  /// Follows every pointer layer down to the pointee type.
  pub fn unwrap_pointers(&self) -> TypeInfo {
    let mut ty = self.clone();
    while let Kind::Pointer(p) = ty.kind {
      ty = (p.elem)();
    }
    ty
  }

  /// Fields of a struct type in declaration order. Empty for anything else.
  pub fn fields(&self) -> &[FieldInfo] {
    match self.kind {
      Kind::Struct(ref fields) => fields,
      _ => &[],
    }
  }

  pub fn field(&self, name: &str) -> Option<&FieldInfo> {
    self.fields().iter().find(|f| f.name == name)
  }

  /// Dereferences `value` through every pointer layer of this type.
  ///
  /// Returns `None` as soon as a null pointer is met.
  pub fn deref_value<'a>(&self, value: &'a dyn Any) -> Option<(&'a dyn Any, TypeInfo)> {
    let mut value = value;
    let mut ty = self.clone();
    while let Kind::Pointer(p) = ty.kind {
      value = (p.deref)(value)?;
      ty = (p.elem)();
    }
    Some((value, ty))
  }

  /// Walks `slot` through every pointer layer of this type, allocating
  /// default pointees where they are missing, and returns the writable leaf.
  ///
  /// # Panics
  ///
  /// When `slot` is not an instance of this type.
  pub fn settle<'a>(&self, slot: &'a mut dyn Any) -> (&'a mut dyn Any, TypeInfo) {
    let mut slot = slot;
    let mut ty = self.clone();
    while let Kind::Pointer(p) = ty.kind {
      slot = match (p.deref_mut)(slot) {
        Some(inner) => inner,
        None => panic!("destination is not a settable {}", ty.name),
      };
      ty = (p.elem)();
    }
    (slot, ty)
  }

  /// Clones `src` into `dst` when both are instances of this type.
  pub fn assign(&self, dst: &mut dyn Any, src: &dyn Any) -> bool {
    (self.assign)(dst, src)
  }

  /// Looks through an `Option` or `Box` of this type.
  ///
  /// `None` when `value` is neither; `Some(None)` for an empty `Option`.
  pub fn pointee<'a>(&self, value: &'a dyn Any) -> Option<Option<&'a dyn Any>> {
    (self.pointee)(value)
  }
}

impl PartialEq for TypeInfo {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for TypeInfo {}

impl fmt::Debug for TypeInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeInfo")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .finish()
  }
}

impl fmt::Display for TypeInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

fn assign<T: Reflect>(dst: &mut dyn Any, src: &dyn Any) -> bool {
  match (dst.downcast_mut::<T>(), src.downcast_ref::<T>()) {
    (Some(dst), Some(src)) => {
      dst.clone_from(src);
      true
    }
    _ => false,
  }
}

fn pointee<T: Reflect>(value: &dyn Any) -> Option<Option<&dyn Any>> {
  if let Some(inner) = value.downcast_ref::<Option<T>>() {
    return Some(inner.as_ref().map(|inner| inner as &dyn Any));
  }
  value
    .downcast_ref::<Box<T>>()
    .map(|inner| Some(&**inner as &dyn Any))
}

#[derive(Clone)]
pub enum Kind {
  Bool(Scalar<bool>),
  Int(IntInfo),
  Float(Scalar<f64>),
  String(Scalar<String>),
  Struct(Vec<FieldInfo>),
  Enum(EnumInfo),
  Pointer(PointerInfo),
  /// Described only; sequences are never converted.
  Sequence(fn() -> TypeInfo),
  Opaque,
}

impl fmt::Debug for Kind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Kind::Bool(_) => f.write_str("Bool"),
      Kind::Int(info) => write!(f, "Int({}{})", if info.signed { "i" } else { "u" }, info.bits),
      Kind::Float(_) => f.write_str("Float"),
      Kind::String(_) => f.write_str("String"),
      Kind::Struct(fields) => f
        .debug_list()
        .entries(fields.iter().map(|field| field.name))
        .finish(),
      Kind::Enum(info) => write!(f, "Enum{:?}", info.variants),
      Kind::Pointer(p) => write!(f, "Pointer({})", (p.elem)().name),
      Kind::Sequence(elem) => write!(f, "Sequence({})", elem().name),
      Kind::Opaque => f.write_str("Opaque"),
    }
  }
}

/// Type-erased read and write access to a scalar value.
pub struct Scalar<V> {
  get: fn(&dyn Any) -> Option<V>,
  set: fn(&mut dyn Any, V) -> bool,
}

impl<V> Scalar<V> {
  pub fn new(get: fn(&dyn Any) -> Option<V>, set: fn(&mut dyn Any, V) -> bool) -> Self {
    Self { get, set }
  }

  pub fn get(&self, value: &dyn Any) -> Option<V> {
    (self.get)(value)
  }

  pub fn set(&self, slot: &mut dyn Any, value: V) -> bool {
    (self.set)(slot, value)
  }
}

impl<V> Clone for Scalar<V> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<V> Copy for Scalar<V> {}

#[derive(Clone, Copy)]
pub struct IntInfo {
  pub signed: bool,
  pub bits: u32,
  pub access: Scalar<i128>,
}

#[derive(Clone, Copy)]
pub struct EnumInfo {
  variants: &'static [&'static str],
  get: fn(&dyn Any) -> Option<&'static str>,
  set: fn(&mut dyn Any, &str) -> bool,
}

impl EnumInfo {
  pub fn variants(&self) -> &'static [&'static str] {
    self.variants
  }

  pub fn get(&self, value: &dyn Any) -> Option<&'static str> {
    (self.get)(value)
  }

  /// Sets `slot` to the variant named `variant`; `false` if there is none.
  pub fn set(&self, slot: &mut dyn Any, variant: &str) -> bool {
    (self.set)(slot, variant)
  }
}

/// A single level of indirection: `Option<T>` or `Box<T>`.
#[derive(Clone, Copy)]
pub struct PointerInfo {
  pub elem: fn() -> TypeInfo,
  deref: fn(&dyn Any) -> Option<&dyn Any>,
  deref_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
}

#[derive(Clone)]
pub struct FieldInfo {
  name: &'static str,
  index: usize,
  type_id: TypeId,
  ty: fn() -> TypeInfo,
  get: fn(&dyn Any) -> Option<&dyn Any>,
  get_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
}

impl FieldInfo {
  pub fn new<F: Reflect>(
    name: &'static str,
    index: usize,
    get: fn(&dyn Any) -> Option<&dyn Any>,
    get_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
  ) -> Self {
    Self {
      name,
      index,
      type_id: TypeId::of::<F>(),
      ty: F::type_info,
      get,
      get_mut,
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Position of the field in its struct declaration.
  pub fn index(&self) -> usize {
    self.index
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn ty(&self) -> TypeInfo {
    (self.ty)()
  }

  pub fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
    (self.get)(owner)
  }

  pub fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
    (self.get_mut)(owner)
  }
}

impl fmt::Debug for FieldInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FieldInfo")
      .field("name", &self.name)
      .field("index", &self.index)
      .finish()
  }
}

/// Implements [`Reflect`] for leaf types that are copied as a whole.
///
/// ```
/// #[derive(Clone)]
/// struct Timestamp(u64);
///
/// automapper::reflect_opaque!(Timestamp);
/// ```
#[macro_export]
macro_rules! reflect_opaque {
  ($($ty:ty),+ $(,)?) => {
    $(
      impl $crate::Reflect for $ty {
        fn type_info() -> $crate::TypeInfo {
          $crate::TypeInfo::opaque::<$ty>(stringify!($ty))
        }
      }
    )+
  };
}

reflect_opaque!(char, ());

fn int_get<T>(value: &dyn Any) -> Option<i128>
where
  T: Any + Copy + TryInto<i128>,
{
  value.downcast_ref::<T>().and_then(|n| (*n).try_into().ok())
}

fn int_set<T>(slot: &mut dyn Any, value: i128) -> bool
where
  T: Any + TryFrom<i128>,
{
  match (slot.downcast_mut::<T>(), T::try_from(value)) {
    (Some(slot), Ok(value)) => {
      *slot = value;
      true
    }
    _ => false,
  }
}

macro_rules! reflect_int {
  ($($ty:ty),+) => {
    $(
      impl Reflect for $ty {
        fn type_info() -> TypeInfo {
          TypeInfo::new::<$ty>(stringify!($ty), Kind::Int(IntInfo {
            signed: <$ty>::MIN != 0,
            bits: <$ty>::BITS,
            access: Scalar::new(int_get::<$ty>, int_set::<$ty>),
          }))
        }
      }
    )+
  };
}

reflect_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Reflect for f64 {
  fn type_info() -> TypeInfo {
    TypeInfo::new::<f64>("f64", Kind::Float(Scalar::new(
      |v: &dyn Any| v.downcast_ref::<f64>().copied(),
      |slot: &mut dyn Any, value: f64| match slot.downcast_mut::<f64>() {
        Some(slot) => {
          *slot = value;
          true
        }
        None => false,
      },
    )))
  }
}

impl Reflect for f32 {
  fn type_info() -> TypeInfo {
    TypeInfo::new::<f32>("f32", Kind::Float(Scalar::new(
      |v: &dyn Any| v.downcast_ref::<f32>().map(|n| f64::from(*n)),
      |slot: &mut dyn Any, value: f64| match slot.downcast_mut::<f32>() {
        Some(slot) => {
          *slot = value as f32;
          true
        }
        None => false,
      },
    )))
  }
}

impl Reflect for bool {
  fn type_info() -> TypeInfo {
    TypeInfo::new::<bool>("bool", Kind::Bool(Scalar::new(
      |v: &dyn Any| v.downcast_ref::<bool>().copied(),
      |slot: &mut dyn Any, value: bool| match slot.downcast_mut::<bool>() {
        Some(slot) => {
          *slot = value;
          true
        }
        None => false,
      },
    )))
  }
}

impl Reflect for String {
  fn type_info() -> TypeInfo {
    TypeInfo::new::<String>("String", Kind::String(Scalar::new(
      |v: &dyn Any| v.downcast_ref::<String>().cloned(),
      |slot: &mut dyn Any, value: String| match slot.downcast_mut::<String>() {
        Some(slot) => {
          *slot = value;
          true
        }
        None => false,
      },
    )))
  }
}

fn option_deref<T: Reflect>(value: &dyn Any) -> Option<&dyn Any> {
  value
    .downcast_ref::<Option<T>>()
    .and_then(Option::as_ref)
    .map(|inner| inner as &dyn Any)
}

fn option_deref_mut<T: Reflect + Default>(slot: &mut dyn Any) -> Option<&mut dyn Any> {
  slot
    .downcast_mut::<Option<T>>()
    .map(|inner| inner.get_or_insert_with(T::default) as &mut dyn Any)
}

impl<T: Reflect + Default> Reflect for Option<T> {
  fn type_info() -> TypeInfo {
    let name = format!("Option<{}>", T::type_info().name);
    TypeInfo::new::<Self>(name, Kind::Pointer(PointerInfo {
      elem: T::type_info,
      deref: option_deref::<T>,
      deref_mut: option_deref_mut::<T>,
    }))
  }
}

fn box_deref<T: Reflect>(value: &dyn Any) -> Option<&dyn Any> {
  value.downcast_ref::<Box<T>>().map(|inner| &**inner as &dyn Any)
}

fn box_deref_mut<T: Reflect>(slot: &mut dyn Any) -> Option<&mut dyn Any> {
  slot.downcast_mut::<Box<T>>().map(|inner| &mut **inner as &mut dyn Any)
}

impl<T: Reflect> Reflect for Box<T> {
  fn type_info() -> TypeInfo {
    let name = format!("Box<{}>", T::type_info().name);
    TypeInfo::new::<Self>(name, Kind::Pointer(PointerInfo {
      elem: T::type_info,
      deref: box_deref::<T>,
      deref_mut: box_deref_mut::<T>,
    }))
  }
}

impl<T: Reflect> Reflect for Vec<T> {
  fn type_info() -> TypeInfo {
    let name = format!("Vec<{}>", T::type_info().name);
    TypeInfo::new::<Self>(name, Kind::Sequence(T::type_info))
  }
}

#[test]
fn test_unwrap_pointers() {
  let ty = TypeInfo::of::<Option<Box<i32>>>();
  assert_eq!(ty.name(), "Option<Box<i32>>");
  assert!(ty.is_pointer());
  assert!(ty.unwrap_pointers().is::<i32>());
  assert!(TypeInfo::of::<String>().unwrap_pointers().is::<String>());
}

#[test]
fn test_deref_value_null() {
  let ty = TypeInfo::of::<Option<Box<i32>>>();
  let none: Option<Box<i32>> = None;
  assert!(ty.deref_value(&none).is_none());

  let some = Some(Box::new(7));
  let (value, leaf) = ty.deref_value(&some).unwrap();
  assert!(leaf.is::<i32>());
  assert_eq!(value.downcast_ref::<i32>(), Some(&7));
}

#[test]
fn test_settle_allocates() {
  let ty = TypeInfo::of::<Option<Option<i64>>>();
  let mut slot: Option<Option<i64>> = None;
  {
    let (leaf, leaf_ty) = ty.settle(&mut slot);
    assert!(leaf_ty.is::<i64>());
    *leaf.downcast_mut::<i64>().unwrap() = 42;
  }
  assert_eq!(slot, Some(Some(42)));
}

#[test]
#[should_panic(expected = "not a settable")]
fn test_settle_wrong_type() {
  let ty = TypeInfo::of::<Option<i64>>();
  let mut slot = 0u8;
  ty.settle(&mut slot);
}

#[test]
fn test_int_range() {
  let ty = TypeInfo::of::<u8>();
  let info = match ty.kind() {
    Kind::Int(info) => *info,
    other => panic!("unexpected kind {:?}", other),
  };
  assert!(!info.signed);
  assert_eq!(info.bits, 8);

  let mut slot = 0u8;
  assert!(info.access.set(&mut slot, 255));
  assert!(!info.access.set(&mut slot, 256));
  assert!(!info.access.set(&mut slot, -1));
  assert_eq!(slot, 255);
  assert_eq!(info.access.get(&slot), Some(255));
}

#[test]
fn test_assign_clones() {
  let ty = TypeInfo::of::<String>();
  let mut dst = String::new();
  assert!(ty.assign(&mut dst, &"copied".to_string()));
  assert_eq!(dst, "copied");
  assert!(!ty.assign(&mut dst, &1i32));
}

#[test]
fn test_pointee() {
  let ty = TypeInfo::of::<i32>();
  let boxed = Box::new(7i32);
  let inner = ty.pointee(&boxed).unwrap().unwrap();
  assert_eq!(inner.downcast_ref::<i32>(), Some(&7));
  assert!(ty.pointee(&Some(7i32)).unwrap().is_some());
  assert!(ty.pointee(&None::<i32>).unwrap().is_none());
  assert!(ty.pointee(&7i32).is_none());
  assert!(ty.pointee(&Some(7i64)).is_none());
}
