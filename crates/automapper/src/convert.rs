//! Conversions between field types.
//!
//! A [`ConverterFactory`] decides, once per field while a mapper is built,
//! whether a destination type can be assigned from a source type directly
//! (`Ok(None)`), through a [`Converter`] (`Ok(Some(_))`), or not at all
//! ([`Error::UnsupportedConversion`]). Converters are then handed the settled
//! destination leaf and the dereferenced source value on every map call.

use crate::error::{Error, Result};
use crate::reflect::{IntInfo, Kind, Scalar, TypeInfo};
use log::trace;
use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

pub trait Converter: Send + Sync {
  fn convert(&self, dst: &mut dyn Any, src: &dyn Any) -> Result<()>;
}

impl<F> Converter for F
where
  F: Fn(&mut dyn Any, &dyn Any) -> Result<()> + Send + Sync,
{
  fn convert(&self, dst: &mut dyn Any, src: &dyn Any) -> Result<()> {
    self(dst, src)
  }
}

pub trait ConverterFactory: Send + Sync {
  fn converter_for(&self, dst: &TypeInfo, src: &TypeInfo) -> Result<Option<Arc<dyn Converter>>>;
}

impl<F> ConverterFactory for F
where
  F: Fn(&TypeInfo, &TypeInfo) -> Result<Option<Arc<dyn Converter>>> + Send + Sync,
{
  fn converter_for(&self, dst: &TypeInfo, src: &TypeInfo) -> Result<Option<Arc<dyn Converter>>> {
    self(dst, src)
  }
}

pub trait ConverterFactoryExt: ConverterFactory + Sized {
  /// Consults `fallback` whenever this factory reports an unsupported
  /// conversion.
  fn or_else<B: ConverterFactory>(self, fallback: B) -> OrElse<Self, B> {
    OrElse {
      first: self,
      fallback,
    }
  }
}

impl<T: ConverterFactory> ConverterFactoryExt for T {}

pub struct OrElse<A, B> {
  first: A,
  fallback: B,
}

impl<A: ConverterFactory, B: ConverterFactory> ConverterFactory for OrElse<A, B> {
  fn converter_for(&self, dst: &TypeInfo, src: &TypeInfo) -> Result<Option<Arc<dyn Converter>>> {
    match self.first.converter_for(dst, src) {
      Err(Error::UnsupportedConversion { .. }) => self.fallback.converter_for(dst, src),
      other => other,
    }
  }
}

/// The error a factory returns for a pair of types it cannot bridge.
pub fn unsupported(dst: &TypeInfo, src: &TypeInfo) -> Error {
  Error::UnsupportedConversion {
    src: src.display_name(),
    dst: dst.display_name(),
  }
}

/// Identical types are assigned directly; integers accept other integer
/// widths and base-10 strings. Everything else is unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConverterFactory;

impl ConverterFactory for DefaultConverterFactory {
  fn converter_for(&self, dst: &TypeInfo, src: &TypeInfo) -> Result<Option<Arc<dyn Converter>>> {
    let dst = dst.unwrap_pointers();
    let src = src.unwrap_pointers();
    if dst == src {
      return Ok(None);
    }

    match *dst.kind() {
      Kind::Int(to) => int_converter(to, &dst, &src),
      _ => Err(unsupported(&dst, &src)),
    }
  }
}

fn int_converter(to: IntInfo, dst: &TypeInfo, src: &TypeInfo) -> Result<Option<Arc<dyn Converter>>> {
  let converter: Arc<dyn Converter> = match *src.kind() {
    Kind::Int(from) => Arc::new(IntToInt {
      from,
      to,
      src: src.display_name(),
      dst: dst.display_name(),
    }),
    Kind::String(from) => Arc::new(StringToInt {
      from,
      to,
      src: src.display_name(),
      dst: dst.display_name(),
    }),
    _ => return Err(unsupported(dst, src)),
  };
  trace!("converting {} to {} through an integer converter", src, dst);
  Ok(Some(converter))
}

struct IntToInt {
  from: IntInfo,
  to: IntInfo,
  src: Cow<'static, str>,
  dst: Cow<'static, str>,
}

impl Converter for IntToInt {
  fn convert(&self, dst: &mut dyn Any, src: &dyn Any) -> Result<()> {
    let value = self.from.access.get(src).ok_or_else(|| Error::TypeMismatch {
      expected: self.src.clone(),
    })?;
    set_int(&self.to, &self.dst, dst, value)
  }
}

struct StringToInt {
  from: Scalar<String>,
  to: IntInfo,
  src: Cow<'static, str>,
  dst: Cow<'static, str>,
}

impl Converter for StringToInt {
  fn convert(&self, dst: &mut dyn Any, src: &dyn Any) -> Result<()> {
    let text = self.from.get(src).ok_or_else(|| Error::TypeMismatch {
      expected: self.src.clone(),
    })?;
    // the empty string leaves the zero value in place
    if text.is_empty() {
      return Ok(());
    }
    let value: i128 = text.parse()?;
    set_int(&self.to, &self.dst, dst, value)
  }
}

fn set_int(to: &IntInfo, ty: &Cow<'static, str>, dst: &mut dyn Any, value: i128) -> Result<()> {
  if to.access.set(dst, value) {
    Ok(())
  } else {
    Err(Error::OutOfRange {
      value: value.to_string(),
      ty: ty.clone(),
    })
  }
}

#[cfg(test)]
fn convert_with<D, S>(factory: &dyn ConverterFactory, src: S) -> Result<D>
where
  D: crate::Reflect + Default,
  S: crate::Reflect,
{
  let dst_ty = TypeInfo::of::<D>();
  let src_ty = TypeInfo::of::<S>();
  let converter = factory.converter_for(&dst_ty, &src_ty)?;
  let mut dst = D::default();
  {
    let (slot, leaf) = dst_ty.settle(&mut dst);
    let (value, _) = src_ty.deref_value(&src).expect("source value");
    match converter {
      Some(converter) => converter.convert(slot, value)?,
      None => assert!(leaf.assign(slot, value)),
    }
  }
  Ok(dst)
}

#[test]
fn test_string_to_int() {
  assert_eq!(convert_with::<i32, _>(&DefaultConverterFactory, "10".to_string()).unwrap(), 10);
  assert_eq!(convert_with::<i64, _>(&DefaultConverterFactory, "-42".to_string()).unwrap(), -42);
}

#[test]
fn test_string_to_int_pointer() {
  let got = convert_with::<Option<i32>, _>(&DefaultConverterFactory, "10".to_string()).unwrap();
  assert_eq!(got, Some(10));
  let got = convert_with::<Option<Option<i32>>, _>(&DefaultConverterFactory, "10".to_string()).unwrap();
  assert_eq!(got, Some(Some(10)));
}

#[test]
fn test_string_to_int_invalid() {
  let err = convert_with::<i32, _>(&DefaultConverterFactory, "forty-two".to_string()).unwrap_err();
  assert!(matches!(err, Error::ParseInt(_)));
}

#[test]
fn test_empty_string_keeps_zero() {
  assert_eq!(convert_with::<u16, _>(&DefaultConverterFactory, String::new()).unwrap(), 0);
}

#[test]
fn test_int_widths() {
  assert_eq!(convert_with::<i64, _>(&DefaultConverterFactory, 7u8).unwrap(), 7);
  let err = convert_with::<u8, _>(&DefaultConverterFactory, 300i32).unwrap_err();
  assert_eq!(err.to_string(), "value 300 is out of range for u8");
}

#[test]
fn test_identical_types_are_direct() {
  let converter = DefaultConverterFactory
    .converter_for(&TypeInfo::of::<Option<String>>(), &TypeInfo::of::<Box<String>>())
    .unwrap();
  assert!(converter.is_none());
}

#[test]
fn test_unsupported() {
  let err = DefaultConverterFactory
    .converter_for(&TypeInfo::of::<Vec<i32>>(), &TypeInfo::of::<String>())
    .err()
    .unwrap();
  assert_eq!(err.to_string(), "cannot convert from String to Vec<i32>");

  let err = DefaultConverterFactory
    .converter_for(&TypeInfo::of::<i32>(), &TypeInfo::of::<f64>())
    .err()
    .unwrap();
  assert_eq!(err.to_string(), "cannot convert from f64 to i32");
}

#[test]
fn test_or_else() {
  let float_to_string = |dst: &TypeInfo, src: &TypeInfo| -> Result<Option<Arc<dyn Converter>>> {
    match (dst.unwrap_pointers().kind(), src.unwrap_pointers().kind()) {
      (Kind::String(to), Kind::Float(from)) => {
        let (to, from) = (*to, *from);
        let converter = move |dst: &mut dyn Any, src: &dyn Any| -> Result<()> {
          let value = from.get(src).unwrap_or_default();
          to.set(dst, format!("{:.2}", value));
          Ok(())
        };
        Ok(Some(Arc::new(converter)))
      }
      _ => Err(unsupported(dst, src)),
    }
  };

  let factory = DefaultConverterFactory.or_else(float_to_string);
  assert_eq!(convert_with::<String, _>(&factory, 1.5f64).unwrap(), "1.50");
  assert_eq!(convert_with::<i32, _>(&factory, "3".to_string()).unwrap(), 3);
  assert!(convert_with::<bool, _>(&factory, 1.5f64).is_err());
}
