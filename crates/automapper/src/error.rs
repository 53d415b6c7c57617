use std::borrow::Cow;
use std::num::ParseIntError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("field `{field}` does not exist on `{ty}`")]
  UnknownField {
    ty: Cow<'static, str>,
    field: String,
  },
  #[error("field `{field}` has type `{actual}` but the override expects `{expected}`")]
  FieldTypeMismatch {
    field: String,
    expected: Cow<'static, str>,
    actual: Cow<'static, str>,
  },
  #[error("override for field `{field}` reads from `{expected}` but the source type is `{actual}`")]
  SourceTypeMismatch {
    field: String,
    expected: Cow<'static, str>,
    actual: Cow<'static, str>,
  },
  #[error("path `{path}` cannot be resolved on `{ty}`")]
  UnresolvedPath {
    ty: Cow<'static, str>,
    path: String,
  },
  #[error("cannot convert from {src} to {dst}")]
  UnsupportedConversion {
    src: Cow<'static, str>,
    dst: Cow<'static, str>,
  },
  #[error(transparent)]
  ParseInt(#[from] ParseIntError),
  #[error("value {value} is out of range for {ty}")]
  OutOfRange {
    value: String,
    ty: Cow<'static, str>,
  },
  #[error("`{value}` is not a variant of {ty}")]
  InvalidVariant {
    value: String,
    ty: Cow<'static, str>,
  },
  #[error("mapping field {dst:?} from {src:?}: {source}")]
  Field {
    dst: String,
    src: String,
    #[source]
    source: Box<Error>,
  },
  #[error("no mapper found from {src} to {dst}")]
  NoMapperFound {
    src: Cow<'static, str>,
    dst: Cow<'static, str>,
  },
  #[error("mapper already exists from {src} to {dst}")]
  DuplicateMapper {
    src: Cow<'static, str>,
    dst: Cow<'static, str>,
  },
  #[error("expected an instance of {expected}")]
  TypeMismatch {
    expected: Cow<'static, str>,
  },
  #[error(transparent)]
  Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wraps an arbitrary error raised by a user supplied mapping function.
  pub fn custom<E>(err: E) -> Self
  where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
  {
    Error::Custom(err.into())
  }

  pub(crate) fn field(dst: String, src: String, source: Error) -> Self {
    Error::Field {
      dst,
      src,
      source: Box::new(source),
    }
  }

  /// `true` when no mapper is registered for the requested pair, as opposed
  /// to a mapper that exists but failed.
  pub fn is_no_mapper_found(&self) -> bool {
    matches!(self, Error::NoMapperFound { .. })
  }

  /// Follows `Field` annotations down to the error that caused them.
  pub fn root_cause(&self) -> &Error {
    match self {
      Error::Field { source, .. } => source.root_cause(),
      other => other,
    }
  }
}

#[test]
fn test_field_display() {
  let err = Error::field(
    "OrderDto.total".to_string(),
    "Order.total".to_string(),
    Error::UnsupportedConversion {
      src: "String".into(),
      dst: "Vec<i32>".into(),
    },
  );
  assert_eq!(
    err.to_string(),
    r#"mapping field "OrderDto.total" from "Order.total": cannot convert from String to Vec<i32>"#
  );
  assert!(matches!(err.root_cause(), Error::UnsupportedConversion { .. }));
}

#[test]
fn test_no_mapper_found() {
  let err = Error::NoMapperFound {
    src: "i32".into(),
    dst: "String".into(),
  };
  assert!(err.is_no_mapper_found());
  assert!(!Error::custom("boom").is_no_mapper_found());
}
