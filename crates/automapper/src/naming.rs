//! Naming conventions propose which source fields a destination field name
//! may be read from.

/// A candidate split of a name: look up `matched` on the current type, then
/// keep resolving `remaining` on the matched field's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Possibility {
  pub matched: String,
  pub remaining: String,
}

impl Possibility {
  pub fn new(matched: impl Into<String>, remaining: impl Into<String>) -> Self {
    Self {
      matched: matched.into(),
      remaining: remaining.into(),
    }
  }
}

pub trait NamingConvention: Send + Sync {
  /// Candidates for `name`, most preferred first.
  fn possibilities(&self, name: &str) -> Vec<Possibility>;
}

impl<F> NamingConvention for F
where
  F: Fn(&str) -> Vec<Possibility> + Send + Sync,
{
  fn possibilities(&self, name: &str) -> Vec<Possibility> {
    self(name)
  }
}

/// Only the identical name matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct Exact;

impl NamingConvention for Exact {
  fn possibilities(&self, name: &str) -> Vec<Possibility> {
    vec![Possibility::new(name, "")]
  }
}

/// Splits `CustomerName` into `Customer` + `Name`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PascalCase;

impl NamingConvention for PascalCase {
  fn possibilities(&self, name: &str) -> Vec<Possibility> {
    compound(&split_before(name, char::is_uppercase), "")
  }
}

/// Splits `customer_name` into `customer` + `name`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnakeCase;

impl NamingConvention for SnakeCase {
  fn possibilities(&self, name: &str) -> Vec<Possibility> {
    if name.is_empty() {
      return Vec::new();
    }
    let parts: Vec<_> = name.split('_').collect();
    compound(&parts, "_")
  }
}

// every prefix/suffix split of `parts`, longest prefix first
fn compound(parts: &[&str], sep: &str) -> Vec<Possibility> {
  (0..parts.len())
    .map(|i| {
      let (matched, remaining) = parts.split_at(parts.len() - i);
      Possibility::new(matched.join(sep), remaining.join(sep))
    })
    .collect()
}

fn split_before(s: &str, f: impl Fn(char) -> bool) -> Vec<&str> {
  let mut parts = Vec::with_capacity(4);
  let mut start = 0;
  for (end, c) in s.char_indices() {
    if f(c) && start < end {
      parts.push(&s[start..end]);
      start = end;
    }
  }
  if start < s.len() {
    parts.push(&s[start..]);
  }
  parts
}

#[cfg(test)]
fn pairs(possibilities: Vec<Possibility>) -> Vec<(String, String)> {
  possibilities
    .into_iter()
    .map(|p| (p.matched, p.remaining))
    .collect()
}

#[test]
fn test_exact() {
  assert_eq!(
    pairs(Exact.possibilities("CustomerName")),
    vec![("CustomerName".to_string(), String::new())]
  );
}

#[test]
fn test_pascal_case() {
  let expected: Vec<(String, String)> = vec![
    ("CustomerAddressCity", ""),
    ("CustomerAddress", "City"),
    ("Customer", "AddressCity"),
  ]
  .into_iter()
  .map(|(a, b)| (a.to_string(), b.to_string()))
  .collect();
  assert_eq!(pairs(PascalCase.possibilities("CustomerAddressCity")), expected);
}

#[test]
fn test_pascal_case_lower_prefix() {
  let got = pairs(PascalCase.possibilities("idValue"));
  assert_eq!(got[0], ("idValue".to_string(), String::new()));
  assert_eq!(got[1], ("id".to_string(), "Value".to_string()));
}

#[test]
fn test_snake_case() {
  let got = pairs(SnakeCase.possibilities("customer_name"));
  assert_eq!(
    got,
    vec![
      ("customer_name".to_string(), String::new()),
      ("customer".to_string(), "name".to_string()),
    ]
  );
}

#[test]
fn test_empty_name() {
  assert!(PascalCase.possibilities("").is_empty());
  assert!(SnakeCase.possibilities("").is_empty());
}

#[test]
fn test_closure_convention() {
  let lower = |name: &str| vec![Possibility::new(name.to_lowercase(), "")];
  assert_eq!(lower.possibilities("ID"), vec![Possibility::new("id", "")]);
}
