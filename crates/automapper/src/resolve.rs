use crate::accessor::Accessor;
use crate::naming::NamingConvention;
use crate::reflect::TypeInfo;
use log::trace;

/// Finds the source field(s) a destination field named `name` reads from.
///
/// Each round asks the naming convention for candidates and takes the first
/// one that names a field of the current (pointer-unwrapped) source type. The
/// unconsumed remainder of the name is then looked up on that field's type,
/// so `customer_name` can resolve to `customer.name`. Resolution fails as soon
/// as a round matches nothing or leaves the name unconsumed.
pub fn find_accessor(convention: &dyn NamingConvention, name: &str, src: &TypeInfo) -> Option<Accessor> {
  let mut accessor: Option<Accessor> = None;
  let mut current_name = name.to_string();
  let mut current_type = src.clone();

  while !current_name.is_empty() {
    let shape = current_type.unwrap_pointers();
    let hit = convention
      .possibilities(&current_name)
      .into_iter()
      .find_map(|p| shape.field(&p.matched).map(|field| (field.clone(), p.remaining)));

    let (field, remaining) = match hit {
      Some(hit) => hit,
      None => {
        trace!("no field of {} matches `{}`", shape, current_name);
        return None;
      }
    };
    if remaining == current_name {
      trace!("`{}` makes no progress on {}", current_name, shape);
      return None;
    }

    let next_type = field.ty();
    let next = Accessor::field(current_type, field);
    accessor = Some(match accessor {
      Some(prev) => Accessor::pair(prev, next),
      None => next,
    });
    current_name = remaining;
    current_type = next_type;
  }

  accessor
}

#[cfg(test)]
mod fixtures {
  use crate::Reflect;

  #[derive(Debug, Clone, Default, Reflect)]
  pub struct Customer {
    pub name: String,
  }

  #[derive(Debug, Clone, Default, Reflect)]
  pub struct Order {
    pub id: i32,
    pub customer: Option<Box<Customer>>,
    pub customer_id: i64,
  }

  #[derive(Debug, Clone, Default, Reflect)]
  pub struct Line {
    pub order: Order,
  }

  #[derive(Debug, Clone, Default, Reflect)]
  pub struct Node {
    pub next: Option<Box<Node>>,
    pub v: i32,
  }
}

#[cfg(test)]
use crate::naming::{Exact, Possibility, SnakeCase};

#[test]
fn test_exact_match() {
  let src = TypeInfo::of::<fixtures::Order>();
  let accessor = find_accessor(&Exact, "id", &src).unwrap();
  assert_eq!(accessor.name(), "id");
  assert!(accessor.output().is::<i32>());
  assert!(find_accessor(&Exact, "customer_name", &src).is_none());
}

#[test]
fn test_compound_match() {
  let src = TypeInfo::of::<fixtures::Order>();
  let accessor = find_accessor(&SnakeCase, "customer_name", &src).unwrap();
  assert_eq!(accessor.name(), "customer.name");
  assert!(accessor.output().is::<String>());
}

#[test]
fn test_longest_prefix_wins() {
  let src = TypeInfo::of::<fixtures::Order>();
  let accessor = find_accessor(&SnakeCase, "customer_id", &src).unwrap();
  assert_eq!(accessor.name(), "customer_id");
}

#[test]
fn test_multiple_hops() {
  let src = TypeInfo::of::<fixtures::Line>();
  let accessor = find_accessor(&SnakeCase, "order_customer_name", &src).unwrap();
  assert_eq!(accessor.name(), "order.customer.name");
}

#[test]
fn test_no_progress() {
  let src = TypeInfo::of::<fixtures::Order>();
  assert!(find_accessor(&SnakeCase, "customer_email", &src).is_none());
  assert!(find_accessor(&SnakeCase, "", &src).is_none());
}

#[test]
fn test_match_without_consuming() {
  // always offers `next` and hands the whole name back
  let convention = |name: &str| vec![Possibility::new("next", name)];
  let src = TypeInfo::of::<fixtures::Node>();
  assert!(find_accessor(&convention, "v", &src).is_none());
  assert!(find_accessor(&convention, "next", &src).is_none());
}
