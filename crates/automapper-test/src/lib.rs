#[cfg(test)]
mod fixtures {
  use automapper::Reflect;

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct Address {
    pub city: String,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct Customer {
    pub name: String,
    pub address: Option<Box<Address>>,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct Line {
    pub sku: String,
    pub quantity: String,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct Order {
    pub id: i32,
    pub customer: Option<Customer>,
    pub transaction: String,
    pub lines: Vec<Line>,
    pub status: String,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct LineDto {
    pub sku: String,
    pub quantity: u16,
  }

  #[derive(Debug, Clone, Copy, PartialEq, Reflect)]
  pub enum Status {
    Open,
    #[reflect(name = "closed")]
    Closed,
  }

  impl Default for Status {
    fn default() -> Self {
      Status::Open
    }
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct OrderDto {
    pub id: i64,
    pub customer_name: String,
    pub customer_address_city: String,
    pub transaction: i32,
    pub lines: Vec<LineDto>,
    pub status: Status,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct OrderSummary {
    pub id: i64,
    pub customer_name: String,
    pub customer_address_city: String,
    pub transaction: i32,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct Tagged {
    pub id: i64,
    pub lines: String,
  }

  #[derive(Debug, Clone, Default, Reflect)]
  pub struct Account {
    #[reflect(name = "customer")]
    pub client: Option<Customer>,
    #[reflect(skip)]
    pub secret: String,
    #[reflect(name = "id")]
    pub account_id: i32,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct AccountDto {
    pub customer_name: String,
    pub secret: String,
    pub id: u8,
  }

  #[derive(Debug, Clone, Default, Reflect)]
  pub struct LegacyCustomer {
    #[reflect(name = "Name")]
    pub name: String,
  }

  #[derive(Debug, Clone, Default, Reflect)]
  pub struct Legacy {
    #[reflect(name = "Customer")]
    pub customer: Box<LegacyCustomer>,
    #[reflect(name = "ID")]
    pub id: i32,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct LegacyDto {
    #[reflect(name = "CustomerName")]
    pub customer_name: String,
    #[reflect(name = "ID")]
    pub id: i32,
  }

  #[derive(Debug, Clone, Default, PartialEq, Reflect)]
  pub struct Prefixed {
    pub dto_id: i64,
    pub dto_transaction: i32,
  }

  pub fn sample_order() -> Order {
    Order {
      id: 42,
      customer: Some(Customer {
        name: "Ada".to_string(),
        address: Some(Box::new(Address {
          city: "London".to_string(),
        })),
      }),
      transaction: "1001".to_string(),
      lines: vec![
        Line {
          sku: "A-1".to_string(),
          quantity: "3".to_string(),
        },
        Line {
          sku: "B-2".to_string(),
          quantity: String::new(),
        },
      ],
      status: "closed".to_string(),
    }
  }
}

#[cfg(test)]
use automapper::*;
#[cfg(test)]
use fixtures::*;
#[cfg(test)]
use std::any::Any;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
fn init() {
  let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(test)]
fn status_factory(dst: &TypeInfo, src: &TypeInfo) -> Result<Option<Arc<dyn Converter>>> {
  let (dst, src) = (dst.unwrap_pointers(), src.unwrap_pointers());
  match (dst.kind(), src.kind()) {
    (Kind::Enum(to), Kind::String(from)) => {
      let (to, from) = (*to, *from);
      let ty = dst.name().to_string();
      let converter = move |dst: &mut dyn Any, src: &dyn Any| -> Result<()> {
        let value = from.get(src).unwrap_or_default();
        if to.set(dst, &value) {
          Ok(())
        } else {
          Err(Error::InvalidVariant {
            value,
            ty: ty.clone().into(),
          })
        }
      };
      Ok(Some(Arc::new(converter)))
    }
    _ => Err(unsupported(&dst, &src)),
  }
}

#[cfg(test)]
fn map_lines(ctx: &dyn Context, dst: &mut Vec<LineDto>, src: &Order) -> Result<()> {
  dst.clear();
  for line in &src.lines {
    let mut out = LineDto::default();
    ctx.map(&mut out, line)?;
    dst.push(out);
  }
  Ok(())
}

#[cfg(test)]
fn provider() -> AutoProvider {
  let mut provider = AutoProvider::new();
  provider.converter_factory(DefaultConverterFactory.or_else(status_factory));
  provider.add::<LineDto, Line>();
  provider
    .add::<OrderDto, Order>()
    .field("lines", FieldOptions::new().map_with(map_lines));
  provider.add::<OrderSummary, Order>();
  provider
}

#[cfg(test)]
fn registry() -> Registry {
  Registry::builder().provider(provider()).build().unwrap()
}

#[test]
fn test_end_to_end() {
  init();
  let registry = registry();
  assert_eq!(registry.len(), 3);

  let mut dto = OrderDto::default();
  registry.map(&mut dto, &sample_order()).unwrap();
  assert_eq!(
    dto,
    OrderDto {
      id: 42,
      customer_name: "Ada".to_string(),
      customer_address_city: "London".to_string(),
      transaction: 1001,
      lines: vec![
        LineDto {
          sku: "A-1".to_string(),
          quantity: 3,
        },
        LineDto {
          sku: "B-2".to_string(),
          quantity: 0,
        },
      ],
      status: Status::Closed,
    }
  );
}

#[test]
fn test_identity() {
  init();
  let mut provider = AutoProvider::new();
  provider.add::<Order, Order>();
  provider.add::<Customer, Customer>();
  let registry = Registry::builder().provider(provider).build().unwrap();

  let order = sample_order();
  let mut copy = Order::default();
  registry.map(&mut copy, &order).unwrap();
  assert_eq!(copy, order);

  let customer = order.customer.clone().unwrap();
  let mut copy = Customer::default();
  registry.map(&mut copy, &customer).unwrap();
  assert_eq!(copy, customer);
}

#[test]
fn test_idempotent() {
  init();
  let registry = registry();
  let order = sample_order();

  let mut once = OrderDto::default();
  registry.map(&mut once, &order).unwrap();
  let mut twice = once.clone();
  registry.map(&mut twice, &order).unwrap();
  assert_eq!(once, twice);
}

#[test]
fn test_null_intermediate() {
  init();
  let registry = registry();

  let mut order = sample_order();
  order.customer.as_mut().unwrap().address = None;
  let mut summary = OrderSummary {
    customer_address_city: "unchanged".to_string(),
    ..Default::default()
  };
  registry.map(&mut summary, &order).unwrap();
  assert_eq!(summary.customer_name, "Ada");
  assert_eq!(summary.customer_address_city, "unchanged");

  order.customer = None;
  let mut summary = OrderSummary {
    customer_name: "unchanged".to_string(),
    ..Default::default()
  };
  registry.map(&mut summary, &order).unwrap();
  assert_eq!(summary.customer_name, "unchanged");
  assert_eq!(summary.id, 42);
}

#[test]
fn test_string_to_int_error() {
  init();
  let registry = registry();
  let order = Order {
    transaction: "ten".to_string(),
    ..sample_order()
  };
  let mut summary = OrderSummary::default();
  let err = registry.map(&mut summary, &order).unwrap_err();
  assert_eq!(
    err.to_string(),
    r#"mapping field "OrderSummary.transaction" from "Order.transaction": invalid digit found in string"#
  );
  assert!(matches!(err.root_cause(), Error::ParseInt(_)));
}

#[test]
fn test_invalid_variant() {
  init();
  let registry = registry();
  let order = Order {
    status: "archived".to_string(),
    ..sample_order()
  };
  let mut dto = OrderDto::default();
  let err = registry.map(&mut dto, &order).unwrap_err();
  assert_eq!(
    err.to_string(),
    r#"mapping field "OrderDto.status" from "Order.status": `archived` is not a variant of Status"#
  );
}

#[test]
fn test_strict_rejects_unsupported() {
  init();
  let mut provider = AutoProvider::new();
  provider.add::<Tagged, Order>();
  let err = Registry::builder().provider(provider).build().unwrap_err();
  assert_eq!(
    err.to_string(),
    r#"mapping field "Tagged.lines" from "Order.lines": cannot convert from Vec<Line> to String"#
  );
}

#[test]
fn test_lenient_skips_unsupported() {
  init();
  let mut provider = AutoProvider::new();
  provider.policy(ConversionPolicy::Lenient);
  provider.add::<Tagged, Order>();
  let registry = Registry::builder().provider(provider).build().unwrap();

  let mut tagged = Tagged::default();
  registry.map(&mut tagged, &sample_order()).unwrap();
  assert_eq!(tagged, Tagged {
    id: 42,
    lines: String::new(),
  });
}

#[test]
fn test_override_precedence() {
  init();
  let mut provider = AutoProvider::new();
  provider
    .add::<OrderSummary, Order>()
    .field("customer_name", FieldOptions::new().from_path("status"))
    .field(
      "transaction",
      FieldOptions::new().map_with(|_, dst: &mut i32, src: &Order| {
        *dst = src.id * 2;
        Ok(())
      }),
    )
    .field(
      "customer_address_city",
      FieldOptions::new()
        .ignore()
        .map_with(|_, dst: &mut String, _: &Order| {
          *dst = "Paris".to_string();
          Ok(())
        }),
    );
  let registry = Registry::builder().provider(provider).build().unwrap();

  let mut summary = OrderSummary::default();
  registry.map(&mut summary, &sample_order()).unwrap();
  assert_eq!(summary, OrderSummary {
    id: 42,
    customer_name: "closed".to_string(),
    customer_address_city: String::new(),
    transaction: 84,
  });
}

#[test]
fn test_converter_override() {
  init();
  let length = |dst: &mut dyn Any, src: &dyn Any| -> Result<()> {
    let len = src.downcast_ref::<String>().map_or(0, String::len);
    if let Some(dst) = dst.downcast_mut::<i32>() {
      *dst = len as i32;
    }
    Ok(())
  };
  let mapper = StructOptions::new::<OrderSummary, Order>()
    .field("transaction", FieldOptions::new().converter(length))
    .build()
    .unwrap();

  let mut summary = OrderSummary::default();
  mapper.map_into(&mut summary, &sample_order()).unwrap();
  assert_eq!(summary.transaction, 4);
  assert_eq!(summary.customer_name, "Ada");
}

#[test]
fn test_field_naming_override() {
  init();
  let mapper = StructOptions::new::<OrderSummary, Order>()
    .field("customer_name", FieldOptions::new().naming(Exact))
    .build()
    .unwrap();
  assert_eq!(
    mapper.mapped_fields().collect::<Vec<_>>(),
    vec!["id", "customer_address_city", "transaction"]
  );

  let mut summary = OrderSummary::default();
  mapper.map_into(&mut summary, &sample_order()).unwrap();
  assert_eq!(summary.customer_name, "");
  assert_eq!(summary.customer_address_city, "London");
}

#[test]
fn test_unresolved_path() {
  init();
  let err = StructOptions::new::<OrderSummary, Order>()
    .field("customer_name", FieldOptions::new().from_path("customer.nickname"))
    .build()
    .err()
    .unwrap();
  assert_eq!(err.to_string(), "path `customer.nickname` cannot be resolved on `Order`");
}

#[test]
fn test_duplicates() {
  init();
  let manual = || {
    let mut manual = StaticProvider::new();
    manual.add_fn(|_, dst: &mut OrderSummary, src: &Order| {
      dst.id = -i64::from(src.id);
      Ok(())
    });
    manual
  };

  let err = Registry::builder()
    .provider(provider())
    .provider(manual())
    .build()
    .unwrap_err();
  assert_eq!(err.to_string(), "mapper already exists from Order to OrderSummary");

  let registry = Registry::builder()
    .provider(provider())
    .provider(manual())
    .duplicates(DuplicatePolicy::Replace)
    .build()
    .unwrap();
  let mut summary = OrderSummary::default();
  registry.map(&mut summary, &sample_order()).unwrap();
  assert_eq!(summary.id, -42);
  assert!(summary.customer_name.is_empty());
}

#[test]
fn test_no_mapper_found() {
  init();
  let registry = registry();
  let mut line = LineDto::default();
  let err = registry.map(&mut line, &sample_order()).unwrap_err();
  assert!(err.is_no_mapper_found());
  assert_eq!(err.to_string(), "no mapper found from Order to LineDto");
}

#[test]
fn test_nested_mapper_missing() {
  init();
  let mut provider = AutoProvider::new();
  provider.converter_factory(DefaultConverterFactory.or_else(status_factory));
  provider
    .add::<OrderDto, Order>()
    .field("lines", FieldOptions::new().map_with(map_lines));
  let registry = Registry::builder().provider(provider).build().unwrap();

  let mut dto = OrderDto::default();
  let err = registry.map(&mut dto, &sample_order()).unwrap_err();
  assert!(!err.is_no_mapper_found());
  assert!(err.root_cause().is_no_mapper_found());
  let msg = err.to_string();
  assert!(msg.starts_with(r#"mapping field "OrderDto.lines" from "Order.(custom function)""#));
  assert!(msg.contains("fixtures::Line to "), "{}", msg);
  assert!(msg.ends_with("fixtures::LineDto"), "{}", msg);
}

#[test]
fn test_pointer_source() {
  init();
  let registry = registry();

  let mut summary = OrderSummary::default();
  registry.map(&mut summary, &Box::new(sample_order())).unwrap();
  assert_eq!(summary.transaction, 1001);

  let mut summary = OrderSummary::default();
  registry.map(&mut summary, &Some(sample_order())).unwrap();
  assert_eq!(summary.customer_name, "Ada");

  let mut summary = OrderSummary::default();
  let none: Option<Order> = None;
  registry.map(&mut summary, &none).unwrap();
  assert_eq!(summary, OrderSummary::default());
}

#[test]
fn test_struct_mapper_pointer_source() {
  init();
  let mapper = StructOptions::new::<OrderSummary, Order>().build().unwrap();

  let mut summary = OrderSummary::default();
  mapper.map_into(&mut summary, &Box::new(sample_order())).unwrap();
  assert_eq!(summary.customer_address_city, "London");

  let mut summary = OrderSummary::default();
  mapper.map_into(&mut summary, &Some(sample_order())).unwrap();
  assert_eq!(summary.transaction, 1001);

  let mut summary = OrderSummary::default();
  mapper.map_into(&mut summary, &None::<Order>).unwrap();
  assert_eq!(summary, OrderSummary::default());
}

#[test]
fn test_concurrent_maps() {
  init();
  let registry = registry();
  std::thread::scope(|s| {
    for i in 0..8 {
      let registry = &registry;
      s.spawn(move || {
        let order = Order {
          id: i,
          ..sample_order()
        };
        let mut dto = OrderDto::default();
        registry.map(&mut dto, &order).unwrap();
        assert_eq!(dto.id, i64::from(i));
        assert_eq!(dto.lines.len(), 2);
      });
    }
  });
}

#[test]
fn test_derive_attributes() {
  init();
  let ty = TypeInfo::of::<Account>();
  assert_eq!(ty.name(), "Account");
  let names: Vec<_> = ty.fields().iter().map(|f| (f.name(), f.index())).collect();
  assert_eq!(names, vec![("customer", 0), ("id", 2)]);

  match TypeInfo::of::<Status>().kind() {
    Kind::Enum(info) => assert_eq!(info.variants(), &["Open", "closed"]),
    other => panic!("unexpected kind {:?}", other),
  }

  let mapper = StructOptions::new::<AccountDto, Account>().build().unwrap();
  let names: Vec<_> = mapper.mapped_fields().collect();
  assert_eq!(names, vec!["customer_name", "id"]);

  let account = Account {
    client: Some(Customer {
      name: "Grace".to_string(),
      address: None,
    }),
    secret: "hunter2".to_string(),
    account_id: 7,
  };
  let mut dto = AccountDto::default();
  mapper.map_into(&mut dto, &account).unwrap();
  assert_eq!(dto, AccountDto {
    customer_name: "Grace".to_string(),
    secret: String::new(),
    id: 7,
  });

  let err = mapper
    .map_into(&mut dto, &Account {
      account_id: 300,
      ..account
    })
    .unwrap_err();
  assert!(matches!(err.root_cause(), Error::OutOfRange { .. }));
}

#[test]
fn test_pascal_case() {
  init();
  let mapper = StructOptions::new::<LegacyDto, Legacy>()
    .naming(PascalCase)
    .build()
    .unwrap();
  let legacy = Legacy {
    customer: Box::new(LegacyCustomer {
      name: "Linus".to_string(),
    }),
    id: 3,
  };
  let mut dto = LegacyDto::default();
  mapper.map_into(&mut dto, &legacy).unwrap();
  assert_eq!(dto, LegacyDto {
    customer_name: "Linus".to_string(),
    id: 3,
  });
}

#[test]
fn test_custom_naming() {
  init();
  let mapper = StructOptions::new::<Prefixed, Order>()
    .naming(|name: &str| vec![Possibility::new(name.trim_start_matches("dto_"), "")])
    .build()
    .unwrap();
  let mut dto = Prefixed::default();
  mapper.map_into(&mut dto, &sample_order()).unwrap();
  assert_eq!(dto, Prefixed {
    dto_id: 42,
    dto_transaction: 1001,
  });
}
