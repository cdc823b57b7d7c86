use interop_core::{
    ConversionRegistry, Convert, Converter, OnConflict, Origin, Phase, Result, TypedValue, CLASS,
};

#[derive(Debug, Clone, PartialEq)]
struct Celsius(f64);

impl Convert for Celsius {
    fn project(value: &TypedValue) -> Result<Self> {
        Ok(Celsius(value.as_f64()?))
    }

    fn lift(self) -> Result<TypedValue> {
        TypedValue::double(self.0).with_attr(CLASS, TypedValue::strings(["celsius"]))
    }
}

#[test]
fn unregistered_custom_type_has_no_converter() {
    let registry = ConversionRegistry::new();
    assert_eq!(registry.phase(), Phase::Open);
    let err = registry.project::<Celsius>(&TypedValue::double(1.0)).unwrap_err();
    assert!(err.is_no_converter());
    assert!(registry.lift(Celsius(1.0)).unwrap_err().is_no_converter());
}

#[test]
fn sealing_blocks_registration_but_not_use() {
    let mut registry = ConversionRegistry::new();
    registry.register::<Celsius>().unwrap();
    registry.seal();
    registry.seal();
    assert_eq!(registry.phase(), Phase::Sealed);

    let err = registry
        .register_converter(Converter::<Celsius>::of(), OnConflict::Overwrite)
        .unwrap_err();
    assert_eq!(err.error_type(), "registry_sealed");

    let lifted = registry.lift(Celsius(21.5)).unwrap();
    assert!(lifted.inherits("celsius"));
    assert_eq!(registry.project::<Celsius>(&lifted).unwrap(), Celsius(21.5));
}

#[test]
fn duplicate_registration_keeps_the_first() {
    let mut registry = ConversionRegistry::new();
    registry.register::<Celsius>().unwrap();
    let replacement = Converter::<Celsius>::new(
        |v| Ok(Celsius(v.as_f64()? - 273.15)),
        |c| Ok(TypedValue::double(c.0 + 273.15)),
    );
    let err = registry
        .register_converter(replacement, OnConflict::Reject)
        .unwrap_err();
    assert!(err.is_duplicate_converter());

    registry.seal();
    let lifted = registry.lift(Celsius(10.0)).unwrap();
    assert_eq!(lifted.as_f64().unwrap(), 10.0);
}

#[test]
fn overwrite_replaces_the_converter() {
    let mut registry = ConversionRegistry::new();
    registry.register::<Celsius>().unwrap();
    let kelvin = Converter::<Celsius>::new(
        |v| Ok(Celsius(v.as_f64()? - 273.0)),
        |c| Ok(TypedValue::double(c.0 + 273.0)),
    );
    registry.register_converter(kelvin, OnConflict::Overwrite).unwrap();
    registry.seal();
    assert_eq!(registry.lift(Celsius(10.0)).unwrap().as_f64().unwrap(), 283.0);
}

#[test]
fn custom_converter_shadows_builtin() {
    let mut registry = ConversionRegistry::new();
    let doubled = Converter::<i32>::new(|v| Ok(v.as_i32()? / 2), |i| Ok(TypedValue::integer(i * 2)));
    registry.register_converter(doubled, OnConflict::Reject).unwrap();
    registry.seal();

    assert_eq!(registry.lift(4_i32).unwrap().as_i32().unwrap(), 8);
    assert_eq!(registry.project::<i32>(&TypedValue::integer(8)).unwrap(), 4);

    let origins: Vec<Origin> = registry
        .registered()
        .into_iter()
        .filter(|info| info.type_name == "i32")
        .map(|info| info.origin)
        .collect();
    assert_eq!(origins, vec![Origin::Builtin, Origin::Custom]);
}

#[test]
fn errors_name_the_native_type() {
    let mut registry = ConversionRegistry::new();
    registry.seal();
    let err = registry
        .project::<Vec<i32>>(&TypedValue::string("x"))
        .unwrap_err();
    assert!(err.is_type_mismatch());
    assert_eq!(err.context(), &["projecting Vec<i32>".to_string()]);
}
