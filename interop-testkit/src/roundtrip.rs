use std::fmt::Debug;

use interop_core::{short_type_name, ConversionRegistry, Result, TypedValue};

/// Sequence lengths covered by round-trip tests: empty, single, several.
pub const SIZES: [usize; 3] = [0, 1, 7];

/// Lift `value` through `registry` and project it back.
pub fn round_trip<T: 'static>(registry: &ConversionRegistry, value: T) -> Result<(TypedValue, T)> {
    let lifted = registry.lift(value)?;
    let back = registry.project::<T>(&lifted)?;
    Ok((lifted, back))
}

/// Check `project(lift(v)) == v`, returning the lifted value.
pub fn assert_round_trip<T>(registry: &ConversionRegistry, value: T) -> TypedValue
where
    T: Clone + Debug + PartialEq + 'static,
{
    match round_trip(registry, value.clone()) {
        Ok((lifted, back)) => {
            assert_eq!(back, value, "round trip changed a {}", short_type_name::<T>());
            lifted
        }
        Err(e) => panic!("round trip of {} failed: {}", short_type_name::<T>(), e),
    }
}
