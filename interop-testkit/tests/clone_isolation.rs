use interop_core::{BufferData, Payload, TypedValue};
use interop_testkit::fixtures::one_of_each_kind;

/// Overwrite the first reachable element of `value`.
fn mutate_first(value: &mut TypedValue) {
    match value.payload() {
        &Payload::Boolean(b) => value.set_element(0, TypedValue::boolean(!b)).unwrap(),
        &Payload::Integer(i) => value.set_element(0, TypedValue::integer(i + 1)).unwrap(),
        &Payload::Double(x) => value.set_element(0, TypedValue::double(x * 2.0)).unwrap(),
        Payload::String(_) => value.set_element(0, TypedValue::string("changed")).unwrap(),
        Payload::Sequence(_) => mutate_first(value.element_mut(0).unwrap()),
        Payload::Record(_) => {
            let (name, _) = value.field_at(0).unwrap();
            let name = name.to_string();
            mutate_first(value.field_mut(&name).unwrap());
        }
        Payload::Opaque(buffer) => {
            let replacement = match buffer.data() {
                BufferData::Logical(_) => TypedValue::boolean(false),
                BufferData::Integer(_) => TypedValue::integer(99),
                BufferData::Double(_) => TypedValue::double(99.0),
                BufferData::Character(_) => TypedValue::string("changed"),
                BufferData::Raw(_) => TypedValue::integer(7),
            };
            value.set_element(0, replacement).unwrap();
        }
        Payload::Null => panic!("null has no elements"),
    }
}

#[test]
fn clone_shares_no_mutable_storage() {
    for original in one_of_each_kind().unwrap() {
        let snapshot = original.clone();
        let mut copy = original.clone();
        assert!(!copy.is_shared());
        mutate_first(&mut copy);
        assert_eq!(original, snapshot, "{} changed through a clone", original.shape_name());
        assert_ne!(copy, original, "mutation of {} had no effect", original.shape_name());
    }
}

#[test]
fn shared_alias_refuses_in_place_writes() {
    for original in one_of_each_kind().unwrap() {
        let Payload::Opaque(_) = original.payload() else {
            continue;
        };
        let mut alias = original.share();
        assert!(alias.is_shared());
        assert!(original.is_shared());
        let err = alias.set_element(0, TypedValue::integer(1)).unwrap_err();
        assert_eq!(err.error_type(), "aliased");

        alias.make_unique();
        assert!(!alias.is_shared());
        assert!(!original.is_shared());
    }
}

#[test]
fn dropping_the_alias_releases_the_buffer() {
    let original = TypedValue::opaque(vec![1.0, 2.0]);
    let alias = original.share();
    assert!(original.is_shared());
    drop(alias);
    assert!(!original.is_shared());
}
