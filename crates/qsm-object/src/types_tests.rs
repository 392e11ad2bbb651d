//! Tests for the primitive type table.

use crate::types::{NATIVE_SIZE, TypeId};

#[test]
fn indices_are_stable() {
    // Format contract: these numbers appear in encoded operands.
    assert_eq!(TypeId::Void as u8, 1);
    assert_eq!(TypeId::Ptr as u8, 3);
    assert_eq!(TypeId::Int as u8, 5);
    assert_eq!(TypeId::Int8 as u8, 6);
    assert_eq!(TypeId::Str as u8, 13);
    assert_eq!(TypeId::Arg as u8, 16);
}

#[test]
fn byte_round_trip() {
    for b in 0..=u8::MAX {
        if let Some(ty) = TypeId::from_byte(b) {
            assert_eq!(ty as u8, b);
            assert_eq!(TypeId::from_name(ty.name()), Some(ty));
        }
    }
    assert_eq!(TypeId::from_byte(0), None);
    assert_eq!(TypeId::from_byte(17), None);
}

#[test]
fn sizes() {
    assert_eq!(TypeId::Void.size(), 0);
    assert_eq!(TypeId::Bool.size(), 1);
    assert_eq!(TypeId::Int8.size(), 1);
    assert_eq!(TypeId::Int16.size(), 2);
    assert_eq!(TypeId::Int32.size(), 4);
    assert_eq!(TypeId::Int.size(), NATIVE_SIZE);
    assert_eq!(TypeId::Ptr.size(), NATIVE_SIZE);
    assert_eq!(TypeId::Float.size(), NATIVE_SIZE);
    assert_eq!(TypeId::Float32.size(), 4);
}

#[test]
fn classification() {
    assert!(TypeId::Float32.is_float());
    assert!(!TypeId::Int.is_float());
    assert!(TypeId::RPtr.is_pointer());
    assert!(TypeId::Str.is_pointer());
    assert!(!TypeId::Bool.is_pointer());
}
