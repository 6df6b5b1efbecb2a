//! `proptest` strategies for key identities, enabled by the `proptest` feature.
//!
//! Useful for property tests in downstream crates that key their own resources.

use super::key::{KeyIdentity, KeyOrigin, KeyParam};
use proptest::prelude::*;
use std::path::PathBuf;
use std::rc::Rc;

/// Any [`KeyParam`], floats included.
pub fn key_param() -> impl Strategy<Value = KeyParam> {
    prop_oneof![
        any::<u64>().prop_map(KeyParam::Unsigned),
        any::<i64>().prop_map(KeyParam::Signed),
        any::<f64>().prop_map(KeyParam::Float),
        "[a-z]{0,8}".prop_map(KeyParam::Text),
    ]
}

/// Any [`KeyOrigin`], drawn from small domains so collisions actually happen.
pub fn key_origin() -> impl Strategy<Value = KeyOrigin> {
    prop_oneof![
        "[a-c]{1,2}\\.png".prop_map(|path| KeyOrigin::File(PathBuf::from(path))),
        prop::collection::vec(0u8..4, 0..4).prop_map(|bytes| KeyOrigin::Memory(Rc::from(bytes))),
        "[xy]{0,3}".prop_map(|text| KeyOrigin::Source(Rc::from(text))),
        ("[A-B]", prop::collection::vec(key_param(), 0..3))
            .prop_map(|(kind, params)| KeyOrigin::Parameters { kind, params }),
        "[a-c]".prop_map(KeyOrigin::Named),
    ]
}

/// Any [`KeyIdentity`], with tags drawn from a tiny alphabet.
pub fn key_identity() -> impl Strategy<Value = KeyIdentity> {
    (key_origin(), prop_oneof![Just(String::new()), "[uv]"]).prop_map(|(origin, tag)| KeyIdentity::new(origin, tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    proptest! {
        #[test]
        fn test_identity_order_is_consistent_with_eq(a in key_identity(), b in key_identity()) {
            prop_assert_eq!(a == b, a.cmp(&b) == Ordering::Equal);
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        }

        #[test]
        fn test_param_order_is_total(a in key_param(), b in key_param(), c in key_param()) {
            if a <= b && b <= c {
                prop_assert!(a <= c);
            }
        }
    }
}
