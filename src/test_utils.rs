//! Helpers shared by unit tests across modules.

pub mod serde {
    use serde::{de::DeserializeOwned, Serialize};

    /// Round-trips `value` through JSON and asserts the result is equal,
    /// catching accidental `#[serde(skip)]`s or asymmetric field renames.
    pub fn assert_round_trip_json<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let encoded = serde_json::to_string(value).expect("serialize");
        let decoded: T = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(value, &decoded, "value did not round-trip through JSON");
    }
}
