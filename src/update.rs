//! Tri-state values for partial update bodies.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field value in a partial update.
///
/// Update bodies hold `Option<UpdateValue<T>>`:
///
/// * `None` - the field is left out of the body and stays untouched on the server,
/// * `Some(UpdateValue::unset())` - the field is cleared,
/// * `Some(UpdateValue::set(Some(v)))` - the field becomes `v`.
///
/// In memory, [`is_set`](UpdateValue::is_set) tells `set(None)` apart from
/// `unset()`. On the wire they are the same: both serialize as JSON `null`,
/// and a JSON `null` reads back as `unset()`.
///
/// # Examples
///
/// ```
/// use xms::UpdateValue;
///
/// assert!(!UpdateValue::<String>::unset().is_set());
/// assert!(UpdateValue::<String>::set(None).is_set());
/// assert_eq!(UpdateValue::<String>::unset(), UpdateValue::unset());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub enum UpdateValue<T> {
    /// The shared "clear this field" marker.
    #[default]
    Unset,
    /// An explicit value, which may itself be absent.
    Set(Option<T>),
}

impl<T> UpdateValue<T> {
    /// The unset marker.
    pub const fn unset() -> Self {
        UpdateValue::Unset
    }

    /// Wraps an explicit value.
    pub const fn set(value: Option<T>) -> Self {
        UpdateValue::Set(value)
    }

    /// Wraps a present value.
    pub fn of(value: T) -> Self {
        UpdateValue::Set(Some(value))
    }

    /// Returns `true` unless this is the unset marker, including for `set(None)`.
    pub fn is_set(&self) -> bool {
        matches!(self, UpdateValue::Set(_))
    }

    /// The wrapped value, or `None` when unset or set to nothing.
    pub fn value_or_none(&self) -> Option<&T> {
        match self {
            UpdateValue::Set(Some(value)) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<T> for UpdateValue<T> {
    fn from(value: T) -> Self {
        UpdateValue::of(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for UpdateValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateValue::Unset => write!(f, "UpdateValue{{unset}}"),
            UpdateValue::Set(value) => write!(f, "UpdateValue{{set={:?}}}", value),
        }
    }
}

impl<T: Serialize> Serialize for UpdateValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value_or_none() {
            Some(value) => value.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for UpdateValue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => UpdateValue::of(value),
            None => UpdateValue::Unset,
        })
    }
}
