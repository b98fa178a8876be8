//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity; two instances with the same attributes are
/// interchangeable. `Money` and a cart line's variant selection are value
/// objects: a line is identified by *which* variant was chosen, never by the
/// allocation holding it.
///
/// Value objects are immutable. To "change" one, build a new value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
