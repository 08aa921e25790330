//! Identifier derivation.
//!
//! An object's [`Identifier`] is produced by an ordered list of
//! [`IdentifierStrategy`] values; the first one yielding a non-empty
//! identifier wins. Closures of type `Fn(&ObjectMeta) -> Option<Identifier>`
//! are strategies too.

use std::sync::Arc;

use crate::key::Identifier;
use crate::meta::ObjectMeta;

/// A pluggable way of deriving an [`Identifier`] from object metadata.
pub trait IdentifierStrategy: Send + Sync {
    /// Derive an identifier, or `None` if this strategy has nothing to offer.
    fn identify(&self, meta: &ObjectMeta) -> Option<Identifier>;
}

impl<F> IdentifierStrategy for F
where
    F: Fn(&ObjectMeta) -> Option<Identifier> + Send + Sync,
{
    fn identify(&self, meta: &ObjectMeta) -> Option<Identifier> {
        self(meta)
    }
}

/// Uses `metadata.name`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NameIdentifier;

impl IdentifierStrategy for NameIdentifier {
    fn identify(&self, meta: &ObjectMeta) -> Option<Identifier> {
        (!meta.name.is_empty()).then(|| Identifier::new(meta.name.as_str()))
    }
}

/// Uses `metadata.uid`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UidIdentifier;

impl IdentifierStrategy for UidIdentifier {
    fn identify(&self, meta: &ObjectMeta) -> Option<Identifier> {
        (!meta.uid.is_empty()).then(|| Identifier::new(meta.uid.as_str()))
    }
}

/// Shared, ordered list of strategies.
pub type Strategies = Vec<Arc<dyn IdentifierStrategy>>;

/// Name first, then uid.
#[must_use]
pub fn default_strategies() -> Strategies {
    vec![Arc::new(NameIdentifier), Arc::new(UidIdentifier)]
}

/// Look up a built-in strategy by its configuration name (`"name"` or `"uid"`).
#[must_use]
pub fn strategy_by_name(name: &str) -> Option<Arc<dyn IdentifierStrategy>> {
    match name {
        "name" => Some(Arc::new(NameIdentifier)),
        "uid" => Some(Arc::new(UidIdentifier)),
        _ => None,
    }
}

/// Error returned when no strategy yields an identifier.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("no identifier available for object (name: {name:?}, uid: {uid:?})")]
    NoIdentifierAvailable { name: String, uid: String },
}

/// Try each strategy in order and return the first non-empty identifier.
pub fn derive_identifier(
    meta: &ObjectMeta,
    strategies: &[Arc<dyn IdentifierStrategy>],
) -> Result<Identifier, IdentityError> {
    strategies
        .iter()
        .filter_map(|strategy| strategy.identify(meta))
        .find(|id| !id.is_empty())
        .ok_or_else(|| IdentityError::NoIdentifierAvailable {
            name: meta.name.clone(),
            uid: meta.uid.clone(),
        })
}
