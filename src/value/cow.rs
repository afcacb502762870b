//! Defines a clone-on-write [`Value`].

use std::ops::Deref;

use crate::Value;

/// A [`Value`] resolved from a [`Context`][crate::Context], borrowed when it
/// lives in a frame and owned when it had to be copied out.
#[derive(Debug)]
pub enum ValueCow<'a> {
    Borrowed(&'a Value),
    Owned(Value),
}

impl Deref for ValueCow<'_> {
    type Target = Value;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(v) => v,
            Self::Owned(v) => v,
        }
    }
}

impl<'a> ValueCow<'a> {
    pub fn into_owned(self) -> Value {
        match self {
            Self::Borrowed(v) => v.clone(),
            Self::Owned(v) => v,
        }
    }

    /// Looks up `key` without cloning a borrowed parent.
    pub fn lookup(self, f: impl FnOnce(&Value) -> Option<&Value>) -> Option<ValueCow<'a>> {
        match self {
            Self::Borrowed(v) => f(v).map(ValueCow::Borrowed),
            Self::Owned(v) => f(&v).cloned().map(ValueCow::Owned),
        }
    }
}
