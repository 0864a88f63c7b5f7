//! Generic traversal over configuration trees.
//!
//! Any struct deriving [`Section`](crate::Section) is a configuration tree.
//! The derive visits fields in declaration order: [`Value`]s are handed to
//! the visitor, nested sections are walked transparently (they add no key
//! prefix, keys live on the values), and every other field type is skipped.
//! An error from any level is wrapped with the field name it came through,
//! so a failure deep in the tree reads as
//! `field 'openai': field 'model': ...`.
//!
//! [`attach`] and [`flatten`](crate::flatten) are both built on this walk.

use std::path::PathBuf;

use tracing::debug;

use crate::error::ConfbindError;
use crate::flags::FlagHandle;
use crate::kind::Kind;
use crate::store::Store;
use crate::value::{AnyValue, Value};

/// Visitor over shared values.
pub type Visit<'a> = dyn FnMut(&dyn AnyValue) -> Result<(), ConfbindError> + 'a;

/// Visitor over mutable values.
pub type VisitMut<'a> = dyn FnMut(&mut dyn AnyValue) -> Result<(), ConfbindError> + 'a;

/// A type that may contain configuration values.
pub trait Node {
    fn walk(&self, visit: &mut Visit<'_>) -> Result<(), ConfbindError>;

    fn walk_mut(&mut self, visit: &mut VisitMut<'_>) -> Result<(), ConfbindError>;

    /// True for configuration structs; only those are accepted as a root.
    fn is_section(&self) -> bool {
        false
    }
}

impl<T: Kind> Node for Value<T> {
    fn walk(&self, visit: &mut Visit<'_>) -> Result<(), ConfbindError> {
        visit(self as &dyn AnyValue)
    }

    fn walk_mut(&mut self, visit: &mut VisitMut<'_>) -> Result<(), ConfbindError> {
        visit(self as &mut dyn AnyValue)
    }
}

macro_rules! leaf_node {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Node for $ty {
                fn walk(&self, _: &mut Visit<'_>) -> Result<(), ConfbindError> {
                    Ok(())
                }

                fn walk_mut(&mut self, _: &mut VisitMut<'_>) -> Result<(), ConfbindError> {
                    Ok(())
                }
            }
        )*
    };
}

leaf_node!(
    (), bool, char, String, PathBuf, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
    usize, f32, f64,
);

impl<T: Kind> Node for FlagHandle<T> {
    fn walk(&self, _: &mut Visit<'_>) -> Result<(), ConfbindError> {
        Ok(())
    }

    fn walk_mut(&mut self, _: &mut VisitMut<'_>) -> Result<(), ConfbindError> {
        Ok(())
    }
}

impl<N: Node> Node for Option<N> {
    fn walk(&self, visit: &mut Visit<'_>) -> Result<(), ConfbindError> {
        match self {
            Some(inner) => inner.walk(visit),
            None => Ok(()),
        }
    }

    fn walk_mut(&mut self, visit: &mut VisitMut<'_>) -> Result<(), ConfbindError> {
        match self {
            Some(inner) => inner.walk_mut(visit),
            None => Ok(()),
        }
    }
}

impl<N: Node> Node for Vec<N> {
    fn walk(&self, visit: &mut Visit<'_>) -> Result<(), ConfbindError> {
        self.iter().try_for_each(|item| item.walk(visit))
    }

    fn walk_mut(&mut self, visit: &mut VisitMut<'_>) -> Result<(), ConfbindError> {
        self.iter_mut().try_for_each(|item| item.walk_mut(visit))
    }
}

impl<N: Node + ?Sized> Node for Box<N> {
    fn walk(&self, visit: &mut Visit<'_>) -> Result<(), ConfbindError> {
        (**self).walk(visit)
    }

    fn walk_mut(&mut self, visit: &mut VisitMut<'_>) -> Result<(), ConfbindError> {
        (**self).walk_mut(visit)
    }

    fn is_section(&self) -> bool {
        (**self).is_section()
    }
}

impl<N: Node + ?Sized> Node for &mut N {
    fn walk(&self, visit: &mut Visit<'_>) -> Result<(), ConfbindError> {
        (**self).walk(visit)
    }

    fn walk_mut(&mut self, visit: &mut VisitMut<'_>) -> Result<(), ConfbindError> {
        (**self).walk_mut(visit)
    }

    fn is_section(&self) -> bool {
        (**self).is_section()
    }
}

fn ensure_section<N: Node + ?Sized>(node: &N) -> Result<(), ConfbindError> {
    if node.is_section() {
        Ok(())
    } else {
        Err(ConfbindError::InvalidInput {
            type_name: std::any::type_name::<N>(),
        })
    }
}

/// Visit every configuration value in `node`, in declaration order.
///
/// `node` must be a configuration struct (or a box of one); anything else
/// fails with [`ConfbindError::InvalidInput`] naming the type. Traversal
/// stops at the first visitor error.
pub fn traverse<N, F>(node: &N, mut visit: F) -> Result<(), ConfbindError>
where
    N: Node + ?Sized,
    F: FnMut(&dyn AnyValue) -> Result<(), ConfbindError>,
{
    ensure_section(node)?;
    node.walk(&mut visit)
}

/// Like [`traverse`], with mutable access to each value.
pub fn traverse_mut<N, F>(node: &mut N, mut visit: F) -> Result<(), ConfbindError>
where
    N: Node + ?Sized,
    F: FnMut(&mut dyn AnyValue) -> Result<(), ConfbindError>,
{
    ensure_section(node)?;
    node.walk_mut(&mut visit)
}

/// Attach `store` to every value in `node`, binding their flags.
///
/// Attaching the same tree again rebinds it, to the same or another store.
pub fn attach<N: Node + ?Sized>(store: &Store, node: &mut N) -> Result<(), ConfbindError> {
    let mut count = 0usize;
    traverse_mut(node, |value| {
        count += 1;
        value.attach(store)
    })?;
    debug!(values = count, "Attached configuration tree");
    Ok(())
}

/// Keys of every value in `node`, in traversal order.
pub fn keys<N: Node + ?Sized>(node: &N) -> Result<Vec<String>, ConfbindError> {
    let mut keys = Vec::new();
    traverse(node, |value| {
        keys.push(value.key().to_string());
        Ok(())
    })?;
    Ok(keys)
}
