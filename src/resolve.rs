// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Dereferencing helper for type-erased values.
//!
//! Values arriving from a mutation hook are `&dyn Any`, and the concrete
//! record may sit behind several owned indirections (`Box<dyn Any>`,
//! `Arc<dyn Any>`, optionally wrapped in `Option`). [`resolve`] peels those
//! layers one at a time until it reaches a value that is not an indirection.
//!
//! Typed call sites never need this: auto-deref already reaches the record.
//! Typed pointers such as `Box<R>` are concrete types and are left for the
//! registry to match.
//!
//! Termination: every step moves strictly into the value owned by the current
//! layer, and the walk is additionally capped at [`MAX_INDIRECTIONS`].

use std::any::Any;
use std::sync::Arc;

/// Upper bound on layers followed by [`resolve`].
pub const MAX_INDIRECTIONS: usize = 64;

type DynAny = dyn Any + Send + Sync;

/// Resolve a value through its indirection chain.
///
/// Returns `None` when the chain ends in an empty `Option` (an absent value).
pub fn resolve(value: &dyn Any) -> Option<&dyn Any> {
    let mut current = value;

    for _ in 0..MAX_INDIRECTIONS {
        match step(current) {
            Step::Into(next) => current = next,
            Step::Absent => return None,
            Step::Done => return Some(current),
        }
    }

    Some(current)
}

enum Step<'a> {
    Into(&'a dyn Any),
    Absent,
    Done,
}

/// Follow exactly one level of indirection.
fn step(value: &dyn Any) -> Step<'_> {
    if let Some(inner) = value.downcast_ref::<Box<DynAny>>() {
        return Step::Into(upcast(&**inner));
    }
    if let Some(inner) = value.downcast_ref::<Arc<DynAny>>() {
        return Step::Into(upcast(&**inner));
    }
    if let Some(inner) = value.downcast_ref::<Option<Box<DynAny>>>() {
        return match inner {
            Some(inner) => Step::Into(upcast(&**inner)),
            None => Step::Absent,
        };
    }
    if let Some(inner) = value.downcast_ref::<Option<Arc<DynAny>>>() {
        return match inner {
            Some(inner) => Step::Into(upcast(&**inner)),
            None => Step::Absent,
        };
    }
    Step::Done
}

fn upcast(value: &DynAny) -> &dyn Any {
    value
}
