//! Binding cells for derivation over self-referential type graphs
//!
//! Deriving a converter for a type whose fields (directly or transitively)
//! mention the type itself would recurse forever if every nested dependency
//! were assembled eagerly. This module breaks such cycles with one lazily
//! populated binding cell per distinct type: a request for a type that is
//! still being assembled receives a *forward* converter that defers through
//! the cell, and the cell is populated exactly once when assembly of that
//! type completes. Forward converters and the finished converter then share
//! the same underlying pair, so mutually-recursive converters remain usable
//! against each other.
//!
//! A [`Knot`] is one derivation session. Sessions are single-threaded and
//! synchronous; the per-type cell is the only mutable state, and it moves
//! through exactly two states, unpopulated then populated. If assembly of a
//! type fails, every cell created during that assembly is torn down rather
//! than left half-built. Tearing down only the failing type's own cell
//! would not be enough: a dependent type populated mid-assembly can hold a
//! forward converter into the failed cell, and keeping it would let a later
//! request observe a converter whose forward reference can never resolve.

use crate::conv::{Converter, TreeCodec};
use crate::error::DeriveResult;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// The lazily-populated slot holding "the converter for a type currently
/// being derived".
struct KnotCell<T> {
    slot: RefCell<Option<Converter<T>>>,
}

impl<T: 'static> KnotCell<T> {
    fn new() -> Rc<Self> {
        Rc::new(KnotCell {
            slot: RefCell::new(None),
        })
    }

    fn populate(&self, conv: Converter<T>) {
        let mut slot = self.slot.borrow_mut();
        debug_assert!(slot.is_none(), "binding cell populated twice");
        *slot = Some(conv);
    }

    /// The populated converter. Panics if derivation has not completed,
    /// which is unreachable through the public API: a converter only
    /// escapes to a caller once its whole derivation frame has succeeded,
    /// and a failed frame tears down every cell it created, forward
    /// handles included.
    fn resolved(&self) -> Converter<T> {
        self.slot.borrow().clone().unwrap_or_else(|| {
            panic!(
                "converter for `{}` invoked before its derivation completed",
                std::any::type_name::<T>()
            )
        })
    }

    /// A converter that defers both directions through this cell.
    fn forward(self: &Rc<Self>) -> Converter<T> {
        let read_cell = Rc::clone(self);
        let write_cell = Rc::clone(self);
        Converter::from_fns(
            move |tree| read_cell.resolved().read(tree),
            move |value| write_cell.resolved().write(value),
        )
    }
}

/// One derivation session: a map from type identity to binding cell.
///
/// `resolve` is idempotent within a session; converters for types that have
/// already been assembled are returned from their cells without re-running
/// assembly.
pub struct Knot {
    cells: HashMap<TypeId, Rc<dyn Any>>,
    /// Cells created by resolve frames still on the call stack, in creation
    /// order; a failing frame drains its suffix to tear down its dependents.
    creations: Vec<TypeId>,
    depth: usize,
}

impl Knot {
    pub fn new() -> Self {
        Knot {
            cells: HashMap::new(),
            creations: Vec::new(),
            depth: 0,
        }
    }

    /// Obtains the converter for `T`, assembling it on first request.
    ///
    /// A re-entrant request for a `T` whose assembly is still in flight
    /// returns a forward converter bound to the in-flight cell; any other
    /// request returns a clone of the finished pair.
    pub fn resolve<T: TreeCodec>(&mut self) -> DeriveResult<Converter<T>> {
        let id = TypeId::of::<T>();
        if let Some(entry) = self.cells.get(&id) {
            let cell = cell_of::<T>(entry);
            let populated = cell.slot.borrow().clone();
            return Ok(match populated {
                Some(conv) => conv,
                None => cell.forward(),
            });
        }

        let mark = self.creations.len();
        let cell = KnotCell::<T>::new();
        self.cells.insert(id, Rc::clone(&cell) as Rc<dyn Any>);
        self.creations.push(id);
        self.depth += 1;
        let assembled = T::assemble(self);
        self.depth -= 1;
        match assembled {
            Ok(conv) => {
                cell.populate(conv.clone());
                if self.depth == 0 {
                    self.creations.clear();
                }
                Ok(conv)
            }
            Err(err) => {
                // Every cell this frame created may hold a forward
                // converter into the failed derivation; a later request
                // must re-run assembly rather than find a dead cell.
                for stale in self.creations.split_off(mark) {
                    self.cells.remove(&stale);
                }
                Err(err)
            }
        }
    }

    /// Number of types with a binding cell in this session.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Default for Knot {
    fn default() -> Self {
        Knot::new()
    }
}

fn cell_of<T: 'static>(entry: &Rc<dyn Any>) -> Rc<KnotCell<T>> {
    match Rc::clone(entry).downcast::<KnotCell<T>>() {
        Ok(cell) => cell,
        Err(_) => unreachable!("binding cell stored under a foreign TypeId"),
    }
}

thread_local! {
    static AMBIENT: RefCell<Knot> = RefCell::new(Knot::new());
}

/// Obtains the converter for `T` from the thread's ambient session,
/// memoizing it for subsequent requests on the same thread.
///
/// Failed derivations are not cached; a later call re-runs assembly.
pub fn converter<T: TreeCodec>() -> DeriveResult<Converter<T>> {
    AMBIENT.with(|knot| knot.borrow_mut().resolve::<T>())
}
