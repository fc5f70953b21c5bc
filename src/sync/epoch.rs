//! Generation tokens.
//!
//! Every logical run takes a fresh [`Generation`] from a shared [`Epoch`].
//! Async work carries its generation and checks it at each resumption point;
//! a mismatch means a newer run exists and the result must be dropped.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
	pub fn value(self) -> u64 {
		self.0
	}
}

#[derive(Clone, Debug, Default)]
pub struct Epoch(Rc<Cell<u64>>);

impl Epoch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Start a new generation, invalidating every earlier one.
	pub fn advance(&self) -> Generation {
		let next = self.0.get() + 1;
		self.0.set(next);
		Generation(next)
	}

	pub fn current(&self) -> Generation {
		Generation(self.0.get())
	}

	pub fn is_current(&self, generation: Generation) -> bool {
		self.0.get() == generation.0
	}
}
