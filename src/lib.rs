//! Proof verifier kernel for the Metamath Zero (MM0) proof language.
//!
//! The kernel consumes an already-parsed [`Environment`] (the declared
//! theory), a proof script (a sequence of [`Stmt`]s produced by an untrusted
//! elaborator), and an input byte buffer, and decides whether every
//! declaration in the environment has been justified. It emits an ordered
//! sequence of output byte strings plus either acceptance or a list of
//! error diagnostics; the kernel is the trust boundary of the surrounding
//! toolchain, so nothing upstream of it is relied on for soundness.
//!
//! The main entry point is [`verify`], or [`Verifier`] for finer control.

// rust lints we want
#![warn(bare_trait_objects, elided_lifetimes_in_paths,
  missing_copy_implementations, missing_debug_implementations, future_incompatible,
  rust_2018_idioms, trivial_numeric_casts, variant_size_differences, unreachable_pub,
  unused, missing_docs)]
// all the clippy
#![warn(clippy::all, clippy::pedantic)]
// the clippy lints we don't want
#![allow(clippy::cognitive_complexity, clippy::default_trait_access,
  clippy::missing_errors_doc, clippy::missing_panics_doc,
  clippy::module_name_repetitions, clippy::shadow_unrelated,
  clippy::too_many_lines, clippy::use_self)]

#[macro_use] extern crate bitflags;

pub mod util;
pub mod environment;
pub mod script;
pub mod verify;
pub mod inout;

pub use environment::{AtomData, AtomId, Binder, Decl, DepType, Environment, Expr,
  Modifiers, SortId, Spec, TermId, ThmId, Type};
pub use script::{Conv, Proof, Stmt};
pub use util::{ArcString, BoxError};
pub use verify::{verify, DeclKey, Verifier, VerifyError};
