//! The kernel's input [`Environment`]: the declared logical theory that the
//! proof script is checked against.
//!
//! The environment is produced by an (untrusted) parser frontend and consumed
//! read-only by the [`Verifier`](crate::verify::Verifier). It consists of an
//! ordered stream of [`Spec`]s plus an atom table interning all names that
//! appear in the theory and in diagnostics.

use std::collections::HashMap;
use std::fmt;
use std::iter::FromIterator;
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::rc::Rc;
use crate::util::ArcString;

macro_rules! id_wrapper {
  ($id:ident: $ty:ty, $vec:ident) => {
    id_wrapper!($id: $ty, $vec,
      concat!("An index into a [`", stringify!($vec), "`](struct.", stringify!($vec), ".html)"));
  };
  ($id:ident: $ty:ty, $vec:ident, $svec:expr) => {
    #[doc=$svec]
    #[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
    pub struct $id(pub $ty);

    impl fmt::Debug for $id {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
    }

    /// A vector wrapper with a strongly typed index interface.
    #[derive(Clone, Debug)]
    pub struct $vec<T>(pub Vec<T>);

    #[allow(dead_code)]
    impl<T> $vec<T> {
      /// Get a reference to the element at the given index.
      #[must_use] pub fn get(&self, i: $id) -> Option<&T> { self.0.get(i.0 as usize) }
      /// Get a mutable reference to the element at the given index.
      pub fn get_mut(&mut self, i: $id) -> Option<&mut T> { self.0.get_mut(i.0 as usize) }
      /// Push a new element to the vector, and return the ID of the element just pushed.
      pub fn push(&mut self, t: T) -> $id {
        let n = $id(self.0.len() as $ty);
        self.0.push(t);
        n
      }
    }
    impl<T> Default for $vec<T> {
      fn default() -> $vec<T> { $vec(Vec::new()) }
    }
    impl<T> Index<$id> for $vec<T> {
      type Output = T;
      fn index(&self, i: $id) -> &T { &self.0[i.0 as usize] }
    }
    impl<T> IndexMut<$id> for $vec<T> {
      fn index_mut(&mut self, i: $id) -> &mut T { &mut self.0[i.0 as usize] }
    }
    impl<T> Deref for $vec<T> {
      type Target = Vec<T>;
      fn deref(&self) -> &Vec<T> { &self.0 }
    }
    impl<T> DerefMut for $vec<T> {
      fn deref_mut(&mut self) -> &mut Vec<T> { &mut self.0 }
    }
    impl<T> FromIterator<T> for $vec<T> {
      fn from_iter<I: IntoIterator<Item=T>>(iter: I) -> Self { $vec(Vec::from_iter(iter)) }
    }
  };
}

id_wrapper!(SortId: u8, SortVec);
id_wrapper!(TermId: u32, TermVec);
id_wrapper!(ThmId: u32, ThmVec);
id_wrapper!(AtomId: u32, AtomVec);

bitflags! {
  /// Sort modifiers, any subset of `pure`, `strict`, `provable`, `free`.
  pub struct Modifiers: u8 {
    /// The `pure` sort modifier, used to indicate that
    /// term constructors can not target this sort.
    const PURE = 1;
    /// The `strict` sort modifier, used to indicate that
    /// bound variables of this sort are not allowed.
    const STRICT = 2;
    /// The `provable` sort modifier, used to indicate that this sort
    /// can appear as the sort of hypotheses and conclusions of
    /// `axiom` and `theorem` declarations.
    const PROVABLE = 4;
    /// The `free` sort modifier, used to indicate that
    /// dummy variables of this sort are not allowed.
    const FREE = 8;
  }
}

impl Modifiers {
  /// The null modifier set. Modifiers are represented as bitfields, so this is the same as `0`.
  pub const NONE: Modifiers = Self::empty();
}

/// The type of a variable in a binder list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
  /// A bound variable `{x : s}`.
  Bound(SortId),
  /// A regular variable `(ph : s x y z)`, which may mention the listed
  /// bound variables, all of which must be declared earlier in the binder list.
  Reg(SortId, Box<[AtomId]>),
}

impl Type {
  /// The sort of a type.
  #[must_use] pub fn sort(&self) -> SortId {
    match *self {
      Type::Bound(s) | Type::Reg(s, _) => s,
    }
  }
  /// True if the type is a bound variable.
  #[must_use] pub fn bound(&self) -> bool { matches!(self, Type::Bound(_)) }
}

/// A named variable binder in an `axiom`/`term`/`def`/`theorem` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binder {
  /// The name of the variable being bound.
  pub name: AtomId,
  /// The type of the variable.
  pub ty: Type,
}

impl Binder {
  /// The sort of the bound variable.
  #[must_use] pub fn sort(&self) -> SortId { self.ty.sort() }
  /// True if this binder introduces a bound variable.
  #[must_use] pub fn bound(&self) -> bool { self.ty.bound() }
}

/// The return type of a term constructor: a sort together with the
/// bound variables of the binder list that the result may depend on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepType {
  /// The sort of the result.
  pub sort: SortId,
  /// The names of bound variables the result depends on.
  pub deps: Box<[AtomId]>,
}

/// An expression in the term algebra. Well-formedness is extrinsic: it is
/// established by the verifier's typechecker relative to a variable context.
#[derive(Clone, Debug)]
pub enum Expr {
  /// A reference to a variable of the enclosing binder list (or a dummy).
  Var(AtomId),
  /// An application of a term constructor to argument subterms.
  App(TermId, Rc<[Expr]>),
}

impl Expr {
  /// Build an application node.
  #[must_use] pub fn app(term: TermId, es: Vec<Expr>) -> Expr { Expr::App(term, es.into()) }
}

impl PartialEq for Expr {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Expr::Var(v1), Expr::Var(v2)) => v1 == v2,
      (Expr::App(t1, es1), Expr::App(t2, es2)) =>
        t1 == t2 && (Rc::ptr_eq(es1, es2) || es1 == es2),
      _ => false,
    }
  }
}
impl Eq for Expr {}

/// A term, definition or axiom declaration in the environment spec stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decl {
  /// An opaque term constructor.
  Term {
    /// The argument binders.
    args: Box<[Binder]>,
    /// The return sort and dependencies.
    ret: DepType,
  },
  /// A term constructor with a definition that can be unfolded.
  Def {
    /// The argument binders.
    args: Box<[Binder]>,
    /// The return sort and dependencies.
    ret: DepType,
    /// Bound variables local to the definition body.
    dummies: Box<[(AtomId, SortId)]>,
    /// The definition body.
    val: Expr,
  },
  /// An axiom: a theorem that carries no proof obligation.
  Axiom {
    /// The argument binders.
    args: Box<[Binder]>,
    /// The hypotheses.
    hyps: Box<[Expr]>,
    /// The conclusion.
    ret: Expr,
  },
}

/// One element of the environment's ordered specification stream. The
/// verifier driver pops these in lockstep with the proof script.
#[derive(Clone, Debug)]
pub enum Spec {
  /// A sort declaration.
  Sort(AtomId, Modifiers),
  /// A term, definition or axiom declaration.
  Decl(AtomId, Decl),
  /// A theorem declaration, which the script must discharge with a proof.
  Thm {
    /// The name of the theorem.
    name: AtomId,
    /// The argument binders.
    args: Box<[Binder]>,
    /// The hypotheses.
    hyps: Box<[Expr]>,
    /// The conclusion.
    ret: Expr,
  },
  /// An `input`/`output` directive over the string theory.
  Inout {
    /// True for `output`, false for `input`.
    out: bool,
    /// The string expression to reduce.
    val: Expr,
  },
}

/// The name data associated to an [`AtomId`].
#[derive(Clone, Debug)]
pub struct AtomData {
  /// The string form of the atom.
  pub name: ArcString,
}

/// The verifier's read-only input: the interned name tables and the
/// specification stream of the declared theory.
#[derive(Clone, Debug, Default)]
pub struct Environment {
  /// The atom table, mapping ids to names.
  pub data: AtomVec<AtomData>,
  /// The inverse of `data`, mapping names to ids.
  atoms: HashMap<ArcString, AtomId>,
  /// The ordered specification stream.
  pub specs: Vec<Spec>,
}

impl Environment {
  /// Make a new empty environment.
  #[must_use] pub fn new() -> Environment { Self::default() }

  /// Intern the string `s`, returning its atom.
  pub fn get_atom(&mut self, s: &str) -> AtomId {
    match self.atoms.get(s) {
      Some(&a) => a,
      None => {
        let name = ArcString::new(s.to_owned());
        let a = self.data.push(AtomData { name: name.clone() });
        self.atoms.insert(name, a);
        a
      }
    }
  }

  /// Look up an already-interned string, without extending the atom table.
  #[must_use] pub fn atom(&self, s: &str) -> Option<AtomId> { self.atoms.get(s).copied() }

  /// Append a specification to the stream.
  pub fn push_spec(&mut self, spec: Spec) { self.specs.push(spec) }
}
