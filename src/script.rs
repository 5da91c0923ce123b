//! The proof script: the sequence of verification statements produced by an
//! (untrusted) elaborator, checked by the [`Verifier`](crate::verify::Verifier)
//! in lockstep with the environment's spec stream.

use crate::environment::{AtomId, Binder, DepType, Expr, SortId, TermId, ThmId};

/// A proof term, checked against a theorem statement by the proof checker.
#[derive(Clone, Debug)]
pub enum Proof {
  /// A reference to a named subproof on the local proof heap.
  Hyp(AtomId),
  /// An application of a theorem to a substitution for its binders and
  /// subproofs for its hypotheses.
  Thm(ThmId, Box<[Expr]>, Box<[Proof]>),
  /// `Conv(tgt, c, p)` proves `tgt` if `p` proves `e` and `c` proves `tgt = e`.
  Conv(Expr, Conv, Box<Proof>),
  /// `Let(h, p1, p2)` binds the conclusion of `p1` under the name `h` on the
  /// heap for the duration of `p2`.
  Let(AtomId, Box<Proof>, Box<Proof>),
  /// A proof placeholder. Rejected unconditionally.
  Sorry,
}

/// A conversion: a witness of definitional equality between two expressions.
/// The relation is the reflexive-symmetric-congruence-definitional closure;
/// transitivity is not a syntactic form.
#[derive(Clone, Debug)]
pub enum Conv {
  /// Reflexivity at a variable.
  Var(AtomId),
  /// Congruence: `CApp(t, cs)` proves `t l1 .. ln = t r1 .. rn` if
  /// `cs[i]` proves `li = ri`.
  App(TermId, Box<[Conv]>),
  /// Symmetry: swaps the sides of the inner conversion.
  Sym(Box<Conv>),
  /// `CUnfold(t, es, vs, c)` proves `t es = r` if `t` is a definition whose
  /// body, substituted with `es` for the parameters and the variables `vs`
  /// for the dummies, is proven equal to `r` by `c`.
  Unfold(TermId, Box<[Expr]>, Box<[AtomId]>, Box<Conv>),
}

/// A statement of the proof script.
#[derive(Clone, Debug)]
pub enum Stmt {
  /// Accept the next `sort` spec.
  Sort(AtomId),
  /// Accept the next opaque `term` spec.
  Term(AtomId),
  /// Accept the next `axiom` spec.
  Axiom(AtomId),
  /// Check a definition and insert it into the term table.
  Def {
    /// The name of the definition.
    name: AtomId,
    /// The argument binders.
    args: Box<[Binder]>,
    /// The return sort and dependencies.
    ret: DepType,
    /// Bound variables local to the body.
    dummies: Box<[(AtomId, SortId)]>,
    /// The definition body.
    val: Expr,
    /// If true, the next environment spec must be the matching `def`;
    /// if false the definition is local and no spec is consumed.
    check: bool,
  },
  /// Check a theorem's proof and insert it into the theorem table.
  Thm {
    /// The name of the theorem.
    name: AtomId,
    /// The argument binders.
    args: Box<[Binder]>,
    /// The named hypotheses, seeding the proof heap.
    hyps: Box<[(AtomId, Expr)]>,
    /// The conclusion.
    ret: Expr,
    /// Bound variables local to the proof.
    dummies: Box<[(AtomId, SortId)]>,
    /// The proof term.
    proof: Proof,
    /// If true, the next environment spec must be the matching theorem
    /// statement; if false the theorem is local and no spec is consumed.
    check: bool,
  },
  /// Run the next `input` (`out = false`) or `output` (`out = true`)
  /// directive from the environment.
  Inout {
    /// True for `output`, false for `input`.
    out: bool,
  },
}
