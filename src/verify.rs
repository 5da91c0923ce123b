//! The verifier kernel: checks a proof script against the environment's
//! specification stream.
//!
//! The [`Verifier`] owns the sort/term/theorem tables, which grow
//! monotonically as declarations are accepted. Each declaration check runs
//! with a fresh variable context and (for theorems) a fresh proof heap; the
//! first error inside a declaration short-circuits and is recorded in the
//! error log under the declaration's name, after which the driver moves on
//! to the next statement. Shape errors (the script diverging from the spec
//! stream) abort the run.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};

use itertools::Itertools;

use crate::environment::{AtomId, Binder, Decl, DepType, Environment, Expr, Modifiers,
  SortId, SortVec, Spec, TermId, TermVec, ThmId, ThmVec, Type};
use crate::inout::InoutHandlers;
use crate::script::{Conv, Proof, Stmt};
use crate::util::{BoxError, HashMapExt};

/// The maximum number of sorts, pinned by the `u8` representation of [`SortId`].
const MAX_SORTS: usize = 128;

/// Errors that can appear during verification.
#[derive(Debug)]
pub enum VerifyError {
  /// The script statement does not match the next environment spec.
  IncorrectStep(String),
  /// The environment's spec stream ran out before the script did.
  NothingToProve,
  /// The script ended with specs left unjustified.
  Unfinished,
  /// A top-level name was declared more than once.
  DuplicateDecl(AtomId),
  /// A binder name was declared more than once in the same context.
  DuplicateVar(AtomId),
  /// A dummy variable collides with another context entry.
  DuplicateDummy(AtomId),
  /// A dependency does not refer to a bound variable in scope.
  UnboundDependency(AtomId),
  /// A hypothesis name was bound more than once on the proof heap.
  DuplicateHyp(AtomId),
  /// A reference to a hypothesis that is not on the proof heap.
  UnknownHyp(AtomId),
  /// A sort id that is not in the sort table.
  UnknownSort,
  /// A term id that is not in the term table.
  UnknownTerm,
  /// A theorem id that is not in the theorem table.
  UnknownThm,
  /// A variable that is not in the context.
  UnknownVar(AtomId),
  /// Bound variable declared in a `strict` sort.
  BoundInStrictSort(AtomId),
  /// Dummy variable declared in a `free` sort.
  DummyInFreeSort(AtomId),
  /// Term constructor declared in a `pure` sort.
  TermInPureSort,
  /// Theorem hypothesis or conclusion not in a `provable` sort.
  NotProvable,
  /// Expected sort `expected`, got `got`.
  SortError {
    /// The sort demanded by the binder or return type.
    expected: SortId,
    /// The sort the expression actually has.
    got: SortId,
  },
  /// Expected a bound variable in a BV slot, got an expression.
  BoundExpected,
  /// Expected `expected` args, got `got`.
  ArgMismatch {
    /// The declared arity.
    expected: usize,
    /// The number of arguments supplied.
    got: usize,
  },
  /// A definition body depends on bound variables not listed in its return type.
  UnaccountedDeps(Vec<AtomId>),
  /// Disjoint variable violation when applying a theorem or unfolding.
  DisjointVariableViolation,
  /// Subproof `i` proved something other than the instantiated hypothesis.
  HypUnifyFailure(usize),
  /// The proof proved something other than the declared conclusion.
  ThmUnifyFailure,
  /// A conversion does not relate the two expressions it was matched against.
  ConvUnifyFailure,
  /// Cannot unfold a non-definition.
  UnfoldNonDef,
  /// The proof uses `sorry`.
  UsesSorry,
  /// A free-form error message.
  Boxed(BoxError),
}

impl VerifyError {
  /// Convert this error to an error message.
  pub fn render<W: Write>(&self, ver: &Verifier<'_>, w: &mut W) -> fmt::Result {
    match *self {
      VerifyError::IncorrectStep(ref s) => write!(w, "incorrect step '{}'", s),
      VerifyError::NothingToProve => write!(w, "nothing more to prove"),
      VerifyError::Unfinished => write!(w, "Not all theorems have been proven"),
      VerifyError::DuplicateDecl(a) =>
        write!(w, "duplicate declaration of '{}'", ver.atom_str(a)),
      VerifyError::DuplicateVar(a) =>
        write!(w, "duplicate variable '{}'", ver.atom_str(a)),
      VerifyError::DuplicateDummy(a) =>
        write!(w, "dummy {} declared more than once", ver.atom_str(a)),
      VerifyError::UnboundDependency(a) =>
        write!(w, "dependency '{}' is not a bound variable in scope", ver.atom_str(a)),
      VerifyError::DuplicateHyp(a) =>
        write!(w, "hypothesis '{}' declared more than once", ver.atom_str(a)),
      VerifyError::UnknownHyp(a) =>
        write!(w, "hypothesis '{}' not found", ver.atom_str(a)),
      VerifyError::UnknownSort => write!(w, "reference to undeclared sort"),
      VerifyError::UnknownTerm => write!(w, "reference to undeclared term"),
      VerifyError::UnknownThm => write!(w, "reference to undeclared theorem"),
      VerifyError::UnknownVar(a) =>
        write!(w, "variable '{}' not declared", ver.atom_str(a)),
      VerifyError::BoundInStrictSort(a) =>
        write!(w, "bound variable {} declared in a `strict` sort", ver.atom_str(a)),
      VerifyError::DummyInFreeSort(a) =>
        write!(w, "dummy variable {} declared in a `free` sort", ver.atom_str(a)),
      VerifyError::TermInPureSort => write!(w, "term declared in a `pure` sort"),
      VerifyError::NotProvable =>
        write!(w, "theorem hypothesis or conclusion not in a `provable` sort"),
      VerifyError::SortError { expected, got } =>
        write!(w, "expected sort {}, got {}", ver.sort_str(expected), ver.sort_str(got)),
      VerifyError::BoundExpected => write!(w, "expected bound variable, got expression"),
      VerifyError::ArgMismatch { expected, got } =>
        write!(w, "expected {} args, got {}", expected, got),
      VerifyError::UnaccountedDeps(ref vs) => write!(w, "unaccounted dependencies: {}",
        vs.iter().map(|&a| ver.atom_str(a)).format(", ")),
      VerifyError::DisjointVariableViolation => write!(w, "disjoint variable violation"),
      VerifyError::HypUnifyFailure(i) =>
        write!(w, "subproof {} failed to prove what it should", i + 1),
      VerifyError::ThmUnifyFailure =>
        write!(w, "theorem proved one thing but the signature claims something else"),
      VerifyError::ConvUnifyFailure => write!(w, "conv proved the wrong thing"),
      VerifyError::UnfoldNonDef => write!(w, "cannot unfold a non-definition"),
      VerifyError::UsesSorry => write!(w, "definition or theorem uses `sorry`"),
      VerifyError::Boxed(ref e) => write!(w, "{}", e),
    }
  }

  /// Convert this error to an error message.
  #[must_use] pub fn render_to_string(&self, ver: &Verifier<'_>) -> String {
    let mut s = String::new();
    self.render(ver, &mut s).expect("impossible");
    s
  }
}

/// A declaration key: terms and theorems share a namespace.
#[derive(Copy, Clone, Debug)]
pub enum DeclKey {
  /// A term or def, with its id.
  Term(TermId),
  /// An axiom or theorem, with its id.
  Thm(ThmId),
}

/// An accepted sort.
#[derive(Copy, Clone, Debug)]
pub struct Sort {
  /// The sort's name.
  pub atom: AtomId,
  /// The sort modifiers.
  pub mods: Modifiers,
}

/// The unfoldable part of a definition.
#[derive(Clone, Debug)]
pub struct TermDef {
  /// Bound variables local to the body.
  pub dummies: Box<[(AtomId, SortId)]>,
  /// The definition body.
  pub val: Expr,
}

/// An accepted term constructor or definition.
#[derive(Clone, Debug)]
pub struct Term {
  /// The term's name.
  pub atom: AtomId,
  /// The argument binders.
  pub args: Box<[Binder]>,
  /// The return sort and dependencies.
  pub ret: DepType,
  /// The definition, if this is a `def` rather than an opaque `term`.
  pub def: Option<TermDef>,
}

/// An accepted axiom or theorem.
#[derive(Clone, Debug)]
pub struct Thm {
  /// The theorem's name.
  pub atom: AtomId,
  /// The argument binders.
  pub args: Box<[Binder]>,
  /// The hypotheses.
  pub hyps: Box<[Expr]>,
  /// The conclusion.
  pub ret: Expr,
}

/// The kind of a context variable. Regular variables carry their declared
/// bound-variable dependencies, which the disjointness checks close over.
#[derive(Copy, Clone, Debug)]
pub(crate) enum VarKind<'a> {
  /// A bound variable of the given sort.
  Bound(SortId),
  /// A regular (open term) variable with its dependency list.
  Reg(SortId, &'a [AtomId]),
}

/// A variable context, built fresh for each declaration.
pub(crate) type Ctx<'a> = HashMap<AtomId, VarKind<'a>>;

/// True if an expression with literal free variables `fvs` can mention the
/// bound variable `v` after instantiation: either `v` occurs literally, or
/// some regular variable in `fvs` declares `v` among its dependencies.
fn mentions(ctx: &Ctx<'_>, fvs: &HashSet<AtomId>, v: AtomId) -> bool {
  fvs.contains(&v) ||
    fvs.iter().any(|x| matches!(ctx.get(x), Some(VarKind::Reg(_, deps)) if deps.contains(&v)))
}

/// Apply a substitution to an expression. Every free variable of `e` must be
/// in the domain of `subst`.
fn subst_expr(subst: &HashMap<AtomId, Expr>, e: &Expr) -> Result<Expr, VerifyError> {
  match *e {
    Expr::Var(v) => subst.get(&v).cloned().ok_or(VerifyError::UnknownVar(v)),
    Expr::App(t, ref es) => Ok(Expr::App(t,
      es.iter().map(|e| subst_expr(subst, e)).collect::<Result<_, _>>()?)),
  }
}

/// The verifier state: the accepted tables, the cursor into the spec stream,
/// and the accumulated outputs and diagnostics.
#[derive(Debug)]
pub struct Verifier<'a> {
  /// The environment being verified.
  pub env: &'a Environment,
  /// The input buffer checked by `input string` directives.
  pub(crate) input: &'a [u8],
  /// The cursor into `env.specs`.
  spec_idx: usize,
  /// The accepted sorts.
  pub sorts: SortVec<Sort>,
  /// The accepted terms and definitions.
  pub terms: TermVec<Term>,
  /// The accepted axioms and theorems.
  pub thms: ThmVec<Thm>,
  /// Named lookup for sorts.
  pub(crate) sort_names: HashMap<AtomId, SortId>,
  /// Named lookup for terms and theorems (shared namespace).
  pub(crate) decl_names: HashMap<AtomId, DeclKey>,
  /// Cached handlers for the string I/O interpreter.
  pub(crate) inout: InoutHandlers,
  /// The byte strings emitted by `output string` directives, in order.
  pub outputs: Vec<Box<[u8]>>,
  /// The accumulated diagnostics, in order.
  pub errors: Vec<String>,
}

impl<'a> Verifier<'a> {
  /// Make a new verifier with empty tables.
  #[must_use] pub fn new(env: &'a Environment, input: &'a [u8]) -> Verifier<'a> {
    Verifier {
      env,
      input,
      spec_idx: 0,
      sorts: Default::default(),
      terms: Default::default(),
      thms: Default::default(),
      sort_names: HashMap::new(),
      decl_names: HashMap::new(),
      inout: Default::default(),
      outputs: vec![],
      errors: vec![],
    }
  }

  /// The name of an atom, for error messages.
  pub(crate) fn atom_str(&self, a: AtomId) -> &str {
    self.env.data.get(a).map_or("_", |ad| &*ad.name)
  }

  /// The name of a sort, for error messages.
  pub(crate) fn sort_str(&self, s: SortId) -> &str {
    self.sorts.get(s).map_or("_", |sd| self.atom_str(sd.atom))
  }

  pub(crate) fn sort(&self, s: SortId) -> Result<&Sort, VerifyError> {
    self.sorts.get(s).ok_or(VerifyError::UnknownSort)
  }

  pub(crate) fn term(&self, t: TermId) -> Result<&Term, VerifyError> {
    self.terms.get(t).ok_or(VerifyError::UnknownTerm)
  }

  fn thm(&self, t: ThmId) -> Result<&Thm, VerifyError> {
    self.thms.get(t).ok_or(VerifyError::UnknownThm)
  }

  /// Record a diagnostic for the declaration named `name` and keep going.
  fn report(&mut self, name: AtomId, e: &VerifyError) {
    let msg = format!("{}: {}", self.atom_str(name), e.render_to_string(self));
    self.errors.push(msg);
  }

  /// Record a diagnostic with no declaration context.
  fn report_raw(&mut self, e: &VerifyError) {
    let msg = e.render_to_string(self);
    self.errors.push(msg);
  }

  /// Extend `ctx` with the binder list, enforcing the scope discipline:
  /// no shadowing, no bound variables at strict sorts, dependencies must
  /// name bound variables already in context.
  fn build_context<'b>(&self, ctx: &mut Ctx<'b>, binders: &'b [Binder]) -> Result<(), VerifyError> {
    for bi in binders {
      match bi.ty {
        Type::Bound(s) => {
          let sd = self.sort(s)?;
          if sd.mods.contains(Modifiers::STRICT) {
            return Err(VerifyError::BoundInStrictSort(bi.name))
          }
          if ctx.try_insert_ext(bi.name, VarKind::Bound(s)).is_some() {
            return Err(VerifyError::DuplicateVar(bi.name))
          }
        }
        Type::Reg(s, ref deps) => {
          self.sort(s)?;
          for d in &**deps {
            if !matches!(ctx.get(d), Some(VarKind::Bound(_))) {
              return Err(VerifyError::UnboundDependency(*d))
            }
          }
          if ctx.try_insert_ext(bi.name, VarKind::Reg(s, &**deps)).is_some() {
            return Err(VerifyError::DuplicateVar(bi.name))
          }
        }
      }
    }
    Ok(())
  }

  /// Extend `ctx` with dummy variables, which are bound and may not live in
  /// `strict` or `free` sorts.
  fn add_dummies(&self, ctx: &mut Ctx<'_>, dummies: &[(AtomId, SortId)]) -> Result<(), VerifyError> {
    for &(v, s) in dummies {
      let sd = self.sort(s)?;
      if sd.mods.contains(Modifiers::STRICT) { return Err(VerifyError::BoundInStrictSort(v)) }
      if sd.mods.contains(Modifiers::FREE) { return Err(VerifyError::DummyInFreeSort(v)) }
      if ctx.try_insert_ext(v, VarKind::Bound(s)).is_some() {
        return Err(VerifyError::DuplicateDummy(v))
      }
    }
    Ok(())
  }

  /// Typecheck an expression, returning its sort, whether it is a bound
  /// variable, and its (literal) free variable set.
  pub(crate) fn typecheck(&self, ctx: &Ctx<'_>, e: &Expr)
      -> Result<(SortId, bool, HashSet<AtomId>), VerifyError> {
    Ok(match *e {
      Expr::Var(v) => match ctx.get(&v) {
        Some(&VarKind::Bound(s)) => (s, true, std::iter::once(v).collect()),
        Some(&VarKind::Reg(s, _)) => (s, false, std::iter::once(v).collect()),
        None => return Err(VerifyError::UnknownVar(v)),
      },
      Expr::App(t, ref es) => {
        let td = self.term(t)?;
        if td.args.len() != es.len() {
          return Err(VerifyError::ArgMismatch { expected: td.args.len(), got: es.len() })
        }
        let mut fvs = HashSet::new();
        for (bi, e) in td.args.iter().zip(&**es) {
          let (s, bv, fv) = self.typecheck(ctx, e)?;
          if s != bi.sort() {
            return Err(VerifyError::SortError { expected: bi.sort(), got: s })
          }
          if bi.bound() && !bv { return Err(VerifyError::BoundExpected) }
          fvs.extend(fv);
        }
        (td.ret.sort, false, fvs)
      }
    })
  }

  /// Typecheck the arguments of a theorem application or definition
  /// unfolding against its binder list, enforcing the disjoint-variable
  /// side conditions, and build the substitution map.
  ///
  /// A bound slot must receive a variable that no earlier argument can
  /// mention (which also keeps bound substitutions pairwise distinct), and
  /// an expression in a regular slot must not mention the variable given to
  /// an earlier bound slot unless the regular binder declared a dependency
  /// on it.
  fn verify_args(&self, ctx: &Ctx<'_>, args: &[Binder], es: &[Expr])
      -> Result<HashMap<AtomId, Expr>, VerifyError> {
    struct ArgInfo<'c> {
      binder: &'c Binder,
      bv: Option<AtomId>,
      fvs: HashSet<AtomId>,
    }
    if args.len() != es.len() {
      return Err(VerifyError::ArgMismatch { expected: args.len(), got: es.len() })
    }
    let mut prev: Vec<ArgInfo<'_>> = Vec::with_capacity(args.len());
    for (bi, e) in args.iter().zip(es) {
      let (s, is_bv, fvs) = self.typecheck(ctx, e)?;
      if s != bi.sort() {
        return Err(VerifyError::SortError { expected: bi.sort(), got: s })
      }
      let bv = match bi.ty {
        Type::Bound(_) => {
          if !is_bv { return Err(VerifyError::BoundExpected) }
          let v = match *e {
            Expr::Var(v) => v,
            Expr::App(..) => unreachable!("bound values are variables"),
          };
          for p in &prev {
            if mentions(ctx, &p.fvs, v) {
              return Err(VerifyError::DisjointVariableViolation)
            }
          }
          Some(v)
        }
        Type::Reg(_, ref allowed) => {
          for p in &prev {
            if let Some(vj) = p.bv {
              if !allowed.contains(&p.binder.name) && mentions(ctx, &fvs, vj) {
                return Err(VerifyError::DisjointVariableViolation)
              }
            }
          }
          None
        }
      };
      prev.push(ArgInfo { binder: bi, bv, fvs });
    }
    Ok(args.iter().zip(es).map(|(bi, e)| (bi.name, e.clone())).collect())
  }

  /// The dependency-tracking variant of the typechecker, used to validate
  /// definition bodies. The returned set contains the bound variables in
  /// context that the expression can mention after full unfolding: a bound
  /// variable passed at a position the callee declared independent of a
  /// regular argument is subtracted back out, and the callee's return
  /// dependencies are mapped to the concrete variables at those positions.
  fn track_deps(&self, ctx: &Ctx<'_>, e: &Expr)
      -> Result<(SortId, bool, HashSet<AtomId>), VerifyError> {
    Ok(match *e {
      Expr::Var(v) => match ctx.get(&v) {
        Some(&VarKind::Bound(s)) => (s, true, std::iter::once(v).collect()),
        Some(&VarKind::Reg(s, deps)) => (s, false, deps.iter().copied().collect()),
        None => return Err(VerifyError::UnknownVar(v)),
      },
      Expr::App(t, ref es) => {
        let td = self.term(t)?;
        if td.args.len() != es.len() {
          return Err(VerifyError::ArgMismatch { expected: td.args.len(), got: es.len() })
        }
        let mut bmap = HashMap::new();
        let mut accum = HashSet::new();
        for (bi, e) in td.args.iter().zip(&**es) {
          let (s, bv, mut fv) = self.track_deps(ctx, e)?;
          if s != bi.sort() {
            return Err(VerifyError::SortError { expected: bi.sort(), got: s })
          }
          match bi.ty {
            Type::Bound(_) => {
              if !bv { return Err(VerifyError::BoundExpected) }
              let v = match *e {
                Expr::Var(v) => v,
                Expr::App(..) => unreachable!("bound values are variables"),
              };
              bmap.insert(bi.name, v);
            }
            Type::Reg(_, ref allowed) => {
              for d in &**allowed {
                if let Some(v) = bmap.get(d) { fv.remove(v); }
              }
              accum.extend(fv);
            }
          }
        }
        for d in &*td.ret.deps {
          if let Some(&v) = bmap.get(d) { accum.insert(v); }
        }
        (td.ret.sort, false, accum)
      }
    })
  }

  /// Check the signature of an opaque term declaration: the binder list is
  /// scope-checked, the return dependencies must name bound binders, and the
  /// return sort must not be `pure`.
  fn check_term_sig(&self, args: &[Binder], ret: &DepType) -> Result<(), VerifyError> {
    let mut ctx = Ctx::new();
    self.build_context(&mut ctx, args)?;
    for d in &*ret.deps {
      if !matches!(ctx.get(d), Some(VarKind::Bound(_))) {
        return Err(VerifyError::UnboundDependency(*d))
      }
    }
    let sd = self.sort(ret.sort)?;
    if sd.mods.contains(Modifiers::PURE) { return Err(VerifyError::TermInPureSort) }
    Ok(())
  }

  /// Check a definition: the signature as for a term, then the body under
  /// the dummies, which must have the declared return sort and no
  /// dependencies on bound variables beyond the declared ones.
  fn check_def(&self, args: &[Binder], ret: &DepType,
      dummies: &[(AtomId, SortId)], val: &Expr) -> Result<(), VerifyError> {
    let mut ctx = Ctx::new();
    self.build_context(&mut ctx, args)?;
    for d in &*ret.deps {
      if !matches!(ctx.get(d), Some(VarKind::Bound(_))) {
        return Err(VerifyError::UnboundDependency(*d))
      }
    }
    let sd = self.sort(ret.sort)?;
    if sd.mods.contains(Modifiers::PURE) { return Err(VerifyError::TermInPureSort) }
    self.add_dummies(&mut ctx, dummies)?;
    let (s, _, fvs) = self.track_deps(&ctx, val)?;
    if s != ret.sort {
      return Err(VerifyError::SortError { expected: ret.sort, got: s })
    }
    let mut extra: Vec<AtomId> = fvs.into_iter().filter(|v| !ret.deps.contains(v)).collect();
    if !extra.is_empty() {
      extra.sort_unstable();
      return Err(VerifyError::UnaccountedDeps(extra))
    }
    Ok(())
  }

  /// Typecheck a hypothesis or conclusion, which must land in a `provable` sort.
  fn check_provable(&self, ctx: &Ctx<'_>, e: &Expr) -> Result<(), VerifyError> {
    let (s, _, _) = self.typecheck(ctx, e)?;
    if !self.sort(s)?.mods.contains(Modifiers::PROVABLE) {
      return Err(VerifyError::NotProvable)
    }
    Ok(())
  }

  /// Check an axiom statement: binders in scope, hypotheses and conclusion
  /// well-sorted and provable. Axioms carry no proof obligation.
  fn check_axiom(&self, args: &[Binder], hyps: &[Expr], ret: &Expr) -> Result<(), VerifyError> {
    let mut ctx = Ctx::new();
    self.build_context(&mut ctx, args)?;
    for h in hyps { self.check_provable(&ctx, h)? }
    self.check_provable(&ctx, ret)
  }

  /// Check a theorem: the statement as for an axiom (before dummies enter
  /// the context, so statements cannot mention them), then the proof, whose
  /// conclusion must equal the declared one.
  fn check_thm_stmt(&self, args: &[Binder], hyps: &[(AtomId, Expr)], ret: &Expr,
      dummies: &[(AtomId, SortId)], proof: &Proof) -> Result<(), VerifyError> {
    let mut ctx = Ctx::new();
    self.build_context(&mut ctx, args)?;
    for (_, h) in hyps { self.check_provable(&ctx, h)? }
    self.check_provable(&ctx, ret)?;
    self.add_dummies(&mut ctx, dummies)?;
    let mut heap = HashMap::new();
    for &(h, ref e) in hyps {
      if heap.try_insert_ext(h, e.clone()).is_some() {
        return Err(VerifyError::DuplicateHyp(h))
      }
    }
    let res = self.verify_proof(&ctx, &mut heap, proof)?;
    if res != *ret { return Err(VerifyError::ThmUnifyFailure) }
    Ok(())
  }

  /// Check a proof term, returning the expression it proves.
  fn verify_proof(&self, ctx: &Ctx<'_>, heap: &mut HashMap<AtomId, Expr>, p: &Proof)
      -> Result<Expr, VerifyError> {
    Ok(match *p {
      Proof::Hyp(h) => heap.get(&h).cloned().ok_or(VerifyError::UnknownHyp(h))?,
      Proof::Thm(t, ref es, ref ps) => {
        let td = self.thm(t)?;
        let subst = self.verify_args(ctx, &td.args, es)?;
        if td.hyps.len() != ps.len() {
          return Err(VerifyError::ArgMismatch { expected: td.hyps.len(), got: ps.len() })
        }
        for (i, (h, p)) in td.hyps.iter().zip(&**ps).enumerate() {
          let want = subst_expr(&subst, h)?;
          let got = self.verify_proof(ctx, heap, p)?;
          if want != got { return Err(VerifyError::HypUnifyFailure(i)) }
        }
        subst_expr(&subst, &td.ret)?
      }
      Proof::Conv(ref tgt, ref c, ref p) => {
        let (l, r, _, _) = self.verify_conv(ctx, c)?;
        let got = self.verify_proof(ctx, heap, p)?;
        if l != *tgt || r != got { return Err(VerifyError::ConvUnifyFailure) }
        tgt.clone()
      }
      Proof::Let(h, ref p1, ref p2) => {
        let e1 = self.verify_proof(ctx, heap, p1)?;
        if heap.try_insert_ext(h, e1).is_some() {
          return Err(VerifyError::DuplicateHyp(h))
        }
        let r = self.verify_proof(ctx, heap, p2);
        heap.remove(&h);
        r?
      }
      Proof::Sorry => return Err(VerifyError::UsesSorry),
    })
  }

  /// Check a conversion, returning `(lhs, rhs, sort, bound)` such that the
  /// conversion witnesses `lhs = rhs` at the given sort.
  fn verify_conv(&self, ctx: &Ctx<'_>, c: &Conv)
      -> Result<(Expr, Expr, SortId, bool), VerifyError> {
    Ok(match *c {
      Conv::Var(v) => match ctx.get(&v) {
        Some(&VarKind::Bound(s)) => (Expr::Var(v), Expr::Var(v), s, true),
        Some(&VarKind::Reg(s, _)) => (Expr::Var(v), Expr::Var(v), s, false),
        None => return Err(VerifyError::UnknownVar(v)),
      },
      Conv::App(t, ref cs) => {
        let td = self.term(t)?;
        if td.args.len() != cs.len() {
          return Err(VerifyError::ArgMismatch { expected: td.args.len(), got: cs.len() })
        }
        let mut ls = Vec::with_capacity(cs.len());
        let mut rs = Vec::with_capacity(cs.len());
        for (bi, c) in td.args.iter().zip(&**cs) {
          let (l, r, s, b) = self.verify_conv(ctx, c)?;
          if s != bi.sort() {
            return Err(VerifyError::SortError { expected: bi.sort(), got: s })
          }
          if bi.bound() && !b { return Err(VerifyError::BoundExpected) }
          ls.push(l);
          rs.push(r);
        }
        (Expr::App(t, ls.into()), Expr::App(t, rs.into()), td.ret.sort, false)
      }
      Conv::Sym(ref c) => {
        let (l, r, s, b) = self.verify_conv(ctx, c)?;
        (r, l, s, b)
      }
      Conv::Unfold(t, ref es, ref vs, ref c) => {
        let td = self.term(t)?;
        let def = td.def.as_ref().ok_or(VerifyError::UnfoldNonDef)?;
        let mut subst = self.verify_args(ctx, &td.args, es)?;
        if def.dummies.len() != vs.len() {
          return Err(VerifyError::ArgMismatch { expected: def.dummies.len(), got: vs.len() })
        }
        // the dummies must map to distinct bound variables not mentioned
        // by the argument expressions
        let mut seen = HashSet::new();
        for (&(dn, ds), &v) in def.dummies.iter().zip(&**vs) {
          match ctx.get(&v) {
            Some(&VarKind::Bound(s)) if s == ds => {}
            Some(&VarKind::Bound(s)) =>
              return Err(VerifyError::SortError { expected: ds, got: s }),
            Some(VarKind::Reg(..)) => return Err(VerifyError::BoundExpected),
            None => return Err(VerifyError::UnknownVar(v)),
          }
          if !seen.insert(v) { return Err(VerifyError::DuplicateDummy(v)) }
          for e in &**es {
            let (_, _, fvs) = self.typecheck(ctx, e)?;
            if mentions(ctx, &fvs, v) {
              return Err(VerifyError::DisjointVariableViolation)
            }
          }
          if subst.insert(dn, Expr::Var(v)).is_some() {
            return Err(VerifyError::DuplicateDummy(dn))
          }
        }
        let (l, r, s, b) = self.verify_conv(ctx, c)?;
        let want = subst_expr(&subst, &def.val)?;
        if l != want { return Err(VerifyError::ConvUnifyFailure) }
        (Expr::App(t, es.iter().cloned().collect()), r, s, b)
      }
    })
  }

  fn next_spec(&mut self) -> Result<&'a Spec, VerifyError> {
    let spec = self.env.specs.get(self.spec_idx).ok_or(VerifyError::NothingToProve)?;
    self.spec_idx += 1;
    Ok(spec)
  }

  fn incorrect_step(&self, stmt: &Stmt) -> VerifyError {
    VerifyError::IncorrectStep(self.describe_stmt(stmt))
  }

  fn describe_stmt(&self, stmt: &Stmt) -> String {
    match *stmt {
      Stmt::Sort(x) => format!("sort {}", self.atom_str(x)),
      Stmt::Term(x) => format!("term {}", self.atom_str(x)),
      Stmt::Axiom(x) => format!("axiom {}", self.atom_str(x)),
      Stmt::Def { name, .. } => format!("def {}", self.atom_str(name)),
      Stmt::Thm { name, .. } => format!("theorem {}", self.atom_str(name)),
      Stmt::Inout { out: false } => "input string".into(),
      Stmt::Inout { out: true } => "output string".into(),
    }
  }

  fn add_sort(&mut self, x: AtomId, mods: Modifiers) -> Result<(), VerifyError> {
    if self.sorts.len() >= MAX_SORTS {
      return Err(VerifyError::Boxed("too many sorts".into()))
    }
    let id = self.sorts.push(Sort { atom: x, mods });
    if self.sort_names.try_insert_ext(x, id).is_some() {
      let e = VerifyError::DuplicateDecl(x);
      self.report(x, &e);
    }
    Ok(())
  }

  fn add_term(&mut self, x: AtomId, args: Box<[Binder]>, ret: DepType, def: Option<TermDef>) {
    let id = self.terms.push(Term { atom: x, args, ret, def });
    if self.decl_names.try_insert_ext(x, DeclKey::Term(id)).is_some() {
      let e = VerifyError::DuplicateDecl(x);
      self.report(x, &e);
    }
  }

  fn add_thm(&mut self, x: AtomId, args: Box<[Binder]>, hyps: Box<[Expr]>, ret: Expr) {
    let id = self.thms.push(Thm { atom: x, args, hyps, ret });
    if self.decl_names.try_insert_ext(x, DeclKey::Thm(id)).is_some() {
      let e = VerifyError::DuplicateDecl(x);
      self.report(x, &e);
    }
  }

  /// Execute one script statement against the spec stream. Per-declaration
  /// check failures are recorded in the error log (and the declaration is
  /// still inserted, from its script-side claim, to keep the id spaces
  /// aligned); only shape errors are returned.
  fn step(&mut self, stmt: &Stmt) -> Result<(), VerifyError> {
    match *stmt {
      Stmt::Sort(x) => match *self.next_spec()? {
        Spec::Sort(x2, mods) if x2 == x => self.add_sort(x, mods),
        _ => Err(self.incorrect_step(stmt)),
      },
      Stmt::Term(x) => match self.next_spec()? {
        Spec::Decl(x2, Decl::Term { args, ret }) if *x2 == x => {
          if let Err(e) = self.check_term_sig(args, ret) { self.report(x, &e) }
          self.add_term(x, args.clone(), ret.clone(), None);
          Ok(())
        }
        _ => Err(self.incorrect_step(stmt)),
      },
      Stmt::Axiom(x) => match self.next_spec()? {
        Spec::Decl(x2, Decl::Axiom { args, hyps, ret }) if *x2 == x => {
          if let Err(e) = self.check_axiom(args, hyps, ret) { self.report(x, &e) }
          self.add_thm(x, args.clone(), hyps.clone(), ret.clone());
          Ok(())
        }
        _ => Err(self.incorrect_step(stmt)),
      },
      Stmt::Def { name, ref args, ref ret, ref dummies, ref val, check } => {
        if check {
          match self.next_spec()? {
            Spec::Decl(x2, Decl::Def { args: sargs, ret: sret, dummies: sdummies, val: sval })
              if *x2 == name && **sargs == **args && *sret == *ret &&
                **sdummies == **dummies && sval == val => {}
            _ => return Err(self.incorrect_step(stmt)),
          }
        }
        if let Err(e) = self.check_def(args, ret, dummies, val) { self.report(name, &e) }
        self.add_term(name, args.clone(), ret.clone(),
          Some(TermDef { dummies: dummies.clone(), val: val.clone() }));
        Ok(())
      }
      Stmt::Thm { name, ref args, ref hyps, ref ret, ref dummies, ref proof, check } => {
        if check {
          match self.next_spec()? {
            Spec::Thm { name: x2, args: sargs, hyps: shyps, ret: sret }
              if *x2 == name && **sargs == **args && *sret == *ret &&
                shyps.len() == hyps.len() &&
                shyps.iter().zip(&**hyps).all(|(e, (_, e2))| e == e2) => {}
            _ => return Err(self.incorrect_step(stmt)),
          }
        }
        if let Err(e) = self.check_thm_stmt(args, hyps, ret, dummies, proof) {
          self.report(name, &e)
        }
        self.add_thm(name, args.clone(),
          hyps.iter().map(|(_, e)| e.clone()).collect(), ret.clone());
        Ok(())
      }
      Stmt::Inout { out } => match self.next_spec()? {
        &Spec::Inout { out: o2, ref val } if o2 == out => {
          if let Err(e) = self.verify_inout(out, val) { self.report_raw(&e) }
          Ok(())
        }
        _ => Err(self.incorrect_step(stmt)),
      },
    }
  }

  /// Run the whole script. Check failures inside declarations accumulate in
  /// [`errors`](Self::errors); a shape error aborts and is returned. After
  /// the script, the spec stream must be exhausted.
  pub fn run(&mut self, script: &[Stmt]) -> Result<(), VerifyError> {
    for stmt in script { self.step(stmt)? }
    if self.spec_idx < self.env.specs.len() {
      return Err(VerifyError::Unfinished)
    }
    Ok(())
  }
}

/// Verify a proof script against an environment. Returns the emitted output
/// strings if everything checks, or the ordered diagnostics otherwise.
pub fn verify(env: &Environment, input: &[u8], script: &[Stmt])
    -> Result<Vec<Box<[u8]>>, Vec<String>> {
  let mut ver = Verifier::new(env, input);
  if let Err(e) = ver.run(script) {
    let msg = e.render_to_string(&ver);
    ver.errors.push(msg);
  }
  if ver.errors.is_empty() { Ok(ver.outputs) } else { Err(ver.errors) }
}
