//! Shared fixture builder for the kernel integration tests.
//!
//! Builds an environment and a matching proof script in lockstep, tracking
//! the ids the verifier will assign to each declaration.

#![allow(dead_code)]

use mm0_kernel::{AtomId, Binder, Decl, DepType, Environment, Expr, Modifiers,
  Proof, SortId, Spec, Stmt, TermId, ThmId, Type};

pub struct Fixture {
  pub env: Environment,
  pub script: Vec<Stmt>,
  nsorts: u8,
  nterms: u32,
  nthms: u32,
}

impl Fixture {
  pub fn new() -> Self {
    Fixture { env: Environment::new(), script: vec![], nsorts: 0, nterms: 0, nthms: 0 }
  }

  pub fn atom(&mut self, s: &str) -> AtomId { self.env.get_atom(s) }

  fn next_sort(&mut self) -> SortId {
    let id = SortId(self.nsorts);
    self.nsorts += 1;
    id
  }
  fn next_term(&mut self) -> TermId {
    let id = TermId(self.nterms);
    self.nterms += 1;
    id
  }
  fn next_thm(&mut self) -> ThmId {
    let id = ThmId(self.nthms);
    self.nthms += 1;
    id
  }

  pub fn sort(&mut self, name: &str, mods: Modifiers) -> SortId {
    let a = self.atom(name);
    self.env.push_spec(Spec::Sort(a, mods));
    self.script.push(Stmt::Sort(a));
    self.next_sort()
  }

  pub fn term(&mut self, name: &str, args: Vec<Binder>, ret: DepType) -> TermId {
    let a = self.atom(name);
    self.env.push_spec(Spec::Decl(a, Decl::Term { args: args.into(), ret }));
    self.script.push(Stmt::Term(a));
    self.next_term()
  }

  pub fn def(&mut self, name: &str, args: Vec<Binder>, ret: DepType,
      dummies: Vec<(AtomId, SortId)>, val: Expr) -> TermId {
    let a = self.atom(name);
    self.env.push_spec(Spec::Decl(a, Decl::Def {
      args: args.clone().into(),
      ret: ret.clone(),
      dummies: dummies.clone().into(),
      val: val.clone(),
    }));
    self.script.push(Stmt::Def {
      name: a,
      args: args.into(),
      ret,
      dummies: dummies.into(),
      val,
      check: true,
    });
    self.next_term()
  }

  /// A `def` that appears only in the script, not in the spec stream.
  pub fn local_def(&mut self, name: &str, args: Vec<Binder>, ret: DepType,
      dummies: Vec<(AtomId, SortId)>, val: Expr) -> TermId {
    let a = self.atom(name);
    self.script.push(Stmt::Def {
      name: a,
      args: args.into(),
      ret,
      dummies: dummies.into(),
      val,
      check: false,
    });
    self.next_term()
  }

  pub fn axiom(&mut self, name: &str, args: Vec<Binder>, hyps: Vec<Expr>, ret: Expr) -> ThmId {
    let a = self.atom(name);
    self.env.push_spec(Spec::Decl(a, Decl::Axiom { args: args.into(), hyps: hyps.into(), ret }));
    self.script.push(Stmt::Axiom(a));
    self.next_thm()
  }

  pub fn thm(&mut self, name: &str, args: Vec<Binder>, hyps: Vec<(AtomId, Expr)>, ret: Expr,
      dummies: Vec<(AtomId, SortId)>, proof: Proof) -> ThmId {
    let a = self.atom(name);
    self.env.push_spec(Spec::Thm {
      name: a,
      args: args.clone().into(),
      hyps: hyps.iter().map(|(_, e)| e.clone()).collect(),
      ret: ret.clone(),
    });
    self.script.push(Stmt::Thm {
      name: a,
      args: args.into(),
      hyps: hyps.into(),
      ret,
      dummies: dummies.into(),
      proof,
      check: true,
    });
    self.next_thm()
  }

  /// A theorem that appears only in the script, not in the spec stream.
  pub fn local_thm(&mut self, name: &str, args: Vec<Binder>, hyps: Vec<(AtomId, Expr)>,
      ret: Expr, dummies: Vec<(AtomId, SortId)>, proof: Proof) -> ThmId {
    let a = self.atom(name);
    self.script.push(Stmt::Thm {
      name: a,
      args: args.into(),
      hyps: hyps.into(),
      ret,
      dummies: dummies.into(),
      proof,
      check: false,
    });
    self.next_thm()
  }

  pub fn inout(&mut self, out: bool, val: Expr) {
    self.env.push_spec(Spec::Inout { out, val });
    self.script.push(Stmt::Inout { out });
  }
}

pub fn bound(a: AtomId, s: SortId) -> Binder {
  Binder { name: a, ty: Type::Bound(s) }
}

pub fn reg(a: AtomId, s: SortId, deps: &[AtomId]) -> Binder {
  Binder { name: a, ty: Type::Reg(s, deps.to_vec().into()) }
}

pub fn var(a: AtomId) -> Expr { Expr::Var(a) }

pub fn app(t: TermId, es: Vec<Expr>) -> Expr { Expr::app(t, es) }

pub fn ret(s: SortId, deps: &[AtomId]) -> DepType {
  DepType { sort: s, deps: deps.to_vec().into() }
}

/// True if some diagnostic in the error list contains `needle`.
pub fn has_error(errs: &[String], needle: &str) -> bool {
  errs.iter().any(|e| e.contains(needle))
}
