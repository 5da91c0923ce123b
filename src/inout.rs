//! Support for the `input string` and `output string` directives.
//!
//! The theory is expected to contain the string signature: nullary `s0`,
//! unary `s1`, binary `sadd` and `ch`, and the sixteen hex digits `x0`..`xf`,
//! over sorts `string`, `hex` and `char`. Any other term reached during
//! reduction must be a definition without dummy variables, which is unfolded
//! in place.

use std::collections::HashMap;
use std::fmt::Write;
use std::rc::Rc;

use crate::environment::{AtomId, Expr, SortId, TermId, Type};
use crate::verify::{Ctx, DeclKey, Verifier, VerifyError};

/// Cached data used by the input/output directives: the resolved string
/// signature, built on first use.
#[derive(Default, Debug)]
pub struct InoutHandlers {
  pub(crate) string: Option<StringHandler>,
}

#[derive(Clone, Debug)]
pub(crate) struct StringHandler {
  sorts: StringSorts,
  map: HashMap<TermId, StringToken>,
}

#[derive(Copy, Clone, Debug)]
struct StringSorts {
  str: SortId,
  hex: SortId,
  chr: SortId,
}

#[derive(Copy, Clone, Debug)]
enum StringToken {
  S0,
  S1,
  SAdd,
  Ch,
  Hex(u8),
}

/// One frame of the reduction environment. The stored argument expressions
/// were captured in the caller's environment, so variable lookups continue
/// in `up`.
#[derive(Debug)]
struct Frame {
  vars: HashMap<AtomId, Expr>,
  up: IoEnv,
}

type IoEnv = Option<Rc<Frame>>;

/// A half-byte cursor over the input buffer. Nibbles within a byte are
/// consumed high first, then low.
#[derive(Copy, Clone, Debug)]
struct InputCursor<'a> {
  buf: &'a [u8],
  pos: usize,
  mid: bool,
}

impl<'a> InputCursor<'a> {
  fn new(buf: &'a [u8]) -> Self { InputCursor { buf, pos: 0, mid: false } }

  fn pop(&mut self) -> Option<u8> {
    let b = *self.buf.get(self.pos)?;
    if self.mid {
      self.mid = false;
      self.pos += 1;
      Some(b & 0xf)
    } else {
      self.mid = true;
      Some(b >> 4)
    }
  }

  fn at_end(&self) -> bool { self.pos == self.buf.len() && !self.mid }

  fn mismatch_at(&self, at: usize) -> VerifyError {
    let rest = &self.buf[at.min(self.buf.len())..];
    let rest = String::from_utf8_lossy(&rest[..rest.len().min(40)]);
    VerifyError::Boxed(format!("input mismatch at char {}: rest = '{}'", at, rest).into())
  }

  fn mismatch(&self) -> VerifyError { self.mismatch_at(self.pos) }
}

/// The result of reducing a string expression in output mode.
#[derive(Debug)]
enum StrVal {
  Str(Vec<u8>),
  Hex(u8),
}

fn bad_axioms() -> VerifyError {
  VerifyError::Boxed("impossible, check string axioms".into())
}

impl Verifier<'_> {
  fn io_sort(&self, name: &str) -> Result<SortId, VerifyError> {
    self.env.atom(name).and_then(|a| self.sort_names.get(&a).copied())
      .ok_or_else(|| VerifyError::Boxed(format!("sort '{}' not found", name).into()))
  }

  fn io_term(&self, name: &str, args: &[SortId], ret: SortId) -> Result<TermId, VerifyError> {
    let t = match self.env.atom(name).and_then(|a| self.decl_names.get(&a)) {
      Some(&DeclKey::Term(t)) => t,
      _ => return Err(VerifyError::Boxed(format!("term '{}' not found", name).into())),
    };
    let td = &self.terms[t];
    if td.def.is_some() {
      return Err(VerifyError::Boxed(format!("def '{}' should be a term", name).into()))
    }
    let ok = td.ret.sort == ret && td.ret.deps.is_empty() &&
      td.args.len() == args.len() &&
      td.args.iter().zip(args).all(|(bi, &arg)|
        matches!(bi.ty, Type::Reg(s, ref deps) if s == arg && deps.is_empty()));
    if !ok {
      let mut s = format!("term '{}' has incorrect type, expected: ", name);
      for &i in args { write!(s, "{} > ", self.sort_str(i)).expect("impossible") }
      write!(s, "{}", self.sort_str(ret)).expect("impossible");
      return Err(VerifyError::Boxed(s.into()))
    }
    Ok(t)
  }

  fn init_string_handler(&mut self) -> Result<(), VerifyError> {
    if self.inout.string.is_some() { return Ok(()) }
    let sorts = StringSorts {
      str: self.io_sort("string")?,
      hex: self.io_sort("hex")?,
      chr: self.io_sort("char")?,
    };
    let mut map = HashMap::new();
    map.insert(self.io_term("s0", &[], sorts.str)?, StringToken::S0);
    map.insert(self.io_term("s1", &[sorts.chr], sorts.str)?, StringToken::S1);
    map.insert(self.io_term("sadd", &[sorts.str, sorts.str], sorts.str)?, StringToken::SAdd);
    map.insert(self.io_term("ch", &[sorts.hex, sorts.hex], sorts.chr)?, StringToken::Ch);
    for i in 0..16 {
      map.insert(self.io_term(&format!("x{:x}", i), &[], sorts.hex)?, StringToken::Hex(i));
    }
    self.inout.string = Some(StringHandler { sorts, map });
    Ok(())
  }

  /// Unfold a non-signature term, which must be a definition without
  /// dummies, pushing a frame binding its parameters to the arguments.
  fn unfold_frame(&self, env: &IoEnv, t: TermId, es: &Rc<[Expr]>)
      -> Result<(IoEnv, &Expr), VerifyError> {
    let td = self.term(t)?;
    let def = match &td.def {
      Some(def) => def,
      None => return Err(VerifyError::Boxed(
        format!("term not supported: '{}'", self.atom_str(td.atom)).into())),
    };
    if !def.dummies.is_empty() {
      return Err(VerifyError::Boxed(
        format!("definition with dummies not supported: '{}'", self.atom_str(td.atom)).into()))
    }
    let vars = td.args.iter().map(|bi| bi.name).zip(es.iter().cloned()).collect();
    Ok((Some(Rc::new(Frame { vars, up: env.clone() })), &def.val))
  }

  fn reduce_input(&self, h: &StringHandler, env: &IoEnv, e: &Expr,
      cur: &mut InputCursor<'_>) -> Result<(), VerifyError> {
    match *e {
      Expr::Var(v) => {
        let fr = env.as_deref().ok_or(VerifyError::UnknownVar(v))?;
        let e2 = fr.vars.get(&v).ok_or(VerifyError::UnknownVar(v))?;
        self.reduce_input(h, &fr.up, e2, cur)
      }
      Expr::App(t, ref es) => match h.map.get(&t) {
        Some(StringToken::S0) => Ok(()),
        Some(StringToken::S1) => self.reduce_input(h, env, &es[0], cur),
        Some(StringToken::SAdd | StringToken::Ch) => {
          self.reduce_input(h, env, &es[0], cur)?;
          self.reduce_input(h, env, &es[1], cur)
        }
        Some(&StringToken::Hex(i)) => {
          let at = cur.pos;
          match cur.pop() {
            Some(n) if n == i => Ok(()),
            _ => Err(cur.mismatch_at(at)),
          }
        }
        None => {
          let (env2, val) = self.unfold_frame(env, t, es)?;
          self.reduce_input(h, &env2, val, cur)
        }
      },
    }
  }

  fn reduce_output(&self, h: &StringHandler, env: &IoEnv, e: &Expr)
      -> Result<StrVal, VerifyError> {
    match *e {
      Expr::Var(v) => {
        let fr = env.as_deref().ok_or(VerifyError::UnknownVar(v))?;
        let e2 = fr.vars.get(&v).ok_or(VerifyError::UnknownVar(v))?;
        self.reduce_output(h, &fr.up, e2)
      }
      Expr::App(t, ref es) => match h.map.get(&t) {
        Some(StringToken::S0) => Ok(StrVal::Str(vec![])),
        Some(StringToken::S1) => self.reduce_output(h, env, &es[0]),
        Some(StringToken::SAdd) => {
          match (self.reduce_output(h, env, &es[0])?, self.reduce_output(h, env, &es[1])?) {
            (StrVal::Str(mut a), StrVal::Str(b)) => {
              a.extend_from_slice(&b);
              Ok(StrVal::Str(a))
            }
            _ => Err(bad_axioms()),
          }
        }
        Some(StringToken::Ch) => {
          match (self.reduce_output(h, env, &es[0])?, self.reduce_output(h, env, &es[1])?) {
            (StrVal::Hex(hi), StrVal::Hex(lo)) => Ok(StrVal::Str(vec![hi << 4 | lo])),
            _ => Err(bad_axioms()),
          }
        }
        Some(&StringToken::Hex(i)) => Ok(StrVal::Hex(i)),
        None => {
          let (env2, val) = self.unfold_frame(env, t, es)?;
          self.reduce_output(h, &env2, val)
        }
      },
    }
  }

  /// Verify an `input`/`output` directive: typecheck the spec expression at
  /// sort `string` in an empty context, then either match it against the
  /// input buffer or append its reduction to the output queue.
  pub(crate) fn verify_inout(&mut self, out: bool, val: &Expr) -> Result<(), VerifyError> {
    self.init_string_handler()?;
    let h = match &self.inout.string {
      Some(h) => h.clone(),
      None => unreachable!("just initialized"),
    };
    let ctx = Ctx::new();
    let (s, _, _) = self.typecheck(&ctx, val)?;
    if s != h.sorts.str {
      return Err(VerifyError::Boxed(
        format!("type error: expected string, got {}", self.sort_str(s)).into()))
    }
    if out {
      match self.reduce_output(&h, &None, val)? {
        StrVal::Str(v) => {
          self.outputs.push(v.into());
          Ok(())
        }
        StrVal::Hex(_) => Err(bad_axioms()),
      }
    } else {
      let mut cur = InputCursor::new(self.input);
      self.reduce_input(&h, &None, val, &mut cur)?;
      if cur.at_end() { Ok(()) } else { Err(cur.mismatch()) }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::InputCursor;

  #[test]
  fn nibbles_come_high_first() {
    let mut cur = InputCursor::new(b"A!");
    assert_eq!(cur.pop(), Some(4));
    assert!(!cur.at_end());
    assert_eq!(cur.pop(), Some(1));
    assert_eq!(cur.pop(), Some(2));
    assert_eq!(cur.pop(), Some(1));
    assert!(cur.at_end());
    assert_eq!(cur.pop(), None);
  }

  #[test]
  fn mid_byte_is_not_the_end() {
    let mut cur = InputCursor::new(b"A");
    assert_eq!(cur.pop(), Some(4));
    assert!(!cur.at_end());
  }

  #[test]
  fn mismatch_reports_byte_position() {
    let mut cur = InputCursor::new(b"AB");
    cur.pop();
    cur.pop();
    match cur.mismatch() {
      super::VerifyError::Boxed(e) =>
        assert_eq!(e.to_string(), "input mismatch at char 1: rest = 'B'"),
      e => panic!("unexpected error {:?}", e),
    }
  }
}
