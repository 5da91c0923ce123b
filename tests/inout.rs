//! Integration tests for the string I/O interpreter: reducing string
//! expressions against an input buffer and onto the output queue.

mod common;

use common::*;
use mm0_kernel::{verify, Expr, Modifiers, SortId, TermId};

struct StringTheory {
  str: SortId,
  chr: SortId,
  x: [TermId; 16],
  s0: TermId,
  s1: TermId,
  sadd: TermId,
  ch: TermId,
}

/// Declare the string signature: sorts `string`/`hex`/`char` and the
/// terms `s0`, `s1`, `sadd`, `ch`, `x0`..`xf`.
fn string_theory(f: &mut Fixture) -> StringTheory {
  let str_s = f.sort("string", Modifiers::NONE);
  let hex_s = f.sort("hex", Modifiers::NONE);
  let chr_s = f.sort("char", Modifiers::NONE);
  let (a, b) = (f.atom("a"), f.atom("b"));
  let s0 = f.term("s0", vec![], ret(str_s, &[]));
  let s1 = f.term("s1", vec![reg(a, chr_s, &[])], ret(str_s, &[]));
  let sadd = f.term("sadd",
    vec![reg(a, str_s, &[]), reg(b, str_s, &[])], ret(str_s, &[]));
  let ch = f.term("ch",
    vec![reg(a, hex_s, &[]), reg(b, hex_s, &[])], ret(chr_s, &[]));
  let mut x = [TermId(0); 16];
  for (i, t) in x.iter_mut().enumerate() {
    *t = f.term(&format!("x{:x}", i), vec![], ret(hex_s, &[]));
  }
  StringTheory { str: str_s, chr: chr_s, x, s0, s1, sadd, ch }
}

impl StringTheory {
  /// The one-character string expression for the byte `c`.
  fn byte(&self, c: u8) -> Expr {
    app(self.s1, vec![app(self.ch, vec![
      app(self.x[(c >> 4) as usize], vec![]),
      app(self.x[(c & 0xf) as usize], vec![]),
    ])])
  }

  /// A string expression spelling out `s` as a right fold of `sadd`.
  fn lit(&self, s: &[u8]) -> Expr {
    let mut e = app(self.s0, vec![]);
    for &c in s.iter().rev() {
      e = app(self.sadd, vec![self.byte(c), e]);
    }
    e
  }
}

#[test]
fn input_string_accepts() {
  let mut f = Fixture::new();
  let t = string_theory(&mut f);
  let main = f.def("main", vec![], ret(t.str, &[]), vec![], t.byte(0x41));
  f.inout(false, app(main, vec![]));
  assert_eq!(verify(&f.env, b"A", &f.script), Ok(vec![]));
}

#[test]
fn input_string_mismatch() {
  let mut f = Fixture::new();
  let t = string_theory(&mut f);
  let main = f.def("main", vec![], ret(t.str, &[]), vec![], t.byte(0x41));
  f.inout(false, app(main, vec![]));
  let errs = verify(&f.env, b"B", &f.script).unwrap_err();
  assert!(has_error(&errs, "input mismatch at char 0"), "{:?}", errs);
}

#[test]
fn input_string_trailing_bytes() {
  let mut f = Fixture::new();
  let t = string_theory(&mut f);
  let main = f.def("main", vec![], ret(t.str, &[]), vec![], t.byte(0x41));
  f.inout(false, app(main, vec![]));
  let errs = verify(&f.env, b"AB", &f.script).unwrap_err();
  assert!(has_error(&errs, "input mismatch at char 1"), "{:?}", errs);
}

#[test]
fn input_string_early_eof() {
  let mut f = Fixture::new();
  let t = string_theory(&mut f);
  let main = f.def("main", vec![], ret(t.str, &[]), vec![], t.byte(0x41));
  f.inout(false, app(main, vec![]));
  let errs = verify(&f.env, b"", &f.script).unwrap_err();
  assert!(has_error(&errs, "input mismatch at char 0"), "{:?}", errs);
}

#[test]
fn output_string_emits() {
  let mut f = Fixture::new();
  let t = string_theory(&mut f);
  let main = f.def("main", vec![], ret(t.str, &[]), vec![], t.byte(0x41));
  f.inout(true, app(main, vec![]));
  let outs = verify(&f.env, b"", &f.script).expect("verification failed");
  assert_eq!(outs, vec![b"A".to_vec().into_boxed_slice()]);
}

/// Whatever output mode produces, input mode accepts, through nested
/// definitions with parameters.
#[test]
fn output_input_round_trip() {
  let mut f = Fixture::new();
  let t = string_theory(&mut f);
  let c = f.atom("c");
  // wrap (c: char): string := sadd (s1 c) (s1 c)
  let wrap = f.def("wrap", vec![reg(c, t.chr, &[])], ret(t.str, &[]), vec![],
    app(t.sadd, vec![app(t.s1, vec![var(c)]), app(t.s1, vec![var(c)])]));
  let body = app(t.sadd, vec![
    t.lit(b"Hi"),
    app(wrap, vec![app(t.ch, vec![app(t.x[2], vec![]), app(t.x[1], vec![])])]),
  ]);
  let main = f.def("main", vec![], ret(t.str, &[]), vec![], body);
  f.inout(true, app(main, vec![]));
  f.inout(false, app(main, vec![]));
  let outs = verify(&f.env, b"Hi!!", &f.script).expect("verification failed");
  assert_eq!(outs, vec![b"Hi!!".to_vec().into_boxed_slice()]);
}

#[test]
fn unsupported_term() {
  let mut f = Fixture::new();
  let t = string_theory(&mut f);
  let mystr = f.term("mystr", vec![], ret(t.str, &[]));
  f.inout(false, app(mystr, vec![]));
  let errs = verify(&f.env, b"", &f.script).unwrap_err();
  assert!(has_error(&errs, "term not supported"), "{:?}", errs);
}

#[test]
fn definition_with_dummies_rejected() {
  let mut f = Fixture::new();
  let t = string_theory(&mut f);
  let v = f.sort("var", Modifiers::NONE);
  let y = f.atom("y");
  let dd = f.def("dd", vec![], ret(t.str, &[]), vec![(y, v)], app(t.s0, vec![]));
  f.inout(false, app(dd, vec![]));
  let errs = verify(&f.env, b"", &f.script).unwrap_err();
  assert!(has_error(&errs, "definition with dummies"), "{:?}", errs);
}

#[test]
fn inout_expression_must_be_a_string() {
  let mut f = Fixture::new();
  let t = string_theory(&mut f);
  f.inout(true, app(t.x[4], vec![]));
  let errs = verify(&f.env, b"", &f.script).unwrap_err();
  assert!(has_error(&errs, "expected string"), "{:?}", errs);
}

#[test]
fn string_signature_must_be_present() {
  let mut f = Fixture::new();
  let s = f.sort("string", Modifiers::NONE);
  let t = f.term("t", vec![], ret(s, &[]));
  f.inout(false, app(t, vec![]));
  let errs = verify(&f.env, b"", &f.script).unwrap_err();
  assert!(has_error(&errs, "sort 'hex' not found"), "{:?}", errs);
}
