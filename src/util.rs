//! Small utilities shared by the kernel modules.

use std::borrow::Borrow;
use std::collections::{HashMap, hash_map::{Entry, OccupiedEntry}};
use std::error::Error;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// Newtype for `Box<dyn Error + Send + Sync>`, used for free-form error payloads.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Extension trait for [`HashMap`], adding an insert that fails on collision.
pub trait HashMapExt<K, V> {
  /// Like `insert`, but if the insertion fails, it does not overwrite the
  /// old value, instead returning it together with the occupied entry.
  fn try_insert_ext(&mut self, k: K, v: V) -> Option<(V, OccupiedEntry<'_, K, V>)>;
}

impl<K: Hash + Eq, V, S: BuildHasher> HashMapExt<K, V> for HashMap<K, V, S> {
  fn try_insert_ext(&mut self, k: K, v: V) -> Option<(V, OccupiedEntry<'_, K, V>)> {
    match self.entry(k) {
      Entry::Vacant(e) => { e.insert(v); None }
      Entry::Occupied(e) => Some((v, e)),
    }
  }
}

/// A shared string, used for atom names.
#[derive(Clone, Hash, PartialEq, Eq)]
pub struct ArcString(pub Arc<String>);

impl Borrow<str> for ArcString {
  fn borrow(&self) -> &str { &self.0 }
}
impl std::ops::Deref for ArcString {
  type Target = str;
  fn deref(&self) -> &str { &self.0 }
}
impl ArcString {
  /// Make a new `ArcString` from an owned string.
  #[must_use] pub fn new(s: String) -> ArcString { ArcString(Arc::new(s)) }
}
impl fmt::Display for ArcString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}
impl fmt::Debug for ArcString {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}
impl From<&str> for ArcString {
  fn from(s: &str) -> ArcString { ArcString::new(s.to_owned()) }
}
