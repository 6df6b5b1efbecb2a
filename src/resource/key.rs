//! Resource keys: what to load, and how.
//!
//! A [`ResourceKey`] pairs a [`KeyIdentity`] with a [`Loader`]. The cache only ever
//! looks at the identity: two keys whose identities compare equal under `Ord` are the
//! same cache entry, whatever their loaders do. The identity is spelled out in full
//! so it is always clear which inputs participate:
//!
//! - the [`KeyOrigin`]: file path, in-memory bytes (compared by content), text
//!   source, generated-content parameters, or a caller-chosen name;
//! - the tag: a free-form string. Equal tags (including the empty default) let
//!   structurally identical requests share an entry; different tags keep them apart.
//!
//! Nothing else is part of the identity. In particular the loader closure is not:
//! keys with the same identity are expected to load the same thing.

use crate::error::LoadError;
use crate::ptr::TransferHandle;
use core::cmp::Ordering;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A zero-argument capability producing a fresh resource or a [`LoadError`].
pub type Loader<R> = Rc<dyn Fn() -> Result<TransferHandle<R>, LoadError>>;

/// One structural parameter of a generated resource (width, fill colour, ...).
///
/// Parameters order first by variant, then by value. Floats use
/// [`f64::total_cmp`], so `NaN` and `-0.0` are ordinary, distinct values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyParam {
    /// An unsigned integer.
    Unsigned(u64),
    /// A signed integer.
    Signed(i64),
    /// A floating point value.
    Float(f64),
    /// A string.
    Text(String),
}

impl KeyParam {
    /// Packs an RGBA colour into a single parameter.
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::Unsigned(u64::from(u32::from_be_bytes([r, g, b, a])))
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Unsigned(_) => 0,
            Self::Signed(_) => 1,
            Self::Float(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl Ord for KeyParam {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Unsigned(a), Self::Unsigned(b)) => a.cmp(b),
            (Self::Signed(a), Self::Signed(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for KeyParam {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for KeyParam {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyParam {}

impl fmt::Display for KeyParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! key_param_from {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for KeyParam {
                fn from(value: $source) -> Self {
                    Self::$variant(<$target>::from(value))
                }
            }
        )+
    };
}

key_param_from!(Unsigned as u64: u8, u16, u32, u64);
key_param_from!(Signed as i64: i8, i16, i32, i64);
key_param_from!(Float as f64: f32, f64);

impl From<usize> for KeyParam {
    fn from(value: usize) -> Self {
        Self::Unsigned(value as u64)
    }
}

impl From<&str> for KeyParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for KeyParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Where a resource comes from. The structural half of a [`KeyIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyOrigin {
    /// A file on disk, identified by its path as given (not canonicalized).
    File(PathBuf),
    /// Raw bytes held in memory, identified by their content.
    Memory(Rc<[u8]>),
    /// Text such as shader code, identified by its content.
    Source(Rc<str>),
    /// Generated content, identified by a kind name and its parameters.
    Parameters {
        /// What is being generated, e.g. `"Size"` or `"Gradient"`.
        kind: String,
        /// The generation parameters, in order.
        params: Vec<KeyParam>,
    },
    /// A caller-chosen name with no further structure.
    Named(String),
}

impl fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Memory(bytes) => write!(f, "memory:{} bytes", bytes.len()),
            Self::Source(text) => write!(f, "source:{} chars", text.chars().count()),
            Self::Parameters { kind, params } => {
                write!(f, "{kind}(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                f.write_str(")")
            }
            Self::Named(name) => write!(f, "named:{name}"),
        }
    }
}

/// The complete cache identity of a resource: origin plus tag.
///
/// Ordering compares the origin first and the tag second.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyIdentity {
    origin: KeyOrigin,
    tag: String,
}

impl KeyIdentity {
    /// Builds an identity from its two parts.
    pub fn new(origin: KeyOrigin, tag: impl Into<String>) -> Self {
        Self {
            origin,
            tag: tag.into(),
        }
    }

    /// Returns the origin.
    pub fn origin(&self) -> &KeyOrigin {
        &self.origin
    }

    /// Returns the tag; empty when none was given.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag.is_empty() {
            write!(f, "{}", self.origin)
        } else {
            write!(f, "{} [{}]", self.origin, self.tag)
        }
    }
}

/// Resources that can be built from a file path.
pub trait FromFile: Sized {
    /// Loads the resource stored at `path`.
    fn from_file(path: &Path) -> Result<Self, LoadError>;
}

/// Resources that can be built from raw bytes.
pub trait FromMemory: Sized {
    /// Decodes the resource from `bytes`.
    fn from_memory(bytes: &[u8]) -> Result<Self, LoadError>;
}

/// Resources that can be built from text, such as shader programs.
pub trait FromSource: Sized {
    /// Compiles or parses the resource from `source`.
    fn from_source(source: &str) -> Result<Self, LoadError>;
}

/// Reads a whole file, reporting failures as [`LoadError::Io`].
///
/// Handy inside [`FromFile`] implementations that decode bytes.
pub fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::io(path, source))
}

/// An immutable description of a resource: its identity and its loader.
///
/// Keys are cheap to clone; clones share the loader. Comparison, equality and
/// ordering look at the [`KeyIdentity`] only.
///
/// # Examples
///
/// ```
/// use hoard::resource::{KeyParam, ResourceKey};
///
/// let white = KeyParam::rgba(255, 255, 255, 255);
/// let a: ResourceKey<Vec<u32>> = ResourceKey::from_parameters(
///     "Size", [64u32.into(), 64u32.into(), white.clone()], "",
///     || Ok(vec![0xffff_ffff; 64 * 64]),
/// );
/// let b: ResourceKey<Vec<u32>> = ResourceKey::from_parameters(
///     "Size", [64u32.into(), 64u32.into(), white], "",
///     || Ok(Vec::new()),
/// );
///
/// // Same identity, same cache entry, whatever the loaders do.
/// assert_eq!(a, b);
/// ```
pub struct ResourceKey<R: ?Sized> {
    identity: KeyIdentity,
    loader: Loader<R>,
}

impl<R: ?Sized> ResourceKey<R> {
    /// Builds a key from an explicit identity and a loader returning a
    /// [`TransferHandle`].
    ///
    /// This is the most general constructor and the only one available for
    /// unsized resource types such as `dyn Texture`.
    pub fn new<F>(identity: KeyIdentity, loader: F) -> Self
    where
        F: Fn() -> Result<TransferHandle<R>, LoadError> + 'static,
    {
        Self {
            identity,
            loader: Rc::new(loader),
        }
    }

    /// Returns the identity used by the cache.
    pub fn identity(&self) -> &KeyIdentity {
        &self.identity
    }

    /// Returns the loader.
    pub fn loader(&self) -> &Loader<R> {
        &self.loader
    }

    /// Runs the loader synchronously.
    ///
    /// # Errors
    ///
    /// Returns whatever the loader failed with. A loader that reports success but
    /// hands back an empty [`TransferHandle`] is treated as a failure as well.
    pub fn load(&self) -> Result<TransferHandle<R>, LoadError> {
        let handle = (self.loader)()?;
        if handle.is_valid() {
            Ok(handle)
        } else {
            Err(LoadError::new(format!("loader for `{}` produced no resource", self.identity)))
        }
    }
}

impl<R: 'static> ResourceKey<R> {
    /// Builds a key with an explicit identity from a loader returning the
    /// resource by value.
    pub fn custom<F>(identity: KeyIdentity, loader: F) -> Self
    where
        F: Fn() -> Result<R, LoadError> + 'static,
    {
        Self::new(identity, move || loader().map(TransferHandle::new))
    }

    /// Builds a key for a resource with no structural origin, identified by `name`.
    pub fn named<F>(name: impl Into<String>, tag: &str, loader: F) -> Self
    where
        F: Fn() -> Result<R, LoadError> + 'static,
    {
        Self::custom(KeyIdentity::new(KeyOrigin::Named(name.into()), tag), loader)
    }

    /// Builds a key for generated content.
    ///
    /// `kind` and `params` together describe what is generated; they and `tag` form
    /// the identity.
    pub fn from_parameters<I, F>(kind: impl Into<String>, params: I, tag: &str, loader: F) -> Self
    where
        I: IntoIterator<Item = KeyParam>,
        F: Fn() -> Result<R, LoadError> + 'static,
    {
        let origin = KeyOrigin::Parameters {
            kind: kind.into(),
            params: params.into_iter().collect(),
        };
        Self::custom(KeyIdentity::new(origin, tag), loader)
    }
}

impl<R: FromFile + 'static> ResourceKey<R> {
    /// Builds a key that loads `path` through [`FromFile`].
    pub fn from_file(path: impl Into<PathBuf>, tag: &str) -> Self {
        let path = path.into();
        let identity = KeyIdentity::new(KeyOrigin::File(path.clone()), tag);
        Self::custom(identity, move || R::from_file(&path))
    }
}

impl<R: FromMemory + 'static> ResourceKey<R> {
    /// Builds a key that decodes `bytes` through [`FromMemory`].
    ///
    /// The bytes are shared between the identity and the loader, not copied.
    pub fn from_memory(bytes: impl Into<Rc<[u8]>>, tag: &str) -> Self {
        let bytes: Rc<[u8]> = bytes.into();
        let identity = KeyIdentity::new(KeyOrigin::Memory(Rc::clone(&bytes)), tag);
        Self::custom(identity, move || R::from_memory(&bytes))
    }
}

impl<R: FromSource + 'static> ResourceKey<R> {
    /// Builds a key that builds the resource from `source` through [`FromSource`].
    pub fn from_source(source: impl Into<Rc<str>>, tag: &str) -> Self {
        let source: Rc<str> = source.into();
        let identity = KeyIdentity::new(KeyOrigin::Source(Rc::clone(&source)), tag);
        Self::custom(identity, move || R::from_source(&source))
    }
}

impl<R: ?Sized> Clone for ResourceKey<R> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            loader: Rc::clone(&self.loader),
        }
    }
}

impl<R: ?Sized> PartialEq for ResourceKey<R> {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl<R: ?Sized> Eq for ResourceKey<R> {}

impl<R: ?Sized> PartialOrd for ResourceKey<R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R: ?Sized> Ord for ResourceKey<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity.cmp(&other.identity)
    }
}

impl<R: ?Sized> fmt::Debug for ResourceKey<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceKey")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl<R: ?Sized> fmt::Display for ResourceKey<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.identity, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    struct Bytes(Vec<u8>);

    impl FromMemory for Bytes {
        fn from_memory(bytes: &[u8]) -> Result<Self, LoadError> {
            Ok(Self(bytes.to_vec()))
        }
    }

    impl FromFile for Bytes {
        fn from_file(path: &Path) -> Result<Self, LoadError> {
            read_file(path).map(Self)
        }
    }

    struct Program(String);

    impl FromSource for Program {
        fn from_source(source: &str) -> Result<Self, LoadError> {
            if source.contains("main") {
                Ok(Self(source.to_owned()))
            } else {
                Err(LoadError::decode("no entry point"))
            }
        }
    }

    fn size_key(w: u32, h: u32, tag: &str) -> ResourceKey<u32> {
        ResourceKey::from_parameters("Size", [KeyParam::from(w), KeyParam::from(h)], tag, move || Ok(w * h))
    }

    #[test]
    fn test_tag_participates_in_identity() {
        assert_eq!(size_key(64, 64, ""), size_key(64, 64, ""));
        assert_eq!(size_key(64, 64, "ui"), size_key(64, 64, "ui"));
        assert_ne!(size_key(64, 64, ""), size_key(64, 64, "ui"));
        assert_ne!(size_key(64, 32, ""), size_key(64, 64, ""));
    }

    #[test]
    fn test_origin_kinds_never_alias() {
        let file: ResourceKey<Bytes> = ResourceKey::from_file("abc", "");
        let named: ResourceKey<Bytes> = ResourceKey::named("abc", "", || Ok(Bytes(Vec::new())));
        let memory: ResourceKey<Bytes> = ResourceKey::from_memory(b"abc".to_vec(), "");
        assert_ne!(file, named);
        assert_ne!(file, memory);
        assert_ne!(named, memory);
    }

    #[test]
    fn test_memory_identity_compares_content() {
        let a: ResourceKey<Bytes> = ResourceKey::from_memory(vec![1, 2, 3], "");
        let b: ResourceKey<Bytes> = ResourceKey::from_memory(vec![1, 2, 3], "");
        let c: ResourceKey<Bytes> = ResourceKey::from_memory(vec![1, 2, 4], "");
        assert_eq!(a, b);
        assert!(a < c);
    }

    #[test]
    fn test_loader_is_not_part_of_identity() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let a = ResourceKey::named("atlas", "", move || {
            seen.set(seen.get() + 1);
            Ok(1u8)
        });
        let b = ResourceKey::named("atlas", "", || Ok(2u8));
        assert_eq!(a, b);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_load_runs_loader() {
        let key: ResourceKey<Bytes> = ResourceKey::from_memory(vec![9, 9], "");
        let handle = key.load().unwrap();
        assert_eq!(*handle, Bytes(vec![9, 9]));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let key: ResourceKey<Bytes> = ResourceKey::from_file("definitely/not/here.png", "");
        match key.load() {
            Err(LoadError::Io { path, .. }) => assert_eq!(path, PathBuf::from("definitely/not/here.png")),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn test_source_key_propagates_decode_error() {
        let good: ResourceKey<Program> = ResourceKey::from_source("fn main() {}", "");
        assert_eq!(good.load().unwrap().0, "fn main() {}");

        let bad: ResourceKey<Program> = ResourceKey::from_source("nothing here", "");
        assert!(matches!(bad.load(), Err(LoadError::Decode { .. })));
    }

    #[test]
    fn test_empty_transfer_is_a_load_error() {
        let key: ResourceKey<u8> =
            ResourceKey::new(KeyIdentity::new(KeyOrigin::Named("void".into()), ""), || Ok(TransferHandle::empty()));
        let err = key.load().err().unwrap();
        assert!(err.cause().contains("produced no resource"));
    }

    #[test]
    fn test_float_params_use_total_order() {
        assert_eq!(KeyParam::Float(f64::NAN), KeyParam::Float(f64::NAN));
        assert_ne!(KeyParam::Float(0.0), KeyParam::Float(-0.0));
        assert!(KeyParam::Unsigned(u64::MAX) < KeyParam::Signed(i64::MIN));
    }

    #[test]
    fn test_display() {
        let key = size_key(64, 32, "ui");
        assert_eq!(key.to_string(), "Size(64, 32) [ui]");

        let file: ResourceKey<Bytes> = ResourceKey::from_file("a.png", "");
        assert_eq!(file.to_string(), "file:a.png");
    }

    #[test]
    fn test_identity_serializes_to_json() {
        let identity = KeyIdentity::new(
            KeyOrigin::Parameters {
                kind: "Size".into(),
                params: vec![KeyParam::rgba(255, 255, 255, 255)],
            },
            "hud",
        );
        let json = serde_json::to_string(&identity).unwrap();
        let back: KeyIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }
}
