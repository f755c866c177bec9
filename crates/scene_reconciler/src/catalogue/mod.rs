//! # Catalogue
//!
//! Registry mapping declarative tag names to constructible native types.
//!
//! A process-wide catalogue ([`CatalogueHandle::global`]) is bootstrapped with
//! the built-in family and can be extended by any caller. Independent
//! catalogues can be created with [`CatalogueHandle::local`], and single types
//! can be bound without touching any catalogue through [`TagBinding::local`].
//!
//! ## Invariants
//!
//! - Tags are unique; re-registering a tag replaces its entry and bumps the
//!   catalogue revision, which invalidates resolution caches held by
//!   reconcilers.
//! - Entries are stored behind `Arc`, so a snapshot taken by
//!   [`CatalogueHandle::entries`] stays valid while registration continues.

use crate::attach::AttachSpec;
use crate::native::{NativeObject, PropValue};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Constructor capability stored in a descriptor
pub type Constructor =
    Arc<dyn Fn(&[PropValue]) -> Result<Box<dyn NativeObject>, String> + Send + Sync>;

/// Describes how to build one native type
#[derive(Clone)]
pub struct TypeDescriptor {
    type_name: Arc<str>,
    constructor: Constructor,
    default_attach: Option<AttachSpec>,
}

impl TypeDescriptor {
    /// Create a descriptor from a constructor taking the node's `args`
    pub fn new<T, F>(type_name: &str, constructor: F) -> Self
    where
        T: NativeObject + 'static,
        F: Fn(&[PropValue]) -> Result<T, String> + Send + Sync + 'static,
    {
        Self {
            type_name: Arc::from(type_name),
            constructor: Arc::new(move |args| {
                constructor(args).map(|object| Box::new(object) as Box<dyn NativeObject>)
            }),
            default_attach: None,
        }
    }

    /// Attach relation used when a node of this type declares none
    pub fn with_default_attach(mut self, attach: AttachSpec) -> Self {
        self.default_attach = Some(attach);
        self
    }

    /// Renderer type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Default attach relation, if any
    pub fn default_attach(&self) -> Option<&AttachSpec> {
        self.default_attach.as_ref()
    }

    /// Build a native object
    pub fn construct(&self, args: &[PropValue]) -> Result<Box<dyn NativeObject>, String> {
        (self.constructor)(args)
    }

    /// Whether both descriptors share one constructor
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.constructor, &other.constructor)
    }

    /// Suggested tag: the type name with a lower-case first letter
    pub fn suggested_tag(&self) -> String {
        let mut chars = self.type_name.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_lowercase().chain(chars).collect()
        })
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("default_attach", &self.default_attach)
            .finish_non_exhaustive()
    }
}

/// One registered tag
#[derive(Debug, Clone)]
pub struct CatalogueEntry {
    /// Tag name
    pub tag: String,
    /// Constructor and metadata
    pub descriptor: TypeDescriptor,
    /// `false` for bootstrap built-ins
    pub is_custom: bool,
}

/// Tag → descriptor map
#[derive(Debug, Default)]
pub struct Catalogue {
    entries: BTreeMap<String, Arc<CatalogueEntry>>,
}

impl Catalogue {
    /// Empty catalogue
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalogue holding the built-in family
    pub fn with_builtins() -> Self {
        let mut catalogue = Self::new();
        for (tag, descriptor) in crate::native::builtin::catalogue_entries() {
            catalogue.insert(tag.to_string(), descriptor, false);
        }
        catalogue
    }

    fn insert(&mut self, tag: String, descriptor: TypeDescriptor, is_custom: bool) {
        let entry = Arc::new(CatalogueEntry {
            tag: tag.clone(),
            descriptor,
            is_custom,
        });
        if self.entries.insert(tag.clone(), entry).is_some() {
            log::debug!("Catalogue entry `{tag}` replaced");
        }
    }

    /// Look up a tag
    pub fn resolve(&self, tag: &str) -> Option<Arc<CatalogueEntry>> {
        self.entries.get(tag).cloned()
    }

    /// Number of registered tags
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tags are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared, injectable catalogue scope
#[derive(Debug, Clone)]
pub struct CatalogueHandle {
    inner: Arc<RwLock<Catalogue>>,
    revision: Arc<AtomicU64>,
}

static GLOBAL: OnceLock<CatalogueHandle> = OnceLock::new();

impl CatalogueHandle {
    fn from_catalogue(catalogue: Catalogue) -> Self {
        Self {
            inner: Arc::new(RwLock::new(catalogue)),
            revision: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The process-wide catalogue, bootstrapped with the built-ins
    pub fn global() -> Self {
        GLOBAL
            .get_or_init(|| Self::from_catalogue(Catalogue::with_builtins()))
            .clone()
    }

    /// A new catalogue scope holding only the built-ins
    pub fn local() -> Self {
        Self::from_catalogue(Catalogue::with_builtins())
    }

    /// A new catalogue scope with no entries at all
    pub fn empty() -> Self {
        Self::from_catalogue(Catalogue::new())
    }

    /// Register custom types; existing tags are overwritten
    pub fn register<I, S>(&self, entries: I)
    where
        I: IntoIterator<Item = (S, TypeDescriptor)>,
        S: Into<String>,
    {
        let mut catalogue = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for (tag, descriptor) in entries {
            let tag = tag.into();
            log::debug!("Registering tag `{tag}` -> {}", descriptor.type_name());
            catalogue.insert(tag, descriptor, true);
        }
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    /// Register one type globally under its suggested tag and return the binding
    pub fn bind(&self, descriptor: TypeDescriptor) -> TagBinding {
        let tag = descriptor.suggested_tag();
        self.register([(tag.clone(), descriptor.clone())]);
        TagBinding {
            tag,
            descriptor,
            scope: BindingScope::Catalogue,
        }
    }

    /// Look up a tag
    pub fn resolve(&self, tag: &str) -> Option<Arc<CatalogueEntry>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(tag)
    }

    /// Snapshot of all entries, ordered by tag
    pub fn entries(&self) -> Vec<Arc<CatalogueEntry>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .values()
            .cloned()
            .collect()
    }

    /// Monotonic counter bumped by every registration call
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Whether both handles share one catalogue
    pub fn same_scope(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for CatalogueHandle {
    fn default() -> Self {
        Self::global()
    }
}

/// Where a [`TagBinding`] is resolvable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingScope {
    /// Registered in a catalogue; the tag resolves through normal lookup
    Catalogue,
    /// Private to the binding object; no catalogue knows the tag
    Local,
}

/// A ready-to-use tag for a single type
#[derive(Debug, Clone)]
pub struct TagBinding {
    tag: String,
    descriptor: TypeDescriptor,
    scope: BindingScope,
}

static LOCAL_BINDING_COUNTER: AtomicU64 = AtomicU64::new(0);

impl TagBinding {
    /// Bind a type without registering it anywhere.
    ///
    /// The generated tag is unique per binding so it can never collide with a
    /// catalogued tag.
    pub fn local(descriptor: TypeDescriptor) -> Self {
        let n = LOCAL_BINDING_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            tag: format!("local:{}#{n}", descriptor.type_name()),
            descriptor,
            scope: BindingScope::Local,
        }
    }

    /// The bound tag
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The bound descriptor
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Resolution scope
    pub fn scope(&self) -> BindingScope {
        self.scope
    }
}

/// Revision-checked resolution cache held by a reconciler.
///
/// Any registration on the backing catalogue clears the cache, so a replaced
/// tag is never resolved from stale data.
#[derive(Debug, Default)]
pub(crate) struct ResolveCache {
    revision: u64,
    entries: HashMap<String, Arc<CatalogueEntry>>,
}

impl ResolveCache {
    pub(crate) fn resolve(
        &mut self,
        catalogue: &CatalogueHandle,
        tag: &str,
    ) -> Option<Arc<CatalogueEntry>> {
        let revision = catalogue.revision();
        if revision != self.revision {
            log::trace!(
                "Catalogue revision {} -> {revision}, dropping {} cached tags",
                self.revision,
                self.entries.len()
            );
            self.entries.clear();
            self.revision = revision;
        }
        if let Some(entry) = self.entries.get(tag) {
            return Some(Arc::clone(entry));
        }
        let entry = catalogue.resolve(tag)?;
        self.entries.insert(tag.to_string(), Arc::clone(&entry));
        Some(entry)
    }
}
