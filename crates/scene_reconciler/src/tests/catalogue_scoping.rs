//! Catalogue scopes: global, per-reconciler local catalogues and catalogue-free
//! bindings

use crate::catalogue::{BindingScope, CatalogueHandle, TagBinding, TypeDescriptor};
use crate::element::Element;
use crate::error::ReconcileError;
use crate::native::PassThrough;
use crate::reconciler::Reconciler;

fn widget() -> TypeDescriptor {
    passthrough("Widget")
}

fn passthrough(type_name: &'static str) -> TypeDescriptor {
    TypeDescriptor::new(type_name, move |_| Ok(PassThrough::new(type_name)))
}

#[test]
fn test_local_binding_never_reaches_global_catalogue() {
    let binding = TagBinding::local(widget());
    assert_eq!(binding.scope(), BindingScope::Local);
    assert!(binding.tag().starts_with("local:Widget#"));
    assert!(CatalogueHandle::global().resolve(binding.tag()).is_none());
}

#[test]
fn test_local_bindings_get_distinct_tags() {
    let a = TagBinding::local(widget());
    let b = TagBinding::local(widget());
    assert_ne!(a.tag(), b.tag());
}

#[test]
fn test_bound_element_mounts_without_catalogue_entry() {
    let binding = TagBinding::local(widget());
    let mut r = Reconciler::new(CatalogueHandle::empty());

    let report = r.reconcile(&[Element::bound(&binding).prop("name", "w")]);

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    let id = r.tree().roots()[0];
    assert_eq!(r.object(id).unwrap().type_name(), "Widget");

    let second = r.reconcile(&[Element::bound(&binding).prop("name", "w")]);
    assert!(second.is_noop());
}

#[test]
fn test_empty_catalogue_knows_no_builtins() {
    let mut r = Reconciler::new(CatalogueHandle::empty());
    let report = r.reconcile(&[Element::new("group")]);
    assert!(matches!(report.errors[0], ReconcileError::UnknownTag { .. }));
    assert!(r.tree().is_empty());
}

#[test]
fn test_local_catalogue_binding_does_not_leak() {
    let local = CatalogueHandle::local();
    let binding = local.bind(passthrough("ScopedGizmo"));
    assert_eq!(binding.tag(), "scopedGizmo");
    assert_eq!(binding.scope(), BindingScope::Catalogue);

    assert!(local.resolve("scopedGizmo").is_some());
    assert!(CatalogueHandle::global().resolve("scopedGizmo").is_none());
    assert!(CatalogueHandle::local().resolve("scopedGizmo").is_none());

    let mut inside = Reconciler::new(local);
    assert!(inside.reconcile(&[Element::bound(&binding)]).errors.is_empty());

    let mut outside = Reconciler::new(CatalogueHandle::local());
    assert_eq!(outside.reconcile(&[Element::new("scopedGizmo")]).errors.len(), 1);
}

#[test]
fn test_reregistering_leaves_mounted_instances_alone() {
    let catalogue = CatalogueHandle::local();
    catalogue.register([("thing", passthrough("ThingV1"))]);
    let mut r = Reconciler::new(catalogue.clone());
    r.reconcile(&[Element::new("thing")]);
    let id = r.tree().roots()[0];

    let revision = catalogue.revision();
    catalogue.register([("thing", passthrough("ThingV2"))]);
    assert!(catalogue.revision() > revision);

    let report = r.reconcile(&[Element::new("thing")]);
    assert_eq!(report.constructed().len(), 0);
    assert_eq!(r.tree().roots()[0], id);
    assert_eq!(r.object(id).unwrap().type_name(), "ThingV1");

    // New instances pick up the replacement.
    r.reconcile(&[Element::new("thing"), Element::new("thing")]);
    let fresh = r.tree().roots()[1];
    assert_eq!(r.object(fresh).unwrap().type_name(), "ThingV2");
}

#[test]
fn test_global_registration_visible_through_new_handles() {
    CatalogueHandle::global().register([("scopingTestGlobalTag", passthrough("GlobalThing"))]);
    assert!(CatalogueHandle::global().resolve("scopingTestGlobalTag").is_some());
    assert!(CatalogueHandle::local().resolve("scopingTestGlobalTag").is_none());
}
