//! User-defined native types take part in reconciliation, attach and hit
//! testing exactly like the built-ins

use crate::attach::SlotAddress;
use crate::catalogue::{CatalogueHandle, TypeDescriptor};
use crate::config::RootConfig;
use crate::element::Element;
use crate::events::{EventKind, PlatformEvent};
use crate::foundation::math::{Transform, Vec3};
use crate::native::{NativeObject, Object3D, PassThrough, PropError, PropValue, SlotKind};
use crate::reconciler::{Mutation, Reconciler};
use crate::root::Root;
use crate::scene::{BoundingSphere, HitShape};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Pickable sphere with a pulse rate and a `lens` slot
#[derive(Debug)]
struct Beacon {
    object: Object3D,
    radius: f32,
    pulse: f32,
    disposals: Arc<AtomicUsize>,
}

impl Beacon {
    fn descriptor(disposals: Arc<AtomicUsize>) -> TypeDescriptor {
        TypeDescriptor::new("Beacon", move |args| {
            let radius = match args.first() {
                None => 1.0,
                Some(value) => value.as_f32().ok_or("radius must be a number")?,
            };
            if radius <= 0.0 {
                return Err(format!("radius must be positive, got {radius}"));
            }
            Ok(Self {
                object: Object3D::default(),
                radius,
                pulse: 1.0,
                disposals: Arc::clone(&disposals),
            })
        })
    }
}

impl NativeObject for Beacon {
    fn type_name(&self) -> &str {
        "Beacon"
    }

    fn set_prop(&mut self, name: &str, value: &PropValue) -> Result<(), PropError> {
        match name {
            "pulse" => {
                self.pulse = value
                    .as_f32()
                    .ok_or_else(|| PropError::invalid(name, "a number"))?;
                Ok(())
            }
            "radius" => Err(PropError::ReadOnly(name.to_string())),
            _ => self.object.set_prop(name, value),
        }
    }

    fn get_prop(&self, name: &str) -> Option<PropValue> {
        match name {
            "pulse" => Some(PropValue::Float(self.pulse)),
            "radius" => Some(PropValue::Float(self.radius)),
            _ => self.object.get_prop(name),
        }
    }

    fn slot(&self, name: &str) -> Option<SlotKind> {
        (name == "lens").then_some(SlotKind::Single)
    }

    fn transform(&self) -> Transform {
        self.object.transform
    }

    fn hit_shape(&self) -> Option<HitShape> {
        Some(HitShape::Sphere(BoundingSphere::new(Vec3::zeros(), self.radius)))
    }

    fn dispose(&mut self) -> Result<(), String> {
        self.disposals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn catalogue_with_beacon() -> (CatalogueHandle, Arc<AtomicUsize>) {
    let disposals = Arc::new(AtomicUsize::new(0));
    let catalogue = CatalogueHandle::local();
    catalogue.register([("beacon", Beacon::descriptor(Arc::clone(&disposals)))]);
    (catalogue, disposals)
}

fn beacon(r: &Reconciler) -> &Beacon {
    let id = r.tree().roots()[0];
    r.object(id).unwrap().as_any().downcast_ref::<Beacon>().unwrap()
}

#[test]
fn test_custom_type_props_and_reset() {
    let (catalogue, _) = catalogue_with_beacon();
    let mut r = Reconciler::new(catalogue);

    let report = r.reconcile(&[Element::new("beacon")
        .args([2.0])
        .prop("pulse", 4.0)
        .prop("position-x", 3.0)]);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!((beacon(&r).pulse - 4.0).abs() < f32::EPSILON);
    assert!((beacon(&r).radius - 2.0).abs() < f32::EPSILON);
    assert!((beacon(&r).object.transform.position.x - 3.0).abs() < f32::EPSILON);

    let report = r.reconcile(&[Element::new("beacon").args([2.0]).prop("position-x", 3.0)]);
    assert_eq!(report.count(|m| matches!(m, Mutation::ResetProp { .. })), 1);
    assert!((beacon(&r).pulse - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_read_only_prop_reported() {
    let (catalogue, _) = catalogue_with_beacon();
    let mut r = Reconciler::new(catalogue);
    let report = r.reconcile(&[Element::new("beacon").prop("radius", 5.0)]);

    assert_eq!(report.errors.len(), 1);
    assert_eq!(r.tree().len(), 1);
}

#[test]
fn test_constructor_error_reported() {
    let (catalogue, disposals) = catalogue_with_beacon();
    let mut r = Reconciler::new(catalogue);
    let report = r.reconcile(&[Element::new("beacon").args([-1.0]), Element::new("group")]);

    assert_eq!(report.errors.len(), 1);
    assert_eq!(r.tree().len(), 1);
    assert_eq!(disposals.load(Ordering::SeqCst), 0);
}

#[test]
fn test_custom_slot_accepts_passthrough_child() {
    let (catalogue, disposals) = catalogue_with_beacon();
    let mut r = Reconciler::new(catalogue);
    let lens = TypeDescriptor::new("Lens", |_| Ok(PassThrough::new("Lens")));

    let report = r.reconcile(&[Element::new("beacon")
        .child(Element::primitive(lens).attach("lens").prop("focal", 35.0))]);
    assert!(report.errors.is_empty(), "{:?}", report.errors);

    let beacon_id = r.tree().roots()[0];
    let lens_id = r.tree().children_of(Some(beacon_id))[0];
    let beacon_node = r.instance(beacon_id).unwrap().node();
    assert_eq!(
        r.graph().slot_occupant(beacon_node, &SlotAddress::single("lens")),
        Some(r.instance(lens_id).unwrap().node())
    );
    assert_eq!(
        r.object(lens_id).unwrap().get_prop("focal"),
        Some(PropValue::Float(35.0))
    );

    r.unmount_all();
    assert_eq!(disposals.load(Ordering::SeqCst), 1);
    assert!(r.tree().is_empty());
}

#[test]
fn test_primitive_descriptor_identity_forces_rebuild() {
    let mut r = Reconciler::new(CatalogueHandle::local());
    let first = TypeDescriptor::new("Gadget", |_| Ok(PassThrough::new("Gadget")));
    let second = TypeDescriptor::new("Gadget", |_| Ok(PassThrough::new("Gadget")));

    r.reconcile(&[Element::primitive(first.clone())]);
    assert!(r.reconcile(&[Element::primitive(first)]).is_noop());

    let report = r.reconcile(&[Element::primitive(second)]);
    assert_eq!(report.constructed().len(), 1);
    assert_eq!(report.disposed().len(), 1);
}

#[test]
fn test_custom_hit_shape_receives_clicks() {
    let (catalogue, _) = catalogue_with_beacon();
    let mut root = Root::with_catalogue(&RootConfig::default(), catalogue);
    let clicks = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = clicks.clone();
    root.render(&[Element::new("beacon")
        .args([0.5])
        .on(EventKind::Click, move |_| counter.set(counter.get() + 1))]);

    root.handle_event(&PlatformEvent::pointer(EventKind::Click, 640.0, 360.0));
    root.handle_event(&PlatformEvent::pointer(EventKind::Click, 5.0, 5.0));
    assert_eq!(clicks.get(), 1);
}
