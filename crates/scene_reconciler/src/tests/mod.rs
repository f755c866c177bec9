//! Cross-module behaviour tests
//!
//! Each file exercises one observable property of the whole pipeline
//! (elements → reconciler → scene graph → events).

mod catalogue_scoping;
mod custom_types;
mod hover_transitions;
