// ── Entities ──
//
// What a snapshot materializes as: identity (`key`), the fixed per-category
// entity list (`catalogue`) and the value each entity reports (`state`).

pub mod catalogue;
pub mod key;
pub mod state;

pub use catalogue::{
    DesiredEntity, DeviceSpec, EntityDescriptor, Platform, descriptor, descriptors,
    desired_entities, device_spec,
};
pub use key::{Category, SourceKey, category_of_unique_id};
pub use state::{EntityState, is_available, state_of};
