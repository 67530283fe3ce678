//! Relation descriptions and association preloading.
//!
//! Record types describe themselves with a static [`Schema`] and expose their
//! relation fields as [`Slot`]s. The [`RelationLoader`] walks a relation path
//! and fills the final relation with one batched query:
//!
//! ```rust,ignore
//! // users -> posts -> comments, two queries in total
//! repo.preload_all(&mut users, "posts.comments").await?;
//! ```
//!
//! Relation keys are inferred by convention unless declared with
//! [`RelationField`]:
//! - owner has `<relation>_id`: belongs-to, matched against the related `id`
//! - otherwise: has-one / has-many, owner `id` matched against `<owner>_id`

mod loader;
pub mod naming;
mod registry;
mod slot;
mod spec;

pub use loader::RelationLoader;
pub use registry::{RelationRegistry, resolve};
pub use slot::Slot;
pub use spec::{RelationField, RelationKind, ResolvedRelation, Schema};
