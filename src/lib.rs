//! # Grimoire
//!
//! A data-access layer built around three pieces:
//! - tracked change logs for partial record writes
//! - immutable query descriptors, rendered by a pluggable engine
//! - batched has-one / has-many / belongs-to preloading over in-memory records
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use grimoire::prelude::*;
//!
//! let repo = Repo::new(engine);
//!
//! let mut users: Vec<User> = repo
//!     .all(repo.from("users").r#where(Filter::eq("active", true)))
//!     .await?;
//!
//! // one query for posts, one for their comments
//! repo.preload_all(&mut users, "posts.comments").await?;
//!
//! repo.update(
//!     repo.from("users").find(users[0].id),
//!     &Changes::build([Change::set("name", "Ann"), Change::inc("logins")]),
//! )
//! .await?;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use grimoire_query::*;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use grimoire_query::prelude::*;
}
