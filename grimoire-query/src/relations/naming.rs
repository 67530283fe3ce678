//! Naming conventions for joins and relation keys.

use convert_case::{Case, Casing};

/// Strip one trailing `s`: `comments` -> `comment`.
pub fn singular(name: &str) -> &str {
    name.strip_suffix('s').unwrap_or(name)
}

/// Snake-case a model or field name: `UserProfile` -> `user_profile`.
pub fn snake(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// Key column on the owning side of a conventional join: `comments` -> `comment_id`.
pub fn join_key(collection: &str) -> String {
    format!("{}_id", singular(collection))
}

/// Owner field implying a belongs-to relation: `author` -> `author_id`.
pub fn belongs_to_reference(relation: &str) -> String {
    format!("{}_id", snake(relation))
}

/// Foreign key on related records of a has-one/has-many: `User` -> `user_id`.
pub fn has_foreign_key(owner_model: &str) -> String {
    format!("{}_id", snake(owner_model))
}
