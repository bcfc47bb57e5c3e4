//! Realms and standard built-in objects for the Marten script engine
//!
//! This crate bootstraps realms over the `marten-object` model:
//! - `Object` - ES5 reflection statics and `Object.prototype` methods
//! - `Function` - `call`, `apply`, `toString`
//! - `Array` - array exotic object with `length` tracking, basic prototype methods
//! - `String` - string wrapper object with read-only indexed characters
//! - `Number` / `Boolean` - primitive wrappers
//! - `Math` - constants and the core numeric functions
//! - `JSON` - `parse` (with reviver) and `stringify` (with replacer and `space`)
//!
//! Built-in methods live in per-class catalogs (`catalog`) attached as class
//! value maps, so they are only materialized when first touched.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod array;
pub mod builtin_builder;
pub mod catalog;
pub mod function;
pub mod global;
pub mod helpers;
pub mod intrinsics;
pub mod json;
pub mod math;
pub mod object;
pub mod primitive;
pub mod realm;
pub mod string;

pub use array::ArrayObject;
pub use builtin_builder::{BuiltInBuilder, NamespaceBuilder};
pub use catalog::{BuiltinCatalog, CatalogEntry};
pub use intrinsics::Intrinsics;
pub use primitive::PrimitiveObject;
pub use realm::{Realm, RealmConfig, RealmId, RealmRegistry};
pub use string::StringObject;
