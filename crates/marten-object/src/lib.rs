//! # Marten Object Model
//!
//! The dynamic object/property layer of the Marten script engine.
//!
//! ## Layers
//!
//! - **Open-addressing maps** (`maps`): the storage primitive for everything else
//! - **Capability contract** (`object`): the `JsObject` trait every object implements
//! - **Property table** (`property_table`): per-object slot storage with attribute bits
//! - **Class value map** (`class_map`): per-class catalogs addressed by small ids,
//!   materialized lazily and shared through the object that holds them
//! - **Resolution** (`ordinary`, `object`): own layers first, then the prototype chain
//! - **Arguments aliasing** (`arguments`): indexed windows onto an activation
//! - **Descriptors** (`descriptor`, `integrity`): the ES5 define/seal/freeze protocol

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod arguments;
pub mod class_map;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod function;
pub mod integrity;
pub mod maps;
pub mod object;
pub mod ordinary;
pub mod property;
pub mod property_table;
pub mod value;

pub use arguments::{Activation, ArgState, ArgumentsObject};
pub use class_map::{ClassCatalog, ClassValueMap, IdInitializer};
pub use descriptor::PropertyDescriptor;
pub use error::{ErrorKind, VmError, VmResult};
pub use function::{NativeFn, NativeFunction, arg};
pub use integrity::IntegrityLevel;
pub use object::{
    ClassMapBinding, JsObject, ObjectCore, ObjectRef, OrdinaryObject, Strictness, WeakObjectRef,
    WriteOutcome, WriteRejection,
};
pub use property::{Attributes, PropertyKey, Slot, SlotValue};
pub use property_table::PropertyTable;
pub use value::{PreferredType, Value, same_value, strict_equals};
