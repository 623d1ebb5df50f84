//! Optional and fallible union types, their array combinators, and adapters
//! that let a structured serializer carry them through nested round trips.

pub mod adapter;
pub mod option;
pub mod result;
pub mod serializer;
pub mod value;
pub mod yaml;

pub type Result<T> = anyhow::Result<T>;

pub use adapter::{Codec, UnionAdapter, WireShape, union_adapter};
pub use option::Optional;
pub use result::Fallible;
pub use serializer::{Document, Serializer, default_serializer, parse, stringify};
pub use value::Value;
