//! Built-in pipeline steps.
//!
//! Field-level steps ([`FilterFields`], [`RenameFields`], [`MakeOptional`],
//! [`ModifyFields`], [`StripMarkers`]) implement [`FieldTransformer`] and can
//! either stand alone in a pipeline or be grouped per field with
//! [`MapFields`]. The rest work on the whole context.

mod attribute;
mod build;
mod connect;
mod extract;
pub mod fields;
mod filter;
mod modify;
mod optional;
mod rename;
mod switch;

pub use attribute::SetAttribute;
pub use build::BuildVariant;
pub use connect::{ConnectOptions, ConnectVariant, alias_name};
pub use extract::ExtractVariant;
pub use fields::{FieldTransformer, MapFields};
pub use filter::{FieldPredicate, FilterFields, FilterOptions};
pub use modify::{ModifyFields, SetFields, StripMarkers};
pub use optional::{MakeOptional, OptionalOptions};
pub use rename::{RenameFields, RenameFn, RenameOptions};
pub use switch::SwitchNested;
