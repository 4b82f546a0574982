//! Primitive OPC UA data types (§3 of the data model): identifiers, strings, and the tagged
//! [`Variant`] value union. These are the building blocks every other module is expressed in
//! terms of.

mod attribute_id;
mod browse_direction;
mod date_time;
mod diagnostic_info;
mod guid;
mod localized_text;
mod node_class;
mod node_id;
mod numeric_range;
mod qualified_name;
mod status_code;
mod variant;

pub use self::{
    attribute_id::AttributeId,
    browse_direction::BrowseDirection,
    date_time::DateTime,
    diagnostic_info::DiagnosticInfo,
    guid::Guid,
    localized_text::LocalizedText,
    node_class::{NodeClass, NodeClassMask},
    node_id::{Identifier, NodeId},
    numeric_range::NumericRange,
    qualified_name::QualifiedName,
    status_code::StatusCode,
    variant::{Array, Scalar, Variant, DEFAULT_ENCODING_LIMIT},
};
