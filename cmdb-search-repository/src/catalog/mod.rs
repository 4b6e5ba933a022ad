//! Index catalog: the versioned indices, their aliases and schemas.
//!
//! Every logical index is created under a versioned name (`{base}-{version}`)
//! and queried through its unversioned alias (`{base}`). A schema change ships
//! as a new version; `IndexCatalog::ensure` creates it and repoints the alias.

mod index_catalog;
mod index_definition;

pub use index_catalog::IndexCatalog;
pub use index_definition::{
    table_properties_mapping, versioned_index_name, IndexDefinition, IndexKind, IndexSettings,
};
