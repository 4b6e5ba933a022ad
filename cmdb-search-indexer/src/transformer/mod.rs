//! Entity transformers.
//!
//! One transformer per entity family turns a source record into the
//! outcome of its change event. Transformers only read the caches and the
//! primary store; all failures come back as `MapError`.

mod instance;
mod model;
mod table;

pub use instance::{InstanceFamily, InstanceTransformer};
pub use model::ModelTransformer;
pub use table::TableRowTransformer;

use async_trait::async_trait;

use crate::cache::EnumLabels;
use crate::collections::Collection;
use crate::errors::MapError;
use crate::identity::SourceDocument;
use crate::outcome::MapOutcome;

/// Per-event inputs shared by every transformer.
pub struct TransformContext<'a> {
    /// Classification of the event's collection.
    pub collection: &'a Collection,
    /// Database the event comes from.
    pub database: &'a str,
    /// Enum label snapshot taken for this event.
    pub labels: &'a EnumLabels,
}

/// Maps a source record of one entity family to an outcome.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(
        &self,
        document: &SourceDocument,
        ctx: &TransformContext<'_>,
    ) -> Result<MapOutcome, MapError>;
}
