pub mod agtype;
pub mod assemble;
pub mod compound;
pub mod db;
pub mod elements;
pub mod logging;
pub mod normalize;
pub mod remote_client;
pub mod rows;
pub mod settings;
pub mod utils;
pub mod validate;
pub mod view;

pub use agtype::{decode, DecodeError, DecodedEntity, EntityKind};
pub use assemble::{assemble, assemble_rows, Assembly, SkippedRow};
pub use compound::{group, CompoundGroup};
pub use elements::{EdgeElement, ElementBatch, NodeElement, VisualElement};
pub use normalize::{resolve_edge_type, resolve_id, resolve_node_label, ElementId};
pub use rows::{EdgeRow, NodeRow, RowSet};
pub use validate::{parse_batch, stats, validate, GraphStats, ParsedBatch, SkippedElement, ValidationError};
pub use view::{GraphSource, GraphView, LoadError};
