//! Data model, value serializer, delta algorithm, and error types shared by
//! every stage of the step-trace pipeline.

pub mod artifact;
pub mod delta;
pub mod error;
pub mod node;
pub mod relationship;
pub mod step;
pub mod value;

pub use artifact::{Artifact, Metadata};
pub use delta::delta;
pub use error::{ParseError, ResourceError, RuntimeError, TracerError, TracerResult};
pub use node::{NodeId, NodeKind, RelationshipNodeId, SourceNode, Span};
pub use relationship::{Relationship, RelationshipKind};
pub use step::{Event, ObjectTableEntry, ObjectValue, RawStep, Step, TraceLineEntry};
pub use value::{ObjectId, Serialized};
