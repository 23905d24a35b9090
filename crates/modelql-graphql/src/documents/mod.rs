//! Client documents: fragments and operation documents derived from the
//! type graphs and operation signatures of a compilation run.

mod fragments;
mod operations;

pub use fragments::{
    BUILTIN_PARTS, FragmentDefinition, FragmentGenerator, FragmentInfoMap, FragmentSet,
    OBJECTS_NONE, REFS_NONE, SCALARS_ONLY, Selection, WHOLE,
};
pub use operations::{OperationDocument, OperationDocumentGenerator, render_documents};
