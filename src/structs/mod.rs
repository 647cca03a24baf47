pub mod record;
pub use record::{LetterAnnotations, SequenceRecord};

pub mod alignment;
pub use alignment::{Alignment, Coordinates, HitStats, Run, RunKind};
