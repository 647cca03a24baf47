//! `hhr` parses the `.hhr` result files written by the HHsuite homology
//! search tools `hhblits` and `hhsearch`.
//!
//! An `.hhr` file reports one query profile aligned against many database
//! templates. [`Reader`] consumes the file header and ranked-hit summary
//! table when it is constructed, then yields one [`Alignment`] per hit on
//! demand:
//!
//! ```no_run
//! use hhr::Reader;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut reader = Reader::from_path("2uvo_hhblits.hhr")?;
//!     println!("query: {}", reader.metadata().query_id);
//!
//!     for alignment in reader.alignments() {
//!         let alignment = alignment?;
//!         println!(
//!             "{}\tProbab={}\tE-value={}",
//!             alignment.target.id, alignment.stats.probab, alignment.stats.e_value,
//!         );
//!     }
//!     Ok(())
//! }
//! ```

pub mod parser;
pub mod structs;
pub mod util;

pub use parser::{Metadata, ParseError, Reader};
pub use structs::{Alignment, Coordinates, HitStats, LetterAnnotations, Run, RunKind, SequenceRecord};
