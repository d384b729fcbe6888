pub mod change;
pub mod convert;
pub mod detect;

pub use change::{Change, DiffPath, PathSegment};
pub use convert::{Assignment, DiffConverter, UpdateExpressions, RESERVED_WORDS};
pub use detect::{diff_snapshots, diff_values};
