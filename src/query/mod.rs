pub mod filter;
pub mod paging;

pub use filter::{FilterExpr, FilterOp};
pub use paging::{apply_sort, paginate, SortDirection, SortSpec};
