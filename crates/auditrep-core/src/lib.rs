pub mod batch;
pub mod error;
pub mod filter;
pub mod ids;
pub mod model;
pub mod outcomes;
pub mod paging;
pub mod poll;
pub mod selector;
pub mod types;

pub use batch::*;
pub use error::*;
pub use filter::*;
pub use ids::*;
pub use model::*;
pub use outcomes::*;
pub use paging::*;
pub use poll::*;
pub use selector::*;
pub use types::*;
