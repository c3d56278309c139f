pub mod context;
pub mod error;
pub mod header;
pub mod mode;
pub mod packet;
pub mod samples;
pub mod stream;
pub mod trailer;

pub use context::*;
pub use error::*;
pub use header::*;
pub use mode::*;
pub use packet::*;
pub use samples::*;
pub use stream::*;
pub use trailer::*;
