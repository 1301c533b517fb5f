pub mod audit_manager;
pub mod s3;
pub mod session;
pub mod sns;

pub use audit_manager::*;
pub use s3::*;
pub use session::*;
pub use sns::*;
