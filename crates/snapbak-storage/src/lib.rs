//! snapbak-storage: OpenDAL operator construction and object get/put

pub mod creds;
pub mod object;
pub mod operator;

pub use creds::StorageCredentials;
pub use object::{fetch_object, store_object};
pub use operator::build_operator;
