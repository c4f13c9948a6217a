pub mod appwrite;

pub use appwrite::{equal_query, AppwriteClient, BackendError};
