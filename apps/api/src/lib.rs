pub mod collaborators;
pub mod router;

pub use collaborators::Collaborators;
pub use router::create_router;
