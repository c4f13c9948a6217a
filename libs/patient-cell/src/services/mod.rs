pub mod identity;
pub mod patient_store;
pub mod registry;

pub use identity::{AppwriteIdentityService, IdentityService, InMemoryIdentityService};
pub use patient_store::{AppwritePatientStore, InMemoryPatientStore, PatientStore};
pub use registry::PatientRegistryService;
