mod image_service;
mod instance_service;
mod kitchen_service;
mod metadata_service;
mod orchestrator;
mod state_store;
mod template_service;

pub use image_service::ImageService;
pub use instance_service::{InstanceService, POST_START_COMMAND};
pub use kitchen_service::KitchenService;
pub use metadata_service::MetadataService;
pub use orchestrator::{DEFAULT_SUITE, GEM_UPDATE_COMMAND, Orchestrator, TestOptions};
pub use state_store::StateStore;
pub use template_service::TemplateService;
