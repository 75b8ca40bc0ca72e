mod config;
mod docx;
mod error;
mod extract;
mod insert;
mod model;
pub mod pipeline;
pub mod planner;

pub use config::{DEFAULT_WIDTH_INCHES, InsertOptions, PipelineConfig};
pub use docx::analyze_structure;
pub use error::{Error, Warning};
pub use extract::{
    MANIFEST_NAME, extension_for_content_type, extract_images, extract_images_with_warnings,
    read_manifest, write_manifest,
};
pub use insert::{InsertReport, insert_batch};
pub use model::{Alignment, DocumentStructure, ImageRecord, ParagraphRecord, PlannedInsertion};
pub use pipeline::RunSummary;
pub use planner::{
    CommandPlanner, FilePlanner, HeadingPlanner, InsertionDecision, InsertionPlan,
    InsertionPlanner, PlanRequest, parse_plan_response, validate_plan,
};
