pub mod checklist_item;
pub mod checklist_template;
pub mod completion_photo;
pub mod completion_summary;
pub mod job;
pub mod job_completion;
pub mod material_usage;
pub mod time_entry;
pub mod user;
