// Intake: creating jobs and resumes from JSON bodies or multipart uploads.
// Resume text is extracted and cached at upload; originals go to S3 when configured.

pub mod handlers;
pub mod job_title;
pub mod uploads;
