mod user;
pub use user::{UserEntity, UserEntityCreateUpdate, normalize_email};

mod domain;
pub use domain::{Domain, DomainCreateUpdate};

mod course;
pub use course::{Course, CourseCreateUpdate, CourseFilter, CourseStatus, ModuleOutlineRow};

mod module;
pub use module::{Module, ModuleCreate};

mod chapter;
pub use chapter::{Chapter, ChapterCreate};

mod content_item;
pub use content_item::{ContentItem, ContentItemCreate, ContentType};

mod class;
pub use class::{Class, ClassCreateUpdate, ClassStudentRow};

mod enrollment;
pub use enrollment::{Enrollment, EnrollmentCreate, EnrollmentFilter, EnrollmentStatus};

mod chapter_progress;
pub use chapter_progress::ChapterProgress;

mod quiz_attempt;
pub use quiz_attempt::{QuizAttempt, QuizAttemptCreate};

mod project_submission;
pub use project_submission::{ProjectSubmission, ProjectSubmissionCreate};
