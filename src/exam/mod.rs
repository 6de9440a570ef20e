pub mod flow;
pub mod registry;

pub use flow::{ExamPhase, ExamSession, ExamView, FlowError, PhaseEvent, PhaseTimings, UploadState};
pub use registry::ExamRegistry;
