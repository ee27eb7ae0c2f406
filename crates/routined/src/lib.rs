pub mod api;
pub mod catalog;
pub mod config;
pub mod generate;
pub mod routine;
pub mod voice;

pub use config::Config;
pub use routine::DeviceUpdate;
pub use routine::OnOff;
pub use routine::ParseFailure;
pub use routine::Policy;
pub use routine::RoutineParseResult;
pub use routine::RoutinePipeline;
