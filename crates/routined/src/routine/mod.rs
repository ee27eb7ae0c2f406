mod error;
mod interpreter;
mod normalizer;
mod pipeline;
mod update;

pub use error::ParseFailure;
pub use interpreter::AnthropicClient;
pub use interpreter::LanguageModel;
pub use interpreter::LanguageModelError;
pub use interpreter::SentenceInterpreter;
pub use normalizer::normalize;
pub use normalizer::Policy;
pub use pipeline::RoutinePipeline;
pub use update::DeviceUpdate;
pub use update::OnOff;
pub use update::RawParse;
pub use update::RawUpdate;
pub use update::RoutineParseResult;
