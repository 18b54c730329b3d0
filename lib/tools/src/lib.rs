//! Built-in tools offered to the model.
//!
//! - **Time**: current date/time and weekday
//! - **Calculator**: arithmetic over `+ - * /` and parentheses
//! - **Files**: save, read, and list text files in the session's directory
//! - **Memory**: remembered preferences and tracked topics
//! - **Fun facts**: a random computing fact
//!
//! Every tool reports its own failures as text, because the model reads the
//! result as conversation rather than as a structured error.

pub mod calculator;
pub mod file;
pub mod fun_fact;
pub mod memory;
pub mod time;

use parley_conversation::{ToolError, ToolRegistry};

pub use calculator::{Calculate, evaluate};
pub use file::{ListFiles, ReadFromFile, SaveToFile};
pub use fun_fact::{FUN_FACTS, GenerateFunFact};
pub use memory::{ListDiscussedTopics, RecallPreference, RememberPreference, TrackTopic};
pub use time::{CurrentDayOfWeek, CurrentTime};

/// Builds a registry holding every built-in tool.
///
/// # Errors
///
/// Returns `ToolError::DuplicateName` only if two built-ins share a name.
pub fn builtin_registry() -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register_tool(CurrentTime)?;
    registry.register_tool(CurrentDayOfWeek)?;
    registry.register_tool(Calculate)?;
    registry.register_tool(SaveToFile)?;
    registry.register_tool(ReadFromFile)?;
    registry.register_tool(ListFiles)?;
    registry.register_tool(RememberPreference)?;
    registry.register_tool(RecallPreference)?;
    registry.register_tool(TrackTopic)?;
    registry.register_tool(ListDiscussedTopics)?;
    registry.register_tool(GenerateFunFact)?;
    Ok(registry)
}
