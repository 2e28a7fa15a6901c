use crate::core::command::Command;
use crate::core::message::Message;

/// A screen-level UI component.
///
/// Components follow the same update/view split as the model:
/// - `update` reacts to a message and may ask for follow-up commands.
/// - `view` is a pure function of the component's state.
///
/// Every call into a component goes through the error boundary, so a panic
/// here is contained to a fallback render.
pub trait Component: Send {
    /// Stable name used in logs and fault reports.
    fn name(&self) -> &str;

    /// Commands to run once when the loop starts.
    fn init(&mut self) -> Vec<Command> {
        Vec::new()
    }

    fn update(&mut self, msg: &Message) -> Vec<Command>;

    fn view(&self) -> String;

    fn set_size(&mut self, width: u16, height: u16);
}
