//! Log messages and the bulk joiner
//!
use std::borrow::Cow;

/// A value that can be submitted as a log message.
///
/// `None` stands for a missing message and is dropped without a network call.
pub trait AsMessage {
    /// Returns the message text, or None if there is no message
    fn as_message(&self) -> Option<&str>;
}

impl AsMessage for str {
    fn as_message(&self) -> Option<&str> {
        Some(self)
    }
}

impl AsMessage for String {
    fn as_message(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl AsMessage for Cow<'_, str> {
    fn as_message(&self) -> Option<&str> {
        Some(self.as_ref())
    }
}

impl<T: AsMessage + ?Sized> AsMessage for &T {
    fn as_message(&self) -> Option<&str> {
        (**self).as_message()
    }
}

impl<T: AsMessage> AsMessage for Option<T> {
    fn as_message(&self) -> Option<&str> {
        self.as_ref().and_then(AsMessage::as_message)
    }
}

/// Combines messages into one payload for a single request.
///
/// The endpoint treats each line feed as the end of an event, so line breaks
/// inside a message are replaced with `\r` to keep the message in one event.
/// Every surviving message is followed by `\n`. Missing and empty messages
/// are skipped, and the result is empty if nothing survives.
///
/// ```
/// use loggly_client::join_messages;
///
/// let joined = join_messages([Some("line1\nline2"), Some(""), None, Some("msg2")]);
/// assert_eq!(joined, "line1\rline2\nmsg2\n");
/// ```
pub fn join_messages<I>(messages: I) -> String
where
    I: IntoIterator,
    I::Item: AsMessage,
{
    let mut buf = String::new();
    for message in messages {
        let text = match message.as_message() {
            Some(text) if !text.is_empty() => text,
            _ => continue,
        };
        buf.extend(text.chars().map(|c| match c {
            '\r' | '\n' => '\r',
            c => c,
        }));
        buf.push('\n');
    }
    buf
}
